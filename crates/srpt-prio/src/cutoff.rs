//! # Cutoff Tables
//!
//! A cutoff table splits the size axis into priority bands. Level `i`
//! (0 = most preferred) owns the half-open band `(cutoff[i-1], cutoff[i]]`,
//! with `cutoff[-1] = 0`. The last entry is always [`MAX_SIZE`], so every
//! size lands in some band.
//!
//! ## Spacing
//!
//! ```text
//! EqualProbability (L = 4):   |----25%----|----25%----|----25%----|----25%----|
//! Exponential      (L = 4):   |--------53%--------|----27%----|-13%-|-7%-|
//! ```
//!
//! Exponential spacing starts at `s₀ = 1 / (2 − 2^(1−L))` and halves the
//! probability step for every level, so small messages get most of the
//! priority resolution and large ones share the bottom bands.
//!
//! ## Scan
//!
//! Thresholds are resolved in ascending order with one forward cursor that
//! is never rewound. The cursor stays on the entry it selected, so the next
//! threshold starts by skipping it (and any repeats of that size) as a
//! duplicate. A distribution with too few distinct sizes yields a table
//! shorter than `L`.

use std::fmt;

use tracing::{debug, warn};

use crate::dist::{SizeDistribution, MAX_SIZE};

// ─── Spacing ────────────────────────────────────────────────────────────────

/// How probability mass is divided between priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spacing {
    /// `L` equal shares of `1/L`.
    EqualProbability,
    /// Geometrically shrinking shares, halving per level.
    Exponential,
}

impl Spacing {
    /// Probability threshold closing band `k - 1`, for `k` in `1..levels`.
    ///
    /// Computed in closed form so the result never depends on accumulated
    /// rounding from earlier thresholds.
    fn threshold(self, k: u16, levels: u16) -> f64 {
        match self {
            Spacing::EqualProbability => k as f64 / levels as f64,
            Spacing::Exponential => {
                let first_step = 1.0 / (2.0 - 2f64.powi(1 - levels as i32));
                first_step * (2.0 - 2f64.powi(1 - k as i32))
            }
        }
    }
}

// ─── CutoffTable ────────────────────────────────────────────────────────────

/// Non-decreasing size thresholds terminated by [`MAX_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CutoffTable {
    cutoffs: Vec<u32>,
}

impl CutoffTable {
    /// Partition `dist` into `levels` priority bands.
    pub fn build(dist: &SizeDistribution, levels: u16, spacing: Spacing) -> Self {
        let points = dist.points();
        let mut cutoffs = Vec::with_capacity(levels.max(1) as usize);
        let mut cursor = 0usize;
        let mut prev_cutoff: Option<u32> = None;

        for k in 1..levels {
            let threshold = spacing.threshold(k, levels);
            while cursor < points.len() {
                let (size, prob) = points[cursor];
                if prev_cutoff == Some(size) {
                    cursor += 1;
                    continue;
                }
                if prob >= threshold {
                    cutoffs.push(size);
                    prev_cutoff = Some(size);
                    break;
                }
                cursor += 1;
            }
        }
        cutoffs.push(MAX_SIZE);

        let table = CutoffTable { cutoffs };
        if table.len() < levels as usize {
            warn!(
                levels,
                built = table.len(),
                ?spacing,
                "distribution has too few distinct sizes for all priority levels"
            );
        }
        debug!(levels, ?spacing, cutoffs = %table, "cutoff table built");
        table
    }

    /// Priority level for `size`: the first band whose cutoff is `>= size`.
    ///
    /// O(log L), no allocation.
    #[inline]
    pub fn lookup(&self, size: u32) -> u16 {
        let idx = self.cutoffs.partition_point(|&cutoff| cutoff < size);
        // The MAX_SIZE sentinel bounds idx; the clamp keeps the cast honest.
        idx.min(self.cutoffs.len() - 1) as u16
    }

    pub fn cutoffs(&self) -> &[u32] {
        &self.cutoffs
    }

    /// Number of bands, sentinel included.
    pub fn len(&self) -> usize {
        self.cutoffs.len()
    }

    /// Always `false`; every table carries the sentinel.
    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }
}

impl fmt::Display for CutoffTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, &cutoff) in self.cutoffs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if cutoff == MAX_SIZE {
                write!(f, "MAX")?;
            } else {
                write!(f, "{cutoff}")?;
            }
        }
        write!(f, "]")
    }
}
