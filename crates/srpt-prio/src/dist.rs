//! # Size Distributions
//!
//! Immutable empirical cumulative distributions over message sizes. The
//! resolver only ever scans them forward while building cutoff tables, so
//! the type exposes ordered iteration and nothing else.
//!
//! Two flavours share this type:
//!
//! - **count-weighted** (CDF): fraction of messages at or below a size
//! - **byte-weighted** (CBF): fraction of bytes carried by messages at or
//!   below a size, optionally capped per message

use std::fmt;

use crate::error::DistributionError;

/// Sentinel size closing the last (unbounded) priority band.
pub const MAX_SIZE: u32 = u32::MAX;

/// Ordered `(size, cumulative probability)` pairs ending at exactly 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeDistribution {
    points: Vec<(u32, f64)>,
}

impl SizeDistribution {
    /// Validate and wrap a list of points.
    ///
    /// Sizes and probabilities must both be non-decreasing, every probability
    /// must lie in `[0, 1]`, and the last one must be exactly `1.0`.
    pub fn new(points: Vec<(u32, f64)>) -> Result<Self, DistributionError> {
        let Some(&(_, last)) = points.last() else {
            return Err(DistributionError::Empty);
        };

        for (index, &(size, prob)) in points.iter().enumerate() {
            if !(0.0..=1.0).contains(&prob) {
                return Err(DistributionError::InvalidProbability { index, value: prob });
            }
            if index == 0 {
                continue;
            }
            let (prev_size, prev_prob) = points[index - 1];
            if size < prev_size {
                return Err(DistributionError::SizeOrder { index });
            }
            if prob < prev_prob {
                return Err(DistributionError::ProbabilityOrder { index });
            }
        }

        if last != 1.0 {
            return Err(DistributionError::NotNormalized { last });
        }

        Ok(SizeDistribution { points })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; construction rejects empty distributions.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in ascending size order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.points.iter().copied()
    }

    pub fn points(&self) -> &[(u32, f64)] {
        &self.points
    }

    /// Largest size with non-zero support.
    pub fn max_size(&self) -> u32 {
        self.points.last().map(|&(size, _)| size).unwrap_or(0)
    }
}

impl fmt::Display for SizeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (size, prob) in self.iter() {
            writeln!(f, "{size} : {prob}")?;
        }
        Ok(())
    }
}
