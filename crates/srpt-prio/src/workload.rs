//! # Workload Estimator
//!
//! Source of the size distributions the resolver partitions. The resolver
//! only sees the [`WorkloadSource`] trait; [`WorkloadEstimator`] is the
//! in-memory implementation that derives byte-weighted distributions from a
//! count-weighted one.
//!
//! Under a byte cap `c` a message of `s` bytes is weighted two ways:
//!
//! ```text
//!   byte-weighted  min(s, c) bytes at s
//!   head/tail      s ≤ c: s bytes at s
//!                  s > c: s − c bytes at s, c bytes at c   (tail promoted)
//! ```
//!
//! With `c = MAX_SIZE` both reduce to the plain byte-weighted distribution.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dist::SizeDistribution;
use crate::error::DistributionError;

// ─── WorkloadSource ─────────────────────────────────────────────────────────

/// Distributions consumed by the priority resolver.
///
/// Both distributions share the same size axis and length. Handles are
/// shared and read-only; the resolver never mutates them.
pub trait WorkloadSource: Send + Sync {
    /// Fraction of messages at or below each size.
    fn count_weighted(&self) -> Arc<SizeDistribution>;

    /// Fraction of bytes carried by messages at or below each size.
    fn byte_weighted(&self) -> Arc<SizeDistribution>;

    /// Byte-weighted distribution where each message contributes at most
    /// `cap` bytes. Same size axis as `count_weighted`.
    fn derive_byte_distribution(
        &self,
        count_weighted: &SizeDistribution,
        cap: u32,
    ) -> Result<SizeDistribution, DistributionError>;

    /// Head/tail distribution: the last `cap` bytes of every larger message
    /// are counted at size `cap`. The axis gains a point at `cap` when it
    /// splits a band.
    fn derive_capped_byte_distribution(
        &self,
        count_weighted: &SizeDistribution,
        cap: u32,
    ) -> Result<SizeDistribution, DistributionError>;
}

// ─── WorkloadEstimator ──────────────────────────────────────────────────────

/// Workload estimate built from a count-weighted distribution.
#[derive(Debug, Clone)]
pub struct WorkloadEstimator {
    cdf: Arc<SizeDistribution>,
    cbf: Arc<SizeDistribution>,
}

impl WorkloadEstimator {
    /// Build from count-weighted `(size, cumulative probability)` points.
    pub fn from_cdf(points: Vec<(u32, f64)>) -> Result<Self, DistributionError> {
        let cdf = SizeDistribution::new(points)?;
        Self::from_distribution(cdf)
    }

    pub fn from_distribution(cdf: SizeDistribution) -> Result<Self, DistributionError> {
        let cbf = byte_weighted(&cdf, |size| size)?;
        Ok(WorkloadEstimator {
            cdf: Arc::new(cdf),
            cbf: Arc::new(cbf),
        })
    }
}

impl WorkloadSource for WorkloadEstimator {
    fn count_weighted(&self) -> Arc<SizeDistribution> {
        Arc::clone(&self.cdf)
    }

    fn byte_weighted(&self) -> Arc<SizeDistribution> {
        Arc::clone(&self.cbf)
    }

    fn derive_byte_distribution(
        &self,
        count_weighted: &SizeDistribution,
        cap: u32,
    ) -> Result<SizeDistribution, DistributionError> {
        byte_weighted(count_weighted, |size| size.min(cap))
    }

    fn derive_capped_byte_distribution(
        &self,
        count_weighted: &SizeDistribution,
        cap: u32,
    ) -> Result<SizeDistribution, DistributionError> {
        head_tail_weighted(count_weighted, cap)
    }
}

/// Reweight a count-weighted distribution by the bytes each size contributes.
fn byte_weighted(
    cdf: &SizeDistribution,
    bytes_of: impl Fn(u32) -> u32,
) -> Result<SizeDistribution, DistributionError> {
    let mut prev_prob = 0.0;
    let bytes = cdf.iter().map(|(size, prob)| {
        let mass = prob - prev_prob;
        prev_prob = prob;
        (size, bytes_of(size) as f64 * mass)
    });
    normalize(bytes)
}

fn head_tail_weighted(
    cdf: &SizeDistribution,
    cap: u32,
) -> Result<SizeDistribution, DistributionError> {
    let mut bytes_at: BTreeMap<u32, f64> = BTreeMap::new();
    let mut prev_prob = 0.0;
    for (size, prob) in cdf.iter() {
        let mass = prob - prev_prob;
        prev_prob = prob;
        if size > cap {
            *bytes_at.entry(size).or_insert(0.0) += (size - cap) as f64 * mass;
            *bytes_at.entry(cap).or_insert(0.0) += cap as f64 * mass;
        } else {
            *bytes_at.entry(size).or_insert(0.0) += size as f64 * mass;
        }
    }
    normalize(bytes_at)
}

/// Accumulate `(size, bytes)` in size order and divide by the total, so the
/// last point is exactly 1.0.
fn normalize(
    bytes: impl IntoIterator<Item = (u32, f64)>,
) -> Result<SizeDistribution, DistributionError> {
    let mut cum_bytes = 0.0;
    let cumulative: Vec<(u32, f64)> = bytes
        .into_iter()
        .map(|(size, b)| {
            cum_bytes += b;
            (size, cum_bytes)
        })
        .collect();

    let total = cum_bytes;
    if total <= 0.0 {
        return Err(DistributionError::ZeroMass);
    }

    let points = cumulative
        .into_iter()
        .map(|(size, bytes)| (size, bytes / total))
        .collect();
    SizeDistribution::new(points)
}
