//! # Priority Resolver
//!
//! Answers the two per-packet questions of an SRPT-approximating transport:
//!
//! 1. What priority do the unscheduled packets of an outbound message carry?
//! 2. What priority does the next scheduled packet of an inbound message get?
//!
//! ## Tables
//!
//! ```text
//!   count-weighted         ──► Cdf, ExpCdf                      built once
//!   bytes, min(size, cap)  ──► Cbf, ExpCbf          ┐
//!   tail bytes at cap      ──► HeadTail, HeadTailExp┘ CapTables, rebuilt per cap
//! ```
//!
//! The four cap-dependent tables live in one [`CapTables`] value keyed by
//! its cap and published through an [`ArcSwap`]. Lookups load a snapshot and
//! see either the old set or the new one, never a mix. Rebuilds are
//! serialized; a cap equal to the live one is a no-op.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, trace};

use crate::config::TransportConfig;
use crate::cutoff::CutoffTable;
use crate::dist::SizeDistribution;
use crate::error::{PrioError, Result};
use crate::message::{InboundMessage, OutboundMessage};
use crate::policy::{Direction, FixedPrio, PrioPolicy, SizeInput, Strategy, TableKind};
use crate::stats::{Counters, ResolverStats};
use crate::workload::WorkloadSource;

// ─── CapTables ──────────────────────────────────────────────────────────────

/// Cutoff tables that depend on the byte cap, plus the cap they were built for.
#[derive(Debug)]
pub struct CapTables {
    pub cap: u32,
    pub cbf: Arc<CutoffTable>,
    pub exp_cbf: Arc<CutoffTable>,
    pub head_tail: Arc<CutoffTable>,
    pub head_tail_exp: Arc<CutoffTable>,
}

impl CapTables {
    fn build(source: &dyn WorkloadSource, levels: u16, cap: u32) -> Result<Self> {
        let cdf = source.count_weighted();
        let cbf = source.derive_byte_distribution(&cdf, cap)?;
        check_lengths(cdf.len(), cbf.len())?;
        let capped = source.derive_capped_byte_distribution(&cdf, cap)?;

        let build = |dist: &SizeDistribution, kind: TableKind| {
            Arc::new(CutoffTable::build(dist, levels, kind.spacing()))
        };
        Ok(CapTables {
            cap,
            cbf: build(&cbf, TableKind::Cbf),
            exp_cbf: build(&cbf, TableKind::ExpCbf),
            head_tail: build(&capped, TableKind::HeadTail),
            head_tail_exp: build(&capped, TableKind::HeadTailExp),
        })
    }
}

fn check_lengths(count_weighted: usize, byte_weighted: usize) -> Result<()> {
    if count_weighted != byte_weighted {
        return Err(PrioError::DistributionLengthMismatch {
            count_weighted,
            byte_weighted,
        });
    }
    Ok(())
}

// ─── PriorityResolver ───────────────────────────────────────────────────────

/// Per-endpoint priority resolver.
///
/// Lookups take `&self` and never block; the resolver can be shared across
/// threads behind an `Arc`.
pub struct PriorityResolver {
    config: TransportConfig,
    source: Arc<dyn WorkloadSource>,
    cdf: Arc<CutoffTable>,
    exp_cdf: Arc<CutoffTable>,
    capped: ArcSwap<CapTables>,
    rebuild: Mutex<()>,
    max_sched_payload: u32,
    counters: Counters,
}

impl PriorityResolver {
    /// Validate `config`, then build every table: the count-weighted ones
    /// for good and the cap-dependent set for `config.byte_cap`.
    ///
    /// The cap-dependent set is built eagerly rather than on the first
    /// [`set_byte_cap`](Self::set_byte_cap), so it is never missing. A
    /// later `set_byte_cap(config.byte_cap)` is a cache hit.
    pub fn new(config: TransportConfig, source: Arc<dyn WorkloadSource>) -> Result<Self> {
        config.validate()?;
        let levels = config.prio_levels;

        let count_weighted = source.count_weighted();
        check_lengths(count_weighted.len(), source.byte_weighted().len())?;
        let cdf = Arc::new(CutoffTable::build(
            &count_weighted,
            levels,
            TableKind::Cdf.spacing(),
        ));
        let exp_cdf = Arc::new(CutoffTable::build(
            &count_weighted,
            levels,
            TableKind::ExpCdf.spacing(),
        ));
        let capped = CapTables::build(source.as_ref(), levels, config.byte_cap)?;

        let counters = Counters::default();
        Counters::bump(&counters.table_rebuilds);

        debug!(
            levels,
            all_prio = config.all_prio,
            cap = config.byte_cap,
            unsched_policy = %config.unsched_policy,
            sched_policy = %config.sched_policy,
            "priority resolver ready"
        );

        Ok(PriorityResolver {
            max_sched_payload: config.max_sched_payload(),
            config,
            source,
            cdf,
            exp_cdf,
            capped: ArcSwap::from_pointee(capped),
            rebuild: Mutex::new(()),
            counters,
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Payload bytes in a full scheduled packet.
    pub fn max_sched_payload(&self) -> u32 {
        self.max_sched_payload
    }

    /// Cap the live cap-dependent tables were built for.
    pub fn byte_cap(&self) -> u32 {
        self.capped.load().cap
    }

    /// The live cap-dependent table set.
    pub fn cap_tables(&self) -> Arc<CapTables> {
        self.capped.load_full()
    }

    /// The live table of the given kind.
    pub fn table(&self, kind: TableKind) -> Arc<CutoffTable> {
        let caps = self.capped.load();
        Arc::clone(self.pick(&caps, kind))
    }

    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot(self.byte_cap())
    }

    // ─── Cap updates ────────────────────────────────────────────────────

    /// Rebuild the cap-dependent tables for `cap`.
    ///
    /// Returns `false` without touching anything when `cap` matches the
    /// live tables. Otherwise the capped distribution is derived again and
    /// all four cap-dependent tables are swapped in together.
    pub fn set_byte_cap(&self, cap: u32) -> Result<bool> {
        let _guard = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);

        if self.capped.load().cap == cap {
            Counters::bump(&self.counters.cap_cache_hits);
            trace!(cap, "byte cap unchanged");
            return Ok(false);
        }

        let tables = CapTables::build(self.source.as_ref(), self.config.prio_levels, cap)?;
        debug!(
            cap,
            cbf = %tables.cbf,
            exp_cbf = %tables.exp_cbf,
            head_tail = %tables.head_tail,
            head_tail_exp = %tables.head_tail_exp,
            "rebuilt cap-dependent cutoff tables"
        );
        self.capped.store(Arc::new(tables));
        Counters::bump(&self.counters.table_rebuilds);
        Ok(true)
    }

    // ─── Resolution ─────────────────────────────────────────────────────

    /// Priorities for each unscheduled packet of `msg`, in send order.
    pub fn resolve_unsched(&self, policy: PrioPolicy, msg: &OutboundMessage) -> Result<Vec<u16>> {
        let strategy = policy.require(Direction::Unscheduled)?;
        Counters::bump(&self.counters.unsched_lookups);

        let pkts = msg.unsched_pkts;
        let prios = match strategy {
            Strategy::Fixed(fixed) => vec![self.fixed(fixed); pkts],
            Strategy::SimulatedSrbf => {
                let top = self.lowest_adaptive() as usize;
                (0..pkts)
                    .map(|i| (pkts - i - 1).min(top) as u16)
                    .collect()
            }
            Strategy::Table { table, input } => {
                // Nothing has been sent or granted yet, so every size input
                // reduces to the full message.
                let unsent = InboundMessage::new(msg.msg_size, 0, msg.msg_size);
                vec![self.lookup(table, input, &unsent); pkts]
            }
        };
        Ok(prios)
    }

    /// Priority for the next scheduled packet of `msg`.
    pub fn resolve_sched(&self, policy: PrioPolicy, msg: &InboundMessage) -> Result<u16> {
        let strategy = policy.require(Direction::Scheduled)?;
        Counters::bump(&self.counters.sched_lookups);

        let prio = match strategy {
            Strategy::Fixed(fixed) => self.fixed(fixed),
            Strategy::SimulatedSrbf => {
                let pkts_left = msg.bytes_to_grant / self.max_sched_payload;
                pkts_left.min(self.lowest_adaptive() as u32) as u16
            }
            Strategy::Table { table, input } => self.lookup(table, input, msg),
        };
        Ok(prio)
    }

    /// [`resolve_unsched`](Self::resolve_unsched) with the configured policy.
    pub fn unsched_priorities(&self, msg: &OutboundMessage) -> Result<Vec<u16>> {
        self.resolve_unsched(self.config.unsched_policy, msg)
    }

    /// [`resolve_sched`](Self::resolve_sched) with the configured policy.
    pub fn sched_priority(&self, msg: &InboundMessage) -> Result<u16> {
        self.resolve_sched(self.config.sched_policy, msg)
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn fixed(&self, fixed: FixedPrio) -> u16 {
        match fixed {
            FixedPrio::Highest => 0,
            FixedPrio::Lowest => self.config.all_prio - 1,
        }
    }

    fn lowest_adaptive(&self) -> u16 {
        self.config.prio_levels - 1
    }

    fn lookup(&self, kind: TableKind, input: SizeInput, msg: &InboundMessage) -> u16 {
        let caps = self.capped.load();
        let size = effective_size(input, msg, caps.cap);
        self.pick(&caps, kind).lookup(size)
    }

    fn pick<'a>(&'a self, caps: &'a CapTables, kind: TableKind) -> &'a Arc<CutoffTable> {
        match kind {
            TableKind::Cdf => &self.cdf,
            TableKind::ExpCdf => &self.exp_cdf,
            TableKind::Cbf => &caps.cbf,
            TableKind::ExpCbf => &caps.exp_cbf,
            TableKind::HeadTail => &caps.head_tail,
            TableKind::HeadTailExp => &caps.head_tail_exp,
        }
    }
}

/// The size a table lookup is keyed on.
///
/// For head/tail policies, once the ungranted tail of a message larger than
/// the cap fits within the cap, the message is looked up as exactly `cap`
/// bytes.
fn effective_size(input: SizeInput, msg: &InboundMessage, cap: u32) -> u32 {
    match input {
        SizeInput::TotalSize => msg.msg_size,
        SizeInput::BytesToGrant => msg.bytes_to_grant,
        SizeInput::HeadTailAdjusted => {
            let sched = msg.sched_bytes();
            if sched > cap && msg.bytes_to_grant <= cap {
                cap
            } else {
                sched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::MAX_SIZE;
    use crate::workload::WorkloadEstimator;

    fn resolver(levels: u16, cap: u32) -> PriorityResolver {
        let est = WorkloadEstimator::from_cdf(vec![
            (100, 0.25),
            (1_000, 0.5),
            (10_000, 0.75),
            (100_000, 1.0),
        ])
        .unwrap();
        let config = TransportConfig {
            prio_levels: levels,
            all_prio: levels + 2,
            byte_cap: cap,
            ..TransportConfig::default()
        };
        PriorityResolver::new(config, Arc::new(est)).unwrap()
    }

    #[test]
    fn effective_size_clamps_tail_to_cap() {
        let cap = 5_000;
        // 20 kB message, 1 kB sent unscheduled, 4 kB left to grant.
        let msg = InboundMessage::new(20_000, 1_000, 4_000);
        assert_eq!(effective_size(SizeInput::HeadTailAdjusted, &msg, cap), cap);
        // Tail still larger than the cap: scheduled bytes are used.
        let msg = InboundMessage::new(20_000, 1_000, 9_000);
        assert_eq!(effective_size(SizeInput::HeadTailAdjusted, &msg, cap), 19_000);
        // Small message never reaches the cap.
        let msg = InboundMessage::new(3_000, 1_000, 2_000);
        assert_eq!(effective_size(SizeInput::HeadTailAdjusted, &msg, cap), 2_000);
        assert_eq!(effective_size(SizeInput::BytesToGrant, &msg, cap), 2_000);
        assert_eq!(effective_size(SizeInput::TotalSize, &msg, cap), 3_000);
    }

    #[test]
    fn count_weighted_table_matches_quartiles() {
        let r = resolver(4, MAX_SIZE);
        assert_eq!(r.table(TableKind::Cdf).cutoffs(), &[100, 1_000, 10_000, MAX_SIZE]);
    }

    #[test]
    fn fixed_sched_is_bottom_wire_priority() {
        let r = resolver(4, MAX_SIZE);
        for msg in [
            InboundMessage::new(1, 0, 1),
            InboundMessage::new(1_000_000, 10_000, 990_000),
            InboundMessage::new(0, 0, 0),
        ] {
            assert_eq!(r.resolve_sched(PrioPolicy::FixedSched, &msg).unwrap(), 5);
        }
    }

    #[test]
    fn fixed_unsched_is_all_zero() {
        let r = resolver(4, MAX_SIZE);
        let prios = r
            .resolve_unsched(PrioPolicy::FixedUnsched, &OutboundMessage::new(50_000, 3))
            .unwrap();
        assert_eq!(prios, vec![0, 0, 0]);
    }

    #[test]
    fn simulated_srbf_unsched_counts_down() {
        let r = resolver(3, MAX_SIZE);
        let prios = r
            .resolve_unsched(PrioPolicy::SimulatedSrbf, &OutboundMessage::new(5_000, 3))
            .unwrap();
        assert_eq!(prios, vec![2, 1, 0]);

        let prios = r
            .resolve_unsched(PrioPolicy::SimulatedSrbf, &OutboundMessage::new(5_000, 5))
            .unwrap();
        assert_eq!(prios, vec![2, 2, 2, 1, 0]);
    }

    #[test]
    fn simulated_srbf_sched_counts_full_packets() {
        let r = resolver(4, MAX_SIZE);
        let payload = r.max_sched_payload();
        let prio = |left| {
            r.resolve_sched(PrioPolicy::SimulatedSrbf, &InboundMessage::new(100_000, 0, left))
                .unwrap()
        };
        assert_eq!(prio(payload - 1), 0);
        assert_eq!(prio(payload), 1);
        assert_eq!(prio(2 * payload + 5), 2);
        assert_eq!(prio(100 * payload), 3);
    }

    #[test]
    fn zero_unsched_packets_yield_empty() {
        let r = resolver(4, MAX_SIZE);
        let msg = OutboundMessage::new(1_000, 0);
        for policy in [PrioPolicy::FixedUnsched, PrioPolicy::SimulatedSrbf, PrioPolicy::StaticFromCdf] {
            assert!(r.resolve_unsched(policy, &msg).unwrap().is_empty());
        }
    }

    #[test]
    fn wrong_direction_is_an_error() {
        let r = resolver(4, MAX_SIZE);
        let err = r
            .resolve_unsched(PrioPolicy::FixedSched, &OutboundMessage::new(10, 1))
            .unwrap_err();
        assert_eq!(
            err,
            PrioError::UnsupportedPolicy {
                policy: PrioPolicy::FixedSched,
                direction: Direction::Unscheduled,
            }
        );
        assert!(r
            .resolve_sched(PrioPolicy::Invalid, &InboundMessage::new(10, 0, 10))
            .is_err());
    }

    #[test]
    fn same_cap_is_a_cache_hit() {
        let r = resolver(4, 10_000);
        let before = r.cap_tables();
        assert!(!r.set_byte_cap(10_000).unwrap());
        assert!(Arc::ptr_eq(&before, &r.cap_tables()));
        let stats = r.stats();
        assert_eq!(stats.table_rebuilds, 1);
        assert_eq!(stats.cap_cache_hits, 1);
    }

    #[test]
    fn new_cap_rebuilds_only_cap_dependent_tables() {
        let r = resolver(4, 10_000);
        let cdf = r.table(TableKind::Cdf);
        let exp_cdf = r.table(TableKind::ExpCdf);
        let before = r.cap_tables();

        assert!(r.set_byte_cap(500).unwrap());
        let after = r.cap_tables();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.cap, 500);
        assert_eq!(r.byte_cap(), 500);
        assert!(Arc::ptr_eq(&cdf, &r.table(TableKind::Cdf)));
        assert!(Arc::ptr_eq(&exp_cdf, &r.table(TableKind::ExpCdf)));
        assert_eq!(r.stats().table_rebuilds, 2);
    }

    #[test]
    fn byte_weighted_tables_follow_the_cap() {
        let r = resolver(4, MAX_SIZE);
        assert_eq!(r.table(TableKind::Cbf).cutoffs(), &[100_000, MAX_SIZE]);

        // Capped bytes 25, 125, 125, 125 → cumulative 0.0625, 0.375, 0.6875, 1.0.
        r.set_byte_cap(500).unwrap();
        assert_eq!(
            r.table(TableKind::Cbf).cutoffs(),
            &[1_000, 10_000, 100_000, MAX_SIZE]
        );
        assert_eq!(r.table(TableKind::ExpCbf).cutoffs(), &[10_000, 100_000, MAX_SIZE]);
    }

    #[test]
    fn mismatched_distributions_are_rejected() {
        struct Broken(WorkloadEstimator);
        impl WorkloadSource for Broken {
            fn count_weighted(&self) -> Arc<SizeDistribution> {
                self.0.count_weighted()
            }
            fn byte_weighted(&self) -> Arc<SizeDistribution> {
                Arc::new(SizeDistribution::new(vec![(1, 1.0)]).unwrap())
            }
            fn derive_byte_distribution(
                &self,
                cdf: &SizeDistribution,
                cap: u32,
            ) -> std::result::Result<SizeDistribution, crate::error::DistributionError> {
                self.0.derive_byte_distribution(cdf, cap)
            }
            fn derive_capped_byte_distribution(
                &self,
                cdf: &SizeDistribution,
                cap: u32,
            ) -> std::result::Result<SizeDistribution, crate::error::DistributionError> {
                self.0.derive_capped_byte_distribution(cdf, cap)
            }
        }

        let est = WorkloadEstimator::from_cdf(vec![(10, 0.5), (100, 1.0)]).unwrap();
        let err = PriorityResolver::new(TransportConfig::default(), Arc::new(Broken(est)))
            .err()
            .unwrap();
        assert_eq!(
            err,
            PrioError::DistributionLengthMismatch {
                count_weighted: 2,
                byte_weighted: 1,
            }
        );
    }

    #[test]
    fn zero_cap_fails_without_replacing_tables() {
        let r = resolver(4, 10_000);
        let before = r.cap_tables();
        assert!(r.set_byte_cap(0).is_err());
        assert!(Arc::ptr_eq(&before, &r.cap_tables()));
    }

    #[test]
    fn resolver_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PriorityResolver>();
    }
}
