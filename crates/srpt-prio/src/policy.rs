//! # Priority Policies
//!
//! Each policy is bound, per packet direction, to a [`Strategy`]: either a
//! fixed answer, the idealized SRBF assignment, or a cutoff-table lookup
//! with a rule for which message field to look up. The resolver evaluates
//! strategies with one generic routine; adding a policy means adding a row
//! to [`PrioPolicy::strategy`].

use std::fmt;
use std::str::FromStr;

use crate::cutoff::Spacing;
use crate::error::PrioError;

// ─── Direction ──────────────────────────────────────────────────────────────

/// Which kind of packet a priority is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Outbound packets sent before any grant arrives.
    Unscheduled,
    /// Inbound-granted packets released by the receiver.
    Scheduled,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Unscheduled => f.write_str("unscheduled"),
            Direction::Scheduled => f.write_str("scheduled"),
        }
    }
}

// ─── Tables & Inputs ────────────────────────────────────────────────────────

/// The cutoff tables a resolver maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Equal shares of the count-weighted distribution.
    Cdf,
    /// Exponential shares of the count-weighted distribution.
    ExpCdf,
    /// Equal shares of the byte-weighted distribution under the byte cap.
    Cbf,
    /// Exponential shares of the byte-weighted distribution under the byte cap.
    ExpCbf,
    /// Equal shares of the head/tail distribution.
    HeadTail,
    /// Exponential shares of the head/tail distribution.
    HeadTailExp,
}

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Cdf,
        TableKind::ExpCdf,
        TableKind::Cbf,
        TableKind::ExpCbf,
        TableKind::HeadTail,
        TableKind::HeadTailExp,
    ];

    pub fn spacing(self) -> Spacing {
        match self {
            TableKind::Cdf | TableKind::Cbf | TableKind::HeadTail => Spacing::EqualProbability,
            TableKind::ExpCdf | TableKind::ExpCbf | TableKind::HeadTailExp => Spacing::Exponential,
        }
    }

    /// Whether the table must be rebuilt when the byte cap changes.
    pub fn depends_on_cap(self) -> bool {
        !matches!(self, TableKind::Cdf | TableKind::ExpCdf)
    }
}

/// Which message field feeds the table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeInput {
    /// Total message size.
    TotalSize,
    /// Bytes the receiver has yet to grant.
    BytesToGrant,
    /// Scheduled bytes, clamped to the byte cap once the tail fits in it.
    HeadTailAdjusted,
}

/// Fixed answers that ignore message state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedPrio {
    /// Priority 0.
    Highest,
    /// The bottom-most wire priority, `all_prio - 1`.
    Lowest,
}

/// How a policy computes a priority for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Fixed(FixedPrio),
    SimulatedSrbf,
    Table { table: TableKind, input: SizeInput },
}

// ─── PrioPolicy ─────────────────────────────────────────────────────────────

/// Named priority resolution policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrioPolicy {
    StaticFromCdf,
    StaticFromCbf,
    FixedUnsched,
    FixedSched,
    StaticExpCdf,
    StaticExpCbf,
    SimulatedSrbf,
    SmfCbfBased,
    HeadTailBytesFirstEqualBytes,
    HeadTailBytesFirstExpBytes,
    HeadTailBytesFirstEqualCounts,
    HeadTailBytesFirstExpCounts,
    /// Returned by [`PrioPolicy::parse`] for unknown names.
    Invalid,
}

impl PrioPolicy {
    /// Every named policy, excluding [`PrioPolicy::Invalid`].
    pub const ALL: [PrioPolicy; 12] = [
        PrioPolicy::StaticFromCdf,
        PrioPolicy::StaticFromCbf,
        PrioPolicy::FixedUnsched,
        PrioPolicy::FixedSched,
        PrioPolicy::StaticExpCdf,
        PrioPolicy::StaticExpCbf,
        PrioPolicy::SimulatedSrbf,
        PrioPolicy::SmfCbfBased,
        PrioPolicy::HeadTailBytesFirstEqualBytes,
        PrioPolicy::HeadTailBytesFirstExpBytes,
        PrioPolicy::HeadTailBytesFirstEqualCounts,
        PrioPolicy::HeadTailBytesFirstExpCounts,
    ];

    /// Case-sensitive name lookup. Unknown names map to `Invalid`; the
    /// caller decides whether that is fatal.
    pub fn parse(name: &str) -> PrioPolicy {
        match name {
            "STATIC_FROM_CDF" => PrioPolicy::StaticFromCdf,
            "STATIC_FROM_CBF" => PrioPolicy::StaticFromCbf,
            "FIXED_UNSCHED" => PrioPolicy::FixedUnsched,
            "FIXED_SCHED" => PrioPolicy::FixedSched,
            "STATIC_EXP_CDF" => PrioPolicy::StaticExpCdf,
            "STATIC_EXP_CBF" => PrioPolicy::StaticExpCbf,
            "SIMULATED_SRBF" => PrioPolicy::SimulatedSrbf,
            "SMF_CBF_BASED" => PrioPolicy::SmfCbfBased,
            "HEAD_TAIL_BYTES_FIRST_EQUAL_BYTES" => PrioPolicy::HeadTailBytesFirstEqualBytes,
            "HEAD_TAIL_BYTES_FIRST_EXP_BYTES" => PrioPolicy::HeadTailBytesFirstExpBytes,
            "HEAD_TAIL_BYTES_FIRST_EQUAL_COUNTS" => PrioPolicy::HeadTailBytesFirstEqualCounts,
            "HEAD_TAIL_BYTES_FIRST_EXP_COUNTS" => PrioPolicy::HeadTailBytesFirstExpCounts,
            _ => PrioPolicy::Invalid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrioPolicy::StaticFromCdf => "STATIC_FROM_CDF",
            PrioPolicy::StaticFromCbf => "STATIC_FROM_CBF",
            PrioPolicy::FixedUnsched => "FIXED_UNSCHED",
            PrioPolicy::FixedSched => "FIXED_SCHED",
            PrioPolicy::StaticExpCdf => "STATIC_EXP_CDF",
            PrioPolicy::StaticExpCbf => "STATIC_EXP_CBF",
            PrioPolicy::SimulatedSrbf => "SIMULATED_SRBF",
            PrioPolicy::SmfCbfBased => "SMF_CBF_BASED",
            PrioPolicy::HeadTailBytesFirstEqualBytes => "HEAD_TAIL_BYTES_FIRST_EQUAL_BYTES",
            PrioPolicy::HeadTailBytesFirstExpBytes => "HEAD_TAIL_BYTES_FIRST_EXP_BYTES",
            PrioPolicy::HeadTailBytesFirstEqualCounts => "HEAD_TAIL_BYTES_FIRST_EQUAL_COUNTS",
            PrioPolicy::HeadTailBytesFirstExpCounts => "HEAD_TAIL_BYTES_FIRST_EXP_COUNTS",
            PrioPolicy::Invalid => "INVALID",
        }
    }

    /// The strategy this policy uses for `direction`, or `None` when the
    /// policy cannot resolve that kind of packet.
    pub fn strategy(self, direction: Direction) -> Option<Strategy> {
        use Direction::{Scheduled, Unscheduled};
        use SizeInput::{BytesToGrant, HeadTailAdjusted, TotalSize};

        let table = |table, input| Some(Strategy::Table { table, input });

        match (self, direction) {
            (PrioPolicy::FixedUnsched, Unscheduled) => Some(Strategy::Fixed(FixedPrio::Highest)),
            (PrioPolicy::FixedSched, Scheduled) => Some(Strategy::Fixed(FixedPrio::Lowest)),
            (PrioPolicy::SimulatedSrbf, _) => Some(Strategy::SimulatedSrbf),

            (PrioPolicy::SmfCbfBased, Unscheduled) => table(TableKind::Cbf, TotalSize),
            (PrioPolicy::SmfCbfBased, Scheduled) => table(TableKind::Cbf, BytesToGrant),

            (PrioPolicy::StaticFromCdf, _) => table(TableKind::Cdf, TotalSize),
            (PrioPolicy::StaticFromCbf, _) => table(TableKind::Cbf, TotalSize),
            (PrioPolicy::StaticExpCdf, _) => table(TableKind::ExpCdf, TotalSize),
            (PrioPolicy::StaticExpCbf, _) => table(TableKind::ExpCbf, TotalSize),

            (PrioPolicy::HeadTailBytesFirstEqualBytes, Unscheduled) => {
                table(TableKind::HeadTail, TotalSize)
            }
            (PrioPolicy::HeadTailBytesFirstExpBytes, Unscheduled) => {
                table(TableKind::HeadTailExp, TotalSize)
            }
            (PrioPolicy::HeadTailBytesFirstEqualCounts, Unscheduled) => {
                table(TableKind::Cdf, TotalSize)
            }
            (PrioPolicy::HeadTailBytesFirstExpCounts, Unscheduled) => {
                table(TableKind::ExpCdf, TotalSize)
            }
            (PrioPolicy::HeadTailBytesFirstEqualBytes, Scheduled) => {
                table(TableKind::HeadTail, HeadTailAdjusted)
            }
            (PrioPolicy::HeadTailBytesFirstExpBytes, Scheduled) => {
                table(TableKind::HeadTailExp, HeadTailAdjusted)
            }
            (PrioPolicy::HeadTailBytesFirstEqualCounts, Scheduled) => {
                table(TableKind::Cdf, HeadTailAdjusted)
            }
            (PrioPolicy::HeadTailBytesFirstExpCounts, Scheduled) => {
                table(TableKind::ExpCdf, HeadTailAdjusted)
            }

            (PrioPolicy::FixedUnsched, Scheduled)
            | (PrioPolicy::FixedSched, Unscheduled)
            | (PrioPolicy::Invalid, _) => None,
        }
    }

    /// Like [`PrioPolicy::strategy`], but an unsupported pairing is an error.
    pub fn require(self, direction: Direction) -> Result<Strategy, PrioError> {
        self.strategy(direction).ok_or(PrioError::UnsupportedPolicy {
            policy: self,
            direction,
        })
    }
}

impl fmt::Display for PrioPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrioPolicy {
    type Err = PrioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PrioPolicy::parse(s) {
            PrioPolicy::Invalid => Err(PrioError::UnknownPolicy(s.to_string())),
            policy => Ok(policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for policy in PrioPolicy::ALL {
            assert_eq!(PrioPolicy::parse(policy.as_str()), policy);
            assert_eq!(policy.as_str().parse::<PrioPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn unknown_names_are_invalid() {
        assert_eq!(PrioPolicy::parse("static_from_cdf"), PrioPolicy::Invalid);
        assert_eq!(PrioPolicy::parse(""), PrioPolicy::Invalid);
        assert_eq!(PrioPolicy::parse("INVALID"), PrioPolicy::Invalid);
        assert_eq!(
            "SRPT".parse::<PrioPolicy>(),
            Err(PrioError::UnknownPolicy("SRPT".into()))
        );
    }

    #[test]
    fn fixed_policies_are_direction_specific() {
        assert!(PrioPolicy::FixedUnsched.strategy(Direction::Unscheduled).is_some());
        assert!(PrioPolicy::FixedUnsched.strategy(Direction::Scheduled).is_none());
        assert!(PrioPolicy::FixedSched.strategy(Direction::Scheduled).is_some());
        assert!(PrioPolicy::FixedSched.strategy(Direction::Unscheduled).is_none());
    }

    #[test]
    fn invalid_has_no_strategy() {
        for dir in [Direction::Unscheduled, Direction::Scheduled] {
            assert_eq!(
                PrioPolicy::Invalid.require(dir),
                Err(PrioError::UnsupportedPolicy {
                    policy: PrioPolicy::Invalid,
                    direction: dir,
                })
            );
        }
    }

    #[test]
    fn static_tables_are_shared_across_directions() {
        for policy in [
            PrioPolicy::StaticFromCdf,
            PrioPolicy::StaticFromCbf,
            PrioPolicy::StaticExpCdf,
            PrioPolicy::StaticExpCbf,
        ] {
            assert_eq!(
                policy.strategy(Direction::Unscheduled),
                policy.strategy(Direction::Scheduled)
            );
        }
    }

    #[test]
    fn head_tail_counts_use_count_weighted_tables() {
        assert_eq!(
            PrioPolicy::HeadTailBytesFirstExpCounts.strategy(Direction::Scheduled),
            Some(Strategy::Table {
                table: TableKind::ExpCdf,
                input: SizeInput::HeadTailAdjusted,
            })
        );
        assert_eq!(
            PrioPolicy::HeadTailBytesFirstEqualBytes.strategy(Direction::Unscheduled),
            Some(Strategy::Table {
                table: TableKind::HeadTail,
                input: SizeInput::TotalSize,
            })
        );
    }

    #[test]
    fn smf_uses_remaining_bytes_for_scheduled_packets() {
        assert_eq!(
            PrioPolicy::SmfCbfBased.strategy(Direction::Scheduled),
            Some(Strategy::Table {
                table: TableKind::Cbf,
                input: SizeInput::BytesToGrant,
            })
        );
    }

    #[test]
    fn cap_dependence() {
        let cap_dependent: Vec<_> = TableKind::ALL
            .into_iter()
            .filter(|t| t.depends_on_cap())
            .collect();
        assert_eq!(
            cap_dependent,
            vec![
                TableKind::Cbf,
                TableKind::ExpCbf,
                TableKind::HeadTail,
                TableKind::HeadTailExp
            ]
        );
    }
}
