use serde::Deserialize;

use crate::dist::MAX_SIZE;
use crate::error::PrioError;
use crate::policy::{Direction, PrioPolicy};

pub const DEFAULT_PRIO_LEVELS: u16 = 8;
pub const DEFAULT_MTU: u32 = 1500;
pub const IP_HEADER_BYTES: u32 = 20;
pub const UDP_HEADER_BYTES: u32 = 8;
/// Transport header carried by every scheduled data packet.
pub const SCHED_DATA_HEADER_BYTES: u32 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfigInput {
    pub prio_levels: Option<u16>,
    pub all_prio: Option<u16>,
    pub byte_cap: Option<u32>,
    pub mtu: Option<u32>,
    pub unsched_policy: Option<String>,
    pub sched_policy: Option<String>,
}

/// Validated transport parameters the resolver is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Levels in the resolver's adaptive cutoff tables.
    pub prio_levels: u16,
    /// Total wire priorities; at least `prio_levels`.
    pub all_prio: u16,
    /// Per-message byte cap for the cap-dependent distributions.
    pub byte_cap: u32,
    /// Link MTU in bytes.
    pub mtu: u32,
    pub unsched_policy: PrioPolicy,
    pub sched_policy: PrioPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            prio_levels: DEFAULT_PRIO_LEVELS,
            all_prio: DEFAULT_PRIO_LEVELS,
            byte_cap: MAX_SIZE,
            mtu: DEFAULT_MTU,
            unsched_policy: PrioPolicy::StaticFromCbf,
            sched_policy: PrioPolicy::SmfCbfBased,
        }
    }
}

impl TransportConfigInput {
    pub fn resolve(self) -> Result<TransportConfig, PrioError> {
        let defaults = TransportConfig::default();
        let prio_levels = self.prio_levels.unwrap_or(defaults.prio_levels);
        let unsched_policy = match self.unsched_policy {
            Some(name) => name.trim().parse()?,
            None => defaults.unsched_policy,
        };
        let sched_policy = match self.sched_policy {
            Some(name) => name.trim().parse()?,
            None => defaults.sched_policy,
        };

        let config = TransportConfig {
            prio_levels,
            all_prio: self.all_prio.unwrap_or(prio_levels),
            byte_cap: self.byte_cap.unwrap_or(defaults.byte_cap),
            mtu: self.mtu.unwrap_or(defaults.mtu),
            unsched_policy,
            sched_policy,
        };
        config.validate()?;
        Ok(config)
    }
}

impl TransportConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, PrioError> {
        if input.trim().is_empty() {
            return Ok(TransportConfig::default());
        }
        let parsed: TransportConfigInput = toml::from_str(input)
            .map_err(|e| PrioError::Config(format!("invalid config TOML: {e}")))?;
        parsed.resolve()
    }

    /// Check the invariants the resolver relies on.
    pub fn validate(&self) -> Result<(), PrioError> {
        if self.prio_levels == 0 {
            return Err(PrioError::Config("prio_levels must be at least 1".into()));
        }
        if self.all_prio < self.prio_levels {
            return Err(PrioError::Config(format!(
                "all_prio ({}) must be >= prio_levels ({})",
                self.all_prio, self.prio_levels
            )));
        }
        let overhead = IP_HEADER_BYTES + UDP_HEADER_BYTES + SCHED_DATA_HEADER_BYTES;
        if self.mtu <= overhead {
            return Err(PrioError::Config(format!(
                "mtu ({}) leaves no room for scheduled payload (overhead {overhead})",
                self.mtu
            )));
        }
        self.unsched_policy.require(Direction::Unscheduled)?;
        self.sched_policy.require(Direction::Scheduled)?;
        Ok(())
    }

    /// Largest payload a scheduled data packet can carry.
    pub fn max_sched_payload(&self) -> u32 {
        self.mtu - IP_HEADER_BYTES - UDP_HEADER_BYTES - SCHED_DATA_HEADER_BYTES
    }
}
