//! # srpt-prio
//!
//! Priority resolution for an RPC transport that approximates
//! shortest-remaining-processing-time-first scheduling with a handful of
//! wire priority levels.
//!
//! Workload size distributions are partitioned into cutoff tables once (and
//! again whenever the byte cap changes); every packet then costs one binary
//! search over a table of at most `L` entries.
//!
//! ## Crate structure
//!
//! - [`dist`] — Immutable empirical size distributions
//! - [`workload`] — Distribution source trait and in-memory estimator
//! - [`cutoff`] — Cutoff table construction and lookup
//! - [`policy`] — Named policies and their per-direction strategies
//! - [`message`] — Outbound/inbound message descriptors
//! - [`config`] — Transport configuration (TOML)
//! - [`resolver`] — The priority resolver
//! - [`stats`] — Resolver counters
//! - [`error`] — Error types

pub mod config;
pub mod cutoff;
pub mod dist;
pub mod error;
pub mod message;
pub mod policy;
pub mod resolver;
pub mod stats;
pub mod workload;

pub use config::TransportConfig;
pub use cutoff::{CutoffTable, Spacing};
pub use dist::{SizeDistribution, MAX_SIZE};
pub use error::{DistributionError, PrioError, Result};
pub use message::{InboundMessage, OutboundMessage};
pub use policy::{Direction, PrioPolicy, TableKind};
pub use resolver::PriorityResolver;
pub use stats::ResolverStats;
pub use workload::{WorkloadEstimator, WorkloadSource};
