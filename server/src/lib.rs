mod config;
mod estimates;
mod lookups;
mod provider;
mod publisher;
mod runner;
mod runway_assigner;
mod scheduler;
mod separation;
mod service;
mod tick;
mod trajectory;

pub use config::{ConfigError, Settings};
pub use estimates::EstimateProvider;
pub use lookups::{TableArrivalLookup, TableFixLookup, TablePerformanceLookup, SAMPLE_AIRPORT};
pub use provider::SequenceProvider;
pub use publisher::SnapshotPublisher;
pub use runner::{ParseSpeedError, ReplayRunner, Runner, Speed, SAMPLE_ARRIVALS_CSV_PATH};
pub use runway_assigner::RunwayAssigner;
pub use scheduler::SequenceScheduler;
pub use separation::{SeparationCalculator, WakeSeparationRules};
pub use service::{FeederFixUpdate, FlightUpdate, SequenceService};
pub use tick::run_ticks;
pub use trajectory::{LookupMisses, TrajectoryService};
