pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{AppConfig, EngineConfig, OutputFormat, TieBreak};
pub use error::{TouchpointError, TouchpointResult};
pub use schema::{CostRecord, EventRecord};
pub use types::{AllocationRecord, CostTable, Event, EventLog, UserId, Week};
