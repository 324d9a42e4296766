pub mod config;
pub mod cooking;
pub mod defrost;
pub mod error;
pub mod history;
pub mod sensor;
pub mod topics;
pub mod types;

pub use config::{DefrostConfig, DefrostEntry, NetworkConfig, OvenConfig, RuntimeConfig};
pub use cooking::{CookingEngine, StartOutcome, TickOutcome};
pub use defrost::{DefrostCalculator, DefrostProfile};
pub use error::{ParseError, SessionError};
pub use history::{HistoryLedger, HistoryRecord};
pub use sensor::SensorFeed;
pub use topics::*;
pub use types::{CookingStage, PowerLevel, SessionStatus, StatusSnapshot};
