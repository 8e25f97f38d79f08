// Library interface for the agency client - exposes modules for testing

pub mod bet_sender;
pub mod channel;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod notifier;
pub mod retry_strategy;
pub mod source;
pub mod winners;

pub use config::{ClientConfig, Config, ConfigError};
pub use errors::ClientError;
pub use lifecycle::{ClientState, LifecycleController, RunOutcome};
pub use source::{BetSource, CsvBetSource, VecBetSource};
