//! Bet sources
//!
//! A source yields the agency's bets in order, in batches of bounded size,
//! and can be reopened at an offset to resume an interrupted run.

mod csv_file;
mod memory;

use async_trait::async_trait;
use shared::Bet;
use std::path::PathBuf;

pub use csv_file::CsvBetSource;
pub use memory::VecBetSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error reading bets file: {0}")]
    Csv(#[from] csv::Error),
}

#[async_trait]
pub trait BetSource: Send {
    /// Up to `max` bets in source order; an empty batch means exhausted
    async fn next_batch(&mut self, max: usize) -> Result<Vec<Bet>, SourceError>;

    /// Number of valid bets consumed so far, including any skipped at open
    fn offset(&self) -> usize;
}
