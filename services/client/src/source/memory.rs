use async_trait::async_trait;
use shared::Bet;

use super::{BetSource, SourceError};

/// In-memory bet source
#[derive(Debug, Clone, Default)]
pub struct VecBetSource {
    bets: Vec<Bet>,
    position: usize,
}

impl VecBetSource {
    pub fn new(bets: Vec<Bet>) -> Self {
        Self { bets, position: 0 }
    }

    pub fn starting_at(bets: Vec<Bet>, offset: usize) -> Self {
        let position = offset.min(bets.len());
        Self { bets, position }
    }
}

#[async_trait]
impl BetSource for VecBetSource {
    async fn next_batch(&mut self, max: usize) -> Result<Vec<Bet>, SourceError> {
        let end = self.position.saturating_add(max).min(self.bets.len());
        let batch = self.bets[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    fn offset(&self) -> usize {
        self.position
    }
}
