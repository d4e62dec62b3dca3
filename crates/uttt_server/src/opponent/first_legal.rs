//! Local move source without search, for offline play and tests.

use super::{ComputeBudget, MoveReply, MoveSource, MoveSourceError, SearchMetadata};
use crate::ids::GameId;
use std::time::{Duration, Instant};
use tracing::debug;
use uttt_rules::MatchState;

/// Picks the first legal placement in board order.
#[derive(Debug, Clone)]
pub struct FirstLegalSource {
    name: String,
    delay: Duration,
}

impl FirstLegalSource {
    /// Creates a source that answers immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: Duration::ZERO,
        }
    }

    /// Waits `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl MoveSource for FirstLegalSource {
    async fn request_move(
        &self,
        _game_id: &GameId,
        state: &MatchState,
        _budget: ComputeBudget,
    ) -> Result<MoveReply, MoveSourceError> {
        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let legal = state.legal_moves();
        let choice = legal
            .first()
            .copied()
            .ok_or_else(|| MoveSourceError::NoMove(format!("{} sees no legal move", self.name)))?;

        debug!(source = %self.name, placement = %choice, "Chose first legal move");

        let metadata = SearchMetadata {
            num_gamestates: legal.len() as u64,
            depth_explored: 1,
            thinking_time_seconds: started.elapsed().as_secs_f64(),
            moves_considered: legal
                .iter()
                .map(|p| ((i64::from(p.sub_board.get()), i64::from(p.cell.get())), 0.0))
                .collect(),
            predicted_line: None,
            early_stop: Some(true),
        };

        Ok(MoveReply::new(
            i64::from(choice.sub_board.get()),
            i64::from(choice.cell.get()),
            metadata,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uttt_rules::{Mark, Placement};

    #[tokio::test]
    async fn answers_inside_the_constraint() {
        let state = MatchState::new()
            .apply(Placement::from_indices(0, 6, Mark::Human).unwrap())
            .unwrap();
        let source = FirstLegalSource::new("first");

        let reply = source
            .request_move(&GameId::new("g"), &state, ComputeBudget::default())
            .await
            .unwrap();

        assert_eq!((reply.board, reply.cell), (6, 0));
        assert_eq!(reply.metadata.num_gamestates, 9);
    }
}
