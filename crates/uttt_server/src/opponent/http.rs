//! Move source backed by the HTTP search engine.

use super::{ComputeBudget, MoveReply, MoveRequest, MoveSource, MoveSourceError};
use crate::ids::GameId;
use tracing::{debug, info, instrument, warn};
use uttt_rules::MatchState;

/// Posts positions to the engine's `makemove` endpoint.
#[derive(Debug, Clone)]
pub struct HttpMoveSource {
    endpoint: String,
    client: reqwest::Client,
    legacy_string_body: bool,
}

impl HttpMoveSource {
    /// Creates a source for the given endpoint URL.
    ///
    /// With `legacy_string_body` the JSON request is itself sent as a JSON
    /// string, which the original engine expects.
    pub fn new(endpoint: impl Into<String>, legacy_string_body: bool) -> Self {
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, legacy_string_body, "Creating HTTP move source");
        Self {
            endpoint,
            client: reqwest::Client::new(),
            legacy_string_body,
        }
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl MoveSource for HttpMoveSource {
    #[instrument(
        skip(self, state),
        fields(endpoint = %self.endpoint, moves = state.moves_played())
    )]
    async fn request_move(
        &self,
        game_id: &GameId,
        state: &MatchState,
        budget: ComputeBudget,
    ) -> Result<MoveReply, MoveSourceError> {
        let request = MoveRequest::new(game_id, state, budget);
        let builder = self
            .client
            .post(&self.endpoint)
            .timeout(budget.deadline());

        let builder = if self.legacy_string_body {
            let encoded = serde_json::to_string(&request)
                .map_err(|e| MoveSourceError::Malformed(format!("cannot encode request: {}", e)))?;
            builder.json(&encoded)
        } else {
            builder.json(&request)
        };

        debug!("Sending move request");
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Engine request failed");
            if e.is_timeout() {
                MoveSourceError::Timeout(budget.deadline())
            } else {
                MoveSourceError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MoveSourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Engine returned error status");
            return Err(MoveSourceError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let reply: MoveReply =
            serde_json::from_str(&body).map_err(|e| MoveSourceError::Malformed(e.to_string()))?;

        info!(
            board = reply.board,
            cell = reply.cell,
            gamestates = reply.metadata.num_gamestates,
            depth = reply.metadata.depth_explored,
            "Engine replied"
        );
        Ok(reply)
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}
