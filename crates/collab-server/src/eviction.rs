use std::time::Duration;

use crate::app::AppState;
use crate::config::ServerConfig;

/// Idle-session sweep (spec §5/§4.2 supplement): the server binary drives
/// this on a timer rather than the session core scheduling anything
/// itself. A document is only reset once its session has been idle past
/// the configured threshold *and* no room subscriber remains — eviction
/// must never drop state a connected client is relying on.
pub async fn run(state: AppState, config: ServerConfig) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.idle_sweep_interval_seconds));
    loop {
        ticker.tick().await;
        let idle = state.sessions.idle_documents(config.idle_eviction_duration());
        for document_id in idle {
            if state.rooms.member_count(&document_id) == 0 {
                log::debug!("evicting idle session for document {document_id}");
                state.sessions.reset(&document_id);
            }
        }
    }
}
