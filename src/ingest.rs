use crate::models::{ChangeEvent, Contribution};
use crate::state::AppState;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub fn spawn_ingest(state: AppState) -> JoinHandle<()> {
    let events = state.store.subscribe();
    spawn_ingest_from(state, events)
}

/// The receiver may predate the initial snapshot; replayed rows the
/// snapshot already included fall out in the id dedup.
pub fn spawn_ingest_from(
    state: AppState,
    mut events: broadcast::Receiver<ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("change feed ingestion started");
        loop {
            match events.recv().await {
                Ok(ChangeEvent::Insert(contribution)) => {
                    merge_insert(&state, contribution).await;
                }
                Ok(ChangeEvent::Delete(contribution)) => {
                    debug!(id = %contribution.id, "delete on the feed, resyncing");
                    resync(&state).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed lagged, events were dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("change feed ingestion stopped");
    })
}

async fn merge_insert(state: &AppState, contribution: Contribution) {
    let id = contribution.id.clone();
    let mut board = state.board.lock().await;
    if board.is_echo(&contribution) {
        debug!(%id, "ignoring echo of a local write");
        return;
    }
    if board.apply_insert(contribution) {
        debug!(%id, "merged feed insert");
    } else {
        debug!(%id, "ignoring duplicate feed insert");
    }
}

async fn resync(state: &AppState) {
    let incentives = match state.store.fetch_incentives().await {
        Ok(incentives) => incentives,
        Err(err) => {
            error!(error = %err, "resync fetch of incentives failed, keeping current view");
            return;
        }
    };
    let contributions = match state.store.fetch_contributions().await {
        Ok(contributions) => contributions,
        Err(err) => {
            error!(error = %err, "resync fetch of contributions failed, keeping current view");
            return;
        }
    };

    let mut board = state.board.lock().await;
    board.rebuild(incentives, &contributions);
    info!(contributions = contributions.len(), "rebuilt dashboard after delete");
}
