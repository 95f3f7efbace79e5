use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::Engine;

/// How often the compactor checks the journal's append counter.
const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Background task that compacts the journal once append churn passes
/// `threshold`. The host spawns this next to the engine:
///
/// ```ignore
/// tokio::spawn(maintenance::run_compactor(engine.clone(), 1000));
/// ```
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        let appends = engine.journal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_journal().await {
            Ok(()) => info!(appends, "journal compacted"),
            Err(e) => warn!("journal compaction failed: {e}"),
        }
    }
}
