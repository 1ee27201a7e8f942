use tracing::info;

use crate::engine::{Engine, EngineError};

/// Compact when `threshold` or more events were appended since the last compaction.
/// Returns whether it compacted.
pub async fn compact_if_needed(engine: &Engine, threshold: u64) -> Result<bool, EngineError> {
    let appended = engine.journal_appends_since_compact().await;
    if appended < threshold {
        return Ok(false);
    }
    engine.compact_journal().await?;
    info!(appended, "compacted journal");
    Ok(true)
}
