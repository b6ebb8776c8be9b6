//! Advisory duration estimate for a clip list.
//!
//! Probes run concurrently on the blocking pool. A clip whose probe fails
//! contributes nothing; the estimate never gates rendering.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::engine::MediaEngine;

/// Sum of probed clip durations in whole milliseconds.
pub async fn estimate_total_duration_ms(engine: Arc<dyn MediaEngine>, clips: &[PathBuf]) -> u64 {
    let mut probes = JoinSet::new();
    for clip in clips.iter().cloned() {
        let engine = Arc::clone(&engine);
        probes.spawn_blocking(move || {
            let ms = engine.probe_duration_secs(&clip).map(secs_to_ms);
            if ms.is_none() {
                tracing::debug!(clip = %clip.display(), "Duration probe failed");
            }
            ms.unwrap_or(0)
        });
    }

    let mut total_ms = 0u64;
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok(ms) => total_ms = total_ms.saturating_add(ms),
            Err(e) => tracing::debug!(error = %e, "Duration probe task did not complete"),
        }
    }

    tracing::debug!(clips = clips.len(), total_ms, "Estimated total duration");
    total_ms
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0) as u64
}
