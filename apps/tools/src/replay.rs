use anyhow::{Context, Result};
use client_core::{ChatClient, ClientError};
use serde::{Deserialize, Serialize};
use shared::protocol::{ChannelSnapshot, ServerEvent};
use tracing::{debug, warn};

/// One line of a recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ReplayRecord {
    Snapshot(ChannelSnapshot),
    Event(ServerEvent),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub snapshots: usize,
    pub events: usize,
    pub rejected: usize,
}

/// Parses newline-delimited records. Blank lines and `#` comments are skipped.
pub fn parse_records(input: &str) -> Result<Vec<ReplayRecord>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid replay record on line {}", index + 1))
        })
        .collect()
}

/// Feeds records through the client in order. Events the client rejects are
/// counted and skipped; any other failure aborts the replay.
pub async fn replay(client: &ChatClient, records: Vec<ReplayRecord>) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    for record in records {
        match record {
            ReplayRecord::Snapshot(snapshot) => {
                let cid = snapshot.cid().clone();
                client
                    .ingest_snapshot(snapshot)
                    .await
                    .with_context(|| format!("failed to ingest snapshot for {cid}"))?;
                summary.snapshots += 1;
            }
            ReplayRecord::Event(event) => match client.handle_server_event(event).await {
                Ok(()) => summary.events += 1,
                Err(err @ ClientError::UnknownChannel(_)) => {
                    warn!(error = %err, "replay: skipping event");
                    summary.rejected += 1;
                }
                Err(err) => return Err(err.into()),
            },
        }
    }
    debug!(?summary, "replay: finished");
    Ok(summary)
}

#[cfg(test)]
#[path = "tests/replay_tests.rs"]
mod tests;
