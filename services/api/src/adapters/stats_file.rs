//! services/api/src/adapters/stats_file.rs
//!
//! Implements the `StatsRepository` port as a single JSON document on disk.

use std::path::PathBuf;

use async_trait::async_trait;
use movie_quiz_core::{PortError, PortResult, StatsRepository, StatsState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The on-disk shape of the stats checkpoint.
#[derive(Debug, Serialize, Deserialize)]
struct StatsRecord {
    quiz_count_total: u64,
    points_total: i64,
}

impl From<&StatsState> for StatsRecord {
    fn from(stats: &StatsState) -> Self {
        Self {
            quiz_count_total: stats.quiz_count_total,
            points_total: stats.points_total,
        }
    }
}

impl From<StatsRecord> for StatsState {
    fn from(record: StatsRecord) -> Self {
        Self {
            quiz_count_total: record.quiz_count_total,
            points_total: record.points_total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStatsRepository {
    path: PathBuf,
}

impl FileStatsRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StatsRepository for FileStatsRepository {
    async fn load(&self) -> PortResult<Option<StatsState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stats checkpoint at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "Could not read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let record: StatsRecord = serde_json::from_slice(&bytes).map_err(|e| {
            PortError::Unexpected(format!("Corrupt stats file {}: {}", self.path.display(), e))
        })?;
        Ok(Some(record.into()))
    }

    async fn save(&self, stats: &StatsState) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PortError::Unexpected(format!("Could not create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_vec_pretty(&StatsRecord::from(stats))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            PortError::Unexpected(format!("Could not write {}: {}", self.path.display(), e))
        })
    }
}
