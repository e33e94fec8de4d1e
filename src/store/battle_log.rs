use crate::logger;
use crate::models::outcome::BattleOutcome;
use crate::store::BattleLog;
use crate::utils::errors::StoreError;
use async_trait::async_trait;
use chrono::Local;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Writes every finished battle as a pretty-printed JSON file into `directory`.
pub struct FileBattleLog {
    directory: PathBuf,
}

impl FileBattleLog {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn file_name(outcome: &BattleOutcome) -> String {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        format!("battle-{stamp}-{}-{}.json", outcome.first, outcome.second)
    }
}

#[async_trait]
impl BattleLog for FileBattleLog {
    async fn append(&self, outcome: &BattleOutcome) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(outcome)
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let path = self.directory.join(FileBattleLog::file_name(outcome));
        fs::write(&path, json)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        logger!(DEBUG, "[STORE] Battle log written to `{}`", path.display());
        Ok(())
    }
}

/// Keeps finished battles in memory, newest last.
#[derive(Default)]
pub struct MemoryBattleLog {
    entries: Mutex<Vec<BattleOutcome>>,
}

impl MemoryBattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<BattleOutcome> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl BattleLog for MemoryBattleLog {
    async fn append(&self, outcome: &BattleOutcome) -> Result<(), StoreError> {
        self.entries.lock().await.push(outcome.clone());
        Ok(())
    }
}
