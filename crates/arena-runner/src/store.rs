//! JSON file store — one document per debate under a state directory.
//!
//! Every mutation rewrites the whole snapshot through a temp file and a
//! rename, so a crash leaves either the old or the new document on disk,
//! never a torn one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use arena_core::{
    ConsensusVerdict, DebateRecord, DebateSnapshot, DebateStatus, DebateStore, PersistenceError,
    Turn, VerificationLogEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

const EXTENSION: &str = "json";

/// File-backed [`DebateStore`].
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles across debates in one process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) the state directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Ids of every stored debate, sorted.
    pub async fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, debate_id: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !debate_id.is_empty()
            && debate_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistenceError::Io(format!(
                "invalid debate id {:?}",
                debate_id
            )));
        }
        Ok(self.dir.join(format!("{}.{}", debate_id, EXTENSION)))
    }

    async fn read(&self, debate_id: &str) -> Result<DebateSnapshot, PersistenceError> {
        let path = self.path_for(debate_id)?;
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(debate_id.to_string()))
            }
            Err(e) => return Err(io_error(&path, e)),
        };
        DebateSnapshot::from_json(&json)
    }

    async fn write(&self, snapshot: &DebateSnapshot) -> Result<(), PersistenceError> {
        let path = self.path_for(snapshot.debate_id())?;
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        let json = snapshot.to_json()?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(
            debate_id = %snapshot.debate_id(),
            turns = snapshot.turns.len(),
            status = %snapshot.status,
            "Snapshot written"
        );
        Ok(())
    }

    async fn update(
        &self,
        debate_id: &str,
        f: impl FnOnce(&mut DebateSnapshot) + Send,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read(debate_id).await?;
        f(&mut snapshot);
        snapshot.updated_at = Utc::now();
        self.write(&snapshot).await
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PersistenceError {
    PersistenceError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl DebateStore for JsonFileStore {
    async fn create(&self, record: &DebateRecord) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(&record.debate_id)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if exists {
            return Err(PersistenceError::AlreadyExists(record.debate_id.clone()));
        }
        self.write(&DebateSnapshot::new(record.clone())).await
    }

    async fn append_turn(&self, debate_id: &str, turn: &Turn) -> Result<(), PersistenceError> {
        self.update(debate_id, |s| s.turns.push(turn.clone())).await
    }

    async fn append_verifications(
        &self,
        debate_id: &str,
        entries: &[VerificationLogEntry],
    ) -> Result<(), PersistenceError> {
        self.update(debate_id, |s| s.verifications.extend_from_slice(entries))
            .await
    }

    async fn set_round_and_status(
        &self,
        debate_id: &str,
        round: u32,
        status: DebateStatus,
    ) -> Result<(), PersistenceError> {
        self.update(debate_id, |s| {
            s.round = round;
            s.status = status;
        })
        .await
    }

    async fn get_snapshot(&self, debate_id: &str) -> Result<DebateSnapshot, PersistenceError> {
        self.read(debate_id).await
    }

    async fn save_verdict(
        &self,
        debate_id: &str,
        verdict: &ConsensusVerdict,
    ) -> Result<(), PersistenceError> {
        self.update(debate_id, |s| s.verdict = Some(verdict.clone()))
            .await
    }
}
