use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::providers::factory::ProviderType;

/// Snapshot of one conversation as written to disk after each chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub model_provider: ProviderType,
    pub model_name: String,
    pub conversation_history: Vec<Message>,
}

/// `session_{YYYYmmdd_HHMMSS}_{8 hex chars}`
pub fn new_session_id() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", timestamp, &suffix[..8])
}

pub fn session_log_path(dir: &Path, session_id: &str) -> PathBuf {
    dir.join(format!("{}.json", session_id))
}

/// Write the log as pretty JSON, replacing any earlier snapshot
pub async fn write_session_log(dir: &Path, log: &SessionLog) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = session_log_path(dir, &log.session_id);
    let body = serde_json::to_vec_pretty(log)?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

pub async fn read_session_log(path: &Path) -> io::Result<SessionLog> {
    let body = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&body)?)
}
