//! Metadata journal for user secrets.
//!
//! `user-secrets.json` records which secret names exist and when each was last
//! set. Values never appear here; they live only in the secret store.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, SecretgateError};

const JOURNAL_FILE: &str = "user-secrets.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSecret {
    pub name: String,
    #[serde(rename = "createdAt", serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

impl UserSecret {
    /// A record stamped with the current time, at millisecond precision.
    pub fn now(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}

/// `2026-01-01T00:00:00.000Z`: always three fractional digits, even when zero.
fn serialize_millis<S>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn journal_path(state_dir: &Path) -> PathBuf {
    state_dir.join(JOURNAL_FILE)
}

/// Read the journal. A missing file is an empty journal.
pub fn read(state_dir: &Path) -> Result<Vec<UserSecret>> {
    let raw = match std::fs::read_to_string(journal_path(state_dir)) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw).map_err(|e| SecretgateError::Serialization(e.to_string()))
}

/// Write the journal pretty-printed, creating the state directory if needed.
/// The file is replaced atomically so readers never see a partial document.
pub fn write(state_dir: &Path, secrets: &[UserSecret]) -> Result<()> {
    std::fs::create_dir_all(state_dir)?;

    let mut raw = serde_json::to_string_pretty(secrets)
        .map_err(|e| SecretgateError::Serialization(e.to_string()))?;
    raw.push('\n');

    let tmp_path = state_dir.join(format!(".{}.tmp.{}", JOURNAL_FILE, rand::random::<u64>()));
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(raw.as_bytes())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, journal_path(state_dir))?;
    Ok(())
}
