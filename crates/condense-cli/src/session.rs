//! Session storage for conversations and their ancestor history

use condense_types::Message;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Session entry types for JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEntry {
    /// Session metadata
    Metadata {
        id: String,
        created_at: i64,
        #[serde(default)]
        source: Option<String>,
    },
    /// A message in the live conversation
    Message { message: Message, timestamp: i64 },
    /// A pre-compaction message kept for display only
    Ancestor { message: Message, timestamp: i64 },
}

/// A loaded session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: i64,
    pub source: Option<String>,
    pub messages: Vec<Message>,
    pub ancestors: Vec<Message>,
}

/// Directory of JSONL session files
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Get the default sessions directory
    pub fn sessions_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("condense")
            .join("sessions")
    }

    /// Store in the default location
    pub fn open_default() -> Self {
        Self::new(Self::sessions_dir())
    }

    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the session files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", id))
    }

    /// Create a new session holding `messages`. Returns the session ID.
    pub fn create(&self, messages: Vec<Message>, source: Option<String>) -> std::io::Result<String> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            source,
            messages,
            ancestors: Vec::new(),
        };
        self.save(&session)?;
        Ok(session.id)
    }

    /// Load an existing session
    pub fn load(&self, id: &str) -> std::io::Result<Session> {
        let path = self.path(id);
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Session not found: {}", id),
            ));
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut session = Session {
            id: id.to_string(),
            created_at: 0,
            source: None,
            messages: Vec::new(),
            ancestors: Vec::new(),
        };

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: SessionEntry = serde_json::from_str(&line).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}:{}: {}", path.display(), lineno + 1, e),
                )
            })?;
            match entry {
                SessionEntry::Metadata {
                    created_at, source, ..
                } => {
                    session.created_at = created_at;
                    session.source = source;
                }
                SessionEntry::Message { message, .. } => session.messages.push(message),
                SessionEntry::Ancestor { message, .. } => session.ancestors.push(message),
            }
        }

        Ok(session)
    }

    /// Write the whole session, replacing any previous file
    pub fn save(&self, session: &Session) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path(&session.id);
        let tmp = path.with_extension("jsonl.tmp");
        let mut writer = BufWriter::new(File::create(&tmp)?);
        let timestamp = chrono::Utc::now().timestamp_millis();

        let metadata = SessionEntry::Metadata {
            id: session.id.clone(),
            created_at: session.created_at,
            source: session.source.clone(),
        };
        writeln!(writer, "{}", serde_json::to_string(&metadata)?)?;

        for message in &session.ancestors {
            let entry = SessionEntry::Ancestor {
                message: message.clone(),
                timestamp,
            };
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }
        for message in &session.messages {
            let entry = SessionEntry::Message {
                message: message.clone(),
                timestamp,
            };
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }

        writer.flush()?;
        drop(writer);
        fs::rename(tmp, path)
    }

    /// List all sessions, newest first
    pub fn list(&self) -> std::io::Result<Vec<SessionInfo>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                if let Some(info) = Self::read_session_info(&path) {
                    sessions.push(info);
                }
            }
        }

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    fn read_session_info(path: &Path) -> Option<SessionInfo> {
        let reader = BufReader::new(File::open(path).ok()?);
        let mut info = None;
        let mut message_count = 0;
        let mut ancestor_count = 0;

        for line in reader.lines().map_while(Result::ok) {
            match serde_json::from_str::<SessionEntry>(&line) {
                Ok(SessionEntry::Metadata { id, created_at, .. }) => info = Some((id, created_at)),
                Ok(SessionEntry::Message { .. }) => message_count += 1,
                Ok(SessionEntry::Ancestor { .. }) => ancestor_count += 1,
                Err(_) => {}
            }
        }

        let (id, created_at) = info?;
        Some(SessionInfo {
            id,
            created_at,
            message_count,
            ancestor_count,
        })
    }
}

/// Information about a saved session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: i64,
    pub message_count: usize,
    pub ancestor_count: usize,
}

impl SessionInfo {
    /// Format the created_at timestamp for display
    pub fn created_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
