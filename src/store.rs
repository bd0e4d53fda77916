//! SQLite persistence for learned data.
//!
//! One store file per user (`<data_dir>/PSCue/learned-data.db`) holding
//! four tables: command knowledge, argument knowledge, command history,
//! and workflow transitions. All writes are additive merges keyed by
//! primary key — counts are summed, `first_seen` takes the minimum,
//! `last_used` the maximum — so concurrent writers from multiple host
//! processes cannot lose each other's updates. WAL journaling lets readers
//! proceed while a writer flushes.
//!
//! A store that cannot be read on load is quarantined next to itself as
//! `<name>.corrupt.<timestamp>` and a fresh store takes its place.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use crate::error::CueError;
use crate::history::HistoryEntry;
use crate::knowledge::{ArgumentKnowledge, CommandKnowledge};
use crate::workflow::{TransitionRecord, TransitionStats};

/// One recorded invocation, queued for the next flush.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub command_key: String,
    /// Literal and its flag-ness, post normalization and dedupe.
    pub arguments: Vec<(String, bool)>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// One observed workflow transition, queued for the next flush.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub from_key: String,
    pub to_key: String,
    pub delta_ms: i64,
    /// Epoch milliseconds of the `to` command.
    pub timestamp: i64,
}

/// Changes accumulated since the last successful flush.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    pub usage: Vec<UsageEvent>,
    pub history: Vec<HistoryEntry>,
    pub transitions: Vec<TransitionEvent>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.usage.is_empty() && self.history.is_empty() && self.transitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.usage.len() + self.history.len() + self.transitions.len()
    }
}

/// Everything the store holds, loaded at init.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    pub commands: Vec<CommandKnowledge>,
    pub history: Vec<HistoryEntry>,
    pub transitions: Vec<TransitionRecord>,
}

/// Handle to the SQLite store. Writes serialize through the inner mutex.
pub struct Store {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Store {
    /// Default store location: `<user_data_dir>/PSCue/learned-data.db`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("PSCue")
            .join("learned-data.db")
    }

    /// Open (creating if absent) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, CueError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CueError::Store {
                path: path.to_path_buf(),
                detail: format!("failed to create store directory: {e}"),
            })?;
        }
        let conn = Connection::open(path).map_err(|e| CueError::store(path, e))?;
        configure(&conn).map_err(|e| CueError::store(path, e))?;
        init_schema(&conn).map_err(|e| CueError::store(path, e))?;
        debug!(path = %path.display(), "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open the store, quarantining a corrupt file and retrying once.
    ///
    /// Returns the store plus the quarantine path when recovery happened.
    pub fn open_with_recovery(path: &Path) -> Result<(Self, Option<PathBuf>), CueError> {
        match Self::open(path) {
            Ok(store) => Ok((store, None)),
            Err(first_error) => {
                if !path.exists() {
                    return Err(first_error);
                }
                let quarantined = quarantine_path(path);
                std::fs::rename(path, &quarantined).map_err(|e| CueError::Store {
                    path: path.to_path_buf(),
                    detail: format!("failed to quarantine corrupt store: {e}"),
                })?;
                let store = Self::open(path)?;
                let recovered = CueError::StoreCorrupt {
                    path: path.to_path_buf(),
                    quarantined: quarantined.clone(),
                };
                warn!(cause = %first_error, "{recovered}");
                Ok((store, Some(quarantined)))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `delta` in one transaction with additive-merge semantics.
    pub fn flush(&self, delta: &Delta) -> Result<(), CueError> {
        if delta.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().expect("store lock poisoned");
        let result = (|| -> rusqlite::Result<()> {
            let tx = conn.transaction()?;
            for event in &delta.usage {
                upsert_usage(&tx, event)?;
            }
            for entry in &delta.history {
                insert_history(&tx, entry)?;
            }
            for event in &delta.transitions {
                upsert_transition(&tx, event)?;
            }
            tx.commit()
        })();
        result.map_err(|e| CueError::store(&self.path, e))?;
        info!(
            events = delta.len(),
            path = %self.path.display(),
            "delta flushed"
        );
        Ok(())
    }

    /// Load the whole store into memory.
    pub fn load(&self) -> Result<StoreSnapshot, CueError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        (|| -> rusqlite::Result<StoreSnapshot> {
            Ok(StoreSnapshot {
                commands: load_knowledge(&conn)?,
                history: load_history(&conn, None)?,
                transitions: load_transitions(&conn)?,
            })
        })()
        .map_err(|e| CueError::store(&self.path, e))
    }

    /// The most recent `limit` persisted history entries, newest first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, CueError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        load_history(&conn, Some(limit)).map_err(|e| CueError::store(&self.path, e))
    }

    /// Delete knowledge rows — one command's, or all of them.
    pub fn clear_knowledge(&self, command_key: Option<&str>) -> Result<(), CueError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let result = match command_key {
            Some(key) => conn
                .execute("DELETE FROM argument_knowledge WHERE command_key = ?1", [key])
                .and_then(|_| {
                    conn.execute("DELETE FROM command_knowledge WHERE command_key = ?1", [key])
                }),
            None => conn
                .execute("DELETE FROM argument_knowledge", [])
                .and_then(|_| conn.execute("DELETE FROM command_knowledge", [])),
        };
        result.map_err(|e| CueError::store(&self.path, e))?;
        Ok(())
    }

    /// Delete all workflow transitions.
    pub fn clear_transitions(&self) -> Result<(), CueError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute("DELETE FROM workflow_transitions", [])
            .map_err(|e| CueError::store(&self.path, e))?;
        Ok(())
    }

    /// Replace knowledge and transitions wholesale (import-replace).
    ///
    /// History rows are left alone; an import document does not carry
    /// history.
    pub fn replace_all(
        &self,
        commands: &[CommandKnowledge],
        transitions: &[TransitionRecord],
    ) -> Result<(), CueError> {
        let mut conn = self.conn.lock().expect("store lock poisoned");
        let result = (|| -> rusqlite::Result<()> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM argument_knowledge", [])?;
            tx.execute("DELETE FROM command_knowledge", [])?;
            tx.execute("DELETE FROM workflow_transitions", [])?;
            for knowledge in commands {
                tx.execute(
                    "INSERT INTO command_knowledge (command_key, total_usage, first_seen, last_used)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        knowledge.command_key,
                        knowledge.total_usage,
                        knowledge.first_seen,
                        knowledge.last_used
                    ],
                )?;
                for arg in knowledge.arguments.values() {
                    tx.execute(
                        "INSERT INTO argument_knowledge
                         (command_key, argument, usage_count, first_seen, last_used, is_flag)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            knowledge.command_key,
                            arg.argument,
                            arg.usage_count,
                            arg.first_seen,
                            arg.last_used,
                            arg.is_flag
                        ],
                    )?;
                }
            }
            for record in transitions {
                tx.execute(
                    "INSERT INTO workflow_transitions
                     (from_key, to_key, frequency, total_time_delta_ms, first_seen, last_seen)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.from_key,
                        record.to_key,
                        record.stats.frequency,
                        record.stats.total_time_delta_ms,
                        record.stats.first_seen,
                        record.stats.last_seen
                    ],
                )?;
            }
            tx.commit()
        })();
        result.map_err(|e| CueError::store(&self.path, e))
    }
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    // WAL keeps concurrent hosts from losing writes; the busy timeout
    // covers writer contention between processes.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS command_knowledge (
             command_key TEXT PRIMARY KEY,
             total_usage INTEGER NOT NULL,
             first_seen  INTEGER NOT NULL,
             last_used   INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS argument_knowledge (
             command_key TEXT NOT NULL,
             argument    TEXT NOT NULL,
             usage_count INTEGER NOT NULL,
             first_seen  INTEGER NOT NULL,
             last_used   INTEGER NOT NULL,
             is_flag     INTEGER NOT NULL,
             PRIMARY KEY (command_key, argument)
         );
         CREATE TABLE IF NOT EXISTS command_history (
             id                INTEGER PRIMARY KEY AUTOINCREMENT,
             command_line      TEXT NOT NULL,
             command           TEXT NOT NULL,
             arguments         TEXT NOT NULL,
             timestamp         INTEGER NOT NULL,
             working_directory TEXT NOT NULL,
             success           INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS workflow_transitions (
             from_key            TEXT NOT NULL,
             to_key              TEXT NOT NULL,
             frequency           INTEGER NOT NULL,
             total_time_delta_ms INTEGER NOT NULL,
             first_seen          INTEGER NOT NULL,
             last_seen           INTEGER NOT NULL,
             PRIMARY KEY (from_key, to_key)
         );",
    )
}

fn upsert_usage(conn: &Connection, event: &UsageEvent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO command_knowledge (command_key, total_usage, first_seen, last_used)
         VALUES (?1, 1, ?2, ?2)
         ON CONFLICT(command_key) DO UPDATE SET
             total_usage = total_usage + 1,
             first_seen  = MIN(first_seen, excluded.first_seen),
             last_used   = MAX(last_used, excluded.last_used)",
        params![event.command_key, event.timestamp],
    )?;
    for (argument, is_flag) in &event.arguments {
        conn.execute(
            "INSERT INTO argument_knowledge
             (command_key, argument, usage_count, first_seen, last_used, is_flag)
             VALUES (?1, ?2, 1, ?3, ?3, ?4)
             ON CONFLICT(command_key, argument) DO UPDATE SET
                 usage_count = usage_count + 1,
                 first_seen  = MIN(first_seen, excluded.first_seen),
                 last_used   = MAX(last_used, excluded.last_used)",
            params![event.command_key, argument, event.timestamp, is_flag],
        )?;
    }
    Ok(())
}

fn insert_history(conn: &Connection, entry: &HistoryEntry) -> rusqlite::Result<()> {
    let arguments = serde_json::to_string(&entry.arguments).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO command_history
         (command_line, command, arguments, timestamp, working_directory, success)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.command_line,
            entry.command,
            arguments,
            entry.timestamp,
            entry.working_directory,
            entry.success
        ],
    )?;
    Ok(())
}

fn upsert_transition(conn: &Connection, event: &TransitionEvent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO workflow_transitions
         (from_key, to_key, frequency, total_time_delta_ms, first_seen, last_seen)
         VALUES (?1, ?2, 1, ?3, ?4, ?4)
         ON CONFLICT(from_key, to_key) DO UPDATE SET
             frequency           = frequency + 1,
             total_time_delta_ms = total_time_delta_ms + excluded.total_time_delta_ms,
             first_seen          = MIN(first_seen, excluded.first_seen),
             last_seen           = MAX(last_seen, excluded.last_seen)",
        params![event.from_key, event.to_key, event.delta_ms, event.timestamp],
    )?;
    Ok(())
}

fn load_knowledge(conn: &Connection) -> rusqlite::Result<Vec<CommandKnowledge>> {
    let mut commands: Vec<CommandKnowledge> = {
        let mut stmt = conn.prepare(
            "SELECT command_key, total_usage, first_seen, last_used
             FROM command_knowledge ORDER BY command_key",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CommandKnowledge {
                command_key: row.get(0)?,
                total_usage: row.get(1)?,
                first_seen: row.get(2)?,
                last_used: row.get(3)?,
                arguments: Default::default(),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut stmt = conn.prepare(
        "SELECT command_key, argument, usage_count, first_seen, last_used, is_flag
         FROM argument_knowledge",
    )?;
    let args = stmt.query_map([], |row| {
        let command_key: String = row.get(0)?;
        Ok((
            command_key,
            ArgumentKnowledge {
                argument: row.get(1)?,
                usage_count: row.get(2)?,
                first_seen: row.get(3)?,
                last_used: row.get(4)?,
                is_flag: row.get(5)?,
            },
        ))
    })?;
    for result in args {
        let (command_key, arg) = result?;
        if let Some(knowledge) = commands.iter_mut().find(|c| c.command_key == command_key) {
            knowledge.arguments.insert(arg.argument.clone(), arg);
        }
    }
    Ok(commands)
}

fn load_history(conn: &Connection, limit: Option<usize>) -> rusqlite::Result<Vec<HistoryEntry>> {
    let sql = match limit {
        Some(_) => {
            "SELECT id, command_line, command, arguments, timestamp, working_directory, success
             FROM command_history ORDER BY id DESC LIMIT ?1"
        }
        None => {
            "SELECT id, command_line, command, arguments, timestamp, working_directory, success
             FROM command_history ORDER BY id ASC"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<HistoryEntry> {
        let arguments_json: String = row.get(3)?;
        Ok(HistoryEntry {
            id: row.get(0)?,
            command_line: row.get(1)?,
            command: row.get(2)?,
            arguments: serde_json::from_str(&arguments_json).unwrap_or_default(),
            timestamp: row.get(4)?,
            working_directory: row.get(5)?,
            success: row.get(6)?,
        })
    };
    let rows = match limit {
        Some(n) => stmt.query_map([n], map_row)?,
        None => stmt.query_map([], map_row)?,
    };
    rows.collect()
}

fn load_transitions(conn: &Connection) -> rusqlite::Result<Vec<TransitionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT from_key, to_key, frequency, total_time_delta_ms, first_seen, last_seen
         FROM workflow_transitions ORDER BY from_key, to_key",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TransitionRecord {
            from_key: row.get(0)?,
            to_key: row.get(1)?,
            stats: TransitionStats {
                frequency: row.get(2)?,
                total_time_delta_ms: row.get(3)?,
                first_seen: row.get(4)?,
                last_seen: row.get(5)?,
            },
        })
    })?;
    rows.collect()
}

/// `<name>.corrupt.<timestamp>`, de-duplicated with a random suffix.
fn quarantine_path(path: &Path) -> PathBuf {
    let base = path.as_os_str().to_string_lossy();
    let stamp = chrono::Utc::now().timestamp();
    let candidate = PathBuf::from(format!("{base}.corrupt.{stamp}"));
    if !candidate.exists() {
        return candidate;
    }
    PathBuf::from(format!(
        "{base}.corrupt.{stamp}.{}",
        uuid::Uuid::new_v4().as_hyphenated()
    ))
}
