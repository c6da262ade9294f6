use crate::domain::models::{Alarm, ViewState};
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STATE_SCHEMA: u8 = 1;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Creates the state database and its schema if missing, handing back the
/// open connection so callers can keep using it.
pub fn initialize_database(path: &Path) -> Result<Connection, InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(connection)
}

fn default_schema() -> u8 {
    STATE_SCHEMA
}

/// The committed alarm list and view state, saved after every successful
/// mutation. Missing fields default, so older payloads load without migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    #[serde(default = "default_schema")]
    pub schema: u8,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(default)]
    pub view: ViewState,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            schema: STATE_SCHEMA,
            alarms: Vec::new(),
            view: ViewState::default(),
        }
    }
}

pub trait StateRepository: Send + Sync {
    /// Returns `None` on first run.
    fn load(&self) -> Result<Option<PersistedState>, InfraError>;
    fn save(&self, state: &PersistedState) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStateRepository {
    db_path: PathBuf,
}

impl SqliteStateRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl StateRepository for SqliteStateRepository {
    fn load(&self) -> Result<Option<PersistedState>, InfraError> {
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row("SELECT payload FROM app_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let state: PersistedState = serde_json::from_str(&payload)?;
        if state.schema != STATE_SCHEMA {
            return Err(InfraError::InvalidConfig(format!(
                "unsupported app_state schema {}",
                state.schema
            )));
        }
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<(), InfraError> {
        let payload = serde_json::to_string(state)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO app_state (id, payload, saved_at)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
               payload = excluded.payload,
               saved_at = excluded.saved_at",
            params![payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    state: Mutex<Option<PersistedState>>,
}

impl StateRepository for InMemoryStateRepository {
    fn load(&self) -> Result<Option<PersistedState>, InfraError> {
        let state = self
            .state
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("state lock poisoned: {error}")))?;
        Ok(state.clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), InfraError> {
        let mut slot = self
            .state
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("state lock poisoned: {error}")))?;
        *slot = Some(state.clone());
        Ok(())
    }
}
