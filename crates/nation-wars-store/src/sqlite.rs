//! SQLite storage backend.
//!
//! Each record is stored as its raw JSON document next to the columns needed
//! for filtered queries. Reading goes through serde, so loosely typed
//! counters written by other tools are coerced on the way back in.
//!
//! Treasury and unit-loss writes patch the named fields of the stored
//! document in place. Unknown fields and fractional balances written by the
//! game are left untouched.

use crate::store::{EntityStore, StoreError, WarFilter};
use nation_wars_core::{coerce, Alliance, BattleLog, Message, Military, Nation, UnitType, War};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-based entity store.
///
/// Thread-safe wrapper around a SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StoreError::Unavailable(err.to_string())
            }
            Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl SqliteStore {
    /// Create a new store with an in-memory database.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Open (or create) a file-based database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_db()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Initialize the database schema.
    pub fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nations (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                raw TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS militaries (
                nation_id TEXT PRIMARY KEY,
                raw TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS alliances (
                id TEXT PRIMARY KEY,
                raw TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS wars (
                id TEXT PRIMARY KEY,
                attacker_nation_id TEXT NOT NULL,
                defender_nation_id TEXT NOT NULL,
                status TEXT NOT NULL,
                start_date TEXT NOT NULL,
                raw TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS battle_logs (
                id TEXT PRIMARY KEY,
                war_id TEXT NOT NULL,
                battle_number INTEGER NOT NULL,
                raw TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                recipient_nation_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                raw TEXT NOT NULL
            );",
        )?;

        // Indexes for filtered queries
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_nations_owner ON nations(owner);
            CREATE INDEX IF NOT EXISTS idx_wars_attacker ON wars(attacker_nation_id, status);
            CREATE INDEX IF NOT EXISTS idx_wars_defender ON wars(defender_nation_id, status);
            CREATE INDEX IF NOT EXISTS idx_battle_logs_war ON battle_logs(war_id, battle_number);
            CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_nation_id, created_at);",
        )?;

        Ok(())
    }

    fn query_raw<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn get_raw<T: DeserializeOwned>(&self, sql: &str, id: &str) -> Result<Option<T>, StoreError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(sql, params![id], |row| row.get(0))
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(StoreError::from))
            .transpose()
    }

    fn query_nations(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Nation>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut nations = Vec::new();
        for row in rows {
            let (id, owner, raw) = row?;
            let mut nation = serde_json::from_str::<Nation>(&raw)?.keyed_to(&id);
            if nation.owner.is_empty() {
                nation.owner = owner;
            }
            nations.push(nation);
        }
        Ok(nations)
    }

    /// Rewrite one stored document under a transaction. Returns `false` when
    /// no row has the key.
    fn patch_raw(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        patch: impl FnOnce(&mut serde_json::Map<String, Value>),
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let raw: Option<String> = tx
            .query_row(
                &format!("SELECT raw FROM {table} WHERE {key_column} = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(false);
        };

        let mut document = match serde_json::from_str::<Value>(&raw)? {
            Value::Object(fields) => fields,
            other => {
                return Err(StoreError::Serialization(format!(
                    "{table} row {key} is not an object: {other}"
                )))
            }
        };
        patch(&mut document);
        tx.execute(
            &format!("UPDATE {table} SET raw = ?2 WHERE {key_column} = ?1"),
            params![key, Value::Object(document).to_string()],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

fn to_raw<T: Serialize>(record: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(record)?)
}

/// A stored balance moved by `delta`, never below zero.
///
/// Fractional balances keep their fraction; anything that is not a plain
/// number is coerced to a whole count first.
fn adjusted_balance(current: Option<&Value>, delta: i64) -> Value {
    match current {
        Some(Value::Number(n)) if n.is_f64() => {
            let balance = n.as_f64().filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0);
            json!((balance + delta as f64).max(0.0))
        }
        other => {
            let balance = other.map(coerce::count).unwrap_or(0);
            json!(balance.saturating_add_signed(delta))
        }
    }
}

impl EntityStore for SqliteStore {
    fn nations_owned_by(&self, owner: &str) -> Result<Vec<Nation>, StoreError> {
        self.query_nations(
            "SELECT id, owner, raw FROM nations WHERE owner = ?1 ORDER BY id",
            &[&owner],
        )
    }

    fn get_nation(&self, id: &str) -> Result<Option<Nation>, StoreError> {
        Ok(self
            .query_nations("SELECT id, owner, raw FROM nations WHERE id = ?1", &[&id])?
            .pop())
    }

    fn put_nation(&self, nation: &Nation) -> Result<(), StoreError> {
        let raw = to_raw(nation)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO nations (id, owner, raw) VALUES (?1, ?2, ?3)",
            params![nation.id, nation.owner, raw],
        )?;
        Ok(())
    }

    fn adjust_treasury(&self, nation_id: &str, delta: i64) -> Result<(), StoreError> {
        let found = self.patch_raw("nations", "id", nation_id, |fields| {
            let balance = adjusted_balance(fields.get("treasury"), delta);
            fields.insert("treasury".to_string(), balance);
        })?;
        if !found {
            return Err(StoreError::not_found("nation", nation_id));
        }
        Ok(())
    }

    fn get_military(&self, nation_id: &str) -> Result<Option<Military>, StoreError> {
        let military: Option<Military> =
            self.get_raw("SELECT raw FROM militaries WHERE nation_id = ?1", nation_id)?;
        Ok(military.map(|m| m.keyed_to(nation_id)))
    }

    fn put_military(&self, military: &Military) -> Result<(), StoreError> {
        let raw = to_raw(military)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO militaries (nation_id, raw) VALUES (?1, ?2)",
            params![military.nation_id, raw],
        )?;
        Ok(())
    }

    fn apply_unit_losses(
        &self,
        nation_id: &str,
        losses: &BTreeMap<UnitType, u64>,
    ) -> Result<(), StoreError> {
        self.patch_raw("militaries", "nation_id", nation_id, |fields| {
            for (unit, lost) in losses {
                let key = unit.as_str();
                let remaining = fields
                    .get(key)
                    .map(coerce::count)
                    .unwrap_or(0)
                    .saturating_sub(*lost);
                fields.insert(key.to_string(), json!(remaining));
            }
        })?;
        Ok(())
    }

    fn get_alliance(&self, id: &str) -> Result<Option<Alliance>, StoreError> {
        self.get_raw("SELECT raw FROM alliances WHERE id = ?1", id)
    }

    fn put_alliance(&self, alliance: &Alliance) -> Result<(), StoreError> {
        let raw = to_raw(alliance)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO alliances (id, raw) VALUES (?1, ?2)",
            params![alliance.id, raw],
        )?;
        Ok(())
    }

    fn create_war(&self, war: &War) -> Result<(), StoreError> {
        let raw = to_raw(war)?;
        self.conn()?.execute(
            "INSERT INTO wars (id, attacker_nation_id, defender_nation_id, status, start_date, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                war.id,
                war.attacker_nation_id,
                war.defender_nation_id,
                war.status.as_str(),
                war.start_date.to_rfc3339(),
                raw
            ],
        )?;
        Ok(())
    }

    fn get_war(&self, id: &str) -> Result<Option<War>, StoreError> {
        self.get_raw("SELECT raw FROM wars WHERE id = ?1", id)
    }

    fn update_war(&self, war: &War) -> Result<(), StoreError> {
        let raw = to_raw(war)?;
        let rows_affected = self.conn()?.execute(
            "UPDATE wars SET status = ?2, raw = ?3 WHERE id = ?1",
            params![war.id, war.status.as_str(), raw],
        )?;
        if rows_affected == 0 {
            return Err(StoreError::not_found("war", &war.id));
        }
        Ok(())
    }

    fn find_wars(&self, filter: &WarFilter) -> Result<Vec<War>, StoreError> {
        let mut sql = String::from("SELECT raw FROM wars");
        let mut conditions: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some((a, b)) = &filter.between {
            conditions.push(
                "((attacker_nation_id = ? AND defender_nation_id = ?)
                  OR (attacker_nation_id = ? AND defender_nation_id = ?))",
            );
            params_vec.push(Box::new(a.clone()));
            params_vec.push(Box::new(b.clone()));
            params_vec.push(Box::new(b.clone()));
            params_vec.push(Box::new(a.clone()));
        }

        if let Some(nation) = &filter.involving {
            conditions.push("(attacker_nation_id = ? OR defender_nation_id = ?)");
            params_vec.push(Box::new(nation.clone()));
            params_vec.push(Box::new(nation.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params_vec.push(Box::new(status.as_str()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY start_date, id");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        self.query_raw(&sql, &params_refs)
    }

    fn create_battle_log(&self, log: &BattleLog) -> Result<(), StoreError> {
        let raw = to_raw(log)?;
        self.conn()?.execute(
            "INSERT INTO battle_logs (id, war_id, battle_number, raw) VALUES (?1, ?2, ?3, ?4)",
            params![log.id, log.war_id, log.battle_number, raw],
        )?;
        Ok(())
    }

    fn battle_logs(&self, war_id: &str) -> Result<Vec<BattleLog>, StoreError> {
        self.query_raw(
            "SELECT raw FROM battle_logs WHERE war_id = ?1 ORDER BY battle_number",
            &[&war_id],
        )
    }

    fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        let raw = to_raw(message)?;
        self.conn()?.execute(
            "INSERT INTO messages (id, recipient_nation_id, created_at, raw) VALUES (?1, ?2, ?3, ?4)",
            params![
                message.id,
                message.recipient_nation_id,
                message.created_at.to_rfc3339(),
                raw
            ],
        )?;
        Ok(())
    }

    fn messages_for(&self, nation_id: &str) -> Result<Vec<Message>, StoreError> {
        self.query_raw(
            "SELECT raw FROM messages WHERE recipient_nation_id = ?1 ORDER BY created_at, id",
            &[&nation_id],
        )
    }
}
