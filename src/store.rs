// 🗄️ SQLite sink - output tables + run event log
//
// Tables are keyed by building name, so re-running a scenario overwrites
// rows instead of duplicating them.

use crate::error::{MapperError, MapperResult};
use crate::pipeline::PipelineOutput;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Audit event, one per run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> MapperResult<()> {
    // WAL for crash recovery; in-memory databases report "memory"
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS building_typology (
            name TEXT PRIMARY KEY,
            standard TEXT NOT NULL,
            year INTEGER NOT NULL,
            use_1 TEXT NOT NULL,
            use_1_r REAL NOT NULL,
            use_2 TEXT NOT NULL,
            use_2_r REAL NOT NULL,
            use_3 TEXT NOT NULL,
            use_3_r REAL NOT NULL,
            reference TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS supply_systems (
            name TEXT PRIMARY KEY,
            type_hs TEXT NOT NULL,
            type_dhw TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS zone_floors (
            name TEXT PRIMARY KEY,
            floors_ag INTEGER NOT NULL,
            height_ag REAL NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Upsert all three tables in one transaction and log a run event.
/// Returns the run id.
pub fn save_output(conn: &mut Connection, output: &PipelineOutput, scenario: &str) -> MapperResult<String> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO building_typology
                (name, standard, year, use_1, use_1_r, use_2, use_2_r, use_3, use_3_r, reference, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for row in &output.typology {
            stmt.execute(params![
                row.name,
                row.standard,
                row.year,
                row.use_1,
                row.ratio_1,
                row.use_2,
                row.ratio_2,
                row.use_3,
                row.ratio_3,
                row.reference,
                now,
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO supply_systems (name, type_hs, type_dhw, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for row in &output.supply {
            stmt.execute(params![
                row.name,
                row.type_hs.to_string(),
                row.type_dhw.to_string(),
                now,
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO zone_floors (name, floors_ag, height_ag, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for row in &output.zone {
            stmt.execute(params![row.name, row.floors_ag, row.height_ag, now])?;
        }
    }

    let event = Event::new(
        "mapping_completed",
        "scenario",
        scenario,
        serde_json::json!({
            "stats": output.stats,
            "reference": output.reference,
            "digest": output.digest()?,
        }),
        "gwr-mapper",
    );
    insert_event(&tx, &event)?;

    tx.commit()?;
    info!(run_id = %event.event_id, buildings = output.typology.len(), "saved mapping to database");

    Ok(event.event_id)
}

pub fn insert_event(conn: &Connection, event: &Event) -> MapperResult<()> {
    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, entity_type, entity_id, data, actor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            serde_json::to_string(&event.data)?,
            event.actor,
        ],
    )?;
    Ok(())
}

pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> MapperResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![entity_type, entity_id], |row| {
        let timestamp: String = row.get(1)?;
        let data: String = row.get(5)?;
        Ok((
            row.get::<_, String>(0)?,
            timestamp,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            data,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (event_id, timestamp, event_type, entity_type, entity_id, data, actor) = row?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| MapperError::Config(format!("bad event timestamp: {}", e)))?;
        events.push(Event {
            event_id,
            timestamp,
            event_type,
            entity_type,
            entity_id,
            data: serde_json::from_str(&data)?,
            actor,
        });
    }

    Ok(events)
}

pub fn count_rows(conn: &Connection, table: &str) -> MapperResult<i64> {
    let sql = match table {
        "building_typology" => "SELECT COUNT(*) FROM building_typology",
        "supply_systems" => "SELECT COUNT(*) FROM supply_systems",
        "zone_floors" => "SELECT COUNT(*) FROM zone_floors",
        "events" => "SELECT COUNT(*) FROM events",
        other => {
            return Err(MapperError::Config(format!(
                "unknown table '{}'",
                other
            )))
        }
    };
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
