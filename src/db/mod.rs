use crate::errors::{AppError, AppResult};
use crate::models::{DashboardSettings, FilterColumn, Lead, LeadFilters, NewLead, Stage, StageCount};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const LEAD_COLUMNS: &str = "id, tax_id, name, state, city, phone, email, social_handle, crop, stage";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Appends every row in one transaction; a failure leaves the table untouched.
    pub fn insert_leads(&self, leads: &[NewLead]) -> AppResult<usize> {
        let mut conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let tx = conn.transaction()?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO leads (tax_id, name, state, city, phone, email, social_handle, crop, stage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for lead in leads {
                statement.execute(params![
                    lead.tax_id,
                    lead.name,
                    lead.state,
                    lead.city,
                    lead.phone,
                    lead.email,
                    lead.social_handle,
                    lead.crop,
                    Stage::INITIAL.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(leads.len())
    }

    pub fn list_leads(&self, filters: &LeadFilters) -> AppResult<Vec<Lead>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let (clause, params_vec) = filter_clause(filters);
        let query = format!("SELECT {} FROM leads WHERE 1 = 1{} ORDER BY id", LEAD_COLUMNS, clause);

        let mut statement = conn.prepare(&query)?;
        let rows = statement.query_map(rusqlite::params_from_iter(params_vec.iter()), parse_lead_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_leads(&self, filters: &LeadFilters) -> AppResult<usize> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let (clause, params_vec) = filter_clause(filters);
        let query = format!("SELECT COUNT(1) FROM leads WHERE 1 = 1{}", clause);
        let count: i64 = conn.query_row(&query, rusqlite::params_from_iter(params_vec.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Sorted distinct values currently stored for a filterable column.
    pub fn distinct_values(&self, column: FilterColumn) -> AppResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let name = column.column_name();
        let mut statement = conn.prepare(&format!("SELECT DISTINCT {name} FROM leads ORDER BY {name}"))?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    /// Returns whether a row was written. Setting the current stage writes nothing.
    pub fn update_stage(&self, id: i64, stage: Stage) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let changed = conn.execute(
            "UPDATE leads SET stage = ?1 WHERE id = ?2 AND stage != ?1",
            params![stage.as_str(), id],
        )?;
        if changed > 0 {
            return Ok(true);
        }

        let exists: Option<i64> = conn
            .query_row("SELECT id FROM leads WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match exists {
            Some(_) => Ok(false),
            None => Err(AppError::NotFound(format!("Lead {} not found", id))),
        }
    }

    pub fn delete_leads_in_stage(&self, stage: Stage) -> AppResult<usize> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let removed = conn.execute("DELETE FROM leads WHERE stage = ?1", [stage.as_str()])?;
        Ok(removed)
    }

    pub fn delete_lead(&self, id: i64) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let removed = conn.execute("DELETE FROM leads WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    pub fn stage_counts(&self) -> AppResult<Vec<StageCount>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut statement = conn.prepare("SELECT stage, COUNT(1) FROM leads GROUP BY stage")?;
        let rows = statement.query_map([], |row| {
            Ok((parse_stage(&row.get::<_, String>(0)?, 0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts: Vec<StageCount> = Stage::ALL
            .into_iter()
            .map(|stage| StageCount { stage, count: 0 })
            .collect();
        for row in rows {
            let (stage, count) = row?;
            if let Some(entry) = counts.iter_mut().find(|entry| entry.stage == stage) {
                entry.count = count as usize;
            }
        }
        Ok(counts)
    }

    pub fn get_settings(&self) -> AppResult<DashboardSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<DashboardSettings>(&raw)?),
            None => Ok(DashboardSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<DashboardSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: DashboardSettings =
            serde_json::from_value(merged).map_err(|error| AppError::Invalid(error.to_string()))?;

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        Ok(settings)
    }
}

/// Filter values are always bound; only fixed column names reach the SQL text.
fn filter_clause(filters: &LeadFilters) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut params_vec = Vec::new();
    if let Some(state) = &filters.state {
        clause.push_str(" AND state = ?");
        params_vec.push(state.clone());
    }
    if let Some(crop) = &filters.crop {
        clause.push_str(" AND crop = ?");
        params_vec.push(crop.clone());
    }
    (clause, params_vec)
}

fn parse_lead_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        tax_id: row.get(1)?,
        name: row.get(2)?,
        state: row.get(3)?,
        city: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        social_handle: row.get(7)?,
        crop: row.get(8)?,
        stage: parse_stage(&row.get::<_, String>(9)?, 9)?,
    })
}

fn parse_stage(raw: &str, column: usize) -> rusqlite::Result<Stage> {
    Stage::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Unknown stage '{}'", raw),
            )),
        )
    })
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::models::{FilterColumn, LeadFilters, NewLead, Stage};

    fn new_lead(name: &str, state: &str, crop: &str) -> NewLead {
        NewLead {
            tax_id: format!("{}-tax", name),
            name: name.to_string(),
            state: state.to_string(),
            city: "Somewhere".to_string(),
            phone: "555".to_string(),
            email: format!("{}@farm.test", name),
            social_handle: String::new(),
            crop: crop.to_string(),
        }
    }

    fn seeded() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("leads.db")).expect("db");
        db.insert_leads(&[
            new_lead("a", "SP", "soy"),
            new_lead("b", "MG", "corn"),
            new_lead("c", "SP", "corn"),
            new_lead("d", "SP", "soy"),
        ])
        .expect("insert");
        (dir, db)
    }

    #[test]
    fn schema_setup_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.db");
        let db = Database::new(&path).expect("db");
        db.insert_leads(&[new_lead("a", "SP", "soy")]).expect("insert");
        drop(db);

        let reopened = Database::new(&path).expect("reopen");
        assert_eq!(reopened.count_leads(&LeadFilters::default()).expect("count"), 1);
    }

    #[test]
    fn inserted_leads_get_increasing_ids_and_initial_stage() {
        let (_dir, db) = seeded();
        let leads = db.list_leads(&LeadFilters::default()).expect("list");
        assert_eq!(leads.len(), 4);
        assert!(leads.windows(2).all(|pair| pair[0].id < pair[1].id));
        assert!(leads.iter().all(|lead| lead.stage == Stage::INITIAL));
    }

    #[test]
    fn filters_bind_values_and_combine_with_and() {
        let (_dir, db) = seeded();
        let filters = LeadFilters {
            state: Some("SP".to_string()),
            crop: Some("soy".to_string()),
        };
        let leads = db.list_leads(&filters).expect("list");
        let names: Vec<&str> = leads.iter().map(|lead| lead.name.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(db.count_leads(&filters).expect("count"), 2);

        let hostile = LeadFilters {
            state: Some("SP' OR '1'='1".to_string()),
            crop: None,
        };
        assert!(db.list_leads(&hostile).expect("list").is_empty());
    }

    #[test]
    fn distinct_values_reflect_live_rows() {
        let (_dir, db) = seeded();
        assert_eq!(db.distinct_values(FilterColumn::State).expect("states"), vec!["MG", "SP"]);
        assert_eq!(db.distinct_values(FilterColumn::Crop).expect("crops"), vec!["corn", "soy"]);
    }

    #[test]
    fn update_stage_touches_one_row_and_skips_same_value() {
        let (_dir, db) = seeded();
        let before = db.list_leads(&LeadFilters::default()).expect("list");
        let target = before[1].id;

        assert!(db.update_stage(target, Stage::InProgress).expect("update"));
        assert!(!db.update_stage(target, Stage::InProgress).expect("same stage"));

        let after = db.list_leads(&LeadFilters::default()).expect("list");
        for (old, new) in before.iter().zip(after.iter()) {
            if old.id == target {
                assert_eq!(new.stage, Stage::InProgress);
                assert_eq!(new.name, old.name);
            } else {
                assert_eq!(new, old);
            }
        }

        let missing = db.update_stage(9_999, Stage::Leads).expect_err("missing lead");
        assert!(missing.to_string().starts_with("NOT_FOUND"));
    }

    #[test]
    fn clearing_a_stage_leaves_other_stages() {
        let (_dir, db) = seeded();
        let leads = db.list_leads(&LeadFilters::default()).expect("list");
        db.update_stage(leads[0].id, Stage::QualifiedContact).expect("update");

        assert_eq!(db.delete_leads_in_stage(Stage::Leads).expect("clear"), 3);
        let remaining = db.list_leads(&LeadFilters::default()).expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, leads[0].id);
        assert_eq!(remaining[0].stage, Stage::QualifiedContact);

        let counts = db.stage_counts().expect("counts");
        assert_eq!(counts.iter().map(|entry| entry.count).collect::<Vec<_>>(), vec![0, 0, 1]);
    }

    #[test]
    fn settings_merge_partial_updates() {
        let (_dir, db) = seeded();
        let defaults = db.get_settings().expect("settings");
        let updated = db
            .update_settings(serde_json::json!({ "logoPath": "logo.jpg" }))
            .expect("update");
        assert_eq!(updated.logo_path.as_deref(), Some("logo.jpg"));
        assert_eq!(updated.export_file_name, defaults.export_file_name);
        assert_eq!(db.get_settings().expect("reload"), updated);
    }

    #[test]
    fn failed_insert_rolls_back_the_whole_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.db");
        let db = Database::new(&path).expect("db");
        db.insert_leads(&[new_lead("kept", "SP", "soy")]).expect("seed");

        let side = rusqlite::Connection::open(&path).expect("side connection");
        side.execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON leads WHEN NEW.name = 'boom'
             BEGIN SELECT RAISE(ABORT, 'rejected row'); END;",
        )
        .expect("trigger");

        let error = db
            .insert_leads(&[new_lead("first", "MG", "corn"), new_lead("boom", "MG", "corn")])
            .expect_err("store failure");
        assert!(error.to_string().starts_with("STORAGE"));

        let names: Vec<String> = db
            .list_leads(&LeadFilters::default())
            .expect("list")
            .into_iter()
            .map(|lead| lead.name)
            .collect();
        assert_eq!(names, vec!["kept"]);
    }

    #[test]
    fn unknown_stage_reports_the_column_it_came_from() {
        let error = super::parse_stage("Em andamento", 0).expect_err("unknown stage");
        assert!(matches!(error, rusqlite::Error::FromSqlConversionFailure(0, _, _)));
        assert!(super::parse_stage("Leads", 9).is_ok());
    }
}
