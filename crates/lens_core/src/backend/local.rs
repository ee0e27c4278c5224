//! SQLite implementation of the lens-data contract.
//!
//! # Responsibility
//! - Serve the same CRUD + run-action contract as the REST server, for
//!   offline use, demos and tests.
//! - Execute named actions through an `ActionRegistry`.
//!
//! # Invariants
//! - Write paths validate before any SQL mutation.
//! - Ids are UUID v4 and never reused; removed ids are recorded in
//!   `lens_retired_ids`.
//! - Reads reject invalid persisted state instead of masking it.
//! - A failed action leaves the stored artifact untouched.

use crate::backend::{ActionRegistry, BackendError, BackendResult, CollectionKey, LensBackend};
use crate::db::{open_db, open_db_in_memory};
use crate::model::artifact::{
    Artifact, ArtifactDraft, ArtifactId, ArtifactMeta, ArtifactPatch, DataMap,
};
use crate::schema::validate_status;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const ARTIFACT_SELECT_SQL: &str = "SELECT
    id,
    type,
    title,
    data,
    meta,
    created_at,
    updated_at
FROM lens_artifacts";

/// SQLite-backed lens-data store.
pub struct LocalBackend {
    conn: Mutex<Connection>,
    actions: ActionRegistry,
}

impl LocalBackend {
    /// Opens (or creates) a store file with the built-in actions.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Private in-memory store; contents vanish with the value.
    pub fn in_memory() -> BackendResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            actions: ActionRegistry::with_builtin(),
        }
    }

    /// Replaces the action registry.
    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BackendError::InvalidData("local store lock poisoned".to_string()))
    }
}

fn logged<T>(op: &str, key: &str, f: impl FnOnce() -> BackendResult<T>) -> BackendResult<T> {
    let started_at = Instant::now();
    info!("event=local_store module=backend status=start op={op} key={key}");
    let result = f();
    match &result {
        Ok(_) => info!(
            "event=local_store module=backend status=ok op={op} key={key} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=local_store module=backend status=error op={op} key={key} duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
    result
}

impl LensBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn list(&self, key: &CollectionKey) -> BackendResult<Vec<Artifact>> {
        logged("list", &key.to_string(), || {
            key.validate()?;
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "{ARTIFACT_SELECT_SQL}
                 WHERE domain = ?1 AND type = ?2
                 ORDER BY rowid ASC;"
            ))?;
            let mut rows = stmt.query(params![key.domain(), key.artifact_type()])?;
            let mut artifacts = Vec::new();
            while let Some(row) = rows.next()? {
                artifacts.push(parse_artifact_row(row)?);
            }
            Ok(artifacts)
        })
    }

    fn create(&self, key: &CollectionKey, draft: &ArtifactDraft) -> BackendResult<Artifact> {
        logged("create", &key.to_string(), || {
            key.validate()?;
            draft.validate()?;
            validate_status(key, draft.meta.status.as_deref())?;

            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let id = fresh_id(&tx)?;
            let artifact = Artifact::from_draft(id, key.artifact_type(), draft.clone());
            tx.execute(
                "INSERT INTO lens_artifacts (
                    id,
                    domain,
                    type,
                    title,
                    data,
                    meta,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL);",
                params![
                    artifact.id.as_str(),
                    key.domain(),
                    artifact.artifact_type.as_str(),
                    artifact.title.as_str(),
                    encode_json(&artifact.data)?,
                    encode_json(&artifact.meta)?,
                    timestamp_to_db(&artifact.created_at),
                ],
            )?;
            tx.commit()?;
            Ok(artifact)
        })
    }

    fn update(
        &self,
        key: &CollectionKey,
        id: &ArtifactId,
        patch: &ArtifactPatch,
    ) -> BackendResult<Artifact> {
        logged("update", &key.to_string(), || {
            key.validate()?;
            patch.validate()?;
            let status = patch.meta.as_ref().and_then(|meta| meta.status.as_deref());
            validate_status(key, status)?;

            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let mut artifact = load_artifact(&tx, key.domain(), Some(key.artifact_type()), id)?
                .ok_or_else(|| BackendError::NotFound(id.clone()))?;
            artifact.apply_patch(patch);
            store_artifact(&tx, &artifact)?;
            tx.commit()?;
            Ok(artifact)
        })
    }

    fn remove(&self, key: &CollectionKey, id: &ArtifactId) -> BackendResult<()> {
        logged("remove", &key.to_string(), || {
            key.validate()?;
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "DELETE FROM lens_artifacts WHERE id = ?1 AND domain = ?2 AND type = ?3;",
                params![id.as_str(), key.domain(), key.artifact_type()],
            )?;
            if changed == 0 {
                return Err(BackendError::NotFound(id.clone()));
            }
            tx.execute(
                "INSERT OR IGNORE INTO lens_retired_ids (id, retired_at) VALUES (?1, ?2);",
                params![id.as_str(), timestamp_to_db(&Utc::now())],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn run_action(
        &self,
        domain: &str,
        id: &ArtifactId,
        action: &str,
        params: &Value,
    ) -> BackendResult<Value> {
        logged("run_action", domain, || {
            super::validate_segment(domain)?;
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let mut artifact = load_artifact(&tx, domain, None, id)?
                .ok_or_else(|| BackendError::NotFound(id.clone()))?;

            let outcome = self.actions.dispatch(&artifact, action, params)?;
            if let Some(patch) = &outcome.patch {
                artifact.apply_patch(patch);
                artifact.validate()?;
                store_artifact(&tx, &artifact)?;
            }
            tx.commit()?;
            Ok(outcome.result)
        })
    }
}

/// Draws UUIDs until one has never been handed out before.
fn fresh_id(tx: &Transaction<'_>) -> BackendResult<ArtifactId> {
    loop {
        let id = ArtifactId::generate();
        let taken: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM lens_artifacts WHERE id = ?1)
                 OR EXISTS (SELECT 1 FROM lens_retired_ids WHERE id = ?1);",
            [id.as_str()],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(id);
        }
    }
}

fn load_artifact(
    tx: &Transaction<'_>,
    domain: &str,
    artifact_type: Option<&str>,
    id: &ArtifactId,
) -> BackendResult<Option<Artifact>> {
    let mut stmt = tx.prepare(&format!(
        "{ARTIFACT_SELECT_SQL}
         WHERE id = ?1
           AND domain = ?2
           AND (?3 IS NULL OR type = ?3);"
    ))?;
    let row = stmt
        .query_row(params![id.as_str(), domain, artifact_type], |row| {
            Ok(parse_artifact_row(row))
        })
        .optional()?;
    row.transpose()
}

fn store_artifact(tx: &Transaction<'_>, artifact: &Artifact) -> BackendResult<()> {
    let updated_at = artifact.updated_at.as_ref().map(timestamp_to_db);
    let changed = tx.execute(
        "UPDATE lens_artifacts
         SET
            title = ?1,
            data = ?2,
            meta = ?3,
            updated_at = ?4
         WHERE id = ?5;",
        params![
            artifact.title.as_str(),
            encode_json(&artifact.data)?,
            encode_json(&artifact.meta)?,
            updated_at,
            artifact.id.as_str(),
        ],
    )?;
    if changed == 0 {
        return Err(BackendError::NotFound(artifact.id.clone()));
    }
    Ok(())
}

fn parse_artifact_row(row: &Row<'_>) -> BackendResult<Artifact> {
    let id: String = row.get("id")?;

    let data_text: String = row.get("data")?;
    let data: DataMap = serde_json::from_str(&data_text).map_err(|err| {
        BackendError::InvalidData(format!("invalid json in lens_artifacts.data for `{id}`: {err}"))
    })?;

    let meta_text: String = row.get("meta")?;
    let meta: ArtifactMeta = serde_json::from_str(&meta_text).map_err(|err| {
        BackendError::InvalidData(format!("invalid json in lens_artifacts.meta for `{id}`: {err}"))
    })?;

    let created_text: String = row.get("created_at")?;
    let created_at = parse_timestamp(&created_text, "created_at")?;
    let updated_at = match row.get::<_, Option<String>>("updated_at")? {
        Some(value) => Some(parse_timestamp(&value, "updated_at")?),
        None => None,
    };

    let artifact = Artifact {
        id: ArtifactId::new(id),
        title: row.get("title")?,
        artifact_type: row.get("type")?,
        data,
        meta,
        created_at,
        updated_at,
    };
    artifact.validate()?;
    Ok(artifact)
}

fn encode_json<T: serde::Serialize>(value: &T) -> BackendResult<String> {
    serde_json::to_string(value).map_err(|err| BackendError::InvalidData(err.to_string()))
}

fn timestamp_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str, column: &str) -> BackendResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            BackendError::InvalidData(format!(
                "invalid timestamp `{value}` in lens_artifacts.{column}"
            ))
        })
}
