//! SurrealDB client factory for the catalog service.
//!
//! A [`Database`] wraps an embedded SurrealDB engine selected by endpoint and
//! hands out typed [`Collection`]s, one table each. Records are keyed by
//! store-assigned identifiers (UUID v7, so key order follows insertion
//! order). Closing the database makes every subsequent operation fail with
//! [`StoreError::Unavailable`].

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;
use thiserror::Error;
use uuid::Uuid;

const MEMORY_SCHEME: &str = "memory://";

/// Failures surfaced by the persistence boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated on '{collection}': {message}")]
    Constraint {
        collection: &'static str,
        message: String,
    },

    #[error("unsupported database endpoint '{0}'; expected memory://<name>")]
    UnsupportedEndpoint(String),

    #[error("store query failed: {0}")]
    Query(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(error: surrealdb::Error) -> Self {
        StoreError::Query(error.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to an embedded SurrealDB database.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    client: Surreal<Db>,
    open: Arc<AtomicBool>,
}

impl Database {
    /// Open a database from an endpoint such as `memory://catalog`, selecting
    /// `namespace` and a database named after the endpoint.
    pub async fn connect(endpoint: &str, namespace: &str) -> StoreResult<Self> {
        let name = endpoint
            .strip_prefix(MEMORY_SCHEME)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StoreError::UnsupportedEndpoint(endpoint.to_string()))?;

        let client = Surreal::new::<Mem>(())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        client.use_ns(namespace).use_db(name).await?;

        tracing::info!(target: "catalog-db", namespace, database = name, "database opened");
        Ok(Self {
            name: Arc::from(name),
            client,
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Open an unnamed scratch database.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("memory://scratch", "catalog").await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Refuse all further reads and writes.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        tracing::info!(target: "catalog-db", database = %self.name, "database closed");
    }

    /// Typed view over the table `name`. Handles for the same name share
    /// their records.
    pub fn collection<T>(&self, name: &'static str) -> Collection<T> {
        Collection {
            name,
            db: self.clone(),
            _record: PhantomData,
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "database '{}' is closed",
                self.name
            )))
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Stored shape of a record. The table key lives outside it.
#[derive(Serialize, Deserialize)]
struct Document<T> {
    record: T,
}

/// Typed record set inside a [`Database`].
pub struct Collection<T> {
    name: &'static str,
    db: Database,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            db: self.db.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("database", &self.db.name)
            .finish()
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a new record; the store assigns its identifier and hands it to
    /// `build` so the record can carry its own id.
    pub async fn insert(&self, build: impl FnOnce(String) -> T) -> StoreResult<T> {
        self.db.ensure_open()?;
        let id = Uuid::now_v7().to_string();
        let record = build(id.clone());

        let created: Option<Document<T>> = self
            .db
            .client
            .create((self.name, id.clone()))
            .content(Document {
                record: record.clone(),
            })
            .await?;
        if created.is_none() {
            return Err(StoreError::Constraint {
                collection: self.name,
                message: format!("record '{}' was not created", id),
            });
        }

        tracing::debug!(target: "catalog-db", collection = self.name, %id, "record inserted");
        Ok(record)
    }

    /// Insert a record under a caller-chosen identifier, overwriting any
    /// existing record with that id. Used for seeding reference data.
    pub async fn put(&self, id: impl Into<String>, record: T) -> StoreResult<()> {
        self.db.ensure_open()?;
        let _: Option<Document<T>> = self
            .db
            .client
            .upsert((self.name, id.into()))
            .content(Document { record })
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        self.db.ensure_open()?;
        let found: Option<Document<T>> = self.db.client.select((self.name, id.to_string())).await?;
        Ok(found.map(|document| document.record))
    }

    pub async fn contains(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// All records in identifier order.
    pub async fn all(&self) -> StoreResult<Vec<T>> {
        self.db.ensure_open()?;
        let mut response = self
            .db
            .client
            .query("SELECT meta::id(id) AS key, record FROM type::table($table) ORDER BY key")
            .bind(("table", self.name))
            .await?;
        let documents: Vec<Document<T>> = response.take(0)?;
        Ok(documents.into_iter().map(|document| document.record).collect())
    }

    pub async fn len(&self) -> StoreResult<usize> {
        Ok(self.all().await?.len())
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Overwrite the record stored under `id`. Returns `None` when no such
    /// record exists; nothing is written in that case.
    pub async fn replace(&self, id: &str, record: T) -> StoreResult<Option<T>> {
        self.db.ensure_open()?;
        let updated: Option<Document<T>> = self
            .db
            .client
            .update((self.name, id.to_string()))
            .content(Document {
                record: record.clone(),
            })
            .await?;

        if updated.is_some() {
            tracing::debug!(target: "catalog-db", collection = self.name, %id, "record replaced");
        }
        Ok(updated.map(|_| record))
    }

    /// Remove the record stored under `id`, returning it if it existed.
    pub async fn remove(&self, id: &str) -> StoreResult<Option<T>> {
        self.db.ensure_open()?;
        let removed: Option<Document<T>> = self.db.client.delete((self.name, id.to_string())).await?;
        if removed.is_some() {
            tracing::debug!(target: "catalog-db", collection = self.name, %id, "record removed");
        }
        Ok(removed.map(|document| document.record))
    }
}
