//! In-memory document store.

use crate::ports::store::union_into;
use crate::ports::{Collection, Document, DocumentStore, Fields, Query, StoreError, StoreResult};
use async_trait::async_trait;
use saude_uuid::RecordId;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Tables = HashMap<Collection, BTreeMap<RecordId, Fields>>;

/// Volatile document store backed by a map per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        self.tables
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &RecordId) -> StoreResult<Option<Document>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .and_then(|table| table.get(id))
            .map(|fields| Document::new(id.clone(), fields.clone())))
    }

    async fn set(&self, collection: Collection, id: &RecordId, fields: Fields) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        Ok(())
    }

    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<RecordId> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();

        let mut id = RecordId::new();
        while table.contains_key(&id) {
            id = RecordId::new();
        }
        table.insert(id.clone(), fields);
        Ok(id)
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(&collection) {
            table.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let documents = tables
            .get(&collection)
            .into_iter()
            .flat_map(|table| table.iter())
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()));
        Ok(query.apply(documents))
    }

    async fn array_union(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        values: Vec<Value>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let fields = tables
            .get_mut(&collection)
            .and_then(|table| table.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.clone(),
            })?;
        union_into(fields, field, values)
    }
}
