//! Filesystem document store.
//!
//! Each document is a JSON object stored in its own sharded directory:
//!
//! ```text
//! <root>/
//!   <collection>/
//!     <s1>/
//!       <s2>/
//!         <id>/
//!           document.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the identifier. Writes go to a
//! temporary file first and are renamed into place, so readers never observe a partial
//! document. Mutations are serialised through a single async mutex; blocking file IO runs on
//! the blocking thread pool.

use crate::constants::{DOCUMENT_FILE_NAME, DOCUMENT_TMP_SUFFIX};
use crate::ports::store::union_into;
use crate::ports::{Collection, Document, DocumentStore, Fields, Query, StoreError, StoreResult};
use async_trait::async_trait;
use saude_uuid::RecordId;
use serde_json::Value;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Number of identifiers tried before `add` gives up on finding a free slot.
const MAX_ALLOCATION_ATTEMPTS: usize = 5;

#[derive(Debug)]
pub struct FileStore {
    root: Arc<PathBuf>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the root or a collection directory cannot be created.
    pub fn open(root: &Path) -> StoreResult<Self> {
        for collection in Collection::ALL {
            fs::create_dir_all(root.join(collection.name()))?;
        }

        Ok(Self {
            root: Arc::new(root.to_path_buf()),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> StoreResult<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || f(&root))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

fn document_dir(root: &Path, collection: Collection, id: &RecordId) -> PathBuf {
    id.sharded_dir(&root.join(collection.name()))
}

fn read_document(path: &Path) -> StoreResult<Option<Fields>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e)),
    };

    match serde_json::from_str::<Value>(&contents).map_err(StoreError::Decode)? {
        Value::Object(fields) => Ok(Some(fields)),
        _ => Err(StoreError::NotAnObject),
    }
}

fn write_document(dir: &Path, fields: &Fields) -> StoreResult<()> {
    fs::create_dir_all(dir)?;

    let target = dir.join(DOCUMENT_FILE_NAME);
    let tmp = target.with_extension(format!("json.{DOCUMENT_TMP_SUFFIX}"));
    let raw = serde_json::to_vec_pretty(fields).map_err(StoreError::Encode)?;

    fs::write(&tmp, raw)?;
    fs::rename(&tmp, &target)?;
    Ok(())
}

/// Allocates a fresh identifier whose directory does not exist yet and creates that directory.
fn allocate_dir(base_dir: &Path) -> StoreResult<(RecordId, PathBuf)> {
    for _attempt in 0..MAX_ALLOCATION_ATTEMPTS {
        let id = RecordId::new();
        let candidate = id.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::Io(e)),
        }
    }

    Err(StoreError::Io(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique document directory after multiple attempts",
    )))
}

/// Walks `<collection>/<s1>/<s2>/<id>/document.json`.
///
/// Unreadable or malformed documents are logged and skipped rather than failing the scan.
fn scan_collection(collection_dir: &Path) -> Vec<Document> {
    let mut documents = Vec::new();

    let s1_iter = match fs::read_dir(collection_dir) {
        Ok(it) => it,
        Err(_) => return documents,
    };

    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for id_ent in id_iter.flatten() {
                let id_path = id_ent.path();
                if !id_path.is_dir() {
                    continue;
                }

                let Some(id) = id_path
                    .file_name()
                    .and_then(|os| os.to_str())
                    .and_then(|name| RecordId::parse(name).ok())
                else {
                    continue;
                };

                let document_path = id_path.join(DOCUMENT_FILE_NAME);
                match read_document(&document_path) {
                    Ok(Some(fields)) => documents.push(Document::new(id, fields)),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            "failed to read document: {} - {}",
                            document_path.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    documents
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, collection: Collection, id: &RecordId) -> StoreResult<Option<Document>> {
        let id = id.clone();
        self.blocking(move |root| {
            let path = document_dir(root, collection, &id).join(DOCUMENT_FILE_NAME);
            Ok(read_document(&path)?.map(|fields| Document::new(id, fields)))
        })
        .await
    }

    async fn set(&self, collection: Collection, id: &RecordId, fields: Fields) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let id = id.clone();
        self.blocking(move |root| write_document(&document_dir(root, collection, &id), &fields))
            .await
    }

    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<RecordId> {
        let _guard = self.write_lock.lock().await;
        self.blocking(move |root| {
            let (id, dir) = allocate_dir(&root.join(collection.name()))?;
            if let Err(e) = write_document(&dir, &fields) {
                // Leave no empty directory behind for a document that was never written.
                let _ = fs::remove_dir_all(&dir);
                return Err(e);
            }
            Ok(id)
        })
        .await
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let id = id.clone();
        self.blocking(move |root| match fs::remove_dir_all(document_dir(root, collection, &id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        })
        .await
    }

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Document>> {
        let query = query.clone();
        self.blocking(move |root| Ok(query.apply(scan_collection(&root.join(collection.name())))))
            .await
    }

    async fn array_union(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        values: Vec<Value>,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let id = id.clone();
        let field = field.to_string();
        self.blocking(move |root| {
            let dir = document_dir(root, collection, &id);
            let mut fields = read_document(&dir.join(DOCUMENT_FILE_NAME))?.ok_or_else(|| {
                StoreError::NotFound {
                    collection,
                    id: id.clone(),
                }
            })?;
            union_into(&mut fields, &field, values)?;
            write_document(&dir, &fields)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Direction;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_open_creates_collection_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).expect("open should succeed");

        for collection in Collection::ALL {
            assert!(
                store.root().join(collection.name()).is_dir(),
                "{collection} directory should exist"
            );
        }
    }

    #[tokio::test]
    async fn test_add_writes_sharded_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();

        let id = store
            .add(Collection::Vitals, fields(json!({"heart_rate": 80})))
            .await
            .expect("add should succeed");

        let path = id
            .sharded_dir(&temp_dir.path().join("vitals"))
            .join(DOCUMENT_FILE_NAME);
        assert!(path.is_file(), "document.json should exist");

        let doc = store.get(Collection::Vitals, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["heart_rate"], json!(80));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();

        let doc = store.get(Collection::Users, &RecordId::new()).await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let id = RecordId::new();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store
                .set(Collection::Users, &id, fields(json!({"name": "Ana"})))
                .await
                .unwrap();
        }

        let reopened = FileStore::open(temp_dir.path()).unwrap();
        let doc = reopened.get(Collection::Users, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Ana"));
    }

    #[tokio::test]
    async fn test_delete_removes_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();
        let id = store
            .add(Collection::Vitals, fields(json!({"a": 1})))
            .await
            .unwrap();

        store.delete(Collection::Vitals, &id).await.unwrap();
        store.delete(Collection::Vitals, &id).await.unwrap();

        assert!(!id.sharded_dir(&temp_dir.path().join("vitals")).exists());
        assert!(store.get(Collection::Vitals, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_skips_malformed_documents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();

        store
            .add(
                Collection::Vitals,
                fields(json!({"patient_id": "p", "recorded_at": 1})),
            )
            .await
            .unwrap();
        store
            .add(
                Collection::Vitals,
                fields(json!({"patient_id": "p", "recorded_at": 2})),
            )
            .await
            .unwrap();

        let broken = RecordId::new().sharded_dir(&temp_dir.path().join("vitals"));
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(DOCUMENT_FILE_NAME), "{ not json").unwrap();

        let query = Query::new()
            .where_eq("patient_id", "p")
            .order_by("recorded_at", Direction::Descending);
        let docs = store.query(Collection::Vitals, &query).await.unwrap();

        assert_eq!(docs.len(), 2, "malformed document should be skipped");
        assert_eq!(docs[0].fields["recorded_at"], json!(2));
    }

    #[tokio::test]
    async fn test_array_union_persists() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();
        let id = RecordId::new();
        store
            .set(Collection::Users, &id, fields(json!({"linked": []})))
            .await
            .unwrap();

        store
            .array_union(Collection::Users, &id, "linked", vec![json!("a")])
            .await
            .unwrap();
        store
            .array_union(Collection::Users, &id, "linked", vec![json!("a"), json!("b")])
            .await
            .unwrap();

        let doc = store.get(Collection::Users, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["linked"], json!(["a", "b"]));
    }
}
