//! In-process document store with optional JSON snapshot persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ports::{
    Collection, Document, DocumentPort, Filter, StoreError, StoreMeta, Update, UpdateOutcome,
    upsert_document,
};

type Collections = BTreeMap<Collection, Vec<Document>>;

/// Document store kept in memory.
///
/// When opened with a snapshot path, the whole database is loaded from that file and
/// rewritten after every mutation, so state survives restarts of the application.
pub struct MemoryStore {
    meta: StoreMeta,
    collections: RwLock<Collections>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, purely in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: StoreMeta {
                kind: String::from("memory"),
                location: String::from("<in-memory>"),
            },
            collections: RwLock::new(Collections::new()),
            snapshot: None,
        }
    }

    /// Open a store backed by a snapshot file, loading it when it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let collections = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read(&path).await?;
            parse_snapshot(&raw)?
        } else {
            Collections::new()
        };

        debug!(path = %path.display(), "opened memory store snapshot");

        Ok(Self {
            meta: StoreMeta {
                kind: String::from("memory"),
                location: path.display().to_string(),
            },
            collections: RwLock::new(collections),
            snapshot: Some(path),
        })
    }

    /// Snapshot file backing this store, if any.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Persist `staged` and only then make it the live state.
    async fn commit(&self, live: &mut Collections, staged: Collections) -> Result<(), StoreError> {
        self.persist(&staged).await?;
        *live = staged;
        Ok(())
    }

    async fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let mut root = Map::new();
        for (collection, documents) in collections {
            root.insert(
                collection.name().to_owned(),
                Value::Array(documents.iter().cloned().map(Value::Object).collect()),
            );
        }
        let bytes = serde_json::to_vec_pretty(&Value::Object(root))
            .map_err(|err| StoreError::Internal(format!("snapshot encoding failed: {err}")))?;

        // Stage next to the target, then rename over it.
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

fn parse_snapshot(raw: &[u8]) -> Result<Collections, StoreError> {
    let root: Map<String, Value> = serde_json::from_slice(raw)
        .map_err(|err| StoreError::Internal(format!("snapshot is not a JSON object: {err}")))?;

    let mut collections = Collections::new();
    for (name, documents) in root {
        let Some(collection) = Collection::from_name(&name) else {
            warn!(collection = %name, "ignoring unknown collection in snapshot");
            continue;
        };
        let Value::Array(documents) = documents else {
            return Err(StoreError::Internal(format!(
                "snapshot collection {name} is not an array"
            )));
        };
        let documents = documents
            .into_iter()
            .filter_map(|document| match document {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        collections.insert(collection, documents);
    }
    Ok(collections)
}

#[async_trait]
impl DocumentPort for MemoryStore {
    fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let matching = collections.get(&collection).map_or(0, |documents| {
            documents
                .iter()
                .filter(|document| filter.matches(document))
                .count()
        });
        Ok(u64::try_from(matching).unwrap_or(u64::MAX))
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        let inserted = documents.len();
        if inserted == 0 {
            return Ok(0);
        }

        let mut collections = self.collections.write().await;
        let mut staged = collections.clone();
        staged.entry(collection).or_default().extend(documents);
        self.commit(&mut collections, staged).await?;
        Ok(inserted)
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let mut staged = collections.clone();
        let documents = staged.entry(collection).or_default();

        let mut outcome = UpdateOutcome::default();
        for document in documents.iter_mut().filter(|document| filter.matches(document)) {
            outcome.matched += 1;
            if update.apply(document) {
                outcome.modified += 1;
            }
        }

        if outcome.matched == 0 && upsert {
            documents.push(upsert_document(filter, update));
            outcome.upserted = true;
        }

        if outcome.modified > 0 || outcome.upserted {
            self.commit(&mut collections, staged).await?;
        }
        Ok(outcome)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let mut staged = collections.clone();
        let Some(documents) = staged.get_mut(&collection) else {
            return Ok(0);
        };

        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        let removed = before - documents.len();

        if removed > 0 {
            self.commit(&mut collections, staged).await?;
        }
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[tokio::test]
    async fn insert_find_update_delete() {
        let store = MemoryStore::new();
        store
            .insert_many(
                Collection::SmartBins,
                vec![
                    doc(json!({"binId": "a", "moduleName": "LabModule"})),
                    doc(json!({"binId": "b", "moduleName": null})),
                ],
            )
            .await
            .expect("insert");

        let lab = Filter::all().eq("moduleName", "LabModule");
        assert_eq!(store.find(Collection::SmartBins, &lab).await.expect("find").len(), 1);
        assert_eq!(
            store
                .count(Collection::SmartBins, &Filter::all().missing("moduleName"))
                .await
                .expect("count"),
            1
        );

        let outcome = store
            .update_many(
                Collection::SmartBins,
                &Filter::all().eq("binId", "b"),
                &Update::new().set("moduleName", "LabModule"),
                false,
            )
            .await
            .expect("update");
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.modified, 1);
        assert_eq!(store.count(Collection::SmartBins, &lab).await.expect("count"), 2);

        let removed = store
            .delete_many(Collection::SmartBins, &Filter::all().eq("binId", "a"))
            .await
            .expect("delete");
        assert_eq!(removed, 1);
        assert_eq!(
            store.count(Collection::SmartBins, &Filter::all()).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn upsert_inserts_only_when_nothing_matches() {
        let store = MemoryStore::new();
        let filter = Filter::all().eq("month", "May").eq("year", 2026);
        let update = Update::new().inc("totalGlassRecycled", 2.0);

        let first = store
            .update_many(Collection::MonthlySummaries, &filter, &update, true)
            .await
            .expect("upsert");
        assert!(first.upserted, "first call inserts");

        let second = store
            .update_many(Collection::MonthlySummaries, &filter, &update, true)
            .await
            .expect("update");
        assert!(!second.upserted, "second call updates");

        let summaries = store
            .find(Collection::MonthlySummaries, &filter)
            .await
            .expect("find");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries.first().and_then(|summary| summary.get("totalGlassRecycled")), Some(&json!(4.0)));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jezero.json");

        let store = MemoryStore::open(&path).await.expect("open empty");
        store
            .insert_many(
                Collection::TrashItems,
                vec![doc(json!({"trashId": "t1", "binId": "a", "codeName": "X", "quantity": 2}))],
            )
            .await
            .expect("insert");
        drop(store);

        let reopened = MemoryStore::open(&path).await.expect("reopen");
        let trash = reopened
            .find(Collection::TrashItems, &Filter::all())
            .await
            .expect("find");
        assert_eq!(trash.len(), 1);
        assert_eq!(reopened.snapshot_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("state");
        std::fs::create_dir_all(&nested).expect("mkdir");
        let store = MemoryStore::open(nested.join("jezero.json")).await.expect("open");
        let bin = doc(json!({"binId": "a", "filledWeight": 1.0}));
        store
            .insert_many(Collection::SmartBins, vec![bin])
            .await
            .expect("insert");

        std::fs::remove_dir_all(&nested).expect("remove snapshot dir");

        let extra = doc(json!({"binId": "b"}));
        assert!(
            store.insert_many(Collection::SmartBins, vec![extra]).await.is_err(),
            "insert reports the write failure"
        );
        let update = Update::new().set("filledWeight", 9.0);
        assert!(
            store
                .update_many(Collection::SmartBins, &Filter::all(), &update, false)
                .await
                .is_err(),
            "update reports the write failure"
        );
        assert!(
            store.delete_many(Collection::SmartBins, &Filter::all()).await.is_err(),
            "delete reports the write failure"
        );

        let bins = store
            .find(Collection::SmartBins, &Filter::all())
            .await
            .expect("find");
        assert_eq!(bins.len(), 1);
        assert_eq!(bins.first().and_then(|bin| bin.get("filledWeight")), Some(&json!(1.0)));
    }

    #[test]
    fn snapshot_skips_unknown_collections() {
        let parsed = parse_snapshot(br#"{"smartbin": [{"binId": "a"}], "legacy": []}"#)
            .expect("parses");
        assert_eq!(parsed.len(), 1);
        assert!(parse_snapshot(b"[]").is_err(), "root must be an object");
    }
}
