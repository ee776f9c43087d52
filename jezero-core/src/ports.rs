//! Traits describing the document-store backend and the query types shared by adapters.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a document store.
pub enum StoreError {
    /// The database driver failed to connect or run the request.
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A stored document does not match the expected shape.
    #[error("Malformed document in {collection}: {source}")]
    Decode {
        /// Collection the document was read from.
        collection: Collection,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// Reading or writing a local snapshot failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Internal store error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Collections of the habitat database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Smart bins.
    SmartBins,
    /// Trash items sitting in bins.
    TrashItems,
    /// Consumable stock catalogue.
    ConsumableItems,
    /// Manufacturing recipes.
    ManufacturableItems,
    /// Recycled-material ledger.
    RecycledMaterials,
    /// Per-month collected/recycled totals.
    MonthlySummaries,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Self; 6] = [
        Self::SmartBins,
        Self::TrashItems,
        Self::ConsumableItems,
        Self::ManufacturableItems,
        Self::RecycledMaterials,
        Self::MonthlySummaries,
    ];

    /// Collection name in the database.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SmartBins => "smartbin",
            Self::TrashItems => "trashitem",
            Self::ConsumableItems => "consumableitem",
            Self::ManufacturableItems => "manufacturableitem",
            Self::RecycledMaterials => "recycledmaterial",
            Self::MonthlySummaries => "monthlysummary",
        }
    }

    /// Look a collection up by its database name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Single predicate on a document field.
pub enum Condition {
    /// Field equals the value.
    Eq(String, Value),
    /// Field equals one of the values.
    AnyOf(String, Vec<Value>),
    /// Field is absent or null.
    Missing(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Conjunction of conditions. An empty filter matches every document.
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    #[must_use]
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_owned(), value.into()));
        self
    }

    /// Require `field` to equal one of `values`.
    #[must_use]
    pub fn any_of<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::AnyOf(
            field.to_owned(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Require `field` to be absent or null.
    #[must_use]
    pub fn missing(mut self, field: &str) -> Self {
        self.conditions.push(Condition::Missing(field.to_owned()));
        self
    }

    /// Conditions making up the filter.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether a document satisfies every condition.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, expected) => document.get(field) == Some(expected),
            Condition::AnyOf(field, candidates) => document
                .get(field)
                .is_some_and(|value| candidates.contains(value)),
            Condition::Missing(field) => document.get(field).is_none_or(Value::is_null),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Field assignments and increments applied to matching documents.
pub struct Update {
    set: Document,
    inc: Map<String, Value>,
}

impl Update {
    /// Empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `field = value`.
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_owned(), value.into());
        self
    }

    /// Add `amount` to a numeric field, treating a missing field as zero.
    #[must_use]
    pub fn inc(mut self, field: &str, amount: f64) -> Self {
        self.inc.insert(field.to_owned(), Value::from(amount));
        self
    }

    /// Assignments.
    #[must_use]
    pub fn assignments(&self) -> &Document {
        &self.set
    }

    /// Increments.
    #[must_use]
    pub fn increments(&self) -> &Map<String, Value> {
        &self.inc
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty()
    }

    /// Apply the update to a document in place. Returns whether anything changed.
    pub fn apply(&self, document: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        for (field, amount) in &self.inc {
            let amount = amount.as_f64().unwrap_or(0.0);
            let current = document.get(field).and_then(Value::as_f64).unwrap_or(0.0);
            document.insert(field.clone(), Value::from(current + amount));
            changed |= amount.abs() > 0.0;
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Result of an update.
pub struct UpdateOutcome {
    /// Documents matching the filter.
    pub matched: u64,
    /// Documents actually changed.
    pub modified: u64,
    /// Whether a new document was inserted by an upsert.
    pub upserted: bool,
}

#[derive(Debug, Clone)]
/// Metadata describing a store backend.
pub struct StoreMeta {
    /// Short backend identifier, e.g. `memory` or `mongodb`.
    pub kind: String,
    /// Human-friendly location, e.g. a snapshot path or endpoint URL.
    pub location: String,
}

#[async_trait]
/// Trait for document database backends.
pub trait DocumentPort: Send + Sync {
    /// Metadata describing the backend.
    fn meta(&self) -> &StoreMeta;

    /// Return all documents of a collection that match the filter.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Count documents that match the filter.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Insert documents, returning how many were inserted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError>;

    /// Apply an update to every matching document, optionally inserting when none match.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Delete every matching document, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;
}

/// Document an upsert inserts when nothing matched: the filter's equality fields plus the update.
#[must_use]
pub fn upsert_document(filter: &Filter, update: &Update) -> Document {
    let mut document = Document::new();
    for condition in filter.conditions() {
        if let Condition::Eq(field, value) = condition {
            document.insert(field.clone(), value.clone());
        }
    }
    update.apply(&mut document);
    document
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

    #[test]
    fn filter_conditions_are_conjunctive() {
        let bin = doc(json!({"binId": "a", "moduleName": "LabModule", "mobility": "INDOOR"}));

        assert!(Filter::all().matches(&bin), "empty filter");
        assert!(Filter::all().eq("moduleName", "LabModule").matches(&bin), "eq");
        assert!(
            !Filter::all()
                .eq("moduleName", "LabModule")
                .eq("mobility", "INSTATION")
                .matches(&bin),
            "both must hold"
        );
        assert!(
            Filter::all().any_of("binId", ["x", "a"]).matches(&bin),
            "any_of"
        );
    }

    #[test]
    fn missing_matches_absent_and_null() {
        let absent = doc(json!({"binId": "a"}));
        let null = doc(json!({"binId": "b", "moduleName": null}));
        let set = doc(json!({"binId": "c", "moduleName": "LabModule"}));
        let filter = Filter::all().missing("moduleName");

        assert!(filter.matches(&absent), "absent");
        assert!(filter.matches(&null), "null");
        assert!(!filter.matches(&set), "set");
    }

    #[test]
    fn update_sets_and_increments() {
        let mut summary = doc(json!({"month": "May", "totalMetalCollected": 2.0}));
        let update = Update::new()
            .inc("totalMetalCollected", 1.5)
            .inc("totalGlassCollected", 3.0)
            .set("year", 2026);

        assert!(update.apply(&mut summary), "changed");
        assert_eq!(summary.get("totalMetalCollected"), Some(&json!(3.5)));
        assert_eq!(summary.get("totalGlassCollected"), Some(&json!(3.0)));
        assert_eq!(summary.get("year"), Some(&json!(2026)));
    }

    #[test]
    fn upsert_document_combines_filter_and_update() {
        let filter = Filter::all().eq("month", "May").eq("year", 2026);
        let update = Update::new().inc("totalPaperRecycled", 4.0);

        let inserted = upsert_document(&filter, &update);
        assert_eq!(
            Value::Object(inserted),
            json!({"month": "May", "year": 2026, "totalPaperRecycled": 4.0})
        );
    }

    #[test]
    fn collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_name(collection.name()), Some(collection));
        }
        assert_eq!(Collection::from_name("nope"), None);
    }
}
