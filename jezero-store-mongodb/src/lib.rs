//! Document-store adapter backed by MongoDB through the official async driver.
//!
//! Documents cross the boundary as relaxed extended JSON. The `_id` the server assigns is
//! dropped on the way out, the habitat documents carry their own keys.

use std::error::Error as StdError;

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::options::{ClientOptions, UpdateOptions};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::debug;

use jezero_core::ports::{
    Collection, Condition, Document, DocumentPort, Filter, StoreError, StoreMeta, Update,
    UpdateOutcome,
};

/// Application name reported to the server.
const APP_NAME: &str = "jezero";

/// [`DocumentPort`] backed by one MongoDB database.
pub struct MongoStore {
    database: Database,
    meta: StoreMeta,
}

impl MongoStore {
    /// Connect to the deployment at `uri` and use `database`.
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the connection string cannot be parsed or
    /// resolved.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await.map_err(driver_error)?;
        options.app_name = Some(APP_NAME.to_owned());

        let hosts = options
            .hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let client = Client::with_options(options).map_err(driver_error)?;

        let mut store = Self::new(&client, database);
        store.meta.location = format!("{hosts}/{database}");
        Ok(store)
    }

    /// Use `database` through an existing client.
    #[must_use]
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            database: client.database(database),
            meta: StoreMeta {
                kind: String::from("mongodb"),
                location: database.to_owned(),
            },
        }
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.name())
    }
}

#[async_trait]
impl DocumentPort for MongoStore {
    fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let query = render_filter(filter)?;
        debug!(%collection, %query, "find");

        let mut cursor = self
            .collection(collection)
            .find(query)
            .await
            .map_err(driver_error)?;

        let mut documents = Vec::new();
        while cursor.advance().await.map_err(driver_error)? {
            let raw = cursor.deserialize_current().map_err(driver_error)?;
            documents.push(to_json(raw));
        }
        Ok(documents)
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let query = render_filter(filter)?;
        debug!(%collection, %query, "count");

        self.collection(collection)
            .count_documents(query)
            .await
            .map_err(driver_error)
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let documents = documents
            .iter()
            .map(to_bson_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(%collection, count = documents.len(), "insert_many");

        let result = self
            .collection(collection)
            .insert_many(documents)
            .await
            .map_err(driver_error)?;
        Ok(result.inserted_ids.len())
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        if update.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        let query = render_filter(filter)?;
        let changes = render_update(update)?;
        debug!(%collection, %query, %changes, upsert, "update_many");

        let result = self
            .collection(collection)
            .update_many(query, changes)
            .with_options(UpdateOptions::builder().upsert(upsert).build())
            .await
            .map_err(driver_error)?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted: result.upserted_id.is_some(),
        })
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let query = render_filter(filter)?;
        debug!(%collection, %query, "delete_many");

        let result = self
            .collection(collection)
            .delete_many(query)
            .await
            .map_err(driver_error)?;
        Ok(result.deleted_count)
    }
}

/// Render a filter as a query document.
///
/// `{ field: null }` matches both null and absent fields, which is what
/// [`Condition::Missing`] means.
///
/// # Errors
///
/// Returns [`StoreError::Internal`] when a value has no BSON representation.
pub fn render_filter(filter: &Filter) -> Result<BsonDocument, StoreError> {
    let mut clauses = filter
        .conditions()
        .iter()
        .map(|condition| {
            let (field, predicate) = match condition {
                Condition::Eq(field, value) => (field, to_bson(value)?),
                Condition::AnyOf(field, values) => {
                    let candidates = values.iter().map(to_bson).collect::<Result<Vec<_>, _>>()?;
                    (field, Bson::Document(doc! { "$in": candidates }))
                }
                Condition::Missing(field) => (field, Bson::Null),
            };
            let mut clause = BsonDocument::new();
            clause.insert(field.as_str(), predicate);
            Ok(clause)
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok(match clauses.len() {
        0 => BsonDocument::new(),
        1 => clauses.pop().unwrap_or_default(),
        _ => doc! { "$and": clauses },
    })
}

/// Render an update as `$set` and `$inc` operators.
///
/// # Errors
///
/// Returns [`StoreError::Internal`] when a value has no BSON representation.
pub fn render_update(update: &Update) -> Result<BsonDocument, StoreError> {
    let mut rendered = BsonDocument::new();
    if !update.assignments().is_empty() {
        rendered.insert("$set", to_bson_document(update.assignments())?);
    }
    if !update.increments().is_empty() {
        rendered.insert("$inc", to_bson_document(update.increments())?);
    }
    Ok(rendered)
}

fn to_bson(value: &Value) -> Result<Bson, StoreError> {
    bson::to_bson(value).map_err(|err| StoreError::Internal(format!("cannot encode {value}: {err}")))
}

fn to_bson_document(document: &Document) -> Result<BsonDocument, StoreError> {
    bson::to_document(document)
        .map_err(|err| StoreError::Internal(format!("cannot encode document: {err}")))
}

fn to_json(document: BsonDocument) -> Document {
    document
        .into_iter()
        .filter(|(key, _)| key != "_id")
        .map(|(key, value)| (key, to_value(value)))
        .collect()
}

/// Plain JSON for the types the habitat documents use, extended JSON for the rest.
fn to_value(value: Bson) -> Value {
    match value {
        Bson::Double(number) => serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::String(text) => Value::String(text),
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Array(items) => Value::Array(items.into_iter().map(to_value).collect()),
        Bson::Document(nested) => Value::Object(to_json(nested)),
        other => other.into_relaxed_extjson(),
    }
}

fn driver_error(err: impl StdError + Send + Sync + 'static) -> StoreError {
    StoreError::Database(Box::new(err))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(render_filter(&Filter::all()).expect("render"), doc! {});
    }

    #[test]
    fn single_condition_is_rendered_inline() {
        let filter = Filter::all().eq("binId", "bin_LabModule_1");
        assert_eq!(
            render_filter(&filter).expect("render"),
            doc! { "binId": "bin_LabModule_1" }
        );

        let unassigned = Filter::all().missing("moduleName");
        assert_eq!(
            render_filter(&unassigned).expect("render"),
            doc! { "moduleName": Bson::Null }
        );
    }

    #[test]
    fn several_conditions_are_combined_with_and() {
        let filter = Filter::all()
            .eq("month", "October")
            .eq("year", 2026)
            .any_of("trashId", ["trash_001", "trash_002"]);

        assert_eq!(
            render_filter(&filter).expect("render"),
            doc! { "$and": [
                { "month": "October" },
                { "year": 2026_i64 },
                { "trashId": { "$in": ["trash_001", "trash_002"] } },
            ] }
        );
    }

    #[test]
    fn update_renders_set_and_inc() {
        let update = Update::new()
            .set("filledWeight", 12.5)
            .inc("totalMetalCollected", 2.0);

        assert_eq!(
            render_update(&update).expect("render"),
            doc! {
                "$set": { "filledWeight": 12.5 },
                "$inc": { "totalMetalCollected": 2.0 },
            }
        );
        assert_eq!(
            render_update(&Update::new().set("quantity", 3)).expect("render"),
            doc! { "$set": { "quantity": 3_i64 } }
        );
    }

    #[test]
    fn server_ids_are_dropped_and_numbers_survive() {
        let raw = doc! {
            "_id": bson::oid::ObjectId::new(),
            "trashId": "trash_001",
            "quantity": 3_i32,
            "weight": 1.5,
            "filledWeight": 0.0,
            "category": Bson::Null,
            "materials": { "ALUMINUM": 2.0 },
        };

        let document = to_json(raw);
        assert_eq!(
            Value::Object(document),
            json!({
                "trashId": "trash_001",
                "quantity": 3,
                "weight": 1.5,
                "filledWeight": 0.0,
                "category": null,
                "materials": {"ALUMINUM": 2.0},
            })
        );
    }

    #[tokio::test]
    async fn malformed_connection_string_is_a_database_error() {
        let result = MongoStore::connect("not a connection string", "jezero").await;
        assert!(
            matches!(result, Err(StoreError::Database(_))),
            "parse failure is reported"
        );
    }

    #[tokio::test]
    async fn unreachable_server_fails_requests() {
        let store = MongoStore::connect(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
            "jezero",
        )
        .await
        .expect("client builds without contacting the server");
        assert_eq!(store.meta().kind, "mongodb");
        assert_eq!(store.meta().location, "127.0.0.1:1/jezero");

        let result = store.count(Collection::SmartBins, &Filter::all()).await;
        assert!(
            matches!(result, Err(StoreError::Database(_))),
            "driver failure is reported"
        );
    }

    /// Runs against a live server when `JEZERO_TEST_MONGODB_URI` is set.
    #[tokio::test]
    async fn round_trip_against_a_live_server() {
        let Ok(uri) = std::env::var("JEZERO_TEST_MONGODB_URI") else {
            return;
        };
        let name = format!("jezero_test_{}", std::process::id());
        let store = MongoStore::connect(&uri, &name).await.expect("connect");

        let bins = [
            json!({"binId": "lab_1", "moduleName": "LabModule", "filledWeight": 10.0}),
            json!({"binId": "spare", "moduleName": null, "filledWeight": 0.0}),
            json!({"binId": "outdoor", "filledWeight": 4.0}),
        ]
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect::<Vec<_>>();
        assert_eq!(
            store.insert_many(Collection::SmartBins, bins).await.expect("insert"),
            3
        );

        let unassigned = Filter::all().missing("moduleName");
        assert_eq!(
            store.count(Collection::SmartBins, &unassigned).await.expect("count"),
            2
        );
        let lab = store
            .find(Collection::SmartBins, &Filter::all().eq("binId", "lab_1"))
            .await
            .expect("find");
        assert_eq!(lab.len(), 1);
        assert!(lab.iter().all(|bin| !bin.contains_key("_id")), "server id dropped");

        let month = Filter::all().eq("month", "October").eq("year", 2026);
        let tally = Update::new().inc("totalMetalCollected", 2.5);
        let created = store
            .update_many(Collection::MonthlySummaries, &month, &tally, true)
            .await
            .expect("upsert");
        assert!(created.upserted, "first call inserts");
        let again = store
            .update_many(Collection::MonthlySummaries, &month, &tally, true)
            .await
            .expect("update");
        assert_eq!((again.matched, again.upserted), (1, false));
        let summary = store
            .find(Collection::MonthlySummaries, &month)
            .await
            .expect("find month");
        assert_eq!(
            summary.first().and_then(|doc| doc.get("totalMetalCollected")),
            Some(&json!(5.0))
        );

        assert_eq!(
            store
                .delete_many(Collection::SmartBins, &Filter::all())
                .await
                .expect("delete"),
            3
        );
        assert_eq!(
            store
                .count(Collection::SmartBins, &Filter::all())
                .await
                .expect("count after delete"),
            0
        );

        store.database.drop().await.expect("drop test database");
    }
}
