//! Typed access to the habitat collections on top of a [`DocumentPort`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{
    Application, BinId, BinMobility, ConsumableItem, HabitatModule, ItemCategory,
    ManufacturableItem, MonthlySummary, RecycledMaterialRecord, SmartBin, Tally, TrashId,
    TrashItem,
};
use crate::ports::{Collection, Document, DocumentPort, Filter, StoreError, StoreMeta, Update};

/// Document field names used in filters and updates.
pub mod field {
    /// `SmartBin::bin_id` and `TrashItem::bin_id`.
    pub const BIN_ID: &str = "binId";
    /// `SmartBin::module_name`.
    pub const MODULE_NAME: &str = "moduleName";
    /// `SmartBin::filled_kg`.
    pub const FILLED_WEIGHT: &str = "filledWeight";
    /// `SmartBin::filled_percentage`.
    pub const FILLED_PERCENTAGE: &str = "filledPercentage";
    /// `TrashItem::trash_id`.
    pub const TRASH_ID: &str = "trashId";
    /// `TrashItem::code_name` and `ConsumableItem::code_name`.
    pub const CODE_NAME: &str = "codeName";
    /// `TrashItem::quantity` and `ConsumableItem::quantity`.
    pub const QUANTITY: &str = "quantity";
    /// `TrashItem::weight`.
    pub const WEIGHT: &str = "weight";
    /// `ManufacturableItem::item_name`.
    pub const ITEM_NAME: &str = "itemName";
    /// `ManufacturableItem::application`.
    pub const APPLICATION: &str = "application";
    /// `MonthlySummary::month`.
    pub const MONTH: &str = "month";
    /// `MonthlySummary::year`.
    pub const YEAR: &str = "year";
}

/// Typed facade over the six habitat collections.
#[derive(Clone)]
pub struct HabitatStore {
    port: Arc<dyn DocumentPort>,
}

impl HabitatStore {
    /// Wrap a document store backend.
    #[must_use]
    pub fn new(port: Arc<dyn DocumentPort>) -> Self {
        Self { port }
    }

    /// Metadata of the underlying backend.
    #[must_use]
    pub fn meta(&self) -> &StoreMeta {
        self.port.meta()
    }

    async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<T>, StoreError> {
        self.port
            .find(collection, filter)
            .await?
            .into_iter()
            .map(|document| decode(collection, document))
            .collect()
    }

    async fn load_one<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<T>, StoreError> {
        Ok(self.load(collection, filter).await?.into_iter().next())
    }

    /// Insert already-typed documents.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when encoding or the backend request fails.
    pub async fn insert<T: Serialize>(
        &self,
        collection: Collection,
        items: &[T],
    ) -> Result<usize, StoreError> {
        let documents = items
            .iter()
            .map(encode)
            .collect::<Result<Vec<_>, _>>()?;
        self.port.insert_many(collection, documents).await
    }

    /// Number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        self.port.count(collection, &Filter::all()).await
    }

    /// All bins, or the bins placed in one module.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn bins(&self, module: Option<HabitatModule>) -> Result<Vec<SmartBin>, StoreError> {
        let filter = match module {
            Some(module) => Filter::all().eq(field::MODULE_NAME, module.as_str()),
            None => Filter::all(),
        };
        self.load(Collection::SmartBins, &filter).await
    }

    /// Bins without a module.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn unassigned_bins(&self) -> Result<Vec<SmartBin>, StoreError> {
        self.load(
            Collection::SmartBins,
            &Filter::all().missing(field::MODULE_NAME),
        )
        .await
    }

    /// Bins with the given mobility tag.
    ///
    /// Filtering happens here rather than in the store because older documents keep the
    /// tag under `binType`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn bins_with_mobility(&self, mobility: BinMobility) -> Result<Vec<SmartBin>, StoreError> {
        Ok(self
            .bins(None)
            .await?
            .into_iter()
            .filter(|bin| bin.mobility == mobility)
            .collect())
    }

    /// Look up a bin.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn bin(&self, bin_id: &BinId) -> Result<Option<SmartBin>, StoreError> {
        self.load_one(
            Collection::SmartBins,
            &Filter::all().eq(field::BIN_ID, bin_id.0.as_str()),
        )
        .await
    }

    /// Persist a bin's fill weight and percentage.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn save_fill(&self, bin: &SmartBin) -> Result<(), StoreError> {
        self.port
            .update_many(
                Collection::SmartBins,
                &Filter::all().eq(field::BIN_ID, bin.bin_id.0.as_str()),
                &Update::new()
                    .set(field::FILLED_WEIGHT, bin.filled_kg)
                    .set(field::FILLED_PERCENTAGE, bin.filled_percentage),
                false,
            )
            .await?;
        Ok(())
    }

    /// Place a bin in a module.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn set_module(&self, bin_id: &BinId, module: HabitatModule) -> Result<(), StoreError> {
        self.port
            .update_many(
                Collection::SmartBins,
                &Filter::all().eq(field::BIN_ID, bin_id.0.as_str()),
                &Update::new().set(field::MODULE_NAME, module.as_str()),
                false,
            )
            .await?;
        Ok(())
    }

    /// All trash, or the trash of one bin.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn trash(&self, bin_id: Option<&BinId>) -> Result<Vec<TrashItem>, StoreError> {
        let filter = match bin_id {
            Some(bin_id) => Filter::all().eq(field::BIN_ID, bin_id.0.as_str()),
            None => Filter::all(),
        };
        self.load(Collection::TrashItems, &filter).await
    }

    /// Trash of several bins.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn trash_in_bins(&self, bin_ids: &[BinId]) -> Result<Vec<TrashItem>, StoreError> {
        if bin_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load(
            Collection::TrashItems,
            &Filter::all().any_of(field::BIN_ID, bin_ids.iter().map(|id| id.0.clone())),
        )
        .await
    }

    /// Trash items with the given identifiers.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn trash_by_ids(&self, trash_ids: &[TrashId]) -> Result<Vec<TrashItem>, StoreError> {
        if trash_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load(
            Collection::TrashItems,
            &Filter::all().any_of(field::TRASH_ID, trash_ids.iter().map(|id| id.0.clone())),
        )
        .await
    }

    /// Look up one trash item.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn trash_item(&self, trash_id: &TrashId) -> Result<Option<TrashItem>, StoreError> {
        self.load_one(
            Collection::TrashItems,
            &Filter::all().eq(field::TRASH_ID, trash_id.0.as_str()),
        )
        .await
    }

    /// Apply an update to one trash item.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn update_trash(&self, trash_id: &TrashId, update: &Update) -> Result<(), StoreError> {
        self.port
            .update_many(
                Collection::TrashItems,
                &Filter::all().eq(field::TRASH_ID, trash_id.0.as_str()),
                update,
                false,
            )
            .await?;
        Ok(())
    }

    /// Move every trash item of one bin into another. Returns how many moved.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn move_trash(&self, from: &BinId, to: &BinId) -> Result<u64, StoreError> {
        let outcome = self
            .port
            .update_many(
                Collection::TrashItems,
                &Filter::all().eq(field::BIN_ID, from.0.as_str()),
                &Update::new().set(field::BIN_ID, to.0.as_str()),
                false,
            )
            .await?;
        Ok(outcome.matched)
    }

    /// Delete trash items. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn delete_trash(&self, trash_ids: &[TrashId]) -> Result<u64, StoreError> {
        if trash_ids.is_empty() {
            return Ok(0);
        }
        self.port
            .delete_many(
                Collection::TrashItems,
                &Filter::all().any_of(field::TRASH_ID, trash_ids.iter().map(|id| id.0.clone())),
            )
            .await
    }

    /// Consumable catalogue.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn consumables(&self) -> Result<Vec<ConsumableItem>, StoreError> {
        self.load(Collection::ConsumableItems, &Filter::all()).await
    }

    /// Look up a consumable by code.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn consumable(&self, code_name: &str) -> Result<Option<ConsumableItem>, StoreError> {
        self.load_one(
            Collection::ConsumableItems,
            &Filter::all().eq(field::CODE_NAME, code_name),
        )
        .await
    }

    /// Overwrite the stock of a consumable.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn set_stock(&self, code_name: &str, quantity: u32) -> Result<(), StoreError> {
        self.port
            .update_many(
                Collection::ConsumableItems,
                &Filter::all().eq(field::CODE_NAME, code_name),
                &Update::new().set(field::QUANTITY, quantity),
                false,
            )
            .await?;
        Ok(())
    }

    /// Manufacturing recipes, optionally restricted to one application area.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn manufacturables(
        &self,
        application: Option<Application>,
    ) -> Result<Vec<ManufacturableItem>, StoreError> {
        let filter = match application {
            Some(application) => Filter::all().eq(field::APPLICATION, application.as_str()),
            None => Filter::all(),
        };
        self.load(Collection::ManufacturableItems, &filter).await
    }

    /// Look up a recipe by item name.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn manufacturable(&self, item_name: &str) -> Result<Option<ManufacturableItem>, StoreError> {
        self.load_one(
            Collection::ManufacturableItems,
            &Filter::all().eq(field::ITEM_NAME, item_name),
        )
        .await
    }

    /// Every ledger record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn ledger(&self) -> Result<Vec<RecycledMaterialRecord>, StoreError> {
        self.load(Collection::RecycledMaterials, &Filter::all()).await
    }

    /// Append one ledger record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn append_ledger(&self, record: &RecycledMaterialRecord) -> Result<(), StoreError> {
        self.insert(Collection::RecycledMaterials, std::slice::from_ref(record))
            .await?;
        Ok(())
    }

    /// Every monthly summary.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn monthly_summaries(&self) -> Result<Vec<MonthlySummary>, StoreError> {
        self.load(Collection::MonthlySummaries, &Filter::all()).await
    }

    /// Insert or overwrite the summary for its month and year.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when encoding or the backend request fails.
    pub async fn upsert_monthly(&self, summary: &MonthlySummary) -> Result<bool, StoreError> {
        let mut update = Update::new();
        for (name, value) in encode(summary)? {
            update = update.set(&name, value);
        }
        let outcome = self
            .port
            .update_many(
                Collection::MonthlySummaries,
                &month_filter(&summary.month, summary.year),
                &update,
                true,
            )
            .await?;
        Ok(outcome.upserted)
    }

    /// Add kilograms per category to one month's collected or recycled totals.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend request fails.
    pub async fn add_to_month(
        &self,
        month: &str,
        year: i32,
        tally: Tally,
        weights: impl IntoIterator<Item = (ItemCategory, f64)>,
    ) -> Result<(), StoreError> {
        let update = weights
            .into_iter()
            .fold(Update::new(), |update, (category, kg)| {
                update.inc(MonthlySummary::field(category, tally), kg)
            });
        if update.is_empty() {
            return Ok(());
        }
        self.port
            .update_many(
                Collection::MonthlySummaries,
                &month_filter(month, year),
                &update,
                true,
            )
            .await?;
        Ok(())
    }
}

fn month_filter(month: &str, year: i32) -> Filter {
    Filter::all()
        .eq(field::MONTH, month)
        .eq(field::YEAR, year)
}

fn decode<T: DeserializeOwned>(collection: Collection, document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|source| StoreError::Decode { collection, source })
}

/// Encode a typed document.
///
/// # Errors
///
/// Returns [`StoreError::Internal`] when the value does not serialize to a JSON object.
pub fn encode<T: Serialize>(item: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(item) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StoreError::Internal(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(err) => Err(StoreError::Internal(format!("encoding failed: {err}"))),
    }
}
