//! High-level service facade implementing every habitat operation.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::balance::{self, Availability, Catalogue, RecycleYield};
use crate::model::{
    Application, BinId, BinMobility, BinStatus, ConsumableItem, HabitatModule, ItemCategory,
    ManufacturableItem, Materials, MonthlySummary, NewTrashItem, RecycledMaterialRecord,
    SmartBin, Tally, TrashId, TrashItem, TrashSummary, TrashUpdate,
};
use crate::ports::{Collection, StoreError, StoreMeta, Update};
use crate::store::{HabitatStore, field};

#[derive(thiserror::Error, Debug)]
/// Errors returned by service operations.
pub enum ServiceError {
    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A referenced document does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of document, e.g. `bin`.
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// Not enough stock to convert the requested quantity.
    #[error("{code_name} is out of stock ({available} left, {requested} requested)")]
    OutOfStock {
        /// Consumable code.
        code_name: String,
        /// Units in stock.
        available: u32,
        /// Units requested.
        requested: u32,
    },
    /// Quantities must be positive.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    /// Only indoor bins can move between modules.
    #[error("Bin {0} is not an indoor bin and cannot be reassigned")]
    NotAssignable(BinId),
    /// There is no in-station bin to receive trash.
    #[error("No in-station bin available")]
    NoInstationBin,
    /// In-station bins cannot be dumped into another in-station bin.
    #[error("Bin {0} is already an in-station bin")]
    InvalidSource(BinId),
    /// A recycling request selected no trash.
    #[error("No trash items selected")]
    EmptySelection,
    /// None of the selected trash can be recycled with the requested process.
    #[error("None of the selected items can be recycled")]
    NothingRecyclable,
    /// The ledger does not hold enough material for the recipe.
    #[error("Not enough materials to manufacture {item}")]
    InsufficientMaterials {
        /// Item that was requested.
        item: String,
        /// Shortfall per material.
        missing: Materials,
    },
    /// A recipe without requirements or with a non-positive requirement.
    #[error("Recipe for {item} is invalid: {reason}")]
    InvalidRecipe {
        /// Item the recipe builds.
        item: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A document with the same key already exists.
    #[error("{kind} already exists: {id}")]
    Duplicate {
        /// Kind of document.
        kind: &'static str,
        /// Conflicting key.
        id: String,
    },
}

fn check_recipe(item: &ManufacturableItem) -> Result<(), ServiceError> {
    match balance::recipe_defect(item) {
        Some(reason) => Err(ServiceError::InvalidRecipe {
            item: item.item_name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

fn not_found(kind: &'static str, id: impl ToString) -> ServiceError {
    ServiceError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of turning a consumable into trash.
pub struct ConversionOutcome {
    /// Trash entry that received the item.
    pub trash_item: TrashItem,
    /// Bin after the fill update.
    pub bin: SmartBin,
    /// Units of the consumable left in stock.
    pub remaining_stock: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of emptying a bin into the recycling station.
pub struct DumpOutcome {
    /// Bin that was emptied.
    pub source_bin_id: BinId,
    /// In-station bin that received the trash.
    pub target_bin_id: BinId,
    /// Number of trash entries moved.
    pub moved_items: u64,
    /// Kilograms moved.
    pub moved_weight: f64,
    /// Human-readable summary.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of recycling a selection of trash.
pub struct RecyclingOutcome {
    /// Ledger process type the materials were booked under.
    pub process_type: String,
    /// Materials produced and the items involved.
    #[serde(flatten)]
    pub recycled: RecycleYield,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of manufacturing one item.
pub struct ManufactureOutcome {
    /// Item that was built.
    pub item_name: String,
    /// Materials taken from the ledger.
    pub consumed: Materials,
    /// Materials left afterwards.
    pub remaining: Materials,
}

/// Public entry point for every habitat operation.
pub struct JezeroService {
    store: HabitatStore,
    write_gate: Mutex<()>,
}

impl JezeroService {
    /// Create a new service bound to the provided store.
    #[must_use]
    pub fn new(store: HabitatStore) -> Self {
        Self {
            store,
            write_gate: Mutex::new(()),
        }
    }

    /// Metadata of the backing store.
    #[must_use]
    pub fn store_meta(&self) -> &StoreMeta {
        self.store.meta()
    }

    /// Typed store access, used by seeding.
    #[must_use]
    pub fn store(&self) -> &HabitatStore {
        &self.store
    }

    /// List bins, optionally only those of one module, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_smart_bins(&self, module: Option<HabitatModule>) -> Result<Vec<SmartBin>, ServiceError> {
        let mut bins = self.store.bins(module).await?;
        bins.sort_by(|left, right| left.bin_id.cmp(&right.bin_id));
        Ok(bins)
    }

    /// Load one bin.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown bins.
    pub async fn get_smart_bin(&self, bin_id: &BinId) -> Result<SmartBin, ServiceError> {
        self.store
            .bin(bin_id)
            .await?
            .ok_or_else(|| not_found("bin", bin_id))
    }

    /// List bins that are not placed in any module.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_unassigned_bins(&self) -> Result<Vec<SmartBin>, ServiceError> {
        let mut bins = self.store.unassigned_bins().await?;
        bins.sort_by(|left, right| left.bin_id.cmp(&right.bin_id));
        Ok(bins)
    }

    /// List all trash, or the trash of one bin.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_trash_items(&self, bin_id: Option<&BinId>) -> Result<Vec<TrashItem>, ServiceError> {
        Ok(self.store.trash(bin_id).await?)
    }

    /// List the trash of one bin.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_trash_items_by_bin(&self, bin_id: &BinId) -> Result<Vec<TrashItem>, ServiceError> {
        Ok(self.store.trash(Some(bin_id)).await?)
    }

    /// Put new trash into a bin and add its weight to the bin.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidQuantity`] for a zero quantity and
    /// [`ServiceError::NotFound`] when the bin does not exist.
    pub async fn insert_trash_item(&self, request: NewTrashItem) -> Result<TrashItem, ServiceError> {
        if request.quantity == 0 {
            return Err(ServiceError::InvalidQuantity);
        }
        let _guard = self.write_gate.lock().await;

        let bin = self.get_smart_bin(&request.bin_id).await?;
        let consumable = self.store.consumable(&request.code_name).await?;
        if consumable.is_none() {
            warn!(code_name = %request.code_name, "inserting trash with an uncatalogued code");
        }

        let item = TrashItem::new(request.bin_id, request.code_name, request.quantity);
        self.store
            .insert(Collection::TrashItems, std::slice::from_ref(&item))
            .await?;

        let weight = item.total_weight(consumable.as_ref());
        self.add_fill(bin, weight).await?;

        info!(trash_id = %item.trash_id, bin_id = %item.bin_id, "inserted trash item");
        Ok(item)
    }

    /// Move a trash item to another bin and/or change its quantity, keeping bin fills in step.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown items or bins and
    /// [`ServiceError::InvalidQuantity`] for a zero quantity.
    pub async fn update_trash_item(
        &self,
        trash_id: &TrashId,
        update: TrashUpdate,
    ) -> Result<TrashItem, ServiceError> {
        if update.quantity == Some(0) {
            return Err(ServiceError::InvalidQuantity);
        }
        let _guard = self.write_gate.lock().await;

        let current = self
            .store
            .trash_item(trash_id)
            .await?
            .ok_or_else(|| not_found("trash item", trash_id))?;
        let consumable = self.store.consumable(&current.code_name).await?;

        let mut updated = current.clone();
        let mut changes = Update::new();
        if let Some(quantity) = update.quantity {
            updated.set_quantity(quantity);
            changes = changes.set(field::QUANTITY, quantity);
            if consumable.is_none()
                && let Some(weight) = updated.weight
            {
                changes = changes.set(field::WEIGHT, weight);
            }
        }
        if let Some(bin_id) = update.bin_id {
            updated.bin_id = bin_id;
            changes = changes.set(field::BIN_ID, updated.bin_id.0.as_str());
        }
        if changes.is_empty() {
            return Ok(current);
        }

        let source = self.get_smart_bin(&current.bin_id).await;
        let target = self.get_smart_bin(&updated.bin_id).await?;
        self.store.update_trash(trash_id, &changes).await?;

        let old_weight = current.total_weight(consumable.as_ref());
        let new_weight = updated.total_weight(consumable.as_ref());
        if current.bin_id == updated.bin_id {
            self.add_fill(target, new_weight - old_weight).await?;
        } else {
            match source {
                Ok(source) => {
                    self.add_fill(source, -old_weight).await?;
                }
                Err(err) => warn!(error = %err, "trash item was in a missing bin"),
            }
            self.add_fill(target, new_weight).await?;
        }

        info!(%trash_id, bin_id = %updated.bin_id, quantity = updated.quantity, "updated trash item");
        Ok(updated)
    }

    /// Place an indoor bin in a module.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown bins and
    /// [`ServiceError::NotAssignable`] for bins that are not indoor bins.
    pub async fn assign_bin_to_module(
        &self,
        bin_id: &BinId,
        module: HabitatModule,
    ) -> Result<SmartBin, ServiceError> {
        let _guard = self.write_gate.lock().await;

        let mut bin = self.get_smart_bin(bin_id).await?;
        if !bin.is_assignable() {
            return Err(ServiceError::NotAssignable(bin.bin_id));
        }
        self.store.set_module(bin_id, module).await?;
        bin.module_name = Some(module);

        info!(%bin_id, %module, "assigned bin to module");
        Ok(bin)
    }

    /// The consumable catalogue, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_consumable_items(&self) -> Result<Vec<ConsumableItem>, ServiceError> {
        let mut items = self.store.consumables().await?;
        items.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(items)
    }

    /// Use up `quantity` units of a consumable and throw them into a bin.
    ///
    /// The units join an existing trash entry with the same code in that bin, or form a
    /// new entry. Stock is decremented and the bin fill grows by the discarded weight.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown consumables or bins,
    /// [`ServiceError::InvalidQuantity`] for a zero quantity and
    /// [`ServiceError::OutOfStock`] when the stock is too low.
    pub async fn convert_consumable_to_trash(
        &self,
        code_name: &str,
        bin_id: &BinId,
        quantity: u32,
    ) -> Result<ConversionOutcome, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::InvalidQuantity);
        }
        let _guard = self.write_gate.lock().await;

        let consumable = self
            .store
            .consumable(code_name)
            .await?
            .ok_or_else(|| not_found("consumable item", code_name))?;
        if consumable.quantity < quantity {
            return Err(ServiceError::OutOfStock {
                code_name: code_name.to_owned(),
                available: consumable.quantity,
                requested: quantity,
            });
        }
        let bin = self.get_smart_bin(bin_id).await?;

        let remaining_stock = consumable.quantity - quantity;
        self.store.set_stock(code_name, remaining_stock).await?;

        let existing = self
            .store
            .trash(Some(bin_id))
            .await?
            .into_iter()
            .find(|item| item.code_name == code_name);
        let trash_item = match existing {
            Some(mut item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                self.store
                    .update_trash(&item.trash_id, &Update::new().set(field::QUANTITY, item.quantity))
                    .await?;
                item
            }
            None => {
                let item = TrashItem::new(bin_id.clone(), code_name, quantity);
                self.store
                    .insert(Collection::TrashItems, std::slice::from_ref(&item))
                    .await?;
                item
            }
        };

        let added = consumable.weight_kg * f64::from(quantity);
        let bin = self.add_fill(bin, added).await?;

        info!(%code_name, %bin_id, quantity, remaining_stock, "converted consumable to trash");
        Ok(ConversionOutcome {
            trash_item,
            bin,
            remaining_stock,
        })
    }

    /// Aggregate the trash of every bin in a module.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_trash_summary_by_module(
        &self,
        module: HabitatModule,
    ) -> Result<TrashSummary, ServiceError> {
        let bins = self.store.bins(Some(module)).await?;
        let bin_ids = bins.iter().map(|bin| bin.bin_id.clone()).collect::<Vec<_>>();
        let trash = self.store.trash_in_bins(&bin_ids).await?;
        let consumables = self.store.consumables().await?;
        let catalogue = Catalogue::new(&consumables);

        let mut category_weights = ItemCategory::ALL
            .iter()
            .map(|category| (*category, 0.0))
            .collect::<BTreeMap<_, _>>();
        let mut total_items = 0_u64;
        let mut total_weight = 0.0;

        for item in &trash {
            let consumable = catalogue.get(&item.code_name);
            total_items += u64::from(item.quantity);

            let weight = item.total_weight(consumable);
            total_weight += weight;
            match item.resolved_category(consumable) {
                Some(category) => *category_weights.entry(category).or_insert(0.0) += weight,
                None => warn!(trash_id = %item.trash_id, code_name = %item.code_name, "trash item has no category"),
            }
        }

        Ok(TrashSummary {
            bin_count: bins.len(),
            total_items,
            total_weight,
            category_weights,
        })
    }

    /// Empty a bin into the least-filled in-station bin.
    ///
    /// Every trash entry moves to the in-station bin, the in-station bin takes over the
    /// source bin's fill weight, and the moved weight counts as collected this month.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown bins,
    /// [`ServiceError::InvalidSource`] when the source is itself an in-station bin and
    /// [`ServiceError::NoInstationBin`] when there is nowhere to dump to.
    pub async fn dump_bin_to_instation(&self, source_bin_id: &BinId) -> Result<DumpOutcome, ServiceError> {
        let _guard = self.write_gate.lock().await;

        let source = self.get_smart_bin(source_bin_id).await?;
        if source.mobility == BinMobility::Instation {
            return Err(ServiceError::InvalidSource(source.bin_id));
        }
        let target = self
            .store
            .bins_with_mobility(BinMobility::Instation)
            .await?
            .into_iter()
            .min_by(|left, right| left.filled_percentage.total_cmp(&right.filled_percentage))
            .ok_or(ServiceError::NoInstationBin)?;

        let trash = self.store.trash(Some(source_bin_id)).await?;
        let consumables = self.store.consumables().await?;
        let catalogue = Catalogue::new(&consumables);
        let mut collected = BTreeMap::<ItemCategory, f64>::new();
        for item in &trash {
            let consumable = catalogue.get(&item.code_name);
            if let Some(category) = item.resolved_category(consumable) {
                *collected.entry(category).or_insert(0.0) += item.total_weight(consumable);
            }
        }

        let moved_items = self.store.move_trash(source_bin_id, &target.bin_id).await?;
        let moved_weight = source.filled_kg;
        let target_bin_id = target.bin_id.clone();
        self.add_fill(target, moved_weight).await?;
        self.store.save_fill(&source.with_fill(0.0)).await?;
        self.record_month(Tally::Collected, collected).await?;

        let message = format!(
            "Moved {moved_items} item(s), {moved_weight:.1} kg from {source_bin_id} to {target_bin_id}"
        );
        info!(%source_bin_id, %target_bin_id, moved_items, moved_weight, "dumped bin to in-station bin");
        Ok(DumpOutcome {
            source_bin_id: source_bin_id.clone(),
            target_bin_id,
            moved_items,
            moved_weight,
            message,
        })
    }

    /// Manufacturing recipes, optionally restricted to one application area.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_manufacturable_items(
        &self,
        application: Option<Application>,
    ) -> Result<Vec<ManufacturableItem>, ServiceError> {
        let mut items = self.store.manufacturables(application).await?;
        items.sort_by(|left, right| left.item_name.cmp(&right.item_name));
        Ok(items)
    }

    /// Add a manufacturing recipe.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRecipe`] when a requirement is missing or not a
    /// positive amount and [`ServiceError::Duplicate`] when an item with the same name
    /// exists.
    pub async fn insert_manufacturable_item(
        &self,
        item: ManufacturableItem,
    ) -> Result<ManufacturableItem, ServiceError> {
        check_recipe(&item)?;
        let _guard = self.write_gate.lock().await;

        if self.store.manufacturable(&item.item_name).await?.is_some() {
            return Err(ServiceError::Duplicate {
                kind: "manufacturable item",
                id: item.item_name,
            });
        }
        self.store
            .insert(Collection::ManufacturableItems, std::slice::from_ref(&item))
            .await?;

        info!(item_name = %item.item_name, "inserted manufacturable item");
        Ok(item)
    }

    /// Assess every recipe against the available materials.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_manufacturing_availability(
        &self,
        application: Option<Application>,
    ) -> Result<Vec<Availability>, ServiceError> {
        let available = self.get_available_materials().await?;
        let items = self.get_manufacturable_items(application).await?;
        Ok(items
            .iter()
            .map(|item| balance::assess(item, &available))
            .collect())
    }

    /// Monthly summaries in chronological order.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_monthly_summary(&self) -> Result<Vec<MonthlySummary>, ServiceError> {
        let mut summaries = self.store.monthly_summaries().await?;
        summaries.sort_by_key(|summary| (summary.year, summary.month_number()));
        Ok(summaries)
    }

    /// Insert or replace the summary for a month. Returns whether a new summary was created.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn insert_monthly_summary(&self, summary: &MonthlySummary) -> Result<bool, ServiceError> {
        let _guard = self.write_gate.lock().await;
        let created = self.store.upsert_monthly(summary).await?;
        info!(month = %summary.month, year = summary.year, created, "stored monthly summary");
        Ok(created)
    }

    /// Recycle selected trash into raw materials.
    ///
    /// The yield is appended to the ledger, recycled items leave their bins, bin fills
    /// shrink accordingly and the input weight counts as recycled this month. Items that
    /// cannot be recycled with the requested process stay where they are.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EmptySelection`] for an empty selection,
    /// [`ServiceError::NotFound`] when a selected item does not exist and
    /// [`ServiceError::NothingRecyclable`] when no selected item can be recycled.
    pub async fn process_trash_for_recycling(
        &self,
        trash_ids: &[TrashId],
        process: Option<&str>,
    ) -> Result<RecyclingOutcome, ServiceError> {
        if trash_ids.is_empty() {
            return Err(ServiceError::EmptySelection);
        }
        let _guard = self.write_gate.lock().await;

        let trash = self.store.trash_by_ids(trash_ids).await?;
        let found = trash.iter().map(|item| &item.trash_id).collect::<HashSet<_>>();
        if let Some(missing) = trash_ids.iter().find(|id| !found.contains(id)) {
            return Err(not_found("trash item", missing));
        }

        let consumables = self.store.consumables().await?;
        let catalogue = Catalogue::new(&consumables);
        let recycled = balance::recycle_yield(&trash, &catalogue, process);
        if recycled.processed.is_empty() {
            return Err(ServiceError::NothingRecyclable);
        }
        for skipped in &recycled.skipped {
            warn!(trash_id = %skipped, "trash item skipped during recycling");
        }

        let process_type = process.unwrap_or("MIXED").to_owned();
        self.store
            .append_ledger(&RecycledMaterialRecord {
                timestamp: Utc::now(),
                materials: recycled.materials.clone(),
                process_type: process_type.clone(),
            })
            .await?;
        self.store.delete_trash(&recycled.processed).await?;

        let processed = recycled.processed.iter().collect::<HashSet<_>>();
        let mut removed_per_bin = BTreeMap::<BinId, f64>::new();
        for item in trash.iter().filter(|item| processed.contains(&item.trash_id)) {
            *removed_per_bin.entry(item.bin_id.clone()).or_insert(0.0) +=
                item.total_weight(catalogue.get(&item.code_name));
        }
        for (bin_id, weight) in removed_per_bin {
            match self.store.bin(&bin_id).await? {
                Some(bin) => {
                    self.add_fill(bin, -weight).await?;
                }
                None => warn!(%bin_id, "recycled trash belonged to a missing bin"),
            }
        }
        self.record_month(Tally::Recycled, recycled.category_weights.clone())
            .await?;

        info!(
            processed = recycled.processed.len(),
            skipped = recycled.skipped.len(),
            total_weight = recycled.total_weight,
            %process_type,
            "recycled trash"
        );
        Ok(RecyclingOutcome {
            process_type,
            recycled,
        })
    }

    /// Build one item, withdrawing its raw materials from the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown recipes,
    /// [`ServiceError::InvalidRecipe`] for malformed stored recipes and
    /// [`ServiceError::InsufficientMaterials`] when the ledger cannot cover the recipe.
    pub async fn create_manufactured_item(&self, item_name: &str) -> Result<ManufactureOutcome, ServiceError> {
        let _guard = self.write_gate.lock().await;

        let item = self
            .store
            .manufacturable(item_name)
            .await?
            .ok_or_else(|| not_found("manufacturable item", item_name))?;
        check_recipe(&item)?;
        let available = balance::sum_ledger(&self.store.ledger().await?);
        let availability = balance::assess(&item, &available);
        if !availability.can_manufacture {
            return Err(ServiceError::InsufficientMaterials {
                item: item.item_name,
                missing: availability.missing_materials,
            });
        }

        let consumed = Materials::from(item.manufacture_process.raw_materials.clone());
        self.store
            .append_ledger(&RecycledMaterialRecord {
                timestamp: Utc::now(),
                materials: consumed.negated(),
                process_type: format!("MANUFACTURE:{}", item.manufacture_process.process),
            })
            .await?;

        let mut remaining = available;
        remaining.merge(&consumed.negated());
        info!(%item_name, "manufactured item");
        Ok(ManufactureOutcome {
            item_name: item.item_name,
            consumed,
            remaining: remaining.without_zeroes(),
        })
    }

    /// Raw materials currently on hand.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_available_materials(&self) -> Result<Materials, ServiceError> {
        Ok(balance::sum_ledger(&self.store.ledger().await?))
    }

    /// Fill status of every bin.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the store request fails.
    pub async fn get_bin_fullness_status(&self) -> Result<BTreeMap<BinId, BinStatus>, ServiceError> {
        let bins = self.store.bins(None).await?;
        let trash = self.store.trash(None).await?;

        let mut counts = BTreeMap::<&BinId, usize>::new();
        for item in &trash {
            *counts.entry(&item.bin_id).or_insert(0) += 1;
        }

        Ok(bins
            .iter()
            .map(|bin| {
                let status = BinStatus {
                    module_name: bin.module_name,
                    mobility: bin.mobility,
                    trash_count: counts.get(&bin.bin_id).copied().unwrap_or(0),
                    fullness_percentage: bin.filled_percentage,
                    level: bin.fill_level(),
                };
                (bin.bin_id.clone(), status)
            })
            .collect())
    }

    async fn add_fill(&self, bin: SmartBin, delta_kg: f64) -> Result<SmartBin, ServiceError> {
        let filled = bin.filled_kg + delta_kg;
        let bin = bin.with_fill(filled);
        self.store.save_fill(&bin).await?;
        Ok(bin)
    }

    async fn record_month(
        &self,
        tally: Tally,
        weights: BTreeMap<ItemCategory, f64>,
    ) -> Result<(), ServiceError> {
        let (month, year) = MonthlySummary::key_for(Utc::now());
        self.store.add_to_month(&month, year, tally, weights).await?;
        Ok(())
    }
}
