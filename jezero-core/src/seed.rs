//! Bundled fixtures used to populate an empty habitat database.

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::model::{
    ConsumableItem, ManufacturableItem, Materials, RecycledMaterialRecord, SmartBin, TrashItem,
};
use crate::ports::{Collection, StoreError};
use crate::store::HabitatStore;

const SMART_BINS: &str = include_str!("../fixtures/smartbins.json");
const CONSUMABLE_ITEMS: &str = include_str!("../fixtures/consumableitems.json");
const MANUFACTURABLE_ITEMS: &str = include_str!("../fixtures/manufacturableItems.json");
const TRASH_ITEMS: &str = include_str!("../fixtures/trashitems.json");

/// Process type of the ledger record created on first start.
pub const INITIAL_PROCESS: &str = "INITIAL";

/// Trash references bins and consumables, so it goes last.
const SEED_ORDER: [Collection; 5] = [
    Collection::SmartBins,
    Collection::ConsumableItems,
    Collection::ManufacturableItems,
    Collection::RecycledMaterials,
    Collection::TrashItems,
];

/// Raw materials on hand before anything has been recycled.
#[must_use]
pub fn initial_materials() -> Materials {
    [
        ("POLYETHYLENE", 5.0),
        ("ALUMINUM", 8.0),
        ("CARBON_FIBER", 3.0),
        ("POLYESTER", 4.0),
        ("COTTON", 3.5),
        ("PAPER", 5.0),
        ("POLYPROPYLENE", 4.5),
        ("NYLON", 3.0),
        ("CARBON", 2.0),
        ("POLYETHYLENE_FOAM", 3.0),
        ("ALUMINUM_FOIL", 2.5),
    ]
    .into_iter()
    .map(|(material, kg)| (material.to_owned(), kg))
    .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// What a seeding run did per collection.
pub struct SeedReport {
    /// Collections that were empty and received fixtures, with the number of documents.
    pub seeded: Vec<(Collection, usize)>,
    /// Collections left alone because they already held documents.
    pub existing: Vec<(Collection, u64)>,
    /// Collections that could not be seeded.
    pub failures: Vec<(Collection, String)>,
}

impl SeedReport {
    /// Whether every collection was either seeded or already populated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum SeedStep {
    Existing(u64),
    Inserted(usize),
}

/// Populate every empty collection from the bundled fixtures.
///
/// A failure in one collection is logged and reported; the remaining collections are
/// still attempted.
pub async fn seed(store: &HabitatStore) -> SeedReport {
    let mut report = SeedReport::default();

    for collection in SEED_ORDER {
        match seed_collection(store, collection).await {
            Ok(SeedStep::Existing(count)) => {
                info!(%collection, count, "collection already populated");
                report.existing.push((collection, count));
            }
            Ok(SeedStep::Inserted(count)) => {
                info!(%collection, count, "seeded collection");
                report.seeded.push((collection, count));
            }
            Err(err) => {
                warn!(%collection, error = %err, "failed to seed collection");
                report.failures.push((collection, err.to_string()));
            }
        }
    }

    report
}

async fn seed_collection(store: &HabitatStore, collection: Collection) -> Result<SeedStep, StoreError> {
    let existing = store.count(collection).await?;
    if existing > 0 {
        return Ok(SeedStep::Existing(existing));
    }

    let inserted = match collection {
        Collection::SmartBins => {
            store
                .insert(collection, &fixture::<SmartBin>(collection, SMART_BINS)?)
                .await?
        }
        Collection::ConsumableItems => {
            store
                .insert(collection, &fixture::<ConsumableItem>(collection, CONSUMABLE_ITEMS)?)
                .await?
        }
        Collection::ManufacturableItems => {
            store
                .insert(
                    collection,
                    &fixture::<ManufacturableItem>(collection, MANUFACTURABLE_ITEMS)?,
                )
                .await?
        }
        Collection::TrashItems => {
            store
                .insert(collection, &fixture::<TrashItem>(collection, TRASH_ITEMS)?)
                .await?
        }
        Collection::RecycledMaterials => {
            let record = RecycledMaterialRecord {
                timestamp: Utc::now(),
                materials: initial_materials(),
                process_type: INITIAL_PROCESS.to_owned(),
            };
            store.insert(collection, &[record]).await?
        }
        Collection::MonthlySummaries => 0,
    };

    Ok(SeedStep::Inserted(inserted))
}

fn fixture<T: DeserializeOwned>(collection: Collection, raw: &str) -> Result<Vec<T>, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Decode { collection, source })
}
