//! Domain documents for habitat modules, smart bins, trash, and the material ledger.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Month, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

const MATERIAL_EPSILON: f64 = 1e-9;

/// Habitat modules of the Jezero base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HabitatModule {
    /// Crew quarters.
    LivingSpaceModule,
    /// Storage and supplies.
    StorageModule,
    /// Medical bay.
    SurgicalModule,
    /// Science laboratory.
    LabModule,
    /// Recycling station hosting the in-station bins.
    RecyclingModule,
    /// Greenhouse.
    PlantationModule,
}

impl HabitatModule {
    /// Every module, in display order.
    pub const ALL: [Self; 6] = [
        Self::LivingSpaceModule,
        Self::StorageModule,
        Self::SurgicalModule,
        Self::LabModule,
        Self::RecyclingModule,
        Self::PlantationModule,
    ];

    /// Document value stored in `moduleName`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LivingSpaceModule => "LivingSpaceModule",
            Self::StorageModule => "StorageModule",
            Self::SurgicalModule => "SurgicalModule",
            Self::LabModule => "LabModule",
            Self::RecyclingModule => "RecyclingModule",
            Self::PlantationModule => "PlantationModule",
        }
    }

    /// Human-friendly name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::LivingSpaceModule => "Living Space",
            Self::StorageModule => "Storage",
            Self::SurgicalModule => "Surgical",
            Self::LabModule => "Laboratory",
            Self::RecyclingModule => "Recycling Station",
            Self::PlantationModule => "Plantation",
        }
    }
}

impl fmt::Display for HabitatModule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Where a bin lives and whether it can be moved between modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinMobility {
    /// Movable bin inside a habitat module.
    Indoor,
    /// Large collection bin outside the habitat.
    Outdoor,
    /// Fixed collection point inside the recycling station.
    Instation,
}

impl BinMobility {
    /// Document value stored in `mobility`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indoor => "INDOOR",
            Self::Outdoor => "OUTDOOR",
            Self::Instation => "INSTATION",
        }
    }
}

impl fmt::Display for BinMobility {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Material category of a consumable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    /// Textiles.
    Fabric,
    /// Plastics and other polymers. Older trash documents call this `PLASTIC`.
    #[serde(alias = "PLASTIC")]
    Polymer,
    /// Glass.
    Glass,
    /// Metals.
    Metal,
    /// Composites such as carbon fibre panels.
    Composite,
    /// Paper and cardboard.
    Paper,
}

impl ItemCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 6] = [
        Self::Fabric,
        Self::Polymer,
        Self::Glass,
        Self::Metal,
        Self::Composite,
        Self::Paper,
    ];

    /// Human-friendly name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Fabric => "Fabric",
            Self::Polymer => "Polymer",
            Self::Glass => "Glass",
            Self::Metal => "Metal",
            Self::Composite => "Composite",
            Self::Paper => "Paper",
        }
    }
}

/// Application area of a manufacturable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Application {
    /// Repairs and habitat upgrades.
    Renovation,
    /// Festivities and crew morale.
    Celebration,
    /// Science and exploration equipment.
    Discovery,
}

impl Application {
    /// Every application area.
    pub const ALL: [Self; 3] = [Self::Renovation, Self::Celebration, Self::Discovery];

    /// Document value stored in `application`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Renovation => "RENOVATION",
            Self::Celebration => "CELEBRATION",
            Self::Discovery => "DISCOVERY",
        }
    }
}

/// Traffic-light classification of a bin's fill percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillLevel {
    /// Up to 75 %.
    Good,
    /// Above 75 % up to 90 %.
    Attention,
    /// Above 90 %.
    Critical,
}

impl FillLevel {
    /// Classify a fill percentage.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > 90.0 {
            Self::Critical
        } else if percentage > 75.0 {
            Self::Attention
        } else {
            Self::Good
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier of a smart bin.
pub struct BinId(pub String);

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for BinId {
    fn from(raw: &str) -> Self {
        BinId(raw.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier of a trash item.
pub struct TrashId(pub String);

impl TrashId {
    /// Generate a fresh, collision-free identifier.
    #[must_use]
    pub fn generate() -> Self {
        TrashId(format!("TRASH-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for TrashId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for TrashId {
    fn from(raw: &str) -> Self {
        TrashId(raw.to_owned())
    }
}

fn default_capacity() -> f64 {
    100.0
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A simulated receptacle tracked by fill level and location.
pub struct SmartBin {
    /// Unique identifier.
    pub bin_id: BinId,
    /// Module the bin is placed in; `None` for unassigned and outdoor bins.
    #[serde(default)]
    pub module_name: Option<HabitatModule>,
    /// Mobility tag. Older documents store it as `binType`.
    #[serde(alias = "binType")]
    pub mobility: BinMobility,
    /// Capacity in kilograms.
    #[serde(rename = "totalWeight", default = "default_capacity")]
    pub capacity_kg: f64,
    /// Current content in kilograms.
    #[serde(rename = "filledWeight", default)]
    pub filled_kg: f64,
    /// Fill level in percent of capacity.
    #[serde(default)]
    pub filled_percentage: f64,
}

impl SmartBin {
    /// Return the bin with its content set to `filled_kg` and the percentage recomputed.
    #[must_use]
    pub fn with_fill(mut self, filled_kg: f64) -> Self {
        self.filled_kg = filled_kg.max(0.0);
        self.filled_percentage = fill_percentage(self.filled_kg, self.capacity_kg);
        self
    }

    /// Traffic-light classification of the current fill level.
    #[must_use]
    pub fn fill_level(&self) -> FillLevel {
        FillLevel::from_percentage(self.filled_percentage)
    }

    /// Only indoor bins can be carried to another module.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.mobility == BinMobility::Indoor
    }
}

/// Fill percentage rounded to one decimal and clamped to `0..=100`.
#[must_use]
pub fn fill_percentage(filled_kg: f64, capacity_kg: f64) -> f64 {
    if capacity_kg <= 0.0 {
        return if filled_kg > 0.0 { 100.0 } else { 0.0 };
    }
    let percentage = (filled_kg / capacity_kg * 1000.0).round() / 10.0;
    percentage.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Discarded consumable sitting in a bin.
pub struct TrashItem {
    /// Unique identifier.
    pub trash_id: TrashId,
    /// Bin currently holding the item.
    pub bin_id: BinId,
    /// Code of the consumable this trash came from.
    pub code_name: String,
    /// Number of discarded units.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Total weight recorded by the legacy schema, used when the code is not catalogued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Category recorded by the legacy schema, used when the code is not catalogued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ItemCategory>,
}

impl TrashItem {
    /// Create a new trash entry with a generated identifier.
    #[must_use]
    pub fn new(bin_id: BinId, code_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            trash_id: TrashId::generate(),
            bin_id,
            code_name: code_name.into(),
            quantity,
            weight: None,
            category: None,
        }
    }

    /// Total weight of the entry, preferring the catalogue unit weight.
    #[must_use]
    pub fn total_weight(&self, consumable: Option<&ConsumableItem>) -> f64 {
        match consumable {
            Some(item) => item.weight_kg * f64::from(self.quantity),
            None => self.weight.unwrap_or(0.0),
        }
    }

    /// Change the number of units.
    ///
    /// A legacy recorded weight covers the whole entry, so it is scaled with the quantity.
    pub fn set_quantity(&mut self, quantity: u32) {
        if let Some(weight) = self.weight {
            let per_unit = weight / f64::from(self.quantity.max(1));
            self.weight = Some(per_unit * f64::from(quantity));
        }
        self.quantity = quantity;
    }

    /// Category of the entry, preferring the catalogue category.
    #[must_use]
    pub fn resolved_category(&self, consumable: Option<&ConsumableItem>) -> Option<ItemCategory> {
        consumable.map(|item| item.category).or(self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One recycling step: a named process and the material ratios it yields per kilogram.
pub struct RecycleStep {
    /// Process name, e.g. `MECHANICAL_SHREDDING`.
    pub process: String,
    /// Output material -> kilograms produced per kilogram of input.
    #[serde(default)]
    pub output_materials: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(steps) => steps,
        OneOrMany::One(step) => vec![step],
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Stock item that becomes trash once used.
pub struct ConsumableItem {
    /// Display name.
    pub name: String,
    /// Unique code, referenced by trash items.
    pub code_name: String,
    /// Material category.
    pub category: ItemCategory,
    /// Units left in stock.
    pub quantity: u32,
    /// Weight of one unit in kilograms.
    #[serde(rename = "weight_kg")]
    pub weight_kg: f64,
    /// Recycling steps. Stored either as a single step or as a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub recycle_process: Vec<RecycleStep>,
}

impl ConsumableItem {
    /// Names of all processes this item can be recycled with.
    pub fn processes(&self) -> impl Iterator<Item = &str> {
        self.recycle_process.iter().map(|step| step.process.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Manufacturing recipe of an item.
pub struct ManufactureProcess {
    /// Process name, e.g. `THREE_D_PRINTING`.
    pub process: String,
    /// Required raw material -> kilograms per produced item.
    #[serde(default)]
    pub raw_materials: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Product that can be built from recycled raw materials.
pub struct ManufacturableItem {
    /// Unique name.
    pub item_name: String,
    /// Recipe.
    pub manufacture_process: ManufactureProcess,
    /// Target application area.
    pub application: Application,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
/// Raw material name -> kilograms.
pub struct Materials(BTreeMap<String, f64>);

impl Materials {
    /// Empty material map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity of a material, zero when absent.
    #[must_use]
    pub fn get(&self, material: &str) -> f64 {
        self.0.get(material).copied().unwrap_or(0.0)
    }

    /// Add `kg` of a material (negative values withdraw).
    pub fn add(&mut self, material: &str, kg: f64) {
        *self.0.entry(material.to_owned()).or_insert(0.0) += kg;
    }

    /// Add every entry of `other`.
    pub fn merge(&mut self, other: &Materials) {
        for (material, kg) in &other.0 {
            self.add(material, *kg);
        }
    }

    /// Copy with every quantity negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        self.0
            .iter()
            .map(|(material, kg)| (material.clone(), -kg))
            .collect()
    }

    /// Drop entries that cancelled out to (almost) zero.
    #[must_use]
    pub fn without_zeroes(self) -> Self {
        self.0
            .into_iter()
            .filter(|(_, kg)| kg.abs() >= MATERIAL_EPSILON)
            .collect()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Iterate materials in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(material, kg)| (material.as_str(), *kg))
    }

    /// Number of materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for Materials {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut materials = Materials::new();
        for (material, kg) in iter {
            materials.add(&material, kg);
        }
        materials
    }
}

impl From<BTreeMap<String, f64>> for Materials {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Materials(map)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Entry of the recycled-material ledger.
pub struct RecycledMaterialRecord {
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Materials added (positive) or consumed (negative).
    pub materials: Materials,
    /// What produced the entry: `INITIAL`, a recycle process, or `MANUFACTURE:<process>`.
    pub process_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Collected and recycled kilograms per category for one month.
pub struct MonthlySummary {
    /// English month name, e.g. `October`.
    pub month: String,
    /// Calendar year.
    pub year: i32,
    /// Fabric kilograms collected.
    #[serde(default)]
    pub total_fabric_collected: f64,
    /// Plastic kilograms collected.
    #[serde(default)]
    pub total_plastic_collected: f64,
    /// Glass kilograms collected.
    #[serde(default)]
    pub total_glass_collected: f64,
    /// Metal kilograms collected.
    #[serde(default)]
    pub total_metal_collected: f64,
    /// Paper kilograms collected.
    #[serde(default)]
    pub total_paper_collected: f64,
    /// Composite kilograms collected.
    #[serde(default)]
    pub total_composite_collected: f64,
    /// Fabric kilograms recycled.
    #[serde(default)]
    pub total_fabric_recycled: f64,
    /// Plastic kilograms recycled.
    #[serde(default)]
    pub total_plastic_recycled: f64,
    /// Glass kilograms recycled.
    #[serde(default)]
    pub total_glass_recycled: f64,
    /// Metal kilograms recycled.
    #[serde(default)]
    pub total_metal_recycled: f64,
    /// Paper kilograms recycled.
    #[serde(default)]
    pub total_paper_recycled: f64,
    /// Composite kilograms recycled.
    #[serde(default)]
    pub total_composite_recycled: f64,
}

/// Which side of the monthly summary a quantity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    /// Trash delivered to the recycling station.
    Collected,
    /// Trash turned into raw materials.
    Recycled,
}

impl MonthlySummary {
    /// Zeroed summary for a month.
    #[must_use]
    pub fn empty(month: impl Into<String>, year: i32) -> Self {
        Self {
            month: month.into(),
            year,
            total_fabric_collected: 0.0,
            total_plastic_collected: 0.0,
            total_glass_collected: 0.0,
            total_metal_collected: 0.0,
            total_paper_collected: 0.0,
            total_composite_collected: 0.0,
            total_fabric_recycled: 0.0,
            total_plastic_recycled: 0.0,
            total_glass_recycled: 0.0,
            total_metal_recycled: 0.0,
            total_paper_recycled: 0.0,
            total_composite_recycled: 0.0,
        }
    }

    /// Month name and year a timestamp falls into.
    #[must_use]
    pub fn key_for(timestamp: DateTime<Utc>) -> (String, i32) {
        let month = u8::try_from(timestamp.month())
            .ok()
            .and_then(|number| Month::try_from(number).ok())
            .map_or("January", |month| month.name());
        (month.to_owned(), timestamp.year())
    }

    /// Month number (1-12), or 0 when the month name is not recognised.
    #[must_use]
    pub fn month_number(&self) -> u32 {
        Month::from_str(&self.month).map_or(0, |month| month.number_from_month())
    }

    /// Document field holding the given tally for a category.
    #[must_use]
    pub fn field(category: ItemCategory, tally: Tally) -> &'static str {
        match (category, tally) {
            (ItemCategory::Fabric, Tally::Collected) => "totalFabricCollected",
            (ItemCategory::Polymer, Tally::Collected) => "totalPlasticCollected",
            (ItemCategory::Glass, Tally::Collected) => "totalGlassCollected",
            (ItemCategory::Metal, Tally::Collected) => "totalMetalCollected",
            (ItemCategory::Paper, Tally::Collected) => "totalPaperCollected",
            (ItemCategory::Composite, Tally::Collected) => "totalCompositeCollected",
            (ItemCategory::Fabric, Tally::Recycled) => "totalFabricRecycled",
            (ItemCategory::Polymer, Tally::Recycled) => "totalPlasticRecycled",
            (ItemCategory::Glass, Tally::Recycled) => "totalGlassRecycled",
            (ItemCategory::Metal, Tally::Recycled) => "totalMetalRecycled",
            (ItemCategory::Paper, Tally::Recycled) => "totalPaperRecycled",
            (ItemCategory::Composite, Tally::Recycled) => "totalCompositeRecycled",
        }
    }

    /// Kilograms recorded for a category.
    #[must_use]
    pub fn get(&self, category: ItemCategory, tally: Tally) -> f64 {
        match (category, tally) {
            (ItemCategory::Fabric, Tally::Collected) => self.total_fabric_collected,
            (ItemCategory::Polymer, Tally::Collected) => self.total_plastic_collected,
            (ItemCategory::Glass, Tally::Collected) => self.total_glass_collected,
            (ItemCategory::Metal, Tally::Collected) => self.total_metal_collected,
            (ItemCategory::Paper, Tally::Collected) => self.total_paper_collected,
            (ItemCategory::Composite, Tally::Collected) => self.total_composite_collected,
            (ItemCategory::Fabric, Tally::Recycled) => self.total_fabric_recycled,
            (ItemCategory::Polymer, Tally::Recycled) => self.total_plastic_recycled,
            (ItemCategory::Glass, Tally::Recycled) => self.total_glass_recycled,
            (ItemCategory::Metal, Tally::Recycled) => self.total_metal_recycled,
            (ItemCategory::Paper, Tally::Recycled) => self.total_paper_recycled,
            (ItemCategory::Composite, Tally::Recycled) => self.total_composite_recycled,
        }
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self, tally: Tally) -> f64 {
        ItemCategory::ALL
            .iter()
            .map(|category| self.get(*category, tally))
            .sum()
    }

    /// Recycled share of collected weight in percent, `None` when nothing was collected.
    #[must_use]
    pub fn recycling_rate(&self) -> Option<f64> {
        let collected = self.total(Tally::Collected);
        (collected > 0.0).then(|| self.total(Tally::Recycled) / collected * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Aggregated trash statistics for one module.
pub struct TrashSummary {
    /// Number of bins in the module.
    pub bin_count: usize,
    /// Number of discarded units across all bins.
    pub total_items: u64,
    /// Total weight in kilograms.
    pub total_weight: f64,
    /// Weight per category; every category is present.
    pub category_weights: BTreeMap<ItemCategory, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Fill status of a single bin.
pub struct BinStatus {
    /// Module the bin is placed in.
    pub module_name: Option<HabitatModule>,
    /// Mobility tag.
    pub mobility: BinMobility,
    /// Number of trash entries in the bin.
    pub trash_count: usize,
    /// Fill level in percent.
    pub fullness_percentage: f64,
    /// Traffic-light classification.
    pub level: FillLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Request to put new trash into a bin.
pub struct NewTrashItem {
    /// Target bin.
    pub bin_id: BinId,
    /// Consumable code.
    pub code_name: String,
    /// Number of units.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Partial update of a trash item.
pub struct TrashUpdate {
    /// Move the item to this bin.
    #[serde(default)]
    pub bin_id: Option<BinId>,
    /// Replace the unit count.
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_accepts_legacy_bin_type_field() {
        let bin: SmartBin = serde_json::from_str(
            r#"{"binId":"bin_Outdoor_1","moduleName":null,"binType":"OUTDOOR",
                "totalWeight":400,"filledWeight":180,"filledPercentage":45}"#,
        )
        .expect("legacy bin parses");

        assert_eq!(bin.mobility, BinMobility::Outdoor);
        assert_eq!(bin.module_name, None);
        assert!((bin.capacity_kg - 400.0).abs() < f64::EPSILON, "capacity");
    }

    #[test]
    fn fill_is_recomputed_and_clamped() {
        let bin = SmartBin {
            bin_id: BinId::from("b"),
            module_name: Some(HabitatModule::LabModule),
            mobility: BinMobility::Indoor,
            capacity_kg: 80.0,
            filled_kg: 0.0,
            filled_percentage: 0.0,
        };

        let half = bin.clone().with_fill(40.0);
        assert!((half.filled_percentage - 50.0).abs() < 1e-9, "half full");

        let over = bin.clone().with_fill(200.0);
        assert!((over.filled_percentage - 100.0).abs() < 1e-9, "clamped");
        assert_eq!(over.fill_level(), FillLevel::Critical);

        let negative = bin.with_fill(-3.0);
        assert!(negative.filled_kg.abs() < 1e-9, "never negative");
    }

    #[test]
    fn fill_level_thresholds() {
        assert_eq!(FillLevel::from_percentage(75.0), FillLevel::Good);
        assert_eq!(FillLevel::from_percentage(75.1), FillLevel::Attention);
        assert_eq!(FillLevel::from_percentage(90.0), FillLevel::Attention);
        assert_eq!(FillLevel::from_percentage(90.5), FillLevel::Critical);
    }

    #[test]
    fn consumable_accepts_single_or_list_recycle_process() {
        let single: ConsumableItem = serde_json::from_str(
            r#"{"name":"Foil","codeName":"Aluminum_Foil_01","category":"METAL","quantity":3,
                "weight_kg":0.2,"recycleProcess":{"process":"MELTING","outputMaterials":{"ALUMINUM":0.9}}}"#,
        )
        .expect("single step parses");
        assert_eq!(single.recycle_process.len(), 1);

        let list: ConsumableItem = serde_json::from_str(
            r#"{"name":"Shirt","codeName":"Cotton_Shirt_01","category":"FABRIC","quantity":3,
                "weight_kg":0.3,"recycleProcess":[
                    {"process":"FIBER_SEPARATION","outputMaterials":{"COTTON":0.7}},
                    {"process":"PULPING","outputMaterials":{"CELLULOSE_FIBER":0.2}}]}"#,
        )
        .expect("step list parses");
        assert_eq!(
            list.processes().collect::<Vec<_>>(),
            vec!["FIBER_SEPARATION", "PULPING"]
        );
    }

    #[test]
    fn plastic_is_an_alias_for_polymer() {
        let trash: TrashItem = serde_json::from_str(
            r#"{"trashId":"trash_001","binId":"b","category":"PLASTIC","codeName":"PLA_Film_01","weight":5}"#,
        )
        .expect("legacy trash parses");

        assert_eq!(trash.category, Some(ItemCategory::Polymer));
        assert_eq!(trash.quantity, 1);
        assert!((trash.total_weight(None) - 5.0).abs() < 1e-9, "legacy weight");
    }

    #[test]
    fn legacy_weight_follows_quantity() {
        let mut trash = TrashItem {
            weight: Some(6.0),
            category: Some(ItemCategory::Composite),
            ..TrashItem::new(BinId::from("b"), "Old_Crate", 3)
        };

        trash.set_quantity(1);
        assert_eq!(trash.quantity, 1);
        assert!((trash.total_weight(None) - 2.0).abs() < 1e-9, "one of three units");

        let mut catalogued = TrashItem::new(BinId::from("b"), "CAN", 2);
        catalogued.set_quantity(5);
        assert_eq!(catalogued.weight, None);
    }

    #[test]
    fn generated_trash_ids_are_unique() {
        let first = TrashId::generate();
        let second = TrashId::generate();
        assert_ne!(first, second);
        assert!(first.0.starts_with("TRASH-"), "prefix");
    }

    #[test]
    fn monthly_summary_maps_polymer_to_plastic_fields() {
        assert_eq!(
            MonthlySummary::field(ItemCategory::Polymer, Tally::Recycled),
            "totalPlasticRecycled"
        );

        let mut summary = MonthlySummary::empty("October", 2026);
        summary.total_plastic_collected = 8.0;
        summary.total_plastic_recycled = 2.0;
        assert_eq!(summary.month_number(), 10);
        let rate = summary.recycling_rate().expect("collected is positive");
        assert!((rate - 25.0).abs() < 1e-9, "rate");
        assert_eq!(MonthlySummary::empty("March", 2026).recycling_rate(), None);
    }

    #[test]
    fn materials_merge_and_drop_zeroes() {
        let mut ledger = Materials::new();
        ledger.add("ALUMINUM", 2.0);
        ledger.merge(&Materials::from_iter([("ALUMINUM".to_owned(), -2.0)]));
        ledger.add("COTTON", 1.5);

        let cleaned = ledger.without_zeroes();
        assert_eq!(cleaned.len(), 1);
        assert!((cleaned.get("COTTON") - 1.5).abs() < 1e-9, "cotton kept");
    }
}
