//! Material balance: what recycling yields and what can be manufactured from the ledger.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{
    ConsumableItem, ItemCategory, ManufacturableItem, Materials, RecycledMaterialRecord, TrashId,
    TrashItem,
};

/// Slack for floating-point sums when comparing available against required kilograms.
const TOLERANCE: f64 = 1e-9;

/// Consumable items indexed by code name.
pub struct Catalogue<'a> {
    by_code: HashMap<&'a str, &'a ConsumableItem>,
}

impl<'a> Catalogue<'a> {
    /// Index a list of consumables.
    #[must_use]
    pub fn new(items: &'a [ConsumableItem]) -> Self {
        Self {
            by_code: items
                .iter()
                .map(|item| (item.code_name.as_str(), item))
                .collect(),
        }
    }

    /// Look up a consumable by code.
    #[must_use]
    pub fn get(&self, code_name: &str) -> Option<&'a ConsumableItem> {
        self.by_code.get(code_name).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Result of running trash through the recycler.
pub struct RecycleYield {
    /// Raw materials produced.
    pub materials: Materials,
    /// Input weight per category of the processed items.
    pub category_weights: BTreeMap<ItemCategory, f64>,
    /// Input weight of the processed items.
    pub total_weight: f64,
    /// Items that were recycled.
    pub processed: Vec<TrashId>,
    /// Items that could not be recycled: unknown code, no recycle process, or a
    /// process other than the requested one.
    pub skipped: Vec<TrashId>,
}

/// Compute what recycling `trash` yields.
///
/// Each item contributes `unit weight * quantity * ratio` of every output material of
/// every applicable step. With `process` set, only steps of that process apply.
#[must_use]
pub fn recycle_yield(
    trash: &[TrashItem],
    catalogue: &Catalogue<'_>,
    process: Option<&str>,
) -> RecycleYield {
    let mut result = RecycleYield::default();

    for item in trash {
        let Some(consumable) = catalogue.get(&item.code_name) else {
            result.skipped.push(item.trash_id.clone());
            continue;
        };

        let steps = consumable
            .recycle_process
            .iter()
            .filter(|step| process.is_none_or(|wanted| step.process == wanted))
            .collect::<Vec<_>>();
        if steps.is_empty() {
            result.skipped.push(item.trash_id.clone());
            continue;
        }

        let weight = item.total_weight(Some(consumable));
        for step in steps {
            for (material, ratio) in &step.output_materials {
                result.materials.add(material, weight * ratio);
            }
        }

        *result
            .category_weights
            .entry(consumable.category)
            .or_insert(0.0) += weight;
        result.total_weight += weight;
        result.processed.push(item.trash_id.clone());
    }

    result
}

/// Sum every ledger record into the currently available materials.
#[must_use]
pub fn sum_ledger(records: &[RecycledMaterialRecord]) -> Materials {
    let mut total = Materials::new();
    for record in records {
        total.merge(&record.materials);
    }
    total.without_zeroes()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Whether and how often an item can be manufactured from the available materials.
pub struct Availability {
    /// The recipe that was assessed.
    #[serde(flatten)]
    pub item: ManufacturableItem,
    /// Every required material is available in sufficient quantity.
    pub can_manufacture: bool,
    /// Available kilograms of each required material.
    pub available_materials: Materials,
    /// Shortfall of each insufficient material.
    pub missing_materials: Materials,
    /// How many items the available materials are enough for.
    pub manufacturable_count: u32,
}

/// Check a recipe against the available materials.
///
/// An item is feasible only when it requires at least one material and every required
/// material is covered. The count is the minimum over required materials of
/// `floor(available / required)`, and zero when the item is not feasible.
#[must_use]
pub fn assess(item: &ManufacturableItem, available: &Materials) -> Availability {
    let mut available_materials = Materials::new();
    let mut missing_materials = Materials::new();
    let mut count: Option<f64> = None;

    for (material, required) in &item.manufacture_process.raw_materials {
        let on_hand = available.get(material);
        available_materials.add(material, on_hand);

        if *required <= 0.0 {
            continue;
        }
        if on_hand + TOLERANCE < *required {
            missing_materials.add(material, required - on_hand);
        }
        let possible = ((on_hand + TOLERANCE) / required).floor();
        count = Some(count.map_or(possible, |current| current.min(possible)));
    }

    let can_manufacture = count.is_some() && missing_materials.is_empty();
    let manufacturable_count = match count {
        Some(possible) if can_manufacture => whole_count(possible),
        _ => 0,
    };

    Availability {
        item: item.clone(),
        can_manufacture,
        available_materials,
        missing_materials,
        manufacturable_count,
    }
}

/// Describe what is wrong with a recipe, if anything.
///
/// A usable recipe names at least one material and every requirement is a finite
/// amount above zero.
#[must_use]
pub fn recipe_defect(item: &ManufacturableItem) -> Option<String> {
    let requirements = &item.manufacture_process.raw_materials;
    if requirements.is_empty() {
        return Some(String::from("it requires no raw materials"));
    }
    requirements
        .iter()
        .find(|(_, required)| !required.is_finite() || **required <= 0.0)
        .map(|(material, required)| format!("{material} requirement {required} is not a positive amount"))
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is floored and clamped to the u32 range first"
)]
fn whole_count(possible: f64) -> u32 {
    possible.clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{Application, BinId, ManufactureProcess, RecycleStep};

    fn consumable(
        code: &str,
        category: ItemCategory,
        weight_kg: f64,
        steps: Vec<(&str, Vec<(&str, f64)>)>,
    ) -> ConsumableItem {
        ConsumableItem {
            name: code.to_owned(),
            code_name: code.to_owned(),
            category,
            quantity: 10,
            weight_kg,
            recycle_process: steps
                .into_iter()
                .map(|(process, outputs)| RecycleStep {
                    process: process.to_owned(),
                    output_materials: outputs
                        .into_iter()
                        .map(|(material, ratio)| (material.to_owned(), ratio))
                        .collect(),
                })
                .collect(),
        }
    }

    fn trash(id: &str, code: &str, quantity: u32) -> TrashItem {
        TrashItem {
            trash_id: TrashId::from(id),
            bin_id: BinId::from("bin"),
            code_name: code.to_owned(),
            quantity,
            weight: None,
            category: None,
        }
    }

    fn recipe(requirements: &[(&str, f64)]) -> ManufacturableItem {
        ManufacturableItem {
            item_name: String::from("Wrench"),
            manufacture_process: ManufactureProcess {
                process: String::from("CASTING"),
                raw_materials: requirements
                    .iter()
                    .map(|(material, kg)| ((*material).to_owned(), *kg))
                    .collect(),
            },
            application: Application::Renovation,
        }
    }

    fn materials(entries: &[(&str, f64)]) -> Materials {
        entries
            .iter()
            .map(|(material, kg)| ((*material).to_owned(), *kg))
            .collect()
    }

    #[test]
    fn four_units_of_two_kilograms_at_half_ratio_yield_four_kilograms() {
        let items = [consumable(
            "CAN",
            ItemCategory::Metal,
            2.0,
            vec![("MELTING", vec![("ALUMINUM", 0.5)])],
        )];
        let catalogue = Catalogue::new(&items);

        let result = recycle_yield(&[trash("t1", "CAN", 4)], &catalogue, None);

        assert!((result.materials.get("ALUMINUM") - 4.0).abs() < 1e-9, "4 kg aluminum");
        assert!((result.total_weight - 8.0).abs() < 1e-9, "8 kg input");
        assert_eq!(result.processed, vec![TrashId::from("t1")]);
    }

    #[test]
    fn yield_sums_quantity_weight_ratio_over_items_and_steps() {
        let items = [
            consumable(
                "SHIRT",
                ItemCategory::Fabric,
                0.3,
                vec![
                    ("FIBER_SEPARATION", vec![("COTTON", 0.7), ("POLYESTER", 0.2)]),
                    ("PULPING", vec![("CELLULOSE_FIBER", 0.1)]),
                ],
            ),
            consumable("BAG", ItemCategory::Polymer, 0.05, vec![("PELLETIZING", vec![("POLYETHYLENE", 0.9)])]),
        ];
        let catalogue = Catalogue::new(&items);
        let trash_items = [trash("t1", "SHIRT", 2), trash("t2", "BAG", 10), trash("t3", "SHIRT", 1)];

        let result = recycle_yield(&trash_items, &catalogue, None);

        assert!((result.materials.get("COTTON") - 0.9 * 0.7).abs() < 1e-9, "cotton");
        assert!((result.materials.get("POLYESTER") - 0.9 * 0.2).abs() < 1e-9, "polyester");
        assert!((result.materials.get("CELLULOSE_FIBER") - 0.9 * 0.1).abs() < 1e-9, "cellulose");
        assert!((result.materials.get("POLYETHYLENE") - 0.5 * 0.9).abs() < 1e-9, "polyethylene");
        let fabric = result.category_weights.get(&ItemCategory::Fabric).copied().unwrap_or_default();
        assert!((fabric - 0.9).abs() < 1e-9, "fabric input weight");
    }

    #[test]
    fn process_filter_and_unknown_codes_skip_items() {
        let items = [
            consumable("FOIL", ItemCategory::Metal, 1.0, vec![("MELTING", vec![("ALUMINUM", 1.0)])]),
            consumable("FILM", ItemCategory::Polymer, 1.0, vec![("PELLETIZING", vec![("PET", 1.0)])]),
            consumable("ROCK", ItemCategory::Composite, 1.0, Vec::new()),
        ];
        let catalogue = Catalogue::new(&items);
        let trash_items = [
            trash("foil", "FOIL", 1),
            trash("film", "FILM", 1),
            trash("rock", "ROCK", 1),
            trash("ghost", "UNKNOWN", 1),
        ];

        let result = recycle_yield(&trash_items, &catalogue, Some("MELTING"));

        assert_eq!(result.processed, vec![TrashId::from("foil")]);
        assert_eq!(
            result.skipped,
            vec![TrashId::from("film"), TrashId::from("rock"), TrashId::from("ghost")]
        );
        assert!(result.materials.get("PET").abs() < 1e-9, "filtered out");
    }

    #[test]
    fn ledger_sums_across_records_including_withdrawals() {
        let records = [
            RecycledMaterialRecord {
                timestamp: Utc::now(),
                materials: materials(&[("ALUMINUM", 8.0), ("COTTON", 3.5)]),
                process_type: String::from("INITIAL"),
            },
            RecycledMaterialRecord {
                timestamp: Utc::now(),
                materials: materials(&[("ALUMINUM", -8.0), ("PAPER", 1.0)]),
                process_type: String::from("MANUFACTURE:CASTING"),
            },
        ];

        let available = sum_ledger(&records);

        assert_eq!(available.len(), 2, "aluminum cancelled out");
        assert!((available.get("COTTON") - 3.5).abs() < 1e-9, "cotton");
        assert!((available.get("PAPER") - 1.0).abs() < 1e-9, "paper");
    }

    #[test]
    fn count_is_minimum_of_floored_ratios() {
        let item = recipe(&[("ALUMINUM", 2.0), ("STEEL", 0.5)]);
        let available = materials(&[("ALUMINUM", 7.0), ("STEEL", 1.2)]);

        let availability = assess(&item, &available);

        assert!(availability.can_manufacture, "both materials suffice");
        assert_eq!(availability.manufacturable_count, 2);
        assert!(availability.missing_materials.is_empty(), "nothing missing");
    }

    #[test]
    fn missing_material_makes_count_zero() {
        let item = recipe(&[("ALUMINUM", 2.0), ("COPPER", 1.0)]);
        let available = materials(&[("ALUMINUM", 10.0)]);

        let availability = assess(&item, &available);

        assert!(!availability.can_manufacture, "copper missing");
        assert_eq!(availability.manufacturable_count, 0);
        assert!((availability.missing_materials.get("COPPER") - 1.0).abs() < 1e-9, "shortfall");
        assert!(availability.available_materials.get("COPPER").abs() < 1e-9, "reported as zero");
    }

    #[test]
    fn recipe_without_requirements_is_not_manufacturable() {
        let availability = assess(&recipe(&[]), &materials(&[("ALUMINUM", 1.0)]));
        assert!(!availability.can_manufacture, "empty recipe");
        assert_eq!(availability.manufacturable_count, 0);
    }

    #[test]
    fn float_noise_does_not_block_exact_amounts() {
        // 0.3 / 0.1 is 2.9999999999999996 in binary floating point.
        let item = recipe(&[("COTTON", 0.1)]);
        let available = materials(&[("COTTON", 0.3)]);
        assert_eq!(assess(&item, &available).manufacturable_count, 3);
    }

    #[test]
    fn feasibility_is_monotonic_in_available_materials() {
        let item = recipe(&[("ALUMINUM", 1.5), ("NYLON", 0.25)]);
        let mut available = materials(&[("ALUMINUM", 1.5), ("NYLON", 0.25)]);
        let mut previous = assess(&item, &available);
        assert!(previous.can_manufacture, "exact amounts suffice");

        for (material, extra) in [("ALUMINUM", 0.7), ("NYLON", 0.1), ("PAPER", 3.0), ("ALUMINUM", 5.0)] {
            available.add(material, extra);
            let next = assess(&item, &available);
            assert!(next.can_manufacture, "adding {material} keeps the item feasible");
            assert!(
                next.manufacturable_count >= previous.manufacturable_count,
                "count never decreases"
            );
            previous = next;
        }
    }
}
