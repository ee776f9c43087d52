use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use jezero_core::{
    Application, Availability, BinId, BinMobility, BinStatus, ConsumableItem, HabitatModule, Materials,
    MonthlySummary, SmartBin, TrashId, TrashItem, TrashSummary,
    service::{JezeroService, ServiceError},
};

use crate::input::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Modules,
    Bins,
    Trash,
    Consumables,
    Assign,
    Station,
    Overview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StationFocus {
    Trash,
    Recipes,
}

pub(crate) struct App {
    pub service: Arc<JezeroService>,

    pub screen: Screen,
    pub module_index: usize,
    pub module_summary: Option<TrashSummary>,

    pub bins: Vec<SmartBin>,
    pub bin_index: usize,
    pub trash: Vec<TrashItem>,

    pub consumables: Vec<ConsumableItem>,
    pub consumable_index: usize,
    pub quantity: u32,

    pub unassigned: Vec<SmartBin>,
    pub unassigned_index: usize,

    pub station_trash: Vec<TrashItem>,
    pub station_index: usize,
    pub selected_trash: BTreeSet<TrashId>,
    pub station_focus: StationFocus,
    pub availability: Vec<Availability>,
    pub recipe_index: usize,
    pub application: Option<Application>,
    pub materials: Materials,

    pub fullness: BTreeMap<BinId, BinStatus>,
    pub monthly: Vec<MonthlySummary>,

    pub is_loading: bool,
    pub error_message: Option<String>,
    pub info_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: Arc<JezeroService>) -> Self {
        Self {
            service,
            screen: Screen::Modules,
            module_index: 0,
            module_summary: None,
            bins: Vec::new(),
            bin_index: 0,
            trash: Vec::new(),
            consumables: Vec::new(),
            consumable_index: 0,
            quantity: 1,
            unassigned: Vec::new(),
            unassigned_index: 0,
            station_trash: Vec::new(),
            station_index: 0,
            selected_trash: BTreeSet::new(),
            station_focus: StationFocus::Trash,
            availability: Vec::new(),
            recipe_index: 0,
            application: None,
            materials: Materials::new(),
            fullness: BTreeMap::new(),
            monthly: Vec::new(),
            is_loading: false,
            error_message: None,
            info_message: None,
        }
    }

    pub(crate) fn selected_module(&self) -> Option<HabitatModule> {
        HabitatModule::ALL.get(self.module_index).copied()
    }

    pub(crate) fn selected_bin(&self) -> Option<&SmartBin> {
        self.bins.get(self.bin_index)
    }

    pub(crate) fn consumable(&self, code_name: &str) -> Option<&ConsumableItem> {
        self.consumables
            .iter()
            .find(|item| item.code_name == code_name)
    }

    /// Display name of a trash item, falling back to its code.
    pub(crate) fn trash_label<'item>(&'item self, item: &'item TrashItem) -> &'item str {
        self.consumable(&item.code_name)
            .map_or(item.code_name.as_str(), |consumable| consumable.name.as_str())
    }

    pub(crate) fn toggle_trash_selection(&mut self) {
        let Some(item) = self.station_trash.get(self.station_index) else {
            return;
        };
        if !self.selected_trash.remove(&item.trash_id) {
            self.selected_trash.insert(item.trash_id.clone());
        }
    }

    pub(crate) fn select_all_trash(&mut self) {
        if self.selected_trash.len() == self.station_trash.len() {
            self.selected_trash.clear();
        } else {
            self.selected_trash = self
                .station_trash
                .iter()
                .map(|item| item.trash_id.clone())
                .collect();
        }
    }

    /// Step the recipe filter through every application area and back to all recipes.
    pub(crate) fn cycle_application(&mut self) {
        self.application = match self.application {
            None => Application::ALL.first().copied(),
            Some(current) => Application::ALL
                .iter()
                .skip_while(|application| **application != current)
                .nth(1)
                .copied(),
        };
        self.recipe_index = 0;
    }

    /// Run the service calls behind an action and update the view state.
    pub(crate) async fn perform(&mut self, action: Action) -> Result<(), ServiceError> {
        match action {
            Action::None | Action::Quit => Ok(()),
            Action::OpenModule => self.open_module().await,
            Action::OpenBin => self.open_bin().await,
            Action::OpenConsumables => self.open_consumables().await,
            Action::ConvertConsumable => self.convert_consumable().await,
            Action::OpenAssign => self.open_assign().await,
            Action::AssignBin => self.assign_bin().await,
            Action::DumpBin => self.dump_bin().await,
            Action::OpenStation => self.open_station().await,
            Action::Recycle => self.recycle_selected().await,
            Action::Manufacture => self.manufacture_selected().await,
            Action::OpenOverview => self.open_overview().await,
        }
    }

    async fn open_module(&mut self) -> Result<(), ServiceError> {
        let Some(module) = self.selected_module() else {
            return Ok(());
        };
        self.bins = self.service.get_smart_bins(Some(module)).await?;
        self.module_summary = Some(self.service.get_trash_summary_by_module(module).await?);
        self.bin_index = self.bin_index.min(self.bins.len().saturating_sub(1));
        if self.consumables.is_empty() {
            self.consumables = self.service.get_consumable_items().await?;
        }
        self.screen = Screen::Bins;
        Ok(())
    }

    async fn open_bin(&mut self) -> Result<(), ServiceError> {
        let Some(bin_id) = self.selected_bin().map(|bin| bin.bin_id.clone()) else {
            return Ok(());
        };
        self.trash = self.service.get_trash_items_by_bin(&bin_id).await?;
        self.screen = Screen::Trash;
        Ok(())
    }

    async fn open_consumables(&mut self) -> Result<(), ServiceError> {
        self.consumables = self.service.get_consumable_items().await?;
        self.consumable_index = self
            .consumable_index
            .min(self.consumables.len().saturating_sub(1));
        self.quantity = 1;
        self.screen = Screen::Consumables;
        Ok(())
    }

    async fn convert_consumable(&mut self) -> Result<(), ServiceError> {
        let Some(bin_id) = self.selected_bin().map(|bin| bin.bin_id.clone()) else {
            return Ok(());
        };
        let Some(code_name) = self
            .consumables
            .get(self.consumable_index)
            .map(|item| item.code_name.clone())
        else {
            return Ok(());
        };

        let outcome = self
            .service
            .convert_consumable_to_trash(&code_name, &bin_id, self.quantity)
            .await?;
        self.info_message = Some(format!(
            "Discarded {} x {code_name} into {bin_id} ({:.1} % full)",
            self.quantity, outcome.bin.filled_percentage
        ));

        self.open_module().await?;
        self.open_bin().await?;
        self.consumables = self.service.get_consumable_items().await?;
        Ok(())
    }

    async fn open_assign(&mut self) -> Result<(), ServiceError> {
        self.unassigned = self
            .service
            .get_unassigned_bins()
            .await?
            .into_iter()
            .filter(SmartBin::is_assignable)
            .collect();
        self.unassigned_index = 0;
        self.screen = Screen::Assign;
        Ok(())
    }

    async fn assign_bin(&mut self) -> Result<(), ServiceError> {
        let Some(module) = self.selected_module() else {
            return Ok(());
        };
        let Some(bin_id) = self
            .unassigned
            .get(self.unassigned_index)
            .map(|bin| bin.bin_id.clone())
        else {
            return Ok(());
        };

        self.service.assign_bin_to_module(&bin_id, module).await?;
        self.info_message = Some(format!("Placed {bin_id} in {}", module.label()));
        self.open_module().await
    }

    async fn dump_bin(&mut self) -> Result<(), ServiceError> {
        let Some(bin_id) = self.selected_bin().map(|bin| bin.bin_id.clone()) else {
            return Ok(());
        };
        let outcome = self.service.dump_bin_to_instation(&bin_id).await?;
        self.info_message = Some(outcome.message);
        self.open_module().await
    }

    async fn open_station(&mut self) -> Result<(), ServiceError> {
        let station_bins = self
            .service
            .get_smart_bins(None)
            .await?
            .into_iter()
            .filter(|bin| bin.mobility == BinMobility::Instation)
            .map(|bin| bin.bin_id)
            .collect::<HashSet<_>>();

        self.station_trash = self
            .service
            .get_trash_items(None)
            .await?
            .into_iter()
            .filter(|item| station_bins.contains(&item.bin_id))
            .collect();
        self.station_trash
            .sort_by(|left, right| left.trash_id.cmp(&right.trash_id));

        let present = self
            .station_trash
            .iter()
            .map(|item| item.trash_id.clone())
            .collect::<BTreeSet<_>>();
        self.selected_trash.retain(|trash_id| present.contains(trash_id));
        self.station_index = self
            .station_index
            .min(self.station_trash.len().saturating_sub(1));

        if self.consumables.is_empty() {
            self.consumables = self.service.get_consumable_items().await?;
        }
        self.availability = self
            .service
            .get_manufacturing_availability(self.application)
            .await?;
        self.recipe_index = self
            .recipe_index
            .min(self.availability.len().saturating_sub(1));
        self.materials = self.service.get_available_materials().await?;
        self.screen = Screen::Station;
        Ok(())
    }

    async fn recycle_selected(&mut self) -> Result<(), ServiceError> {
        let selected = self.selected_trash.iter().cloned().collect::<Vec<_>>();
        let outcome = self
            .service
            .process_trash_for_recycling(&selected, None)
            .await?;
        self.info_message = Some(format!(
            "Recycled {} item(s), {:.1} kg into {:.2} kg of raw materials",
            outcome.recycled.processed.len(),
            outcome.recycled.total_weight,
            outcome.recycled.materials.total()
        ));
        self.selected_trash.clear();
        self.open_station().await
    }

    async fn manufacture_selected(&mut self) -> Result<(), ServiceError> {
        let Some(item_name) = self
            .availability
            .get(self.recipe_index)
            .map(|entry| entry.item.item_name.clone())
        else {
            return Ok(());
        };
        let outcome = self.service.create_manufactured_item(&item_name).await?;
        self.info_message = Some(format!(
            "Manufactured {} using {:.2} kg of materials",
            outcome.item_name,
            outcome.consumed.total()
        ));
        self.open_station().await
    }

    async fn open_overview(&mut self) -> Result<(), ServiceError> {
        self.fullness = self.service.get_bin_fullness_status().await?;
        self.monthly = self.service.get_monthly_summary().await?;
        self.screen = Screen::Overview;
        Ok(())
    }
}

/// Move a list cursor one step, staying within `0..len`.
pub(crate) fn step_cursor(index: &mut usize, len: usize, forward: bool) {
    if forward {
        if *index + 1 < len {
            *index += 1;
        }
    } else {
        *index = index.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use jezero_core::{HabitatStore, MemoryStore, seed};

    use super::*;

    async fn app() -> App {
        let store = HabitatStore::new(Arc::new(MemoryStore::new()));
        seed(&store).await;
        App::new(Arc::new(JezeroService::new(store)))
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut index = 0;
        step_cursor(&mut index, 2, false);
        assert_eq!(index, 0);
        step_cursor(&mut index, 2, true);
        step_cursor(&mut index, 2, true);
        assert_eq!(index, 1);
        step_cursor(&mut index, 0, true);
        assert_eq!(index, 1);
    }

    #[tokio::test]
    async fn discarding_a_consumable_updates_the_bin_view() {
        let mut app = app().await;
        app.module_index = HabitatModule::ALL
            .iter()
            .position(|module| *module == HabitatModule::LabModule)
            .unwrap_or_default();

        app.perform(Action::OpenModule).await.expect("bins");
        assert_eq!(app.screen, Screen::Bins);
        assert_eq!(app.bins.len(), 2);

        app.perform(Action::OpenBin).await.expect("trash");
        let before = app.trash.len();
        app.perform(Action::OpenConsumables).await.expect("catalogue");
        app.consumable_index = app
            .consumables
            .iter()
            .position(|item| item.code_name == "Cotton_Shirt_01")
            .unwrap_or_default();
        app.quantity = 2;

        app.perform(Action::ConvertConsumable).await.expect("convert");

        assert_eq!(app.screen, Screen::Trash);
        assert_eq!(app.trash.len(), before + 1);
        assert!(app.info_message.is_some(), "confirmation shown");
    }

    #[tokio::test]
    async fn station_recipes_follow_the_application_filter() {
        let mut app = app().await;
        app.perform(Action::OpenStation).await.expect("station");
        let all = app.availability.len();

        app.cycle_application();
        assert_eq!(app.application, Some(Application::Renovation));
        app.perform(Action::OpenStation).await.expect("filtered");
        assert!(app.availability.len() < all, "filter narrows the list");
        assert!(
            app.availability
                .iter()
                .all(|entry| entry.item.application == Application::Renovation),
            "only renovation recipes"
        );

        app.cycle_application();
        app.cycle_application();
        assert_eq!(app.application, Some(Application::Discovery));
        app.cycle_application();
        assert_eq!(app.application, None);
    }

    #[tokio::test]
    async fn station_recycles_the_selection() {
        let mut app = app().await;

        app.perform(Action::OpenStation).await.expect("station");
        assert_eq!(app.screen, Screen::Station);
        let before = app.station_trash.len();
        assert!(before > 0, "station bins hold trash");

        app.toggle_trash_selection();
        assert_eq!(app.selected_trash.len(), 1);
        app.perform(Action::Recycle).await.expect("recycle");

        assert_eq!(app.station_trash.len(), before - 1);
        assert!(app.selected_trash.is_empty(), "selection cleared");
    }
}
