use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use jezero_core::HabitatModule;

use crate::app::{App, Screen, StationFocus, step_cursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Load the bins of the highlighted module
    OpenModule,
    /// Load the trash of the highlighted bin
    OpenBin,
    OpenConsumables,
    /// Run `service.convert_consumable_to_trash`(...) for the highlighted consumable
    ConvertConsumable,
    OpenAssign,
    AssignBin,
    /// Run `service.dump_bin_to_instation`(...) for the highlighted bin
    DumpBin,
    OpenStation,
    /// Recycle every selected station trash item
    Recycle,
    /// Manufacture the highlighted recipe
    Manufacture,
    OpenOverview,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Down, Enter, Esc, Left, Right, Tab, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    // Any key dismisses the last message
    app.error_message = None;
    app.info_message = None;

    let mut action = Action::None;

    match app.screen {
        Screen::Modules => match key.code {
            Up | Char('k') => step_cursor(&mut app.module_index, HabitatModule::ALL.len(), false),
            Down | Char('j') => step_cursor(&mut app.module_index, HabitatModule::ALL.len(), true),
            Enter | Right | Char(' ') => {
                app.bin_index = 0;
                action = Action::OpenModule;
            }
            Char('s') => action = Action::OpenStation,
            Char('o') => action = Action::OpenOverview,
            _ => {}
        },

        Screen::Bins => match key.code {
            Up | Char('k') => step_cursor(&mut app.bin_index, app.bins.len(), false),
            Down | Char('j') => step_cursor(&mut app.bin_index, app.bins.len(), true),
            Enter | Right => action = Action::OpenBin,
            Char('a') => action = Action::OpenAssign,
            Char('d') => action = Action::DumpBin,
            Left | Esc | Backspace => app.screen = Screen::Modules,
            _ => {}
        },

        Screen::Trash => match key.code {
            Enter | Char('c') => action = Action::OpenConsumables,
            Left | Esc | Backspace => action = Action::OpenModule,
            _ => {}
        },

        Screen::Consumables => match key.code {
            Up | Char('k') => step_cursor(&mut app.consumable_index, app.consumables.len(), false),
            Down | Char('j') => step_cursor(&mut app.consumable_index, app.consumables.len(), true),
            Char('+' | '=') | Right => app.quantity = app.quantity.saturating_add(1),
            Char('-') | Left => app.quantity = app.quantity.saturating_sub(1).max(1),
            Enter => action = Action::ConvertConsumable,
            Esc | Backspace => app.screen = Screen::Trash,
            _ => {}
        },

        Screen::Assign => match key.code {
            Up | Char('k') => step_cursor(&mut app.unassigned_index, app.unassigned.len(), false),
            Down | Char('j') => step_cursor(&mut app.unassigned_index, app.unassigned.len(), true),
            Enter => action = Action::AssignBin,
            Left | Esc | Backspace => app.screen = Screen::Bins,
            _ => {}
        },

        Screen::Station => match key.code {
            Tab => {
                app.station_focus = match app.station_focus {
                    StationFocus::Trash => StationFocus::Recipes,
                    StationFocus::Recipes => StationFocus::Trash,
                };
            }
            Up | Char('k') => match app.station_focus {
                StationFocus::Trash => {
                    step_cursor(&mut app.station_index, app.station_trash.len(), false);
                }
                StationFocus::Recipes => {
                    step_cursor(&mut app.recipe_index, app.availability.len(), false);
                }
            },
            Down | Char('j') => match app.station_focus {
                StationFocus::Trash => {
                    step_cursor(&mut app.station_index, app.station_trash.len(), true);
                }
                StationFocus::Recipes => {
                    step_cursor(&mut app.recipe_index, app.availability.len(), true);
                }
            },
            Char(' ') if app.station_focus == StationFocus::Trash => app.toggle_trash_selection(),
            Char('a') if app.station_focus == StationFocus::Trash => app.select_all_trash(),
            Char('f') => {
                app.cycle_application();
                action = Action::OpenStation;
            }
            Char('r') => {
                if app.selected_trash.is_empty() {
                    app.error_message = Some("Select trash with Space first".to_owned());
                } else {
                    action = Action::Recycle;
                }
            }
            Enter if app.station_focus == StationFocus::Recipes => action = Action::Manufacture,
            Esc | Left | Backspace => app.screen = Screen::Modules,
            _ => {}
        },

        Screen::Overview => match key.code {
            Enter | Char('r') => action = Action::OpenOverview,
            Esc | Left | Backspace => app.screen = Screen::Modules,
            _ => {}
        },
    }
    action
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jezero_core::{HabitatStore, JezeroService, MemoryStore};

    use super::*;

    fn app() -> App {
        let store = HabitatStore::new(Arc::new(MemoryStore::new()));
        App::new(Arc::new(JezeroService::new(store)))
    }

    fn press(app: &mut App, code: KeyCode) -> Action {
        handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), app)
    }

    #[test]
    fn quit_shortcuts() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::Quit);
        assert_eq!(
            handle_key_event(
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
                &mut app
            ),
            Action::Quit
        );
    }

    #[test]
    fn module_screen_navigation() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.module_index, 2);

        assert_eq!(press(&mut app, KeyCode::Enter), Action::OpenModule);
        assert_eq!(press(&mut app, KeyCode::Char('s')), Action::OpenStation);
        assert_eq!(press(&mut app, KeyCode::Char('o')), Action::OpenOverview);
    }

    #[test]
    fn quantity_never_drops_below_one() {
        let mut app = app();
        app.screen = Screen::Consumables;

        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.quantity, 1);
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.quantity, 3);
        assert_eq!(press(&mut app, KeyCode::Enter), Action::ConvertConsumable);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Trash);
    }

    #[test]
    fn recycling_requires_a_selection() {
        let mut app = app();
        app.screen = Screen::Station;

        assert_eq!(press(&mut app, KeyCode::Char('r')), Action::None);
        assert!(app.error_message.is_some(), "hint shown");

        assert_eq!(press(&mut app, KeyCode::Char('f')), Action::OpenStation);
        assert!(app.application.is_some(), "filter engaged");

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.station_focus, StationFocus::Recipes);
        assert_eq!(press(&mut app, KeyCode::Enter), Action::Manufacture);
    }
}
