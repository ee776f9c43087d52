use jezero_core::{Application, FillLevel, HabitatModule, ItemCategory, MonthlySummary, Tally};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::app::{App, Screen, StationFocus};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new(format!(
        "jezero – habitat waste management · {}",
        app.service.store_meta().location
    ))
    .block(Block::default().borders(Borders::ALL).title("Jezero"));
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::Modules => draw_modules(frame, app, *content_area),
        Screen::Bins => draw_bins(frame, app, *content_area),
        Screen::Trash => draw_trash(frame, app, *content_area),
        Screen::Consumables => draw_consumables(frame, app, *content_area),
        Screen::Assign => draw_assign(frame, app, *content_area),
        Screen::Station => draw_station(frame, app, *content_area),
        Screen::Overview => draw_overview(frame, app, *content_area),
    }

    let nav_hint = match app.screen {
        Screen::Modules => "↑/↓ move · Enter open module · s recycling station · o overview · q quit",
        Screen::Bins => "↑/↓ move · Enter open bin · a assign bin · d dump to station · Esc back · q quit",
        Screen::Trash => "c add consumable · Esc back · q quit",
        Screen::Consumables => "↑/↓ move · +/- quantity · Enter discard into bin · Esc back",
        Screen::Assign => "↑/↓ move · Enter place bin in module · Esc back",
        Screen::Station => {
            "Tab switch list · Space select · a select all · r recycle · f filter · Enter manufacture · Esc back"
        }
        Screen::Overview => "Enter/r refresh · Esc back · q quit",
    };

    let (status_text, status_style) = if app.is_loading {
        (
            format!("Working… · {nav_hint}"),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(msg) = &app.error_message {
        (format!("{msg} · {nav_hint}"), Style::default().fg(Color::Red))
    } else if let Some(msg) = &app.info_message {
        (
            format!("{msg} · {nav_hint}"),
            Style::default().fg(Color::Green),
        )
    } else {
        (nav_hint.to_owned(), Style::default())
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn highlighted<'list>(block: Block<'list>, list: List<'list>) -> List<'list> {
    list.block(block).highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn draw_modules(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = HabitatModule::ALL
        .iter()
        .enumerate()
        .map(|(idx, module)| {
            let prefix = if idx == app.module_index { "> " } else { "  " };
            ListItem::new(format!("{prefix}{}", module.label()))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = highlighted(
        Block::default()
            .borders(Borders::ALL)
            .title("Habitat modules (↑/↓, Enter)"),
        List::new(items),
    );

    let mut state = ListState::default();
    state.select(Some(app.module_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_bins(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [bins_area, summary_area] = chunks else {
        return;
    };

    let module_label = app.selected_module().map_or("<module>", HabitatModule::label);
    let title = format!("Bins in {module_label} (Enter to open)");

    let rows = app.bins.iter().enumerate().map(|(idx, bin)| {
        let mut style = Style::default().fg(level_color(bin.fill_level()));
        if idx == app.bin_index {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Row::new(vec![
            Cell::from(bin.bin_id.to_string()),
            Cell::from(bin.mobility.to_string()),
            Cell::from(format!("{:.1} / {:.0} kg", bin.filled_kg, bin.capacity_kg)),
            Cell::from(format!("{:.1} %", bin.filled_percentage)),
            Cell::from(level_label(bin.fill_level())),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(10),
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Bin", "Type", "Content", "Fill", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .column_spacing(1);
    frame.render_widget(table, *bins_area);

    let summary_text = app.module_summary.as_ref().map_or_else(
        || String::from("No summary loaded."),
        |summary| {
            let categories = summary
                .category_weights
                .iter()
                .filter(|(_, kg)| **kg > 0.0)
                .map(|(category, kg)| format!("{} {kg:.1} kg", category.label()))
                .collect::<Vec<_>>()
                .join(" · ");
            format!(
                "{} bins · {} items · {:.1} kg\n{categories}",
                summary.bin_count, summary.total_items, summary.total_weight
            )
        },
    );
    let summary = Paragraph::new(summary_text)
        .block(Block::default().borders(Borders::ALL).title("Module totals"))
        .wrap(Wrap { trim: true });
    frame.render_widget(summary, *summary_area);
}

fn draw_trash(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let bin_label = app
        .selected_bin()
        .map_or_else(|| String::from("<bin>"), |bin| bin.bin_id.to_string());
    let title = format!("Trash in {bin_label} (c to add a consumable)");

    if app.trash.is_empty() {
        let paragraph = Paragraph::new("This bin is empty.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.trash.iter().map(|item| {
        let consumable = app.consumable(&item.code_name);
        let category = item.resolved_category(consumable);
        Row::new(vec![
            Cell::from(app.trash_label(item).to_owned()),
            Cell::from(item.code_name.clone()),
            Cell::from(item.quantity.to_string()),
            Cell::from(format!("{:.2} kg", item.total_weight(consumable))),
            Cell::from(category.map_or("?", ItemCategory::label)),
        ])
        .style(Style::default().fg(category.map_or(Color::Gray, category_color)))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(22),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Item", "Code", "Qty", "Weight", "Category"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .column_spacing(1);
    frame.render_widget(table, area);
}

fn draw_consumables(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let bin_label = app
        .selected_bin()
        .map_or_else(|| String::from("<bin>"), |bin| bin.bin_id.to_string());
    let title = format!(
        "Discard {} unit(s) into {bin_label} (+/- quantity, Enter)",
        app.quantity
    );

    let items = app
        .consumables
        .iter()
        .map(|item| {
            let line = format!(
                "{:<28} {:>4} in stock · {:.2} kg · {}",
                item.name,
                item.quantity,
                item.weight_kg,
                item.category.label()
            );
            let style = if item.quantity < app.quantity {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(category_color(item.category))
            };
            ListItem::new(line).style(style)
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = highlighted(Block::default().borders(Borders::ALL).title(title), List::new(items))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !app.consumables.is_empty() {
        state.select(Some(app.consumable_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_assign(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let module_label = app.selected_module().map_or("<module>", HabitatModule::label);
    let title = format!("Unassigned indoor bins → {module_label} (Enter)");

    let items = if app.unassigned.is_empty() {
        vec![ListItem::new("No unassigned indoor bins.")]
    } else {
        app.unassigned
            .iter()
            .map(|bin| {
                ListItem::new(format!(
                    "{} · {:.1} % full",
                    bin.bin_id, bin.filled_percentage
                ))
            })
            .collect()
    };

    let list = highlighted(Block::default().borders(Borders::ALL).title(title), List::new(items))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !app.unassigned.is_empty() {
        state.select(Some(app.unassigned_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_station(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let [trash_area, right_area] = columns.as_ref() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(8)])
        .split(*right_area);
    let [recipes_area, materials_area] = rows.as_ref() else {
        return;
    };

    let focus_style = |focus: StationFocus| {
        if app.station_focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    // Trash waiting in the in-station bins
    let trash_items = app
        .station_trash
        .iter()
        .map(|item| {
            let mark = if app.selected_trash.contains(&item.trash_id) {
                "[x]"
            } else {
                "[ ]"
            };
            let weight = item.total_weight(app.consumable(&item.code_name));
            ListItem::new(format!(
                "{mark} {} × {} · {weight:.1} kg · {}",
                item.quantity,
                app.trash_label(item),
                item.bin_id
            ))
        })
        .collect::<Vec<ListItem<'_>>>();
    let trash_list = highlighted(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(StationFocus::Trash))
            .title(format!(
                "Station trash ({} selected)",
                app.selected_trash.len()
            )),
        List::new(trash_items),
    );
    let mut trash_state = ListState::default();
    if !app.station_trash.is_empty() {
        trash_state.select(Some(app.station_index));
    }
    frame.render_stateful_widget(trash_list, *trash_area, &mut trash_state);

    // Recipes with feasibility
    let recipe_items = app
        .availability
        .iter()
        .map(|entry| {
            let style = if entry.can_manufacture {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let detail = if entry.can_manufacture {
                format!("×{}", entry.manufacturable_count)
            } else {
                let missing = entry
                    .missing_materials
                    .iter()
                    .map(|(material, kg)| format!("{material} -{kg:.1}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("missing {missing}")
            };
            ListItem::new(format!(
                "{} [{}] {detail}",
                entry.item.item_name,
                entry.item.application.as_str()
            ))
            .style(style)
        })
        .collect::<Vec<ListItem<'_>>>();
    let recipe_list = highlighted(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(StationFocus::Recipes))
            .title(format!(
                "Manufacturing · {} (f filter, Enter to build)",
                app.application.map_or("all", Application::as_str)
            )),
        List::new(recipe_items),
    );
    let mut recipe_state = ListState::default();
    if !app.availability.is_empty() {
        recipe_state.select(Some(app.recipe_index));
    }
    frame.render_stateful_widget(recipe_list, *recipes_area, &mut recipe_state);

    let materials_text = if app.materials.is_empty() {
        String::from("No raw materials on hand.")
    } else {
        app.materials
            .iter()
            .map(|(material, kg)| format!("{material} {kg:.2} kg"))
            .collect::<Vec<_>>()
            .join(" · ")
    };
    let materials = Paragraph::new(materials_text)
        .block(Block::default().borders(Borders::ALL).title("Raw materials"))
        .wrap(Wrap { trim: true });
    frame.render_widget(materials, *materials_area);
}

fn draw_overview(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let [bins_area, monthly_area] = layout_chunks.as_ref() else {
        return;
    };

    let rows = app.fullness.iter().map(|(bin_id, status)| {
        Row::new(vec![
            Cell::from(bin_id.to_string()),
            Cell::from(status.module_name.map_or("-", HabitatModule::label)),
            Cell::from(status.trash_count.to_string()),
            Cell::from(format!("{:.1} %", status.fullness_percentage)),
            Cell::from(level_label(status.level)),
        ])
        .style(Style::default().fg(level_color(status.level)))
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(20),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Bin", "Module", "Items", "Fill", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Bin fullness"))
    .column_spacing(1);
    frame.render_widget(table, *bins_area);

    let monthly_rows = app.monthly.iter().map(|summary| {
        Row::new(vec![
            Cell::from(format!("{} {}", summary.month, summary.year)),
            Cell::from(format!("{:.1} kg", summary.total(Tally::Collected))),
            Cell::from(format!("{:.1} kg", summary.total(Tally::Recycled))),
            Cell::from(recycling_rate_label(summary)),
        ])
    });
    let monthly = Table::new(
        monthly_rows,
        [
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["Month", "Collected", "Recycled", "Rate"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Monthly summary"))
    .column_spacing(1);
    frame.render_widget(monthly, *monthly_area);
}

fn recycling_rate_label(summary: &MonthlySummary) -> String {
    summary
        .recycling_rate()
        .map_or_else(|| "–".to_owned(), |rate| format!("{rate:.0} %"))
}

fn level_label(level: FillLevel) -> &'static str {
    match level {
        FillLevel::Good => "Good",
        FillLevel::Attention => "Attention",
        FillLevel::Critical => "Critical",
    }
}

fn level_color(level: FillLevel) -> Color {
    match level {
        FillLevel::Good => Color::Green,
        FillLevel::Attention => Color::Yellow,
        FillLevel::Critical => Color::Red,
    }
}

fn category_color(category: ItemCategory) -> Color {
    match category {
        ItemCategory::Fabric => Color::Magenta,
        ItemCategory::Polymer => Color::Yellow,
        ItemCategory::Glass => Color::Cyan,
        ItemCategory::Metal => Color::LightBlue,
        ItemCategory::Composite => Color::Gray,
        ItemCategory::Paper => Color::Blue,
    }
}
