use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::export::DEFAULT_EXPORT_NAME;
use crate::data::normalize::format_date;
use crate::state::{AppState, PanelView};

const SOURCE_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls", "ods", "parquet", "pq", "json"];

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("Nenhuma planilha de fornecedores carregada.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let states: Vec<String> = dataset.states.iter().cloned().collect();
    let categories: Vec<String> = dataset.categories.iter().cloned().collect();
    let bounds = dataset.registration_bounds;

    if ui
        .add_enabled(!state.filters.is_unrestricted(), egui::Button::new("Limpar filtros"))
        .clicked()
    {
        state.clear_filters();
    }
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Registration period ----
            registration_range(ui, state, bounds);
            ui.separator();

            // ---- UF ----
            let header = format!("UF  ({}/{})", state.filters.states.len(), states.len());
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("filter_states")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    for uf in &states {
                        let mut checked = state.filters.states.contains(uf);
                        let text = RichText::new(uf).color(state.state_colors.color_for(uf));
                        if ui.checkbox(&mut checked, text).changed() {
                            state.toggle_state(uf);
                        }
                    }
                });

            // ---- Categories ----
            let header = format!(
                "Categoria  ({}/{})",
                state.filters.categories.len(),
                categories.len()
            );
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("filter_categories")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    if categories.is_empty() {
                        ui.label("Nenhuma categoria na planilha.");
                    }
                    for cat in &categories {
                        let mut checked = state.filters.categories.contains(cat);
                        if ui.checkbox(&mut checked, cat).changed() {
                            state.toggle_category(cat);
                        }
                    }
                });
        });
}

/// Checkbox enabling the range, plus two date pickers.
fn registration_range(
    ui: &mut Ui,
    state: &mut AppState,
    bounds: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
) {
    let (lo, hi) = bounds.unwrap_or((state.today, state.today));
    let mut enabled =
        state.filters.registered_from.is_some() || state.filters.registered_to.is_some();

    if ui
        .checkbox(&mut enabled, RichText::new("Período de cadastro").strong())
        .changed()
    {
        if enabled {
            state.set_registration_range(Some(lo), Some(hi));
        } else {
            state.set_registration_range(None, None);
        }
    }

    if !enabled {
        if let Some((lo, hi)) = bounds {
            ui.weak(format!("{} – {}", format_date(Some(lo)), format_date(Some(hi))));
        }
        return;
    }

    let mut from = state.filters.registered_from.unwrap_or(lo);
    let mut to = state.filters.registered_to.unwrap_or(hi);
    egui::Grid::new("registration_range").show(ui, |ui: &mut Ui| {
        ui.label("De");
        ui.add(DatePickerButton::new(&mut from).id_salt("registered_from"));
        ui.end_row();
        ui.label("Até");
        ui.add(DatePickerButton::new(&mut to).id_salt("registered_to"));
        ui.end_row();
    });
    state.set_registration_range(Some(from), Some(to));
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir fornecedores…").clicked() {
                open_suppliers_dialog(state);
                ui.close_menu();
            }
            if ui.button("Abrir pedidos…").clicked() {
                open_orders_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Exportar tabela filtrada…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let sources = [&state.suppliers_path, &state.orders_path]
                .iter()
                .filter_map(|p| p.as_ref())
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            ui.label(format!(
                "{} fornecedores, {} visíveis, {} pedidos",
                ds.len(),
                state.visible_indices.len(),
                ds.orders.len()
            ))
            .on_hover_text(sources);
            ui.separator();
        }

        ui.label(format!("Referência: {}", format_date(Some(state.today))));
        ui.separator();

        ui.selectable_value(&mut state.view, PanelView::Table, "Tabela");
        ui.selectable_value(&mut state.view, PanelView::Charts, "Gráficos");

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.info_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::LIGHT_GREEN));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn source_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Arquivos suportados", SOURCE_EXTENSIONS)
        .add_filter("CSV", &["csv"])
        .add_filter("Excel / ODS", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
}

pub fn open_suppliers_dialog(state: &mut AppState) {
    if let Some(path) = source_dialog("Abrir cadastro de fornecedores").pick_file() {
        state.open_suppliers(&path);
    }
}

pub fn open_orders_dialog(state: &mut AppState) {
    if let Some(path) = source_dialog("Abrir histórico de pedidos").pick_file() {
        state.open_orders(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Exportar tabela filtrada")
        .set_file_name(DEFAULT_EXPORT_NAME)
        .add_filter("Excel", &["xlsx"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet"])
        .save_file();

    if let Some(path) = file {
        match state.export(&path) {
            Ok(n) => {
                state.status_message = None;
                state.info_message = Some(format!("{n} fornecedores exportados"));
            }
            Err(e) => {
                log::error!("Failed to export table: {e:#}");
                state.info_message = None;
                state.status_message = Some(format!("Erro: {e:#}"));
            }
        }
    }
}
