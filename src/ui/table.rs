use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::export::{table_cells, TABLE_COLUMNS};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Detail table (central panel)
// ---------------------------------------------------------------------------

/// Render the filtered suppliers, most recent registration first.
pub fn supplier_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        return;
    };
    if let Some(msg) = state.empty_view_message() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new(msg).italics());
        });
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(130.0))
        .columns(Column::remainder().at_least(140.0).clip(true), 2)
        .column(Column::auto().at_least(30.0))
        .column(Column::remainder().at_least(100.0).clip(true))
        .columns(Column::auto().at_least(90.0), 3)
        .header(22.0, |mut header| {
            for name in TABLE_COLUMNS {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(20.0, state.table_rows.len(), |mut row| {
                let Some(supplier) = state
                    .table_rows
                    .get(row.index())
                    .and_then(|&i| dataset.rows.get(i))
                else {
                    return;
                };
                for cell in table_cells(supplier, state.today) {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
