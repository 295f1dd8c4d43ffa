use eframe::egui;

use crate::config::PanelConfig;
use crate::state::{AppState, PanelView};
use crate::ui::{panels, plot, summary, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SupplierPanelApp {
    pub state: AppState,
}

impl SupplierPanelApp {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            state: AppState::from_config(config),
        }
    }
}

impl eframe::App for SupplierPanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: cards + table or charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.dataset.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Abra a planilha de fornecedores  (Arquivo → Abrir fornecedores…)");
                });
                return;
            }

            summary::metric_cards(ui, &self.state.metrics.activity);
            ui.separator();

            match self.state.view {
                PanelView::Table => table::supplier_table(ui, &self.state),
                PanelView::Charts => {
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .show(ui, |ui| plot::charts(ui, &self.state));
                }
            }
        });
    }
}
