mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::SupplierPanelApp;
use config::PanelConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = PanelConfig::from_env();
    log::info!("starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Painel de Fornecedores Ativos",
        options,
        Box::new(move |_cc| Ok(Box::new(SupplierPanelApp::new(&config)))),
    )
}
