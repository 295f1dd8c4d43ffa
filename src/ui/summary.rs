use eframe::egui::{self, RichText, Ui};

use crate::data::metrics::ActivityMetrics;

// ---------------------------------------------------------------------------
// Metric cards (top of the central panel)
// ---------------------------------------------------------------------------

/// Render the row of summary cards for the filtered view.
pub fn metric_cards(ui: &mut Ui, m: &ActivityMetrics) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        card(ui, &m.total.to_string(), "Total de fornecedores (após filtro)");
        card(ui, &m.registered_30d.to_string(), "Cadastrados nos últimos 30 dias");
        card(
            ui,
            &format!("{} ({:.1}%)", m.active_12m, m.active_pct),
            "Usados nos últimos 12 meses",
        );
        card(ui, &m.new_with_usage_30d.to_string(), "Novos (30 dias) já com pedido");
        card(
            ui,
            &m.inactivity_risk_90d.to_string(),
            "Risco de inatividade (sem pedido há 90+ dias)",
        );
        card(
            ui,
            &format!(
                "{} / {} / {}",
                days(m.days_since_mean),
                days(m.days_since_median),
                days(m.days_since_p90)
            ),
            "Dias desde o último pedido (média / mediana / p90)",
        );

        let pareto = &m.pareto;
        let pareto_value = if pareto.total_orders == 0 {
            "–".to_string()
        } else {
            format!("{} de {}", pareto.top_suppliers, pareto.suppliers_with_orders)
        };
        card(
            ui,
            &pareto_value,
            &format!(
                "Fornecedores com {:.0}% dos {} pedidos em 12 meses",
                pareto.share * 100.0,
                pareto.total_orders
            ),
        );
    });
}

fn card(ui: &mut Ui, value: &str, caption: &str) {
    egui::Frame::group(ui.style())
        .inner_margin(12.0)
        .show(ui, |ui: &mut Ui| {
            ui.set_min_width(170.0);
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(RichText::new(value).size(26.0).strong());
                ui.small(caption);
            });
        });
}

fn days(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_else(|| "–".into())
}
