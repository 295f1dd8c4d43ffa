use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Plot};

use crate::color::{ramp, ColorMap};
use crate::data::metrics::{RankedEntry, NO_STATE_LABEL};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Charts (central panel, "Gráficos" tab)
// ---------------------------------------------------------------------------

/// Render the three bar charts for the filtered view.
pub fn charts(ui: &mut Ui, state: &AppState) {
    if let Some(msg) = state.empty_view_message() {
        ui.label(RichText::new(msg).italics());
        return;
    }
    let m = &state.metrics;

    ui.heading("Top 10 fornecedores mais utilizados nos últimos 12 meses");
    if m.top_suppliers.is_empty() {
        ui.label("Nenhum pedido nos últimos 12 meses para os fornecedores filtrados.");
    } else {
        let max = m.top_suppliers.first().map_or(0, |e| e.count);
        ranked_chart(ui, "top_suppliers", &m.top_suppliers, true, |e| {
            ramp(e.count, max)
        });
    }
    ui.separator();

    ui.columns(2, |cols| {
        cols[0].heading("Distribuição por UF");
        ranked_chart(&mut cols[0], "by_state", &m.by_state, false, |e| {
            if e.label == NO_STATE_LABEL {
                Color32::GRAY
            } else {
                state.state_colors.color_for(&e.label)
            }
        });

        cols[1].heading("Distribuição por categoria");
        if m.by_category.is_empty() {
            cols[1].label("Fornecedores filtrados sem categoria.");
        } else {
            let colors: &ColorMap = &state.category_colors;
            ranked_chart(&mut cols[1], "by_category", &m.by_category, false, |e| {
                colors.color_for(&e.label)
            });
        }
    });
}

/// One bar per entry, in entry order. Horizontal charts put the first entry on
/// top; the category axis is labelled with the entry labels.
fn ranked_chart(
    ui: &mut Ui,
    id: &str,
    entries: &[RankedEntry],
    horizontal: bool,
    color: impl Fn(&RankedEntry) -> Color32,
) {
    let n = entries.len();
    let position = move |i: usize| if horizontal { (n - 1 - i) as f64 } else { i as f64 };

    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            Bar::new(position(i), e.count as f64)
                .name(&e.label)
                .fill(color(e))
                .width(0.7)
        })
        .collect();
    let mut chart = BarChart::new(bars).name("Fornecedores");
    if horizontal {
        chart = chart.horizontal().name("Pedidos");
    }

    let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
    let axis_label = move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| {
        let v = mark.value;
        if v < 0.0 || v.fract() != 0.0 {
            return String::new();
        }
        let slot = v as usize;
        let i = if horizontal { n.checked_sub(slot + 1) } else { Some(slot) };
        i.and_then(|i| labels.get(i)).cloned().unwrap_or_default()
    };

    let mut plot = Plot::new(id)
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false);
    plot = if horizontal {
        plot.y_axis_formatter(axis_label).x_axis_label("Quantidade de pedidos")
    } else {
        plot.x_axis_formatter(axis_label).y_axis_label("Fornecedores")
    };

    plot.show(ui, |plot_ui| {
        plot_ui.bar_chart(chart);
    });
}
