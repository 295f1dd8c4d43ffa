use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, Months, NaiveDate};

use super::model::{SupplierDataset, SupplierRow};

/// Suppliers shown in the "top suppliers" chart.
pub const TOP_SUPPLIERS: usize = 10;
/// Cumulative order share the Pareto statistic looks for (80%).
const PARETO_NUM: usize = 4;
const PARETO_DEN: usize = 5;
/// Label for suppliers without a state code in the geographic chart.
pub const NO_STATE_LABEL: &str = "(sem UF)";

// ---------------------------------------------------------------------------
// Reference windows
// ---------------------------------------------------------------------------

/// Window starts derived from the reference date. All windows are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub today: NaiveDate,
    pub last_30_days: NaiveDate,
    pub last_90_days: NaiveDate,
    pub last_12_months: NaiveDate,
}

impl Windows {
    pub fn at(today: NaiveDate) -> Self {
        Self {
            today,
            last_30_days: today - Duration::days(30),
            last_90_days: today - Duration::days(90),
            last_12_months: today
                .checked_sub_months(Months::new(12))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Summary cards of the panel, computed over the filtered view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityMetrics {
    /// Distinct tax IDs in the view.
    pub total: usize,
    /// Registered within the last 30 days.
    pub registered_30d: usize,
    /// Last order within the last 12 months.
    pub active_12m: usize,
    /// `active_12m / total` as a percentage, 0 for an empty view.
    pub active_pct: f64,
    /// Registered within the last 30 days and already ordered from.
    pub new_with_usage_30d: usize,
    /// Mean days since last order, over suppliers with orders.
    pub days_since_mean: Option<f64>,
    pub days_since_median: Option<f64>,
    pub days_since_p90: Option<f64>,
    /// No orders at all, or last order more than 90 days ago.
    pub inactivity_risk_90d: usize,
    pub pareto: ParetoStats,
}

/// 80/20 concentration of 12-month orders among suppliers in the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParetoStats {
    /// Smallest number of top suppliers whose orders reach 80% of the total.
    pub top_suppliers: usize,
    /// Cumulative share actually reached by that prefix (0..=1).
    pub share: f64,
    /// Distinct suppliers with at least one order in the window.
    pub suppliers_with_orders: usize,
    /// Orders in the window.
    pub total_orders: usize,
}

/// One bar in a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub label: String,
    pub count: usize,
}

/// Everything the panel renders besides the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelMetrics {
    pub activity: ActivityMetrics,
    pub top_suppliers: Vec<RankedEntry>,
    pub by_state: Vec<RankedEntry>,
    pub by_category: Vec<RankedEntry>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute every metric and chart series for the rows at `indices`.
pub fn compute(dataset: &SupplierDataset, indices: &[usize], today: NaiveDate) -> PanelMetrics {
    let windows = Windows::at(today);
    let view = distinct_view(dataset, indices);
    let order_counts = order_counts_12m(dataset, &view, &windows);

    PanelMetrics {
        activity: activity(&view, &order_counts, &windows),
        top_suppliers: top_suppliers(&view, &order_counts, TOP_SUPPLIERS),
        by_state: rank(view.iter().map(|r| {
            if r.supplier.state.is_empty() {
                NO_STATE_LABEL.to_string()
            } else {
                r.supplier.state.clone()
            }
        })),
        by_category: rank(
            view.iter()
                .flat_map(|r| r.supplier.categories.iter().cloned()),
        ),
    }
}

/// Rows of the view, one per tax ID (first occurrence wins).
fn distinct_view<'a>(dataset: &'a SupplierDataset, indices: &[usize]) -> Vec<&'a SupplierRow> {
    let mut seen = HashSet::new();
    indices
        .iter()
        .filter_map(|&i| dataset.rows.get(i))
        .filter(|r| seen.insert(r.supplier.tax_id.as_str()))
        .collect()
}

/// Orders per supplier in the 12-month window, limited to suppliers in view.
fn order_counts_12m<'a>(
    dataset: &'a SupplierDataset,
    view: &[&SupplierRow],
    windows: &Windows,
) -> HashMap<&'a str, usize> {
    let in_view: HashSet<&str> = view.iter().map(|r| r.supplier.tax_id.as_str()).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for order in &dataset.orders {
        let in_window = order.ordered_on.is_some_and(|d| d >= windows.last_12_months);
        if in_window && in_view.contains(order.supplier_tax_id.as_str()) {
            *counts.entry(order.supplier_tax_id.as_str()).or_default() += 1;
        }
    }
    counts
}

fn activity(
    view: &[&SupplierRow],
    order_counts: &HashMap<&str, usize>,
    windows: &Windows,
) -> ActivityMetrics {
    let total = view.len();
    let registered_recently =
        |r: &&&SupplierRow| r.supplier.registered_on.is_some_and(|d| d >= windows.last_30_days);

    let registered_30d = view.iter().filter(registered_recently).count();
    let new_with_usage_30d = view
        .iter()
        .filter(registered_recently)
        .filter(|r| r.last_order.is_some())
        .count();
    let active_12m = view
        .iter()
        .filter(|r| r.ordered_since(windows.last_12_months))
        .count();
    let inactivity_risk_90d = view
        .iter()
        .filter(|r| !r.ordered_since(windows.last_90_days))
        .count();

    let mut days: Vec<f64> = view
        .iter()
        .filter_map(|r| r.days_since_last_order(windows.today))
        .map(|d| d as f64)
        .collect();
    days.sort_by(f64::total_cmp);

    ActivityMetrics {
        total,
        registered_30d,
        active_12m,
        active_pct: percentage(active_12m, total),
        new_with_usage_30d,
        days_since_mean: mean(&days),
        days_since_median: percentile(&days, 0.5),
        days_since_p90: percentile(&days, 0.9),
        inactivity_risk_90d,
        pareto: pareto(order_counts.values().copied().collect()),
    }
}

/// `part / total` in percent, 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear interpolation between closest ranks over sorted `values`.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Smallest prefix of counts (sorted descending) whose cumulative share of
/// the total reaches 80%.
pub fn pareto(mut counts: Vec<usize>) -> ParetoStats {
    counts.retain(|&c| c > 0);
    counts.sort_unstable_by(|a, b| b.cmp(a));
    let total: usize = counts.iter().sum();
    let suppliers_with_orders = counts.len();
    if total == 0 {
        return ParetoStats::default();
    }

    let mut cumulative = 0usize;
    let mut top_suppliers = suppliers_with_orders;
    for (i, c) in counts.iter().enumerate() {
        cumulative += c;
        // integer form of cumulative / total >= 0.8
        if cumulative * PARETO_DEN >= total * PARETO_NUM {
            top_suppliers = i + 1;
            break;
        }
    }

    ParetoStats {
        top_suppliers,
        share: cumulative as f64 / total as f64,
        suppliers_with_orders,
        total_orders: total,
    }
}

fn top_suppliers(
    view: &[&SupplierRow],
    order_counts: &HashMap<&str, usize>,
    limit: usize,
) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = view
        .iter()
        .filter_map(|r| {
            let count = *order_counts.get(r.supplier.tax_id.as_str())?;
            Some(RankedEntry {
                label: r.supplier.display_name(),
                count,
            })
        })
        .collect();
    sort_ranked(&mut entries);
    entries.truncate(limit);
    entries
}

/// Count occurrences of each label, descending by count then label.
fn rank(labels: impl Iterator<Item = String>) -> Vec<RankedEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut entries: Vec<RankedEntry> = counts
        .into_iter()
        .map(|(label, count)| RankedEntry { label, count })
        .collect();
    sort_ranked(&mut entries);
    entries
}

fn sort_ranked(entries: &mut [RankedEntry]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filtered_indices, FilterState};
    use crate::data::join::join;
    use crate::data::model::{OrderRecord, SupplierRecord};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    fn supplier(tax_id: &str, state: &str, reg: Option<NaiveDate>) -> SupplierRecord {
        SupplierRecord {
            tax_id: tax_id.into(),
            legal_name: format!("{tax_id} LTDA"),
            trade_name: tax_id.into(),
            state: state.into(),
            registered_on: reg,
            categories: vec!["TI".into()],
        }
    }

    fn orders(tax_id: &str, n: usize, at: NaiveDate) -> Vec<OrderRecord> {
        (0..n)
            .map(|_| OrderRecord {
                supplier_tax_id: tax_id.into(),
                ordered_on: Some(at),
            })
            .collect()
    }

    fn all(ds: &SupplierDataset) -> Vec<usize> {
        (0..ds.len()).collect()
    }

    #[test]
    fn pareto_reaches_80_percent_at_second_supplier() {
        let stats = pareto(vec![20, 50, 30]);
        assert_eq!(stats.top_suppliers, 2);
        assert_eq!(stats.suppliers_with_orders, 3);
        assert_eq!(stats.total_orders, 100);
        assert!((stats.share - 0.8).abs() < 1e-12);
    }

    #[test]
    fn pareto_edge_cases() {
        assert_eq!(pareto(Vec::new()), ParetoStats::default());
        assert_eq!(pareto(vec![0, 0]), ParetoStats::default());

        let single = pareto(vec![7]);
        assert_eq!(single.top_suppliers, 1);
        assert_eq!(single.share, 1.0);

        // 25% each: needs 4 of 4 to pass 80%
        assert_eq!(pareto(vec![1, 1, 1, 1]).top_suppliers, 4);
    }

    #[test]
    fn pareto_counts_only_window_and_view() {
        let mut all_orders = orders("A", 50, days_ago(10));
        all_orders.extend(orders("B", 30, days_ago(100)));
        all_orders.extend(orders("C", 20, days_ago(200)));
        // outside the 12-month window
        all_orders.extend(orders("C", 500, days_ago(400)));
        // not in the registry
        all_orders.extend(orders("Z", 500, days_ago(1)));

        let ds = join(
            vec![
                supplier("A", "SP", None),
                supplier("B", "SP", None),
                supplier("C", "RJ", None),
            ],
            all_orders,
        );
        let m = compute(&ds, &all(&ds), today());
        assert_eq!(m.activity.pareto.top_suppliers, 2);
        assert_eq!(m.activity.pareto.suppliers_with_orders, 3);
        assert_eq!(m.activity.pareto.total_orders, 100);

        let sp_only = FilterState {
            states: ["SP".to_string()].into(),
            ..Default::default()
        };
        let m = compute(&ds, &filtered_indices(&ds, &sp_only), today());
        // A=50, B=30 → 50/80 < 0.8, 80/80 ≥ 0.8
        assert_eq!(m.activity.pareto.top_suppliers, 2);
        assert_eq!(m.activity.pareto.suppliers_with_orders, 2);
        assert_eq!(m.activity.pareto.total_orders, 80);
    }

    #[test]
    fn new_supplier_with_usage_counts_twice() {
        let ds = join(
            vec![supplier("A", "SP", Some(days_ago(5)))],
            orders("A", 1, days_ago(3)),
        );
        let a = compute(&ds, &all(&ds), today()).activity;
        assert_eq!(a.registered_30d, 1);
        assert_eq!(a.new_with_usage_30d, 1);
        assert_eq!(a.active_12m, 1);
        assert_eq!(a.inactivity_risk_90d, 0);
    }

    #[test]
    fn supplier_without_orders_is_at_risk() {
        let ds = join(vec![supplier("A", "SP", Some(days_ago(400)))], Vec::new());
        assert_eq!(ds.rows[0].days_since_last_order(today()), None);

        let a = compute(&ds, &all(&ds), today()).activity;
        assert_eq!(a.inactivity_risk_90d, 1);
        assert_eq!(a.active_12m, 0);
        assert_eq!(a.days_since_mean, None);
        assert_eq!(a.days_since_median, None);
        assert_eq!(a.days_since_p90, None);
    }

    #[test]
    fn activity_windows_and_staleness() {
        let mut history = orders("A", 1, days_ago(10));
        history.extend(orders("B", 1, days_ago(91)));
        history.extend(orders("C", 1, days_ago(90)));
        history.extend(orders("D", 1, days_ago(500)));
        let ds = join(
            vec![
                supplier("A", "SP", Some(days_ago(30))),
                supplier("B", "SP", Some(days_ago(31))),
                supplier("C", "SP", None),
                supplier("D", "SP", None),
                supplier("E", "SP", Some(days_ago(1))),
            ],
            history,
        );
        let a = compute(&ds, &all(&ds), today()).activity;

        assert_eq!(a.total, 5);
        assert_eq!(a.registered_30d, 2); // A (boundary) and E
        assert_eq!(a.new_with_usage_30d, 1); // A only
        assert_eq!(a.active_12m, 3); // A, B, C
        assert!((a.active_pct - 60.0).abs() < 1e-9);
        assert_eq!(a.inactivity_risk_90d, 3); // B (91d), D, E (no orders)

        // days: [10, 90, 91, 500]
        assert_eq!(a.days_since_mean, Some(172.75));
        assert_eq!(a.days_since_median, Some(90.5));
        // pos = 0.9 * 3 = 2.7 → 91 + 0.7 * 409
        assert!((a.days_since_p90.unwrap() - 377.3).abs() < 1e-9);
    }

    #[test]
    fn duplicate_tax_ids_count_once() {
        let ds = join(
            vec![supplier("A", "SP", None), supplier("A", "SP", None)],
            orders("A", 3, days_ago(1)),
        );
        let m = compute(&ds, &all(&ds), today());
        assert_eq!(m.activity.total, 1);
        assert_eq!(m.activity.active_12m, 1);
        assert_eq!(m.top_suppliers.len(), 1);
        assert_eq!(m.top_suppliers[0].count, 3);
    }

    #[test]
    fn empty_view_yields_zeroes() {
        let ds = join(vec![supplier("A", "SP", None)], orders("A", 1, days_ago(1)));
        let m = compute(&ds, &[], today());
        assert_eq!(m.activity.total, 0);
        assert_eq!(m.activity.active_pct, 0.0);
        assert_eq!(m.activity.pareto, ParetoStats::default());
        assert!(m.top_suppliers.is_empty());
        assert!(m.by_state.is_empty());
    }

    #[test]
    fn chart_series() {
        let mut history = orders("A", 2, days_ago(10));
        history.extend(orders("B", 5, days_ago(10)));
        history.extend(orders("C", 2, days_ago(10)));
        let mut c = supplier("C", "", None);
        c.trade_name = String::new();
        c.categories = vec!["TI".into(), "OBRAS".into()];
        let ds = join(
            vec![supplier("A", "SP", None), supplier("B", "SP", None), c],
            history,
        );
        let m = compute(&ds, &all(&ds), today());

        let top: Vec<(&str, usize)> = m
            .top_suppliers
            .iter()
            .map(|e| (e.label.as_str(), e.count))
            .collect();
        // ties broken by label; C falls back to its legal name
        assert_eq!(top, vec![("B", 5), ("A", 2), ("C LTDA", 2)]);

        let states: Vec<(&str, usize)> =
            m.by_state.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(states, vec![("SP", 2), (NO_STATE_LABEL, 1)]);

        let cats: Vec<(&str, usize)> =
            m.by_category.iter().map(|e| (e.label.as_str(), e.count)).collect();
        assert_eq!(cats, vec![("TI", 3), ("OBRAS", 1)]);
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[4.0], 0.9), Some(4.0));
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 1.0), Some(4.0));
    }

    #[test]
    fn twelve_month_window_uses_calendar_months() {
        let w = Windows::at(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(w.last_12_months, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        assert_eq!(w.last_30_days, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
    }
}
