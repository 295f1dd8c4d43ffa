use std::collections::HashMap;

use chrono::NaiveDate;

use super::model::{OrderRecord, SupplierDataset, SupplierRecord, SupplierRow};

/// Max order date per supplier key over the full order history. Orders with a
/// null date are ignored; keys whose orders are all undated are absent.
pub fn last_order_by_supplier(orders: &[OrderRecord]) -> HashMap<&str, NaiveDate> {
    let mut last: HashMap<&str, NaiveDate> = HashMap::new();
    for order in orders {
        let Some(date) = order.ordered_on else {
            continue;
        };
        last.entry(order.supplier_tax_id.as_str())
            .and_modify(|d| *d = (*d).max(date))
            .or_insert(date);
    }
    last
}

/// Left-join each supplier with its last order date and build the dataset.
pub fn join(suppliers: Vec<SupplierRecord>, orders: Vec<OrderRecord>) -> SupplierDataset {
    let rows: Vec<SupplierRow> = {
        let last = last_order_by_supplier(&orders);
        suppliers
            .into_iter()
            .map(|supplier| {
                let last_order = last.get(supplier.tax_id.as_str()).copied();
                SupplierRow {
                    supplier,
                    last_order,
                }
            })
            .collect()
    };

    let dataset = SupplierDataset::from_rows(rows, orders);

    let unmatched = dataset
        .orders
        .iter()
        .filter(|o| !dataset.index_by_tax_id.contains_key(&o.supplier_tax_id))
        .count();
    let with_orders = dataset.rows.iter().filter(|r| r.last_order.is_some()).count();
    log::info!(
        "joined {} suppliers with {} orders ({} suppliers with orders, {} orders without a registered supplier)",
        dataset.len(),
        dataset.orders.len(),
        with_orders,
        unmatched
    );

    dataset
}
