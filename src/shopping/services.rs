use std::collections::BTreeMap;

use uuid::Uuid;

use super::repo::{self, CartLine};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Groups lines by `(name, unit)` and sums amounts. The result is sorted by
/// name, then unit, whatever the input order.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingItem>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub fn render(items: &[ShoppingItem]) -> String {
    items
        .iter()
        .map(|i| format!("{} - {} {}\n", i.name, i.total, i.measurement_unit))
        .collect()
}

pub async fn shopping_list(state: &AppState, user_id: Uuid) -> anyhow::Result<Vec<ShoppingItem>> {
    let lines = repo::cart_lines(&state.db, user_id).await?;
    Ok(aggregate(lines))
}
