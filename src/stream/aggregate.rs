use crate::error::{FleetError, Result};
use crate::model::{AttributedChange, MonthRow, MonthlyMatrix};
use std::collections::{BTreeMap, BTreeSet};

/// `YYYY-MM` → attributed changes, for one repository.
pub type MonthCounts = BTreeMap<String, u64>;

/// Fold one change into its month; undated changes have no bucket.
pub fn count_month(counts: &mut MonthCounts, change: AttributedChange) {
    if let Some(month) = change.month {
        *counts.entry(month).or_insert(0) += 1;
    }
}

/// Build the dense matrix: one row per month seen anywhere, one column per repository.
pub fn aggregate(per_repo: &[(String, MonthCounts)]) -> Result<MonthlyMatrix> {
    // zero-padded YYYY-MM sorts lexicographically
    let months: BTreeSet<&String> = per_repo.iter().flat_map(|(_, counts)| counts.keys()).collect();
    if months.is_empty() {
        return Err(FleetError::EmptyResultSet);
    }

    let rows = months
        .into_iter()
        .map(|month| MonthRow {
            month: month.clone(),
            counts: per_repo
                .iter()
                .map(|(_, counts)| counts.get(month).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    Ok(MonthlyMatrix {
        repos: per_repo.iter().map(|(id, _)| id.clone()).collect(),
        rows,
    })
}
