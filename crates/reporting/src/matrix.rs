//! Aggregation of allocation records into the wide attribution matrix, and
//! the user-by-channel pivot used by the U-shaped model.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use touchpoint_core::{AllocationRecord, UserId, Week};

/// Round half to even at `decimals` places.
pub fn round_half_even(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// One `(week, user)` row of an [`AttributionMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub week: Week,
    pub user_id: UserId,
    /// Amount per channel, aligned with [`AttributionMatrix::channels`].
    pub amounts: Vec<f64>,
    /// Sum of `amounts`.
    pub total_gmv: f64,
}

impl MatrixRow {
    pub fn non_zero_channels(&self) -> usize {
        self.amounts.iter().filter(|a| **a != 0.0).count()
    }
}

/// Attributed value per `(week, user)` and channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributionMatrix {
    pub channels: Vec<String>,
    /// Sorted by week, then user.
    pub rows: Vec<MatrixRow>,
    /// Purchases skipped because no touch was eligible for them.
    pub omitted_purchases: usize,
}

impl AttributionMatrix {
    pub fn channel_index(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    pub fn row(&self, week: Week, user_id: UserId) -> Option<&MatrixRow> {
        self.rows
            .binary_search_by_key(&(week, user_id), |r| (r.week, r.user_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Amount credited to `channel` in the `(week, user)` row.
    pub fn get(&self, week: Week, user_id: UserId, channel: &str) -> Option<f64> {
        let idx = self.channel_index(channel)?;
        self.row(week, user_id).map(|r| r.amounts[idx])
    }

    /// Column sums, in column order.
    pub fn channel_totals(&self) -> Vec<(&str, f64)> {
        self.channels
            .iter()
            .enumerate()
            .map(|(idx, channel)| {
                let total: f64 = self.rows.iter().map(|r| r.amounts[idx]).sum();
                (channel.as_str(), total)
            })
            .collect()
    }

    pub fn total_gmv(&self) -> f64 {
        self.rows.iter().map(|r| r.total_gmv).sum()
    }
}

/// Grouped-sum pass turning allocation records into an [`AttributionMatrix`].
///
/// Records for the same `(week, user, channel)` accumulate; nothing is ever
/// overwritten. When `decimals` is set, each cell is rounded once after all
/// records have been summed.
#[derive(Debug, Clone)]
pub struct Aggregator {
    channels: Vec<String>,
    decimals: Option<u32>,
}

impl Aggregator {
    pub fn new(channels: &[String]) -> Self {
        Self {
            channels: channels.to_vec(),
            decimals: None,
        }
    }

    pub fn rounded(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn aggregate(&self, records: &[AllocationRecord]) -> AttributionMatrix {
        let mut channels = self.channels.clone();
        let mut column: HashMap<String, usize> = channels
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), idx))
            .collect();
        let mut cells: BTreeMap<(Week, UserId), Vec<f64>> = BTreeMap::new();

        for record in records {
            let idx = match column.get(&record.channel) {
                Some(idx) => *idx,
                None => {
                    // Channel unknown to the log; append a column for it.
                    channels.push(record.channel.clone());
                    column.insert(record.channel.clone(), channels.len() - 1);
                    channels.len() - 1
                }
            };
            let row = cells.entry((record.week, record.user_id)).or_default();
            if row.len() <= idx {
                row.resize(idx + 1, 0.0);
            }
            row[idx] += record.amount;
        }

        let width = channels.len();
        let rows = cells
            .into_iter()
            .map(|((week, user_id), mut amounts)| {
                amounts.resize(width, 0.0);
                if let Some(decimals) = self.decimals {
                    for amount in amounts.iter_mut() {
                        *amount = round_half_even(*amount, decimals);
                    }
                }
                let total_gmv = amounts.iter().sum();
                MatrixRow {
                    week,
                    user_id,
                    amounts,
                    total_gmv,
                }
            })
            .collect();

        AttributionMatrix {
            channels,
            rows,
            omitted_purchases: 0,
        }
    }
}

/// One user row of a [`UShapedPivot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    pub user_id: UserId,
    pub values: Vec<f64>,
}

/// Raw event gmv pivoted by user and channel: each cell is the mean amount
/// of that user's event-level records on that channel, or 0 when there are
/// none.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UShapedPivot {
    pub channels: Vec<String>,
    /// Sorted by user.
    pub rows: Vec<PivotRow>,
}

impl UShapedPivot {
    pub fn from_records(channels: &[String], records: &[AllocationRecord]) -> Self {
        let column: HashMap<&str, usize> = channels
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.as_str(), idx))
            .collect();
        let width = channels.len();
        // (sum, count) per cell
        let mut cells: BTreeMap<UserId, Vec<(f64, u32)>> = BTreeMap::new();

        for record in records {
            let Some(&idx) = column.get(record.channel.as_str()) else {
                continue;
            };
            let row = cells
                .entry(record.user_id)
                .or_insert_with(|| vec![(0.0, 0); width]);
            row[idx].0 += record.amount;
            row[idx].1 += 1;
        }

        let rows = cells
            .into_iter()
            .map(|(user_id, sums)| PivotRow {
                user_id,
                values: sums
                    .into_iter()
                    .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
                    .collect(),
            })
            .collect();

        Self {
            channels: channels.to_vec(),
            rows,
        }
    }

    pub fn get(&self, user_id: UserId, channel: &str) -> Option<f64> {
        let idx = self.channels.iter().position(|c| c == channel)?;
        self.rows
            .binary_search_by_key(&user_id, |r| r.user_id)
            .ok()
            .map(|i| self.rows[i].values[idx])
    }
}
