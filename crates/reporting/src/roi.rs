//! Per-channel ROI of attributed gmv against advertising spend.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use touchpoint_core::{CostTable, TouchpointError, TouchpointResult};

use crate::matrix::AttributionMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRow {
    pub channel: String,
    /// Attributed gmv summed over every matrix row.
    pub gmv: f64,
    pub costs: f64,
    /// `(gmv - costs) / costs * 100`, rounded half to even.
    pub roi_percent: i64,
}

/// Which side of the join lacked the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSide {
    Cost,
    Attribution,
}

/// Advisory for a channel dropped by the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedChannel {
    pub channel: String,
    pub missing: MissingSide,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoiReport {
    /// In attribution column order.
    pub rows: Vec<RoiRow>,
    pub unmatched: Vec<UnmatchedChannel>,
}

impl RoiReport {
    pub fn get(&self, channel: &str) -> Option<&RoiRow> {
        self.rows.iter().find(|r| r.channel == channel)
    }
}

pub struct RoiCalculator;

impl RoiCalculator {
    /// ROI of a single channel. Fails on zero spend instead of producing an
    /// infinite or NaN percentage.
    pub fn channel_roi(channel: &str, gmv: f64, costs: f64) -> TouchpointResult<RoiRow> {
        if costs == 0.0 {
            return Err(TouchpointError::DivisionByZero {
                channel: channel.to_string(),
            });
        }
        let roi_percent = ((gmv - costs) / costs * 100.0).round_ties_even() as i64;
        Ok(RoiRow {
            channel: channel.to_string(),
            gmv,
            costs,
            roi_percent,
        })
    }

    /// Inner-join the matrix column sums with `costs`.
    ///
    /// Channels present on only one side are left out of `rows` and listed in
    /// `unmatched`. Any joined channel with zero spend fails the whole report.
    pub fn compute(matrix: &AttributionMatrix, costs: &CostTable) -> TouchpointResult<RoiReport> {
        let mut report = RoiReport::default();
        let totals = matrix.channel_totals();

        for (channel, gmv) in &totals {
            match costs.get(channel) {
                Some(spend) => report.rows.push(Self::channel_roi(channel, *gmv, spend)?),
                None => report.unmatched.push(UnmatchedChannel {
                    channel: channel.to_string(),
                    missing: MissingSide::Cost,
                }),
            }
        }

        for channel in costs.channels() {
            if !totals.iter().any(|(c, _)| *c == channel) {
                report.unmatched.push(UnmatchedChannel {
                    channel: channel.to_string(),
                    missing: MissingSide::Attribution,
                });
            }
        }

        for advisory in &report.unmatched {
            warn!(
                channel = %advisory.channel,
                missing = ?advisory.missing,
                "Channel dropped from ROI join"
            );
        }
        info!(
            channels = report.rows.len(),
            unmatched = report.unmatched.len(),
            "ROI computed"
        );

        Ok(report)
    }
}
