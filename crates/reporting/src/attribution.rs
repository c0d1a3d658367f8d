//! Revenue attribution: credits each purchase's gmv to the marketing
//! channels that led to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use touchpoint_core::{AllocationRecord, EngineConfig, EventLog, TouchpointError};

use crate::index::{CandidateWindow, EventIndex};
use crate::matrix::{Aggregator, AttributionMatrix, UShapedPivot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    /// Full credit to the latest touch of the purchase window.
    LastTouch,
    /// Full credit to the earliest touch of the purchase window.
    FirstTouch,
    /// Equal credit to every touch of the purchase window.
    Linear,
    /// Event gmv pivoted by user and channel. Not a 40/20/40 position split.
    UShaped,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 4] = [
        AttributionModel::LastTouch,
        AttributionModel::FirstTouch,
        AttributionModel::Linear,
        AttributionModel::UShaped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionModel::LastTouch => "last_touch",
            AttributionModel::FirstTouch => "first_touch",
            AttributionModel::Linear => "linear",
            AttributionModel::UShaped => "u_shaped",
        }
    }

    /// Whether the model segments touches by purchase window.
    pub fn is_windowed(&self) -> bool {
        !matches!(self, AttributionModel::UShaped)
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionModel {
    type Err = TouchpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| TouchpointError::Config(format!("unknown attribution model '{}'", s)))
    }
}

/// Allocation records produced by one model over one log.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Allocation {
    pub records: Vec<AllocationRecord>,
    /// Purchases with an empty candidate window.
    pub omitted_purchases: usize,
}

/// Result of [`AttributionEngine::attribute`]; the U-shaped model has a
/// different shape from the windowed ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "table", rename_all = "snake_case")]
pub enum AttributionOutput {
    Matrix(AttributionMatrix),
    Pivot(UShapedPivot),
}

impl AttributionOutput {
    pub fn as_matrix(&self) -> Option<&AttributionMatrix> {
        match self {
            AttributionOutput::Matrix(m) => Some(m),
            AttributionOutput::Pivot(_) => None,
        }
    }

    pub fn into_matrix(self) -> Option<AttributionMatrix> {
        match self {
            AttributionOutput::Matrix(m) => Some(m),
            AttributionOutput::Pivot(_) => None,
        }
    }
}

/// Stateless attribution engine. Every method reads its inputs and returns
/// a fresh result, so repeated calls over the same log are identical.
#[derive(Debug, Clone, Default)]
pub struct AttributionEngine {
    config: EngineConfig,
}

impl AttributionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn attribute(&self, log: &EventLog, model: AttributionModel) -> AttributionOutput {
        match model {
            AttributionModel::UShaped => AttributionOutput::Pivot(self.u_shaped(log)),
            windowed => AttributionOutput::Matrix(self.windowed(log, windowed)),
        }
    }

    pub fn last_touch(&self, log: &EventLog) -> AttributionMatrix {
        self.windowed(log, AttributionModel::LastTouch)
    }

    pub fn first_touch(&self, log: &EventLog) -> AttributionMatrix {
        self.windowed(log, AttributionModel::FirstTouch)
    }

    pub fn linear(&self, log: &EventLog) -> AttributionMatrix {
        self.windowed(log, AttributionModel::Linear)
    }

    pub fn u_shaped(&self, log: &EventLog) -> UShapedPivot {
        let index = EventIndex::build(log);
        let allocation = self.allocate(&index, AttributionModel::UShaped);
        let pivot = UShapedPivot::from_records(log.channels(), &allocation.records);
        info!(
            model = %AttributionModel::UShaped,
            users = pivot.rows.len(),
            channels = pivot.channels.len(),
            "Attribution computed"
        );
        pivot
    }

    /// Credit records for every purchase in the index.
    ///
    /// The U-shaped model does not segment by purchase, so it yields one
    /// record per event carrying that event's raw gmv.
    pub fn allocate(&self, index: &EventIndex<'_>, model: AttributionModel) -> Allocation {
        let mut allocation = Allocation::default();

        if model == AttributionModel::UShaped {
            allocation.records = index
                .users()
                .flat_map(|(_, timeline)| timeline.events())
                .map(|e| AllocationRecord {
                    week: e.event.week,
                    user_id: e.event.user_id,
                    channel: e.event.channel.clone(),
                    amount: e.event.gmv,
                })
                .collect();
            return allocation;
        }

        let tie_break = self.config.tie_break;
        for purchase in index.purchases() {
            let event = purchase.event;
            let window = CandidateWindow::for_purchase(index, event.user_id, event.week);
            if window.is_empty() {
                debug!(
                    user_id = event.user_id,
                    week = event.week,
                    "No eligible touch for purchase, omitting"
                );
                allocation.omitted_purchases += 1;
                continue;
            }

            let credit = |channel: &str, amount: f64| AllocationRecord {
                week: event.week,
                user_id: event.user_id,
                channel: channel.to_string(),
                amount,
            };

            match model {
                AttributionModel::LastTouch | AttributionModel::FirstTouch => {
                    let touch = if model == AttributionModel::LastTouch {
                        window.latest(tie_break)
                    } else {
                        window.earliest(tie_break)
                    };
                    if let Some(touch) = touch {
                        allocation.records.push(credit(touch.channel(), event.gmv));
                    }
                }
                AttributionModel::Linear => {
                    let share = event.gmv / window.len() as f64;
                    allocation
                        .records
                        .extend(window.touches().iter().map(|t| credit(t.channel(), share)));
                }
                // event-level, returned above
                AttributionModel::UShaped => {}
            }
        }

        allocation
    }

    fn windowed(&self, log: &EventLog, model: AttributionModel) -> AttributionMatrix {
        let index = EventIndex::build(log);
        let allocation = self.allocate(&index, model);

        let aggregator = match model {
            AttributionModel::Linear => {
                Aggregator::new(log.channels()).rounded(self.config.linear_decimals)
            }
            _ => Aggregator::new(log.channels()),
        };
        let mut matrix = aggregator.aggregate(&allocation.records);
        matrix.omitted_purchases = allocation.omitted_purchases;

        info!(
            model = %model,
            records = allocation.records.len(),
            rows = matrix.rows.len(),
            omitted = matrix.omitted_purchases,
            "Attribution computed"
        );
        matrix
    }
}
