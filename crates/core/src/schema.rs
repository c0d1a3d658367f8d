//! Raw tabular rows as handed over by a loader, and their conversion into
//! validated domain types.

use serde::{Deserialize, Serialize};

use crate::error::{TouchpointError, TouchpointResult};
use crate::types::{CostTable, Event, EventLog, UserId, Week};

pub const EVENT_COLUMNS: [&str; 5] = ["week", "user_id", "channel", "is_purchased", "gmv"];
pub const COST_COLUMNS: [&str; 2] = ["channel", "costs"];

/// One row of the event table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub week: Week,
    pub user_id: UserId,
    pub channel: String,
    /// `0` for a touch, `1` for a purchase.
    pub is_purchased: u8,
    pub gmv: f64,
}

/// One row of the cost table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub channel: String,
    pub costs: f64,
}

impl TryFrom<EventRecord> for Event {
    type Error = TouchpointError;

    fn try_from(record: EventRecord) -> TouchpointResult<Self> {
        let is_purchase = match record.is_purchased {
            0 => false,
            1 => true,
            other => {
                return Err(TouchpointError::Schema(format!(
                    "is_purchased must be 0 or 1, got {}",
                    other
                )))
            }
        };
        let event = Event {
            week: record.week,
            user_id: record.user_id,
            channel: record.channel,
            is_purchase,
            gmv: record.gmv,
        };
        event.validate()?;
        Ok(event)
    }
}

/// Fail when any of `required` is absent from `headers`.
pub fn require_columns<'a, I>(table: &str, headers: I, required: &[&str]) -> TouchpointResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = headers.into_iter().map(str::trim).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TouchpointError::Schema(format!(
            "{}: missing required column(s): {}",
            table,
            missing.join(", ")
        )))
    }
}

/// Convert raw event rows into a validated [`EventLog`]. The first invalid
/// row aborts the conversion.
pub fn event_log_from_records<I>(records: I) -> TouchpointResult<EventLog>
where
    I: IntoIterator<Item = EventRecord>,
{
    let events = records
        .into_iter()
        .enumerate()
        .map(|(row, record)| {
            Event::try_from(record).map_err(|e| match e {
                TouchpointError::Schema(msg) => {
                    TouchpointError::Schema(format!("events row {}: {}", row, msg))
                }
                other => other,
            })
        })
        .collect::<TouchpointResult<Vec<_>>>()?;
    EventLog::new(events)
}

pub fn cost_table_from_records<I>(records: I) -> TouchpointResult<CostTable>
where
    I: IntoIterator<Item = CostRecord>,
{
    CostTable::new(records.into_iter().map(|r| (r.channel, r.costs)))
}
