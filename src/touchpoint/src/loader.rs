//! CSV loading for the event log and the cost table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use touchpoint_core::schema::{
    cost_table_from_records, event_log_from_records, require_columns, COST_COLUMNS, EVENT_COLUMNS,
};
use touchpoint_core::{CostRecord, CostTable, EventLog, EventRecord, TouchpointError, TouchpointResult};
use tracing::debug;

pub fn read_events<R: Read>(reader: R) -> TouchpointResult<EventLog> {
    let records: Vec<EventRecord> = read_table("events", &EVENT_COLUMNS, reader)?;
    event_log_from_records(records)
}

pub fn read_costs<R: Read>(reader: R) -> TouchpointResult<CostTable> {
    let records: Vec<CostRecord> = read_table("costs", &COST_COLUMNS, reader)?;
    cost_table_from_records(records)
}

pub fn load_events(path: &Path) -> TouchpointResult<EventLog> {
    let log = read_events(File::open(path)?)?;
    debug!(path = %path.display(), events = log.len(), "Event log loaded");
    Ok(log)
}

pub fn load_costs(path: &Path) -> TouchpointResult<CostTable> {
    let costs = read_costs(File::open(path)?)?;
    debug!(path = %path.display(), channels = costs.len(), "Cost table loaded");
    Ok(costs)
}

fn read_table<T, R>(table: &str, columns: &[&str], reader: R) -> TouchpointResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| TouchpointError::Schema(format!("{}: unreadable header: {}", table, e)))?
        .clone();
    require_columns(table, headers.iter(), columns)?;

    reader
        .deserialize()
        .enumerate()
        .map(|(row, result)| {
            result.map_err(|e| TouchpointError::Schema(format!("{} row {}: {}", table, row, e)))
        })
        .collect()
}
