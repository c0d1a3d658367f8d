//! Domain types shared by every attribution model.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TouchpointError, TouchpointResult};

/// Ordinal week number. Only the ordering matters, not the calendar.
pub type Week = i64;

pub type UserId = u64;

/// A single row of the event log: either a marketing touch or a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub week: Week,
    pub user_id: UserId,
    pub channel: String,
    pub is_purchase: bool,
    /// Gross merchandise value. Always zero for touches.
    pub gmv: f64,
}

impl Event {
    pub fn touch(week: Week, user_id: UserId, channel: impl Into<String>) -> Self {
        Self {
            week,
            user_id,
            channel: channel.into(),
            is_purchase: false,
            gmv: 0.0,
        }
    }

    pub fn purchase(week: Week, user_id: UserId, channel: impl Into<String>, gmv: f64) -> Self {
        Self {
            week,
            user_id,
            channel: channel.into(),
            is_purchase: true,
            gmv,
        }
    }

    /// Check the per-event invariants: finite, non-negative gmv that is only
    /// carried by purchases.
    pub fn validate(&self) -> TouchpointResult<()> {
        if !self.gmv.is_finite() || self.gmv < 0.0 {
            return Err(TouchpointError::Schema(format!(
                "gmv must be a non-negative number, got {}",
                self.gmv
            )));
        }
        if self.gmv > 0.0 && !self.is_purchase {
            return Err(TouchpointError::Schema(format!(
                "non-purchase event for user {} in week {} carries gmv {}",
                self.user_id, self.week, self.gmv
            )));
        }
        if self.channel.is_empty() {
            return Err(TouchpointError::Schema("channel must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Validated, immutable event log.
///
/// Input order is not assumed to be chronological; it is kept only so that
/// ties between events of the same week can be broken deterministically.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    events: Vec<Event>,
    channels: Vec<String>,
}

impl EventLog {
    pub fn new(events: Vec<Event>) -> TouchpointResult<Self> {
        let channels = {
            let mut seen = HashSet::new();
            let mut channels = Vec::new();
            for (position, event) in events.iter().enumerate() {
                event.validate().map_err(|e| match e {
                    TouchpointError::Schema(msg) => {
                        TouchpointError::Schema(format!("events row {}: {}", position, msg))
                    }
                    other => other,
                })?;
                if seen.insert(event.channel.as_str()) {
                    channels.push(event.channel.clone());
                }
            }
            channels
        };

        debug!(events = events.len(), channels = channels.len(), "Event log validated");
        Ok(Self { events, channels })
    }

    /// Events in input order; the slice index is the input position.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Distinct channels in first-seen order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn purchases(&self) -> impl Iterator<Item = (usize, &Event)> {
        self.events.iter().enumerate().filter(|(_, e)| e.is_purchase)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One unit of credit assigned by a model to a channel for a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub week: Week,
    pub user_id: UserId,
    pub channel: String,
    pub amount: f64,
}

/// Advertising spend per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostTable {
    costs: BTreeMap<String, f64>,
}

impl CostTable {
    pub fn new<I, S>(entries: I) -> TouchpointResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut costs = BTreeMap::new();
        for (channel, spend) in entries {
            let channel = channel.into();
            if channel.is_empty() {
                return Err(TouchpointError::Schema(
                    "costs: channel must not be empty".to_string(),
                ));
            }
            if !spend.is_finite() || spend < 0.0 {
                return Err(TouchpointError::Schema(format!(
                    "costs: spend for channel '{}' must be a non-negative number, got {}",
                    channel, spend
                )));
            }
            if costs.insert(channel.clone(), spend).is_some() {
                return Err(TouchpointError::Schema(format!(
                    "costs: duplicate channel '{}'",
                    channel
                )));
            }
        }
        Ok(Self { costs })
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.costs.get(channel).copied()
    }

    /// Channels in ascending name order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.costs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_keeps_first_seen_channel_order() {
        let log = EventLog::new(vec![
            Event::touch(3, 1, "context_ads"),
            Event::touch(1, 2, "social_media"),
            Event::purchase(2, 1, "context_ads", 50.0),
            Event::touch(1, 3, "bloggers"),
        ])
        .unwrap();

        assert_eq!(log.channels(), &["context_ads", "social_media", "bloggers"]);
        assert_eq!(log.len(), 4);
        assert_eq!(log.purchases().count(), 1);
    }

    #[test]
    fn test_touch_with_gmv_is_rejected() {
        let mut touch = Event::touch(1, 1, "mobile_ads");
        touch.gmv = 10.0;

        let err = EventLog::new(vec![Event::touch(1, 1, "a"), touch]).unwrap_err();
        match err {
            TouchpointError::Schema(msg) => assert!(msg.starts_with("events row 1:"), "{msg}"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_or_nan_gmv_is_rejected() {
        assert!(Event::purchase(1, 1, "a", -5.0).validate().is_err());
        assert!(Event::purchase(1, 1, "a", f64::NAN).validate().is_err());
        assert!(Event::purchase(1, 1, "a", 0.0).validate().is_ok());
    }

    #[test]
    fn test_cost_table_rejects_duplicates_and_negative_spend() {
        let dup = CostTable::new([("tv", 10.0), ("tv", 20.0)]);
        assert!(matches!(dup, Err(TouchpointError::Schema(_))));

        let negative = CostTable::new([("tv", -1.0)]);
        assert!(matches!(negative, Err(TouchpointError::Schema(_))));

        let ok = CostTable::new([("tv", 0.0), ("bloggers", 900.0)]).unwrap();
        assert_eq!(ok.get("tv"), Some(0.0));
        assert_eq!(ok.get("radio"), None);
        assert_eq!(ok.channels().collect::<Vec<_>>(), vec!["bloggers", "tv"]);
    }
}
