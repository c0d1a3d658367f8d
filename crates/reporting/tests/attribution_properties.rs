//! End-to-end properties of the attribution models over a realistic log.

use touchpoint_core::{CostTable, Event, EventLog, TouchpointError};
use touchpoint_reporting::{
    AttributionEngine, AttributionMatrix, AttributionModel, EventIndex, RoiCalculator,
};

const CHANNELS: [&str; 4] = ["social_media", "mobile_ads", "bloggers", "context_ads"];

/// Deterministic, deliberately unsorted log: 12 users over 10 weeks with a
/// handful of repeat purchases and same-week ties.
fn sample_log() -> EventLog {
    let mut events = Vec::new();
    for user in 1..=12u64 {
        for week in (1..=10i64).rev() {
            let slot = (user as i64 * 7 + week * 3) % 11;
            if slot < 5 {
                let channel = CHANNELS[((user as i64 + week) % 4) as usize];
                events.push(Event::touch(week, user, channel));
            }
            if slot == 2 || slot == 9 {
                let channel = CHANNELS[((user as i64 * week) % 4) as usize];
                let gmv = 10.0 * ((user as i64 + week) % 7 + 1) as f64 + 0.35;
                events.push(Event::purchase(week, user, channel, gmv));
            }
        }
    }
    EventLog::new(events).unwrap()
}

/// Summed purchase gmv per (week, user).
fn purchase_totals(log: &EventLog) -> Vec<((i64, u64), f64, usize)> {
    let index = EventIndex::build(log);
    let mut totals: Vec<((i64, u64), f64, usize)> = Vec::new();
    for (_, event) in log.purchases() {
        let key = (event.week, event.user_id);
        let touches = index.candidates(event.user_id, event.week).len();
        match totals.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => {
                entry.1 += event.gmv;
                entry.2 += touches;
            }
            None => totals.push((key, event.gmv, touches)),
        }
    }
    totals.sort_by_key(|(k, _, _)| *k);
    totals
}

fn assert_single_channel_rows(matrix: &AttributionMatrix, log: &EventLog) {
    let expected = purchase_totals(log);
    assert_eq!(matrix.rows.len(), expected.len());
    for (row, (key, gmv, _)) in matrix.rows.iter().zip(&expected) {
        assert_eq!((row.week, row.user_id), *key);
        assert_eq!(row.non_zero_channels(), 1, "row {key:?}");
        assert_eq!(row.total_gmv, *gmv, "row {key:?}");
    }
}

#[test]
fn test_sample_log_has_repeat_purchases() {
    let log = sample_log();
    let index = EventIndex::build(&log);
    let repeat = index
        .users()
        .filter(|(_, timeline)| timeline.purchases().count() > 1)
        .count();
    assert!(repeat > 0);
    assert!(log.purchases().count() > 12);
}

#[test]
fn test_last_touch_rows_have_one_channel_and_exact_total() {
    let log = sample_log();
    let matrix = AttributionEngine::default().last_touch(&log);
    assert_single_channel_rows(&matrix, &log);
    assert_eq!(matrix.omitted_purchases, 0);
}

#[test]
fn test_first_touch_rows_have_one_channel_and_exact_total() {
    let log = sample_log();
    let matrix = AttributionEngine::default().first_touch(&log);
    assert_single_channel_rows(&matrix, &log);
}

#[test]
fn test_linear_rows_within_rounding_tolerance() {
    let log = sample_log();
    let matrix = AttributionEngine::default().linear(&log);
    let expected = purchase_totals(&log);

    assert_eq!(matrix.rows.len(), expected.len());
    for (row, (key, gmv, touches)) in matrix.rows.iter().zip(&expected) {
        assert_eq!(row.total_gmv, row.amounts.iter().sum::<f64>());
        let tolerance = *touches as f64 * 0.005 + 1e-9;
        assert!(
            (row.total_gmv - gmv).abs() <= tolerance,
            "row {key:?}: {} vs {gmv}",
            row.total_gmv
        );
        for amount in &row.amounts {
            assert!(((amount * 100.0).round() - amount * 100.0).abs() < 1e-6);
        }
    }
}

#[test]
fn test_models_are_idempotent() {
    let log = sample_log();
    let engine = AttributionEngine::default();
    for model in AttributionModel::ALL {
        let first = serde_json::to_string(&engine.attribute(&log, model)).unwrap();
        let second = serde_json::to_string(&engine.attribute(&log, model)).unwrap();
        assert_eq!(first, second, "{model}");
    }
}

#[test]
fn test_output_does_not_depend_on_input_order_across_weeks() {
    let log = EventLog::new(vec![
        Event::purchase(5, 2, "bloggers", 30.0),
        Event::touch(4, 2, "mobile_ads"),
        Event::purchase(2, 1, "social_media", 10.0),
        Event::touch(1, 1, "context_ads"),
    ])
    .unwrap();
    let reversed = EventLog::new(log.events().iter().rev().cloned().collect()).unwrap();
    let engine = AttributionEngine::default();

    let a = engine.first_touch(&log);
    let b = engine.first_touch(&reversed);
    assert_eq!(a.get(2, 1, "context_ads"), Some(10.0));
    assert_eq!(a.get(5, 2, "mobile_ads"), Some(30.0));
    assert_eq!(b.get(2, 1, "context_ads"), Some(10.0));
    assert_eq!(b.get(5, 2, "mobile_ads"), Some(30.0));

    let keys = |m: &AttributionMatrix| m.rows.iter().map(|r| (r.week, r.user_id)).collect::<Vec<_>>();
    assert_eq!(keys(&a), vec![(2, 1), (5, 2)]);
    assert_eq!(keys(&a), keys(&b));
    for row in &a.rows {
        for channel in &a.channels {
            assert_eq!(a.get(row.week, row.user_id, channel), b.get(row.week, row.user_id, channel));
        }
    }
}

#[test]
fn test_windowing_for_repeat_buyer() {
    let mut events: Vec<_> = (1..=9).map(|w| Event::touch(w, 1, format!("ch{w}"))).collect();
    events.push(Event::purchase(2, 1, "ch2", 20.0));
    events.push(Event::purchase(5, 1, "ch5", 50.0));
    events.push(Event::purchase(9, 1, "ch9", 90.0));
    let log = EventLog::new(events).unwrap();

    let linear = AttributionEngine::default().linear(&log);
    // weeks 6..=9 touches plus the week 9 purchase itself
    assert_eq!(linear.get(9, 1, "ch6"), Some(18.0));
    assert_eq!(linear.get(9, 1, "ch9"), Some(36.0));
    assert_eq!(linear.get(9, 1, "ch5"), Some(0.0));

    let first = AttributionEngine::default().first_touch(&log);
    assert_eq!(first.get(9, 1, "ch6"), Some(90.0));
    assert_eq!(first.get(5, 1, "ch3"), Some(50.0));
    assert_eq!(first.get(2, 1, "ch1"), Some(20.0));
}

#[test]
fn test_roi_over_attributed_matrix() {
    let log = sample_log();
    let matrix = AttributionEngine::default().last_touch(&log);
    let costs = CostTable::new([
        ("social_media", 100.0),
        ("mobile_ads", 80.0),
        ("bloggers", 90.0),
        ("context_ads", 110.0),
    ])
    .unwrap();

    let report = RoiCalculator::compute(&matrix, &costs).unwrap();
    assert!(report.unmatched.is_empty());
    let attributed: f64 = report.rows.iter().map(|r| r.gmv).sum();
    assert!((attributed - matrix.total_gmv()).abs() < 1e-9);
    for row in &report.rows {
        let expected = ((row.gmv - row.costs) / row.costs * 100.0).round_ties_even() as i64;
        assert_eq!(row.roi_percent, expected);
    }
}

#[test]
fn test_roi_zero_cost_never_yields_infinity() {
    let log = EventLog::new(vec![Event::purchase(1, 1, "social_media", 4000.0)]).unwrap();
    let matrix = AttributionEngine::default().last_touch(&log);
    let costs = CostTable::new([("social_media", 0.0)]).unwrap();

    assert!(matches!(
        RoiCalculator::compute(&matrix, &costs),
        Err(TouchpointError::DivisionByZero { .. })
    ));
}

#[test]
fn test_u_shaped_output_serializes_as_pivot() {
    let log = EventLog::new(vec![
        Event::touch(1, 93, "context_ads"),
        Event::purchase(1, 34, "social_media", 50.0),
        Event::purchase(1, 26, "mobile_ads", 100.0),
    ])
    .unwrap();
    let output = AttributionEngine::default().attribute(&log, AttributionModel::UShaped);

    let json: serde_json::Value = serde_json::to_value(&output).unwrap();
    assert_eq!(json["shape"], "pivot");
    assert_eq!(json["table"]["channels"][1], "social_media");
    assert_eq!(json["table"]["rows"][0]["user_id"], 26);
}
