//! Per-user chronological index over an event log, and the candidate window
//! that bounds which touches a purchase may be credited to.

use std::collections::BTreeMap;

use touchpoint_core::{Event, EventLog, TieBreak, UserId, Week};

/// An event together with its position in the input log.
#[derive(Debug, Clone, Copy)]
pub struct IndexedEvent<'a> {
    pub position: usize,
    pub event: &'a Event,
}

impl IndexedEvent<'_> {
    pub fn week(&self) -> Week {
        self.event.week
    }

    pub fn channel(&self) -> &str {
        &self.event.channel
    }
}

/// All events of one user ordered by `(week, input position)`.
#[derive(Debug, Default)]
pub struct UserTimeline<'a> {
    events: Vec<IndexedEvent<'a>>,
    /// Sorted, deduplicated weeks in which the user purchased.
    purchase_weeks: Vec<Week>,
}

impl<'a> UserTimeline<'a> {
    pub fn events(&self) -> &[IndexedEvent<'a>] {
        &self.events
    }

    pub fn purchases(&self) -> impl Iterator<Item = &IndexedEvent<'a>> {
        self.events.iter().filter(|e| e.event.is_purchase)
    }

    /// Closest purchase week strictly before `week`.
    pub fn previous_purchase_week(&self, week: Week) -> Option<Week> {
        let idx = self.purchase_weeks.partition_point(|&w| w < week);
        idx.checked_sub(1).map(|i| self.purchase_weeks[i])
    }
}

/// Per-user view of an [`EventLog`], built once and shared by every model
/// and every purchase.
#[derive(Debug)]
pub struct EventIndex<'a> {
    users: BTreeMap<UserId, UserTimeline<'a>>,
    channels: &'a [String],
}

impl<'a> EventIndex<'a> {
    pub fn build(log: &'a EventLog) -> Self {
        let mut users: BTreeMap<UserId, UserTimeline<'a>> = BTreeMap::new();

        for (position, event) in log.events().iter().enumerate() {
            let timeline = users.entry(event.user_id).or_default();
            timeline.events.push(IndexedEvent { position, event });
            if event.is_purchase {
                timeline.purchase_weeks.push(event.week);
            }
        }

        for timeline in users.values_mut() {
            timeline.events.sort_by_key(|e| (e.event.week, e.position));
            timeline.purchase_weeks.sort_unstable();
            timeline.purchase_weeks.dedup();
        }

        Self {
            users,
            channels: log.channels(),
        }
    }

    pub fn user(&self, user_id: UserId) -> Option<&UserTimeline<'a>> {
        self.users.get(&user_id)
    }

    pub fn users(&self) -> impl Iterator<Item = (UserId, &UserTimeline<'a>)> {
        self.users.iter().map(|(id, timeline)| (*id, timeline))
    }

    /// Channels of the underlying log in first-seen order.
    pub fn channels(&self) -> &'a [String] {
        self.channels
    }

    /// Every purchase, ordered by user then chronologically.
    pub fn purchases(&self) -> impl Iterator<Item = &IndexedEvent<'a>> {
        self.users.values().flat_map(|timeline| timeline.purchases())
    }

    pub fn candidates(&self, user_id: UserId, week: Week) -> CandidateWindow<'_, 'a> {
        CandidateWindow::for_purchase(self, user_id, week)
    }
}

/// The touches of one user eligible for a purchase in `upper` week: every
/// event in `(lower, upper]`, where `lower` is the user's closest earlier
/// purchase week, or every event up to `upper` when there is none.
#[derive(Debug, Clone, Copy)]
pub struct CandidateWindow<'i, 'a> {
    lower: Option<Week>,
    upper: Week,
    touches: &'i [IndexedEvent<'a>],
}

impl<'i, 'a> CandidateWindow<'i, 'a> {
    pub fn for_purchase(index: &'i EventIndex<'a>, user_id: UserId, week: Week) -> Self {
        let Some(timeline) = index.user(user_id) else {
            return Self {
                lower: None,
                upper: week,
                touches: &[],
            };
        };

        let lower = timeline.previous_purchase_week(week);
        let events = timeline.events();
        let start = match lower {
            Some(prev) => events.partition_point(|e| e.week() <= prev),
            None => 0,
        };
        let end = events.partition_point(|e| e.week() <= week);

        Self {
            lower,
            upper: week,
            touches: &events[start..end.max(start)],
        }
    }

    /// Exclusive lower bound, if the user purchased before.
    pub fn lower_bound(&self) -> Option<Week> {
        self.lower
    }

    /// Inclusive upper bound: the purchase week.
    pub fn upper_bound(&self) -> Week {
        self.upper
    }

    /// Candidate touches ordered by `(week, input position)`.
    pub fn touches(&self) -> &'i [IndexedEvent<'a>] {
        self.touches
    }

    pub fn len(&self) -> usize {
        self.touches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }

    /// Touch in the latest week of the window.
    pub fn latest(&self, tie_break: TieBreak) -> Option<&'i IndexedEvent<'a>> {
        let week = self.touches.last()?.week();
        self.pick_in_week(week, tie_break)
    }

    /// Touch in the earliest week of the window.
    pub fn earliest(&self, tie_break: TieBreak) -> Option<&'i IndexedEvent<'a>> {
        let week = self.touches.first()?.week();
        self.pick_in_week(week, tie_break)
    }

    fn pick_in_week(&self, week: Week, tie_break: TieBreak) -> Option<&'i IndexedEvent<'a>> {
        let touches = self.touches;
        let start = touches.partition_point(|e| e.week() < week);
        let end = touches.partition_point(|e| e.week() <= week);
        let same_week = &touches[start..end];
        match tie_break {
            TieBreak::FirstSeen => same_week.first(),
            TieBreak::LastSeen => same_week.last(),
        }
    }
}
