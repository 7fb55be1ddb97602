//! Routing of activity protocol events into a live set of running activities.
//!
//! The host process reports long-running work as a stream of `oneshot`, `start`, `progress`, and
//! `finish` events. Each activity id moves `Idle -> Active -> Done`; a oneshot goes straight from
//! `Idle` to `Done`. Events that break that protocol are rejected without touching state.

use std::cell::RefCell;
use std::collections::{btree_map::Entry, BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use workbench_host::unix_time_ms_now;

use crate::config::ActivityLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Surface an activity is rendered on.
pub enum ActivityLocation {
    #[default]
    /// Status area of the window.
    Window,
    /// Notification toast.
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Self-contained notification that never becomes active.
pub struct OneshotEvent {
    /// Occurrence id, unique and increasing per activity.
    pub id: u64,
    /// Activity identifier.
    pub activity_id: String,
    /// Display title.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Secondary text.
    pub detail: Option<String>,
    #[serde(default)]
    /// Rendering surface.
    pub location: ActivityLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Opens a long-running activity.
pub struct StartEvent {
    /// Occurrence id.
    pub id: u64,
    /// Activity identifier.
    pub activity_id: String,
    /// Display title, kept for the life of the activity unless a progress event renames it.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Initial detail text.
    pub detail: Option<String>,
    #[serde(default)]
    /// Rendering surface, inherited by later events.
    pub location: ActivityLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Reports progress on an active activity.
pub struct ProgressEvent {
    /// Occurrence id.
    pub id: u64,
    /// Activity identifier.
    pub activity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement title.
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement detail text.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Closes an active activity.
pub struct FinishEvent {
    /// Occurrence id.
    pub id: u64,
    /// Activity identifier.
    pub activity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Activity protocol event, externally tagged by kind (`{"start": {...}}`).
pub enum ActivityEvent {
    /// Instant notification.
    Oneshot(OneshotEvent),
    /// Activity started.
    Start(StartEvent),
    /// Activity progressed.
    Progress(ProgressEvent),
    /// Activity finished.
    Finish(FinishEvent),
}

impl ActivityEvent {
    /// Occurrence id of the event.
    pub fn id(&self) -> u64 {
        match self {
            Self::Oneshot(event) => event.id,
            Self::Start(event) => event.id,
            Self::Progress(event) => event.id,
            Self::Finish(event) => event.id,
        }
    }

    /// Activity the event belongs to.
    pub fn activity_id(&self) -> &str {
        match self {
            Self::Oneshot(event) => &event.activity_id,
            Self::Start(event) => &event.activity_id,
            Self::Progress(event) => &event.activity_id,
            Self::Finish(event) => &event.activity_id,
        }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Oneshot(_) => "oneshot",
            Self::Start(_) => "start",
            Self::Progress(_) => "progress",
            Self::Finish(_) => "finish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Live record of an active activity.
pub struct ActivityRecord {
    /// Occurrence id of the `start` event.
    pub id: u64,
    /// Activity identifier.
    pub activity_id: String,
    /// Current title.
    pub title: String,
    /// Title from the `start` event; progress renames never touch it.
    pub start_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Current detail text.
    pub detail: Option<String>,
    /// Rendering surface from the `start` event.
    pub location: ActivityLocation,
    /// Occurrence id of the last applied event.
    pub last_event_id: u64,
    /// Unix milliseconds when the activity started.
    pub started_at_unix_ms: u64,
    /// Unix milliseconds of the last applied event.
    pub updated_at_unix_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Protocol phase of an activity id.
pub enum ActivityPhase {
    /// No event seen, or history no longer remembers it.
    Idle,
    /// Started and not yet finished.
    Active,
    /// Finished or emitted as a oneshot.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// State change produced by an accepted event.
pub enum ActivityTransition {
    /// A oneshot was recorded.
    Oneshot(OneshotEvent),
    /// A new activity became active.
    Started(ActivityRecord),
    /// An active activity was updated.
    Progressed(ActivityRecord),
    /// An activity left the live set.
    Finished(ActivityRecord),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Events rejected by the activity protocol.
pub enum ProtocolViolation {
    /// `progress` or `finish` for an activity that is not active.
    #[error("{kind} event {id} for unknown activity `{activity_id}`")]
    UnknownActivity {
        /// Event kind.
        kind: &'static str,
        /// Occurrence id.
        id: u64,
        /// Activity identifier.
        activity_id: String,
    },
    /// `start` or `oneshot` for an activity that is already active.
    #[error("{kind} event {id} for activity `{activity_id}` which is already active")]
    AlreadyActive {
        /// Event kind.
        kind: &'static str,
        /// Occurrence id.
        id: u64,
        /// Activity identifier.
        activity_id: String,
    },
    /// An event whose id does not follow the last applied event of the same activity.
    #[error("{kind} event {id} for activity `{activity_id}` arrived after event {last_applied}")]
    OutOfOrder {
        /// Event kind.
        kind: &'static str,
        /// Occurrence id.
        id: u64,
        /// Activity identifier.
        activity_id: String,
        /// Last applied occurrence id.
        last_applied: u64,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Failures of [`ActivityRouter::dispatch_json`].
pub enum RouterError {
    /// The payload is not a well-formed activity event.
    #[error("malformed activity event: {0}")]
    Decode(String),
    /// The event was well-formed but broke the protocol.
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),
}

type SubscriberFn = Rc<dyn Fn(&[ActivityRecord])>;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    subscribers: BTreeMap<u64, SubscriberFn>,
}

/// Handle returned by [`ActivityRouter::subscribe`].
///
/// Delivery stops when the handle is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
    registry: Weak<RefCell<SubscriberRegistry>>,
    id: u64,
}

impl Subscription {
    /// Stops delivery to this subscriber.
    pub fn unsubscribe(self) {}

    fn detach(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().subscribers.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Applies activity events in arrival order and publishes the live set.
pub struct ActivityRouter {
    limits: ActivityLimits,
    live: BTreeMap<String, ActivityRecord>,
    history: VecDeque<ActivityEvent>,
    recent_oneshots: VecDeque<OneshotEvent>,
    registry: Rc<RefCell<SubscriberRegistry>>,
}

impl Default for ActivityRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActivityRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRouter")
            .field("limits", &self.limits)
            .field("live", &self.live)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl ActivityRouter {
    /// Creates a router bounded by the configured activity limits.
    pub fn new() -> Self {
        Self::with_limits(ActivityLimits::default())
    }

    /// Creates a router with explicit limits.
    pub fn with_limits(limits: ActivityLimits) -> Self {
        Self {
            limits,
            live: BTreeMap::new(),
            history: VecDeque::new(),
            recent_oneshots: VecDeque::new(),
            registry: Rc::default(),
        }
    }

    /// Applies one event.
    ///
    /// Accepted events are appended to history and the new live set is published to every
    /// subscriber. Rejected events are logged and leave all state untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolViolation`] that caused the event to be dropped.
    pub fn dispatch(&mut self, event: ActivityEvent) -> Result<ActivityTransition, ProtocolViolation> {
        match self.apply(&event) {
            Ok(transition) => {
                self.record_history(event);
                self.publish();
                Ok(transition)
            }
            Err(violation) => {
                tracing::warn!(%violation, "dropping activity event");
                Err(violation)
            }
        }
    }

    /// Decodes a wire payload and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Decode`] for malformed payloads and [`RouterError::Violation`] for
    /// rejected events.
    pub fn dispatch_json(&mut self, payload: Value) -> Result<ActivityTransition, RouterError> {
        let event = serde_json::from_value::<ActivityEvent>(payload).map_err(|err| {
            tracing::warn!(error = %err, "dropping malformed activity event");
            RouterError::Decode(err.to_string())
        })?;
        Ok(self.dispatch(event)?)
    }

    fn apply(&mut self, event: &ActivityEvent) -> Result<ActivityTransition, ProtocolViolation> {
        let already_active = || ProtocolViolation::AlreadyActive {
            kind: event.kind(),
            id: event.id(),
            activity_id: event.activity_id().to_string(),
        };
        let unknown = || ProtocolViolation::UnknownActivity {
            kind: event.kind(),
            id: event.id(),
            activity_id: event.activity_id().to_string(),
        };

        match event {
            ActivityEvent::Oneshot(oneshot) => {
                if self.live.contains_key(&oneshot.activity_id) {
                    return Err(already_active());
                }
                self.recent_oneshots.push_back(oneshot.clone());
                while self.recent_oneshots.len() > self.limits.max_recent_oneshots {
                    self.recent_oneshots.pop_front();
                }
                Ok(ActivityTransition::Oneshot(oneshot.clone()))
            }
            ActivityEvent::Start(start) => {
                let Entry::Vacant(slot) = self.live.entry(start.activity_id.clone()) else {
                    return Err(already_active());
                };
                let now = unix_time_ms_now();
                let record = slot.insert(ActivityRecord {
                    id: start.id,
                    activity_id: start.activity_id.clone(),
                    title: start.title.clone(),
                    start_title: start.title.clone(),
                    detail: start.detail.clone(),
                    location: start.location,
                    last_event_id: start.id,
                    started_at_unix_ms: now,
                    updated_at_unix_ms: now,
                });
                Ok(ActivityTransition::Started(record.clone()))
            }
            ActivityEvent::Progress(progress) => {
                let record = self.live.get_mut(&progress.activity_id).ok_or_else(unknown)?;
                ensure_in_order(record, event)?;
                record.last_event_id = progress.id;
                record.updated_at_unix_ms = unix_time_ms_now();
                if let Some(title) = &progress.title {
                    record.title = title.clone();
                }
                if let Some(detail) = &progress.detail {
                    record.detail = Some(detail.clone());
                }
                Ok(ActivityTransition::Progressed(record.clone()))
            }
            ActivityEvent::Finish(finish) => {
                let Entry::Occupied(slot) = self.live.entry(finish.activity_id.clone()) else {
                    return Err(unknown());
                };
                ensure_in_order(slot.get(), event)?;
                let mut record = slot.remove();
                record.last_event_id = finish.id;
                record.updated_at_unix_ms = unix_time_ms_now();
                Ok(ActivityTransition::Finished(record))
            }
        }
    }

    fn record_history(&mut self, event: ActivityEvent) {
        self.history.push_back(event);
        while self.history.len() > self.limits.max_history {
            self.history.pop_front();
        }
    }

    fn publish(&self) {
        let subscribers = self
            .registry
            .borrow()
            .subscribers
            .values()
            .cloned()
            .collect::<Vec<_>>();
        if subscribers.is_empty() {
            return;
        }
        let snapshot = self.list_active();
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
    }

    /// Registers `callback` to receive the full live set after every accepted event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[ActivityRecord]) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, Rc::new(callback));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }

    /// Active activities ordered by start occurrence id.
    pub fn list_active(&self) -> Vec<ActivityRecord> {
        let mut active = self.live.values().cloned().collect::<Vec<_>>();
        active.sort_by_key(|record| record.id);
        active
    }

    /// Active activities rendered on `location`, ordered by start occurrence id.
    pub fn list_active_at(&self, location: ActivityLocation) -> Vec<ActivityRecord> {
        let mut active = self.list_active();
        active.retain(|record| record.location == location);
        active
    }

    /// Live record of `activity_id`.
    pub fn get(&self, activity_id: &str) -> Option<&ActivityRecord> {
        self.live.get(activity_id)
    }

    /// Title `activity_id` was started with, while it is active.
    pub fn start_title(&self, activity_id: &str) -> Option<&str> {
        self.live
            .get(activity_id)
            .map(|record| record.start_title.as_str())
    }

    /// Protocol phase of `activity_id`.
    pub fn phase(&self, activity_id: &str) -> ActivityPhase {
        if self.live.contains_key(activity_id) {
            return ActivityPhase::Active;
        }
        let done = self.history.iter().rev().any(|event| {
            event.activity_id() == activity_id
                && matches!(event, ActivityEvent::Finish(_) | ActivityEvent::Oneshot(_))
        });
        if done {
            ActivityPhase::Done
        } else {
            ActivityPhase::Idle
        }
    }

    /// Accepted events, oldest first, bounded by the history limit.
    pub fn history(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.history.iter()
    }

    /// Oneshots not yet dismissed, oldest first.
    pub fn recent_oneshots(&self) -> impl Iterator<Item = &OneshotEvent> {
        self.recent_oneshots.iter()
    }

    /// Removes the oneshot with occurrence `id` from the recent list.
    pub fn dismiss_oneshot(&mut self, id: u64) -> Option<OneshotEvent> {
        let index = self.recent_oneshots.iter().position(|event| event.id == id)?;
        self.recent_oneshots.remove(index)
    }

    /// Drops every live activity, history entry, and recent oneshot, then publishes the empty set.
    ///
    /// Subscribers are notified even when nothing was live.
    pub fn clear(&mut self) {
        self.live.clear();
        self.history.clear();
        self.recent_oneshots.clear();
        self.publish();
    }
}

fn ensure_in_order(record: &ActivityRecord, event: &ActivityEvent) -> Result<(), ProtocolViolation> {
    if event.id() > record.last_event_id {
        Ok(())
    } else {
        Err(ProtocolViolation::OutOfOrder {
            kind: event.kind(),
            id: event.id(),
            activity_id: record.activity_id.clone(),
            last_applied: record.last_event_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    fn start(id: u64, activity_id: &str, title: &str) -> ActivityEvent {
        ActivityEvent::Start(StartEvent {
            id,
            activity_id: activity_id.to_string(),
            title: title.to_string(),
            detail: None,
            location: ActivityLocation::Window,
        })
    }

    fn progress(id: u64, activity_id: &str, detail: &str) -> ActivityEvent {
        ActivityEvent::Progress(ProgressEvent {
            id,
            activity_id: activity_id.to_string(),
            title: None,
            detail: Some(detail.to_string()),
        })
    }

    fn finish(id: u64, activity_id: &str) -> ActivityEvent {
        ActivityEvent::Finish(FinishEvent {
            id,
            activity_id: activity_id.to_string(),
        })
    }

    fn oneshot(id: u64, activity_id: &str) -> ActivityEvent {
        ActivityEvent::Oneshot(OneshotEvent {
            id,
            activity_id: activity_id.to_string(),
            title: "Saved".to_string(),
            detail: None,
            location: ActivityLocation::Notification,
        })
    }

    fn active_ids(router: &ActivityRouter) -> Vec<String> {
        router
            .list_active()
            .into_iter()
            .map(|record| record.activity_id)
            .collect()
    }

    #[test]
    fn start_progress_finish_walks_the_lifecycle() {
        let mut router = ActivityRouter::new();
        assert_eq!(router.phase("a"), ActivityPhase::Idle);

        router.dispatch(start(1, "a", "Indexing")).expect("start");
        assert_eq!(router.phase("a"), ActivityPhase::Active);

        let transition = router.dispatch(progress(2, "a", "50%")).expect("progress");
        let ActivityTransition::Progressed(record) = transition else {
            panic!("expected progress transition");
        };
        assert_eq!(record.title, "Indexing");
        assert_eq!(record.detail.as_deref(), Some("50%"));
        assert_eq!(router.start_title("a"), Some("Indexing"));

        router.dispatch(finish(3, "a")).expect("finish");
        assert_eq!(router.phase("a"), ActivityPhase::Done);
        assert!(router.list_active().is_empty());
        assert_eq!(router.start_title("a"), None);
    }

    #[test]
    fn start_title_survives_a_renaming_progress_event() {
        let mut router = ActivityRouter::new();
        router.dispatch(start(1, "a", "Indexing")).expect("start");
        router
            .dispatch(ActivityEvent::Progress(ProgressEvent {
                id: 2,
                activity_id: "a".to_string(),
                title: Some("Step 2".to_string()),
                detail: None,
            }))
            .expect("progress");

        assert_eq!(router.get("a").map(|record| record.title.as_str()), Some("Step 2"));
        assert_eq!(router.start_title("a"), Some("Indexing"));
    }

    #[test]
    fn oneshot_never_enters_the_live_set() {
        let mut router = ActivityRouter::new();
        let transition = router.dispatch(oneshot(1, "save")).expect("oneshot");
        assert!(matches!(transition, ActivityTransition::Oneshot(_)));
        assert!(router.list_active().is_empty());
        assert_eq!(router.phase("save"), ActivityPhase::Done);
        assert_eq!(router.recent_oneshots().count(), 1);
        assert_eq!(router.dismiss_oneshot(1).map(|event| event.id), Some(1));
        assert_eq!(router.recent_oneshots().count(), 0);
    }

    #[traced_test]
    #[test]
    fn protocol_violations_are_rejected_without_state_changes() {
        let mut router = ActivityRouter::new();
        router.dispatch(start(1, "a", "Sync")).expect("start");
        let before = router.list_active();

        assert!(matches!(
            router.dispatch(progress(2, "ghost", "x")),
            Err(ProtocolViolation::UnknownActivity { kind: "progress", .. })
        ));
        assert!(matches!(
            router.dispatch(finish(3, "ghost")),
            Err(ProtocolViolation::UnknownActivity { kind: "finish", .. })
        ));
        assert!(matches!(
            router.dispatch(start(4, "a", "Again")),
            Err(ProtocolViolation::AlreadyActive { kind: "start", .. })
        ));
        assert!(matches!(
            router.dispatch(oneshot(5, "a")),
            Err(ProtocolViolation::AlreadyActive { kind: "oneshot", .. })
        ));

        assert_eq!(router.list_active(), before);
        assert_eq!(router.history().count(), 1);
        assert!(logs_contain("dropping activity event"));
    }

    #[test]
    fn stale_events_for_the_same_activity_are_rejected() {
        let mut router = ActivityRouter::new();
        router.dispatch(start(10, "a", "Build")).expect("start");
        router.dispatch(progress(12, "a", "late")).expect("progress");

        assert_eq!(
            router.dispatch(progress(11, "a", "early")),
            Err(ProtocolViolation::OutOfOrder {
                kind: "progress",
                id: 11,
                activity_id: "a".to_string(),
                last_applied: 12,
            })
        );
        assert_eq!(
            router.get("a").and_then(|record| record.detail.clone()),
            Some("late".to_string())
        );
        assert!(matches!(
            router.dispatch(finish(12, "a")),
            Err(ProtocolViolation::OutOfOrder { .. })
        ));
        router.dispatch(finish(13, "a")).expect("finish");
    }

    #[test]
    fn live_set_is_ordered_by_start_id_and_filtered_by_location() {
        let mut router = ActivityRouter::new();
        router.dispatch(start(5, "later", "Later")).expect("start");
        router.dispatch(start(2, "earlier", "Earlier")).expect("start");
        router
            .dispatch(ActivityEvent::Start(StartEvent {
                id: 7,
                activity_id: "toast".to_string(),
                title: "Toast".to_string(),
                detail: None,
                location: ActivityLocation::Notification,
            }))
            .expect("start");

        assert_eq!(active_ids(&router), vec!["earlier", "later", "toast"]);
        let toasts = router.list_active_at(ActivityLocation::Notification);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].activity_id, "toast");
    }

    #[test]
    fn subscribers_receive_full_live_set_until_unsubscribed() {
        let mut router = ActivityRouter::new();
        let seen = Rc::new(RefCell::new(Vec::<Vec<String>>::new()));
        let sink = Rc::clone(&seen);
        let subscription = router.subscribe(move |active| {
            sink.borrow_mut()
                .push(active.iter().map(|record| record.activity_id.clone()).collect());
        });

        router.dispatch(start(1, "a", "A")).expect("start");
        router.dispatch(start(2, "b", "B")).expect("start");
        let _ = router.dispatch(finish(3, "missing"));
        router.dispatch(finish(4, "a")).expect("finish");
        assert_eq!(
            *seen.borrow(),
            vec![
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ]
        );

        subscription.unsubscribe();
        assert_eq!(router.subscriber_count(), 0);
        router.dispatch(finish(5, "b")).expect("finish");
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn dropping_a_subscription_stops_delivery() {
        let mut router = ActivityRouter::new();
        let calls = Rc::new(RefCell::new(0_u32));
        let counter = Rc::clone(&calls);
        {
            let _subscription = router.subscribe(move |_| *counter.borrow_mut() += 1);
            router.dispatch(start(1, "a", "A")).expect("start");
        }
        router.dispatch(finish(2, "a")).expect("finish");
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn dispatch_json_decodes_wire_events() {
        let mut router = ActivityRouter::new();
        router
            .dispatch_json(json!({"start": {"id": 1, "activityId": "a", "title": "Fetch"}}))
            .expect("start");
        router
            .dispatch_json(json!({"progress": {"id": 2, "activityId": "a", "detail": "1/3"}}))
            .expect("progress");
        assert_eq!(router.get("a").map(|record| record.location), Some(ActivityLocation::Window));

        assert!(matches!(
            router.dispatch_json(json!({"explode": {"id": 3}})),
            Err(RouterError::Decode(_))
        ));
        assert!(matches!(
            router.dispatch_json(json!({"finish": {"id": 4, "activityId": "b"}})),
            Err(RouterError::Violation(ProtocolViolation::UnknownActivity { .. }))
        ));
    }

    #[test]
    fn history_and_recent_oneshots_are_bounded() {
        let mut router = ActivityRouter::with_limits(ActivityLimits {
            max_history: 3,
            max_recent_oneshots: 2,
        });
        for id in 1..=5 {
            router.dispatch(oneshot(id, "note")).expect("oneshot");
        }
        assert_eq!(
            router.history().map(ActivityEvent::id).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
        assert_eq!(
            router.recent_oneshots().map(|event| event.id).collect::<Vec<_>>(),
            vec![4, 5]
        );
    }

    #[test]
    fn clear_drops_everything_and_publishes_empty_set() {
        let mut router = ActivityRouter::new();
        let last = Rc::new(RefCell::new(None::<usize>));
        let sink = Rc::clone(&last);
        let _subscription = router.subscribe(move |active| *sink.borrow_mut() = Some(active.len()));

        router.dispatch(start(1, "a", "A")).expect("start");
        router.clear();
        assert!(router.list_active().is_empty());
        assert_eq!(router.history().count(), 0);
        assert_eq!(*last.borrow(), Some(0));
        assert_eq!(router.phase("a"), ActivityPhase::Idle);
    }

    #[test]
    fn clear_notifies_subscribers_when_nothing_is_live() {
        let mut router = ActivityRouter::new();
        let calls = Rc::new(RefCell::new(Vec::<usize>::new()));
        let sink = Rc::clone(&calls);
        let _subscription = router.subscribe(move |active| sink.borrow_mut().push(active.len()));

        router.dispatch(oneshot(1, "save")).expect("oneshot");
        let before = calls.borrow().len();
        router.clear();

        assert_eq!(calls.borrow().len(), before + 1);
        assert_eq!(calls.borrow().last(), Some(&0));
        assert_eq!(router.recent_oneshots().count(), 0);
    }
}
