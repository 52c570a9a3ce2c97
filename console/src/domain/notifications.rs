//! Process-wide queue of timed, severity-tagged notifications.
//!
//! Notifications are appended with a fresh monotonic id. A positive
//! duration schedules a removal task; the task handles are retained so
//! `remove` can cancel one and `shutdown` (or dropping the centre) can
//! cancel all of them. `clear_all` empties the queue but leaves the timers
//! running; when they fire, they find nothing to remove.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Visual category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Completed action.
    Success,
    /// Failed action.
    Error,
    /// Degraded or throttled action.
    Warning,
    /// Neutral information.
    Info,
}

impl Severity {
    /// Lower-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default display time per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationDurations {
    /// Display time for success messages.
    pub success: Duration,
    /// Display time for info messages.
    pub info: Duration,
    /// Display time for warnings.
    pub warning: Duration,
    /// Display time for errors.
    pub error: Duration,
}

impl NotificationDurations {
    /// Display time for `severity`.
    pub const fn for_severity(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Success => self.success,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        }
    }
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            success: Duration::from_millis(3000),
            info: Duration::from_millis(5000),
            warning: Duration::from_millis(6000),
            error: Duration::from_millis(8000),
        }
    }
}

/// Monotonic notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique, increasing id.
    pub id: NotificationId,
    /// Text shown to the user.
    pub message: String,
    /// Visual category.
    pub severity: Severity,
    /// When the notification was pushed.
    pub created_at: DateTime<Utc>,
}

struct Shared {
    queue: watch::Sender<Vec<Notification>>,
    timers: Mutex<HashMap<NotificationId, AbortHandle>>,
}

impl Shared {
    fn lock_timers(&self) -> MutexGuard<'_, HashMap<NotificationId, AbortHandle>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_entry(&self, id: NotificationId) -> bool {
        self.queue.send_if_modified(|queue| {
            let before = queue.len();
            queue.retain(|notification| notification.id != id);
            queue.len() != before
        })
    }
}

/// Notification queue shared by every store.
pub struct NotificationCenter {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    durations: NotificationDurations,
    clock: Arc<dyn Clock>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NotificationDurations::default())
    }
}

impl NotificationCenter {
    /// Empty centre using `durations` as per-severity defaults.
    pub fn new(durations: NotificationDurations) -> Self {
        let (queue, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                queue,
                timers: Mutex::new(HashMap::new()),
            }),
            next_id: AtomicU64::new(1),
            durations,
            clock: Arc::new(DefaultClock),
        }
    }

    /// Replace the clock used for `created_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append a notification.
    ///
    /// `duration` overrides the per-severity default; a zero duration keeps
    /// the notification until it is removed explicitly. Scheduling requires
    /// a tokio runtime; without one the notification simply stays.
    pub fn push(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
    ) -> NotificationId {
        let id = NotificationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            created_at: self.clock.utc(),
        };
        debug!(id = id.get(), severity = %severity, "notification pushed");
        self.shared.queue.send_modify(|queue| queue.push(notification));

        let duration = duration.unwrap_or_else(|| self.durations.for_severity(severity));
        if !duration.is_zero() {
            self.schedule_removal(id, duration);
        }
        id
    }

    /// Push a success notification with the default duration.
    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Success, None)
    }

    /// Push an error notification with the default duration.
    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Error, None)
    }

    /// Push a warning with the default duration.
    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Warning, None)
    }

    /// Push an info notification with the default duration.
    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, Severity::Info, None)
    }

    /// Remove a notification and cancel its timer. Unknown ids are ignored.
    pub fn remove(&self, id: NotificationId) {
        if let Some(timer) = self.shared.lock_timers().remove(&id) {
            timer.abort();
        }
        self.shared.remove_entry(id);
    }

    /// Empty the queue. Pending timers keep running and fire as no-ops.
    pub fn clear_all(&self) {
        self.shared.queue.send_if_modified(|queue| {
            let had_entries = !queue.is_empty();
            queue.clear();
            had_entries
        });
    }

    /// Cancel every pending removal timer.
    pub fn shutdown(&self) {
        let timers: Vec<_> = self.shared.lock_timers().drain().collect();
        for (_, timer) in timers {
            timer.abort();
        }
    }

    /// Current queue, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.shared.queue.borrow().clone()
    }

    /// Number of queued notifications.
    pub fn len(&self) -> usize {
        self.shared.queue.borrow().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.queue.borrow().is_empty()
    }

    /// Number of removal timers not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.shared.lock_timers().len()
    }

    /// Observe the queue.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.shared.queue.subscribe()
    }

    fn schedule_removal(&self, id: NotificationId, duration: Duration) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                id = id.get(),
                "no async runtime; notification will not expire"
            );
            return;
        };
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        // Hold the lock so the task cannot deregister before it is registered.
        let mut timers = self.shared.lock_timers();
        let task = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(shared) = weak.upgrade() {
                shared.lock_timers().remove(&id);
                shared.remove_entry(id);
            }
        });
        timers.insert(id, task.abort_handle());
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("queued", &self.len())
            .field("pending_timers", &self.pending_timers())
            .field("durations", &self.durations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use tokio::time::sleep;

    fn messages(centre: &NotificationCenter) -> Vec<String> {
        centre
            .notifications()
            .into_iter()
            .map(|notification| notification.message)
            .collect()
    }

    #[rstest]
    #[case(Severity::Success, 3000)]
    #[case(Severity::Info, 5000)]
    #[case(Severity::Warning, 6000)]
    #[case(Severity::Error, 8000)]
    #[tokio::test(start_paused = true)]
    async fn notification_expires_after_default_duration(
        #[case] severity: Severity,
        #[case] millis: u64,
    ) {
        let centre = NotificationCenter::default();
        centre.push("Saved", severity, None);

        sleep(Duration::from_millis(millis - 1)).await;
        assert_eq!(centre.len(), 1);
        sleep(Duration::from_millis(2)).await;
        assert!(centre.is_empty());
        assert_eq!(centre.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_persists() {
        let centre = NotificationCenter::default();
        centre.push("Pinned", Severity::Info, Some(Duration::ZERO));
        sleep(Duration::from_secs(60)).await;
        assert_eq!(messages(&centre), vec!["Pinned"]);
        assert_eq!(centre.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_all_then_timer_fire_is_a_noop() {
        let centre = NotificationCenter::default();
        centre.success("first");
        centre.clear_all();
        assert_eq!(centre.pending_timers(), 1);

        let later = centre.push("second", Severity::Info, Some(Duration::from_secs(10)));
        sleep(Duration::from_millis(3001)).await;
        assert_eq!(messages(&centre), vec!["second"]);
        centre.remove(later);
        assert!(centre.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_cancels_timer() {
        let centre = NotificationCenter::default();
        let id = centre.error("Failed to load vehicles");
        assert_eq!(centre.pending_timers(), 1);

        centre.remove(id);
        centre.remove(id);
        assert!(centre.is_empty());
        assert_eq!(centre.pending_timers(), 0);
    }

    #[tokio::test]
    async fn ids_are_monotonic() {
        let centre = NotificationCenter::default();
        let ids: Vec<_> = (0..5).map(|n| centre.info(format!("n{n}"))).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn shutdown_cancels_all_timers() {
        let centre = NotificationCenter::default();
        centre.success("a");
        centre.warning("b");
        centre.shutdown();
        assert_eq!(centre.pending_timers(), 0);
        assert_eq!(centre.len(), 2);
    }

    #[test]
    fn push_without_runtime_keeps_notification() {
        let centre = NotificationCenter::default();
        centre.success("offline");
        assert_eq!(centre.len(), 1);
        assert_eq!(centre.pending_timers(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_pushes() {
        let centre = NotificationCenter::default();
        let mut receiver = centre.subscribe();
        centre.info("hello");
        assert!(receiver.has_changed().expect("sender alive"));
        assert_eq!(receiver.borrow_and_update().len(), 1);
    }
}
