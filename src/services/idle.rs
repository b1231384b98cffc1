//! Client-paired idle/activity monitor.
//!
//! Advisory companion to the session authority: it watches local activity,
//! warns before the session is considered abandoned, and reports expiry so
//! the UI can log out. The server-side cookie expiry stays authoritative;
//! this machine is allowed to be wrong without weakening that guarantee.
//!
//! One state machine, one deadline. `Active` waits out the inactivity
//! threshold, `Warning` runs the countdown, `Expired` parks until the next
//! explicit extension.

use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, Instant, sleep_until};
use tracing::debug;

use crate::config::IdleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePhase {
    Active,
    Warning,
    Expired,
}

/// Transitions surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Inactivity threshold crossed; countdown started.
    Warned { remaining_seconds: u64 },
    /// Countdown elapsed with no choice; the session should be logged out.
    Expired,
    /// The user chose to continue; callers follow up with a keep-alive
    /// request so the server-side session is touched too.
    Extended,
}

/// Pure deadline-driven state machine. The async driver below owns the clock;
/// this type never sleeps.
#[derive(Debug)]
pub struct IdleTimeline {
    config: IdleConfig,
    phase: IdlePhase,
    deadline: Option<Instant>,
}

impl IdleTimeline {
    #[must_use]
    pub fn new(config: IdleConfig, now: Instant) -> Self {
        let deadline = now + Duration::from_secs(config.warn_after_seconds);
        Self {
            config,
            phase: IdlePhase::Active,
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> IdlePhase {
        self.phase
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Input activity only defers the warning while `Active`. Once the
    /// countdown is showing, continuing requires the explicit choice.
    pub fn record_activity(&mut self, now: Instant) {
        if self.phase == IdlePhase::Active {
            self.deadline = Some(now + Duration::from_secs(self.config.warn_after_seconds));
        }
    }

    /// Explicit "keep me signed in". Resets to `Active` from any phase;
    /// returns whether a transition out of `Warning`/`Expired` happened.
    pub fn extend(&mut self, now: Instant) -> bool {
        let was_interrupted = self.phase != IdlePhase::Active;
        self.phase = IdlePhase::Active;
        self.deadline = Some(now + Duration::from_secs(self.config.warn_after_seconds));
        was_interrupted
    }

    /// The single timer fired. Advances one phase and hands back the event to
    /// publish, if any.
    pub fn on_deadline(&mut self, now: Instant) -> Option<IdleEvent> {
        match self.phase {
            IdlePhase::Active => {
                self.phase = IdlePhase::Warning;
                self.deadline = Some(now + Duration::from_secs(self.config.countdown_seconds));
                Some(IdleEvent::Warned {
                    remaining_seconds: self.config.countdown_seconds,
                })
            }
            IdlePhase::Warning => {
                self.phase = IdlePhase::Expired;
                self.deadline = None;
                Some(IdleEvent::Expired)
            }
            IdlePhase::Expired => None,
        }
    }
}

/// Async driver: a single task sleeping toward the current deadline, woken
/// whenever activity or an extension moves it.
pub struct IdleMonitor {
    timeline: Arc<Mutex<IdleTimeline>>,
    events: broadcast::Sender<IdleEvent>,
    wake: watch::Sender<()>,
}

impl IdleMonitor {
    #[must_use]
    pub fn spawn(config: IdleConfig) -> Self {
        let timeline = Arc::new(Mutex::new(IdleTimeline::new(config, Instant::now())));
        let (events, _) = broadcast::channel(16);
        let (wake, mut wake_rx) = watch::channel(());

        let task_timeline = Arc::clone(&timeline);
        let task_events = events.clone();

        tokio::spawn(async move {
            loop {
                let deadline = task_timeline
                    .lock()
                    .expect("idle timeline lock poisoned")
                    .deadline();

                tokio::select! {
                    () = async {
                        match deadline {
                            Some(at) => sleep_until(at).await,
                            None => std::future::pending().await,
                        }
                    } => {
                        let event = task_timeline
                            .lock()
                            .expect("idle timeline lock poisoned")
                            .on_deadline(Instant::now());
                        if let Some(event) = event {
                            debug!(?event, "Idle monitor transition");
                            let _ = task_events.send(event);
                        }
                    }
                    changed = wake_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            timeline,
            events,
            wake,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IdleEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> IdlePhase {
        self.timeline
            .lock()
            .expect("idle timeline lock poisoned")
            .phase()
    }

    pub fn record_activity(&self) {
        self.timeline
            .lock()
            .expect("idle timeline lock poisoned")
            .record_activity(Instant::now());
        let _ = self.wake.send(());
    }

    pub fn extend(&self) {
        let interrupted = self
            .timeline
            .lock()
            .expect("idle timeline lock poisoned")
            .extend(Instant::now());
        if interrupted {
            let _ = self.events.send(IdleEvent::Extended);
        }
        let _ = self.wake.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IdleConfig {
        IdleConfig {
            warn_after_seconds: 60,
            countdown_seconds: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_defers_warning() {
        let start = Instant::now();
        let mut timeline = IdleTimeline::new(config(), start);

        timeline.record_activity(start + Duration::from_secs(30));
        assert_eq!(
            timeline.deadline(),
            Some(start + Duration::from_secs(30 + 60))
        );
        assert_eq!(timeline.phase(), IdlePhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_walks_active_warning_expired() {
        let start = Instant::now();
        let mut timeline = IdleTimeline::new(config(), start);

        let warn_at = start + Duration::from_secs(60);
        assert_eq!(
            timeline.on_deadline(warn_at),
            Some(IdleEvent::Warned {
                remaining_seconds: 10
            })
        );
        assert_eq!(timeline.phase(), IdlePhase::Warning);
        assert_eq!(timeline.deadline(), Some(warn_at + Duration::from_secs(10)));

        // Activity during the countdown is not a choice; the countdown holds.
        timeline.record_activity(warn_at + Duration::from_secs(1));
        assert_eq!(timeline.phase(), IdlePhase::Warning);

        assert_eq!(
            timeline.on_deadline(warn_at + Duration::from_secs(10)),
            Some(IdleEvent::Expired)
        );
        assert_eq!(timeline.phase(), IdlePhase::Expired);
        assert_eq!(timeline.deadline(), None);

        // Expired is a resting state; a stray timer does nothing.
        assert_eq!(timeline.on_deadline(warn_at + Duration::from_secs(20)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_resets_from_warning() {
        let start = Instant::now();
        let mut timeline = IdleTimeline::new(config(), start);

        timeline.on_deadline(start + Duration::from_secs(60));
        assert_eq!(timeline.phase(), IdlePhase::Warning);

        let extended_at = start + Duration::from_secs(65);
        assert!(timeline.extend(extended_at));
        assert_eq!(timeline.phase(), IdlePhase::Active);
        assert_eq!(
            timeline.deadline(),
            Some(extended_at + Duration::from_secs(60))
        );

        // Extending while already active is a no-op transition.
        assert!(!timeline.extend(extended_at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_emits_warning_then_expiry() {
        let monitor = IdleMonitor::spawn(config());
        let mut events = monitor.subscribe();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(
            events.recv().await.unwrap(),
            IdleEvent::Warned {
                remaining_seconds: 10
            }
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Expired);
        assert_eq!(monitor.phase(), IdlePhase::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_extension_restarts_cycle() {
        let monitor = IdleMonitor::spawn(config());
        let mut events = monitor.subscribe();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(matches!(
            events.recv().await.unwrap(),
            IdleEvent::Warned { .. }
        ));

        monitor.extend();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Extended);
        assert_eq!(monitor.phase(), IdlePhase::Active);

        // Activity keeps deferring the next warning.
        tokio::time::sleep(Duration::from_secs(50)).await;
        monitor.record_activity();
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(monitor.phase(), IdlePhase::Active);
    }
}
