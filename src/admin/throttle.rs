use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::storage::{FileStore, KeyValueStore, read_counter};
use crate::timer::ScheduledTask;

pub const KEY_ATTEMPTS: &str = "loginAttempts";
pub const KEY_LOCKOUT_UNTIL: &str = "lockoutUntil";
pub const KEY_LAST_ATTEMPT: &str = "lastAttemptTime";

/// Remaining-attempt warnings are shown from this many attempts left.
const WARN_REMAINING: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub max_attempts: u32,
    pub lockout: Duration,
    pub reset_window: Duration,
    pub tick: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            max_attempts: 5,
            lockout: Duration::from_secs(60),
            reset_window: Duration::from_secs(300),
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    pub attempts: u32,
    /// Epoch ms; 0 when no lockout is set.
    pub lockout_until: i64,
    /// Epoch ms of the latest failure; 0 when none is tracked.
    pub last_attempt_time: i64,
}

/// What the login screen should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ThrottleView {
    Open { remaining_attempts: Option<u32> },
    Locked { seconds_left: u64 },
}

struct Inner {
    config: ThrottleConfig,
    clock: Arc<dyn Clock>,
    store: Box<dyn KeyValueStore>,
    state: ThrottleState,
}

impl Inner {
    fn load(store: &dyn KeyValueStore) -> ThrottleState {
        ThrottleState {
            attempts: u32::try_from(read_counter(store, KEY_ATTEMPTS)).unwrap_or(u32::MAX),
            lockout_until: read_counter(store, KEY_LOCKOUT_UNTIL),
            last_attempt_time: read_counter(store, KEY_LAST_ATTEMPT),
        }
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn reset(&mut self) {
        self.state = ThrottleState::default();
        self.store.remove(KEY_ATTEMPTS);
        self.store.remove(KEY_LOCKOUT_UNTIL);
        self.store.remove(KEY_LAST_ATTEMPT);
    }

    fn attempts_are_stale(&self, now: i64) -> bool {
        self.state.last_attempt_time > 0
            && now - self.state.last_attempt_time > duration_ms(self.config.reset_window)
    }

    fn is_locked(&self) -> bool {
        self.state.lockout_until > self.now()
    }

    /// A lockout was set and its time is up, but the state is not reset yet.
    fn lockout_expired(&self) -> bool {
        self.state.lockout_until > 0 && !self.is_locked()
    }

    fn seconds_left(&self) -> u64 {
        let left_ms = self.state.lockout_until - self.now();
        if left_ms <= 0 {
            0
        } else {
            (left_ms as u64).div_ceil(1000)
        }
    }

    fn attempts_warning(&self) -> Option<u32> {
        let remaining = self.config.max_attempts.saturating_sub(self.state.attempts);
        (self.state.attempts > 0 && remaining > 0 && remaining <= WARN_REMAINING)
            .then_some(remaining)
    }

    fn view(&self) -> ThrottleView {
        if self.is_locked() {
            ThrottleView::Locked {
                seconds_left: self.seconds_left(),
            }
        } else {
            ThrottleView::Open {
                remaining_attempts: self.attempts_warning(),
            }
        }
    }
}

/// Gates login submissions for one browser client.
///
/// Two states: *Open* and *Locked*. Reaching `max_attempts` consecutive
/// failures locks submissions for `lockout`; a countdown task ticks while
/// locked and reopens the guard when it reaches zero.
pub struct LoginThrottle {
    inner: Arc<Mutex<Inner>>,
    updates: watch::Sender<ThrottleView>,
    countdown: Option<ScheduledTask>,
}

impl LoginThrottle {
    pub fn initialize(
        config: ThrottleConfig,
        clock: Arc<dyn Clock>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let state = Inner::load(store.as_ref());
        let mut inner = Inner {
            config,
            clock,
            store,
            state,
        };

        let now = inner.now();
        if inner.attempts_are_stale(now) {
            tracing::debug!("Login attempts aged out, resetting");
            inner.reset();
        }

        let locked = if inner.state.lockout_until > now {
            true
        } else {
            if inner.state.lockout_until > 0 {
                tracing::debug!("Stored lockout has expired, resetting");
                inner.reset();
            }
            false
        };

        let (updates, _) = watch::channel(inner.view());
        let mut throttle = LoginThrottle {
            inner: Arc::new(Mutex::new(inner)),
            updates,
            countdown: None,
        };
        if locked {
            throttle.start_countdown();
        }
        throttle
    }

    pub fn record_failure(&mut self) {
        // The countdown may not have ticked past the end of the lockout yet.
        if self.lock().lockout_expired() {
            self.cancel_countdown();
        }

        let locked_now = {
            let mut inner = self.lock();
            if inner.is_locked() {
                tracing::debug!("Ignoring failure recorded during an active lockout");
                return;
            }

            let now = inner.now();
            if inner.lockout_expired() {
                tracing::debug!("Lockout expired before this failure, resetting");
                inner.reset();
            } else if inner.attempts_are_stale(now) {
                inner.reset();
            }

            inner.state.attempts = inner.state.attempts.saturating_add(1);
            inner.state.last_attempt_time = now;
            let attempts = inner.state.attempts.to_string();
            inner.store.set(KEY_ATTEMPTS, attempts);
            inner.store.set(KEY_LAST_ATTEMPT, now.to_string());

            if inner.state.attempts >= inner.config.max_attempts {
                let until = now + duration_ms(inner.config.lockout);
                inner.state.lockout_until = until;
                inner.store.set(KEY_LOCKOUT_UNTIL, until.to_string());
                tracing::warn!(
                    attempts = inner.state.attempts,
                    "Too many failed logins, locking for {:?}",
                    inner.config.lockout
                );
                true
            } else {
                false
            }
        };

        if locked_now {
            self.start_countdown();
        }
        self.publish();
    }

    pub fn record_success(&mut self) {
        self.cancel_countdown();
        self.lock().reset();
        self.publish();
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_locked()
    }

    pub fn attempts(&self) -> u32 {
        self.lock().state.attempts
    }

    #[cfg(test)]
    pub fn state(&self) -> ThrottleState {
        self.lock().state
    }

    #[cfg(test)]
    pub fn seconds_left(&self) -> u64 {
        self.lock().seconds_left()
    }

    /// Attempts left before lockout, only once the count gets low.
    #[cfg(test)]
    pub fn attempts_warning(&self) -> Option<u32> {
        self.lock().attempts_warning()
    }

    /// Open with nothing counted; such a guard holds no state worth keeping.
    fn is_idle(&self) -> bool {
        let inner = self.lock();
        inner.state.attempts == 0 && !inner.is_locked()
    }

    pub fn view(&self) -> ThrottleView {
        self.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThrottleView> {
        self.updates.subscribe()
    }

    pub fn dispose(&mut self) {
        self.cancel_countdown();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    fn publish(&self) {
        self.updates.send_replace(self.view());
    }

    fn cancel_countdown(&mut self) {
        if let Some(task) = self.countdown.take() {
            task.cancel();
        }
    }

    fn start_countdown(&mut self) {
        self.cancel_countdown();

        let inner = self.inner.clone();
        let updates = self.updates.clone();
        let tick = lock_inner(&inner).config.tick;
        self.countdown = Some(ScheduledTask::every(tick, move || {
            let mut inner = lock_inner(&inner);
            let seconds_left = inner.seconds_left();
            if seconds_left == 0 {
                inner.reset();
                updates.send_replace(inner.view());
                tracing::info!("Login lockout expired");
                ControlFlow::Break(())
            } else {
                updates.send_replace(ThrottleView::Locked { seconds_left });
                ControlFlow::Continue(())
            }
        }));
    }
}

impl Drop for LoginThrottle {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// One throttle guard per browser client.
///
/// Guards are created when a client first fails a login, or when state for it
/// is found on disk. Idle guards are dropped whenever a new one is created.
pub struct ThrottleRegistry {
    config: ThrottleConfig,
    clock: Arc<dyn Clock>,
    store: FileStore,
    guards: HashMap<String, LoginThrottle>,
}

impl ThrottleRegistry {
    pub fn new(config: ThrottleConfig, clock: Arc<dyn Clock>, store: FileStore) -> Self {
        ThrottleRegistry {
            config,
            clock,
            store,
            guards: HashMap::new(),
        }
    }

    pub fn guard(&mut self, client_id: &str) -> &mut LoginThrottle {
        if !self.guards.contains_key(client_id) {
            self.evict_idle();
        }
        let ThrottleRegistry {
            config,
            clock,
            store,
            guards,
        } = self;
        guards.entry(client_id.to_string()).or_insert_with(|| {
            LoginThrottle::initialize(
                *config,
                clock.clone(),
                Box::new(store.scoped(client_id)),
            )
        })
    }

    /// What the login screen shows for a client, without creating a guard
    /// for clients that have never failed.
    pub fn view(&mut self, client_id: &str) -> ThrottleView {
        match self.existing(client_id) {
            Some(guard) => guard.view(),
            None => ThrottleView::Open {
                remaining_attempts: None,
            },
        }
    }

    pub fn subscribe(&mut self, client_id: &str) -> Option<watch::Receiver<ThrottleView>> {
        self.existing(client_id).map(|guard| guard.subscribe())
    }

    fn existing(&mut self, client_id: &str) -> Option<&mut LoginThrottle> {
        if !self.guards.contains_key(client_id) && !self.store.has_scope(client_id) {
            return None;
        }
        Some(self.guard(client_id))
    }

    fn evict_idle(&mut self) {
        let before = self.guards.len();
        self.guards.retain(|_, guard| !guard.is_idle());
        let evicted = before - self.guards.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Dropped idle login guards");
        }
    }

    /// Clears a client's state after a successful login and drops its guard.
    pub fn record_success(&mut self, client_id: &str) {
        if let Some(guard) = self.existing(client_id) {
            guard.record_success();
        }
        self.release(client_id);
    }

    fn release(&mut self, client_id: &str) {
        if let Some(mut guard) = self.guards.remove(client_id) {
            guard.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, TokioClock};
    use crate::storage::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn throttle_with(clock: Arc<dyn Clock>, store: MemoryStore) -> LoginThrottle {
        LoginThrottle::initialize(ThrottleConfig::default(), clock, Box::new(store))
    }

    fn stored(values: &[(&str, i64)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (key, value) in values {
            store.set(key, value.to_string());
        }
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_initially() {
        let clock = Arc::new(ManualClock::new(T0));
        let throttle = throttle_with(clock, MemoryStore::new());
        assert!(!throttle.is_locked());
        assert_eq!(throttle.attempts(), 0);
        assert_eq!(
            throttle.view(),
            ThrottleView::Open {
                remaining_attempts: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_after_5_failures() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock.clone(), MemoryStore::new());
        for _ in 0..4 {
            throttle.record_failure();
            clock.advance_secs(1);
        }
        assert!(!throttle.is_locked());

        throttle.record_failure();
        assert!(throttle.is_locked());
        assert_eq!(throttle.seconds_left(), 60);
        assert_eq!(throttle.state().lockout_until, T0 + 4_000 + 60_000);

        clock.advance_ms(59_999);
        assert!(throttle.is_locked());
        clock.advance_ms(1);
        assert!(!throttle.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_immediately() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock, MemoryStore::new());
        for _ in 0..5 {
            throttle.record_failure();
        }
        assert!(throttle.is_locked());

        throttle.record_success();
        assert!(!throttle.is_locked());
        assert_eq!(throttle.state(), ThrottleState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_window_restarts_count() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock.clone(), MemoryStore::new());
        for _ in 0..4 {
            throttle.record_failure();
        }
        clock.advance_secs(301);
        throttle.record_failure();
        assert_eq!(throttle.attempts(), 1);
        assert!(!throttle.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_within_window_accumulate() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock.clone(), MemoryStore::new());
        throttle.record_failure();
        clock.advance_secs(300);
        throttle.record_failure();
        assert_eq!(throttle.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_warning_range() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock, MemoryStore::new());

        throttle.record_failure();
        assert_eq!(throttle.attempts_warning(), None);
        throttle.record_failure();
        assert_eq!(throttle.attempts_warning(), Some(3));
        throttle.record_failure();
        assert_eq!(throttle.attempts_warning(), Some(2));
        throttle.record_failure();
        assert_eq!(throttle.attempts_warning(), Some(1));
        assert_eq!(
            throttle.view(),
            ThrottleView::Open {
                remaining_attempts: Some(1)
            }
        );
        throttle.record_failure();
        assert_eq!(throttle.attempts_warning(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_lockout_ends_starts_new_count() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock.clone(), MemoryStore::new());
        for _ in 0..5 {
            throttle.record_failure();
        }
        clock.advance_ms(60_000);
        assert!(!throttle.is_locked());

        // The countdown task has not ticked; the paused runtime never advanced.
        throttle.record_failure();
        assert_eq!(throttle.attempts(), 1);
        assert!(!throttle.is_locked());
        assert_eq!(throttle.state().lockout_until, 0);
        assert_eq!(throttle.state().last_attempt_time, T0 + 60_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_during_lockout_is_ignored() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut throttle = throttle_with(clock.clone(), MemoryStore::new());
        for _ in 0..5 {
            throttle.record_failure();
        }
        let before = throttle.state();
        clock.advance_secs(10);
        throttle.record_failure();
        assert_eq!(throttle.state(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_restores_active_lockout() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = stored(&[
            (KEY_ATTEMPTS, 5),
            (KEY_LOCKOUT_UNTIL, T0 + 30_000),
            (KEY_LAST_ATTEMPT, T0 - 30_000),
        ]);
        let throttle = throttle_with(clock, store);
        assert!(throttle.is_locked());
        assert_eq!(throttle.view(), ThrottleView::Locked { seconds_left: 30 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_clears_expired_lockout() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = stored(&[
            (KEY_ATTEMPTS, 5),
            (KEY_LOCKOUT_UNTIL, T0 - 1),
            (KEY_LAST_ATTEMPT, T0 - 61_000),
        ]);
        let throttle = throttle_with(clock, store);
        assert!(!throttle.is_locked());
        assert_eq!(throttle.state(), ThrottleState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_ages_out_old_attempts() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = stored(&[(KEY_ATTEMPTS, 3), (KEY_LAST_ATTEMPT, T0 - 300_001)]);
        let throttle = throttle_with(clock, store);
        assert_eq!(throttle.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_keeps_recent_attempts() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = stored(&[(KEY_ATTEMPTS, 3), (KEY_LAST_ATTEMPT, T0 - 10_000)]);
        let throttle = throttle_with(clock, store);
        assert_eq!(throttle.attempts(), 3);
        assert_eq!(throttle.attempts_warning(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_storage_reads_as_zero() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut store = MemoryStore::new();
        store.set(KEY_ATTEMPTS, "many".to_string());
        store.set(KEY_LOCKOUT_UNTIL, "soon".to_string());
        let throttle = throttle_with(clock, store);
        assert_eq!(throttle.state(), ThrottleState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_persists_across_reload() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
        let path = {
            let file = tempfile::NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        let file = FileStore::load_or_create(&path).unwrap();
        {
            let mut throttle = LoginThrottle::initialize(
                ThrottleConfig::default(),
                clock.clone(),
                Box::new(file.scoped("browser")),
            );
            for _ in 0..5 {
                throttle.record_failure();
            }
        }

        let reloaded = FileStore::load_or_create(&path).unwrap();
        let throttle = LoginThrottle::initialize(
            ThrottleConfig::default(),
            clock,
            Box::new(reloaded.scoped("browser")),
        );
        assert!(throttle.is_locked());
        assert_eq!(throttle.attempts(), 5);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_reopens_after_lockout() {
        let clock = Arc::new(TokioClock::new(T0));
        let mut throttle = throttle_with(clock, MemoryStore::new());
        for _ in 0..5 {
            throttle.record_failure();
        }
        assert_eq!(throttle.seconds_left(), 60);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(throttle.is_locked());
        let mut updates = throttle.subscribe();
        assert_eq!(*updates.borrow_and_update(), ThrottleView::Locked { seconds_left: 58 });

        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            let view = *updates.borrow_and_update();
            seen.push(view);
            if let ThrottleView::Open { .. } = view {
                break;
            }
        }

        assert_eq!(seen.first(), Some(&ThrottleView::Locked { seconds_left: 57 }));
        assert_eq!(
            seen.last(),
            Some(&ThrottleView::Open {
                remaining_attempts: None
            })
        );
        let counts: Vec<u64> = seen
            .iter()
            .filter_map(|v| match v {
                ThrottleView::Locked { seconds_left } => Some(*seconds_left),
                ThrottleView::Open { .. } => None,
            })
            .collect();
        assert!(counts.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(counts.last(), Some(&1));
        assert!(!throttle.is_locked());
        assert_eq!(throttle.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_end_clears_persisted_keys() {
        let clock = Arc::new(TokioClock::new(T0));
        let path = {
            let file = tempfile::NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        let file = FileStore::load_or_create(&path).unwrap();
        let mut throttle = LoginThrottle::initialize(
            ThrottleConfig::default(),
            clock,
            Box::new(file.scoped("browser")),
        );
        for _ in 0..5 {
            throttle.record_failure();
        }
        assert!(file.has_scope("browser"));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!throttle.is_locked());
        assert!(!file.has_scope("browser"));

        let reloaded = FileStore::load_or_create(&path).unwrap();
        let scoped = reloaded.scoped("browser");
        assert_eq!(scoped.get(KEY_ATTEMPTS), None);
        assert_eq!(scoped.get(KEY_LOCKOUT_UNTIL), None);
        assert_eq!(scoped.get(KEY_LAST_ATTEMPT), None);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_skips_unknown_and_evicts_idle_clients() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
        let path = {
            let file = tempfile::NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        let store = FileStore::load_or_create(&path).unwrap();
        let mut registry = ThrottleRegistry::new(ThrottleConfig::default(), clock, store);

        assert_eq!(
            registry.view("stranger"),
            ThrottleView::Open {
                remaining_attempts: None
            }
        );
        assert!(registry.subscribe("stranger").is_none());
        assert!(registry.guards.is_empty());

        registry.guard("a").record_failure();
        registry.guard("a").record_failure();
        assert!(registry.subscribe("a").is_some());
        assert_eq!(
            registry.view("a"),
            ThrottleView::Open {
                remaining_attempts: Some(3)
            }
        );

        registry.guard("a").record_success();
        registry.guard("b").record_failure();
        assert!(!registry.guards.contains_key("a"));
        assert!(registry.guards.contains_key("b"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_loads_persisted_client() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
        let path = {
            let file = tempfile::NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        {
            let store = FileStore::load_or_create(&path).unwrap();
            let mut registry = ThrottleRegistry::new(ThrottleConfig::default(), clock.clone(), store);
            for _ in 0..5 {
                registry.guard("a").record_failure();
            }
        }

        let store = FileStore::load_or_create(&path).unwrap();
        let mut registry = ThrottleRegistry::new(ThrottleConfig::default(), clock, store);
        assert_eq!(registry.view("a"), ThrottleView::Locked { seconds_left: 60 });
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_scopes_guards_per_client() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
        let path = {
            let file = tempfile::NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        let store = FileStore::load_or_create(&path).unwrap();
        let mut registry = ThrottleRegistry::new(ThrottleConfig::default(), clock, store);

        for _ in 0..5 {
            registry.guard("a").record_failure();
        }
        assert!(registry.guard("a").is_locked());
        assert!(!registry.guard("b").is_locked());

        registry.record_success("a");
        assert!(!registry.guards.contains_key("a"));
        assert_eq!(registry.view("a"), ThrottleView::Open { remaining_attempts: None });
        assert!(registry.subscribe("a").is_none());
        let _ = std::fs::remove_file(&path);
    }
}
