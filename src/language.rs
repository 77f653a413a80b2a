//! Active language, request tokens and consumer lifecycle
//!
//! Every language change bumps a [`LanguageToken`] exactly once. Requests
//! carry the token that was current when they were issued; when their result
//! comes back the coordinator decides what to do with it:
//!
//! ```text
//! consumer cancelled (unmounted)  → Delivery::Cancelled  (cached, not applied)
//! token != current token          → Delivery::Stale      (cached, not applied)
//! otherwise                       → Delivery::Applied
//! ```
//!
//! Phases:
//!
//! ```text
//! Stable ──language changed──▶ Switching ──all mounted consumers settled──▶ Stable
//! ```

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info};

/// Language codes the content service serves
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "he", "ru"];

pub fn is_supported(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

/// Right-to-left languages
pub fn is_rtl(language: &str) -> bool {
    language == "he"
}

// =============================================================================
// Tokens and snapshots
// =============================================================================

/// Monotonic language generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct LanguageToken(u64);

impl LanguageToken {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LanguageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePhase {
    Stable,
    Switching,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageSnapshot {
    pub language: String,
    pub token: LanguageToken,
    pub phase: LanguagePhase,
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation flag passed along with a request.
///
/// Cancelling never aborts the fetch; it only stops the result from being
/// applied to the consumer that issued it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a resolver needs to know about who is asking
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub language: String,
    pub token: LanguageToken,
    pub consumer: Option<u64>,
    pub cancel: CancelToken,
}

/// Outcome of a request from the consumer's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Applied(T),
    /// Result belongs to an older language generation
    Stale {
        token: LanguageToken,
        current: LanguageToken,
    },
    /// Consumer unmounted before the result arrived
    Cancelled,
}

impl<T> Delivery<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Delivery<U> {
        match self {
            Self::Applied(value) => Delivery::Applied(f(value)),
            Self::Stale { token, current } => Delivery::Stale { token, current },
            Self::Cancelled => Delivery::Cancelled,
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

struct CoordinatorState {
    language: String,
    token: LanguageToken,
    phase: LanguagePhase,
    /// Mounted consumers
    active: HashSet<u64>,
    /// Mounted consumers that have not settled under the current token
    awaiting: HashSet<u64>,
}

impl CoordinatorState {
    fn snapshot(&self) -> LanguageSnapshot {
        LanguageSnapshot {
            language: self.language.clone(),
            token: self.token,
            phase: self.phase,
        }
    }
}

pub struct LanguageCoordinator {
    state: Mutex<CoordinatorState>,
    next_consumer: AtomicU64,
    tx: watch::Sender<LanguageSnapshot>,
}

impl LanguageCoordinator {
    pub fn new(language: &str) -> Self {
        let state = CoordinatorState {
            language: language.to_string(),
            token: LanguageToken::default(),
            phase: LanguagePhase::Stable,
            active: HashSet::new(),
            awaiting: HashSet::new(),
        };
        let (tx, _) = watch::channel(state.snapshot());
        Self {
            state: Mutex::new(state),
            next_consumer: AtomicU64::new(1),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LanguageSnapshot {
        self.lock().snapshot()
    }

    pub fn language(&self) -> String {
        self.lock().language.clone()
    }

    pub fn token(&self) -> LanguageToken {
        self.lock().token
    }

    pub fn phase(&self) -> LanguagePhase {
        self.lock().phase
    }

    pub fn is_current(&self, token: LanguageToken) -> bool {
        self.lock().token == token
    }

    /// Watch language changes and phase transitions
    pub fn subscribe(&self) -> watch::Receiver<LanguageSnapshot> {
        self.tx.subscribe()
    }

    /// Switch the active language. Switching to the language already active
    /// is not a change and keeps the current token.
    pub fn change_language(&self, language: &str) -> LanguageToken {
        let mut state = self.lock();
        if state.language == language {
            return state.token;
        }

        let previous = std::mem::replace(&mut state.language, language.to_string());
        state.token = state.token.next();
        state.awaiting = state.active.clone();
        state.phase = if state.awaiting.is_empty() {
            LanguagePhase::Stable
        } else {
            LanguagePhase::Switching
        };

        info!(
            from = %previous,
            to = language,
            token = %state.token,
            awaiting = state.awaiting.len(),
            "Language changed"
        );
        self.tx.send_replace(state.snapshot());
        state.token
    }

    /// Register a mounted consumer (a screen or a field component)
    pub fn mount(self: &Arc<Self>) -> Consumer {
        let id = self.next_consumer.fetch_add(1, Ordering::Relaxed);
        self.lock().active.insert(id);
        debug!(consumer = id, "Consumer mounted");
        Consumer {
            id,
            cancel: CancelToken::new(),
            coordinator: Arc::clone(self),
        }
    }

    /// Context for a request not tied to any consumer
    pub fn detached_context(&self) -> RequestContext {
        let state = self.lock();
        RequestContext {
            language: state.language.clone(),
            token: state.token,
            consumer: None,
            cancel: CancelToken::new(),
        }
    }

    fn context_for(&self, consumer: u64, cancel: &CancelToken) -> RequestContext {
        let state = self.lock();
        RequestContext {
            language: state.language.clone(),
            token: state.token,
            consumer: Some(consumer),
            cancel: cancel.clone(),
        }
    }

    /// Decide whether a settled result may be applied for `ctx`.
    pub fn deliver<T>(&self, ctx: &RequestContext, value: T) -> Delivery<T> {
        if ctx.cancel.is_cancelled() {
            debug!(token = %ctx.token, "Result arrived after unmount, cached only");
            return Delivery::Cancelled;
        }

        let current = self.token();
        if ctx.token != current {
            debug!(token = %ctx.token, current = %current, "Stale result, cached only");
            return Delivery::Stale {
                token: ctx.token,
                current,
            };
        }

        if let Some(consumer) = ctx.consumer {
            self.acknowledge(consumer, ctx.token);
        }
        Delivery::Applied(value)
    }

    /// Mark `consumer` as settled under `token`
    pub fn acknowledge(&self, consumer: u64, token: LanguageToken) {
        let mut state = self.lock();
        if state.token != token {
            return;
        }
        state.awaiting.remove(&consumer);
        self.finish_switch_if_settled(&mut state);
    }

    fn release(&self, consumer: u64) {
        let mut state = self.lock();
        state.active.remove(&consumer);
        state.awaiting.remove(&consumer);
        self.finish_switch_if_settled(&mut state);
        debug!(consumer = consumer, "Consumer unmounted");
    }

    fn finish_switch_if_settled(&self, state: &mut CoordinatorState) {
        if state.phase == LanguagePhase::Switching && state.awaiting.is_empty() {
            state.phase = LanguagePhase::Stable;
            info!(language = %state.language, token = %state.token, "Language switch settled");
            self.tx.send_replace(state.snapshot());
        }
    }

    pub fn active_consumers(&self) -> usize {
        self.lock().active.len()
    }

    /// Consumers still expected to settle under the current token
    pub fn awaiting_consumers(&self) -> usize {
        self.lock().awaiting.len()
    }
}

/// A mounted consumer. Dropping it unmounts: in-flight results addressed to
/// it are still cached but no longer applied.
pub struct Consumer {
    id: u64,
    cancel: CancelToken,
    coordinator: Arc<LanguageCoordinator>,
}

impl Consumer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Context for a request issued now, under the current token
    pub fn context(&self) -> RequestContext {
        self.coordinator.context_for(self.id, &self.cancel)
    }

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn unmount(self) {}
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.coordinator.release(self.id);
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_languages() {
        assert!(is_supported("he"));
        assert!(is_supported("ru"));
        assert!(!is_supported("fr"));
        assert!(is_rtl("he"));
        assert!(!is_rtl("en"));
    }

    #[test]
    fn test_token_bumps_once_per_change() {
        let coordinator = LanguageCoordinator::new("en");
        let t0 = coordinator.token();

        let t1 = coordinator.change_language("he");
        assert_eq!(t1, t0.next());

        // same language again is not a change
        assert_eq!(coordinator.change_language("he"), t1);
        assert_eq!(coordinator.language(), "he");
    }

    #[test]
    fn test_switch_without_consumers_is_stable() {
        let coordinator = LanguageCoordinator::new("en");
        coordinator.change_language("ru");
        assert_eq!(coordinator.phase(), LanguagePhase::Stable);
    }

    #[test]
    fn test_switching_until_consumers_settle() {
        let coordinator = Arc::new(LanguageCoordinator::new("en"));
        let a = coordinator.mount();
        let b = coordinator.mount();

        coordinator.change_language("he");
        assert_eq!(coordinator.phase(), LanguagePhase::Switching);
        assert_eq!(coordinator.awaiting_consumers(), 2);

        let ctx = a.context();
        assert!(coordinator.deliver(&ctx, ()).is_applied());
        assert_eq!(coordinator.phase(), LanguagePhase::Switching);

        // unmounting the other consumer also settles the switch
        drop(b);
        assert_eq!(coordinator.phase(), LanguagePhase::Stable);
    }

    #[test]
    fn test_stale_delivery() {
        let coordinator = Arc::new(LanguageCoordinator::new("en"));
        let consumer = coordinator.mount();
        let old = consumer.context();

        coordinator.change_language("he");
        match coordinator.deliver(&old, "english") {
            Delivery::Stale { token, current } => {
                assert_eq!(token, old.token);
                assert_eq!(current, coordinator.token());
            }
            other => panic!("expected stale, got {:?}", other),
        }
        // a stale result does not settle the switch
        assert_eq!(coordinator.phase(), LanguagePhase::Switching);
    }

    #[test]
    fn test_cancelled_delivery() {
        let coordinator = Arc::new(LanguageCoordinator::new("en"));
        let consumer = coordinator.mount();
        let ctx = consumer.context();

        consumer.unmount();
        assert_eq!(coordinator.deliver(&ctx, 1), Delivery::Cancelled);
        assert_eq!(coordinator.active_consumers(), 0);
    }

    #[test]
    fn test_watch_sees_change() {
        let coordinator = LanguageCoordinator::new("en");
        let rx = coordinator.subscribe();
        coordinator.change_language("ru");
        assert_eq!(rx.borrow().language, "ru");
    }

    #[test]
    fn test_delivery_map() {
        let d: Delivery<u32> = Delivery::Applied(2);
        assert_eq!(d.map(|v| v * 2).applied(), Some(4));
        let s: Delivery<u32> = Delivery::Cancelled;
        assert_eq!(s.map(|v| v * 2).applied(), None);
    }
}
