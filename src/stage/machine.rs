//! StageMachine: the current stage with a bounded back-history and listeners.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, info, warn};

use super::state::{Stage, StageChange};
use crate::error::StageError;
use crate::sync::{FlagGuard, lock};

/// Default number of previously visited stages kept for back navigation.
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Receives every successful stage transition.
///
/// Returning an error only gets the failure logged; the transition itself
/// has already happened and other listeners are still notified.
pub trait StageListener: Send + Sync {
    fn on_stage_change(&self, change: StageChange) -> anyhow::Result<()>;
}

impl<F> StageListener for F
where
    F: Fn(StageChange) -> anyhow::Result<()> + Send + Sync,
{
    fn on_stage_change(&self, change: StageChange) -> anyhow::Result<()> {
        self(change)
    }
}

struct StageState {
    current: Stage,
    /// Previously visited stages, most recent last.
    history: VecDeque<Stage>,
}

struct Shared {
    state: Mutex<StageState>,
    listeners: Mutex<Vec<(u64, Arc<dyn StageListener>)>>,
    transitioning: AtomicBool,
    next_listener_id: AtomicU64,
    history_limit: usize,
}

/// Tracks the active stage of a session.
///
/// Cloning yields another handle to the same machine, which is how listeners
/// that need to look at (or try to drive) the machine get hold of it.
#[derive(Clone)]
pub struct StageMachine {
    shared: Arc<Shared>,
}

impl StageMachine {
    /// Create a machine pinned to `Welcome`.
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a machine that keeps at most `limit` history entries.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StageState {
                    current: Stage::Welcome,
                    history: VecDeque::new(),
                }),
                listeners: Mutex::new(Vec::new()),
                transitioning: AtomicBool::new(false),
                next_listener_id: AtomicU64::new(0),
                history_limit: limit.max(1),
            }),
        }
    }

    /// The active stage.
    pub fn current(&self) -> Stage {
        lock(&self.shared.state).current
    }

    /// Previously visited stages, most recent last.
    pub fn history(&self) -> Vec<Stage> {
        lock(&self.shared.state).history.iter().copied().collect()
    }

    /// Move to `stage`, recording the current stage in history.
    ///
    /// Moving to the current stage succeeds without notifying anyone.
    pub fn transition_to(&self, stage: Stage) -> Result<(), StageError> {
        let _guard = self.begin()?;
        self.apply(stage, true);
        Ok(())
    }

    /// Like [`transition_to`](Self::transition_to) for an untyped stage name.
    pub fn transition_to_named(&self, name: &str) -> Result<(), StageError> {
        let stage: Stage = name.parse().inspect_err(|e| {
            warn!(error = %e, "Rejected transition to unknown stage");
        })?;
        self.transition_to(stage)
    }

    /// Return to the most recently visited stage without recording the
    /// current one.
    pub fn go_back(&self) -> Result<(), StageError> {
        let _guard = self.begin()?;
        let previous = lock(&self.shared.state)
            .history
            .pop_back()
            .ok_or(StageError::NoHistory)?;
        self.apply(previous, false);
        Ok(())
    }

    /// Move to the canonical successor of the current stage.
    pub fn advance(&self) -> Result<(), StageError> {
        let _guard = self.begin()?;
        let current = self.current();
        let next = current.next().ok_or(StageError::NoSuccessor(current))?;
        self.apply(next, true);
        Ok(())
    }

    /// Clear history and return to `Welcome`.
    ///
    /// Listeners are notified like for any other transition, unless the
    /// machine was already at `Welcome`.
    pub fn reset(&self) -> Result<(), StageError> {
        let _guard = self.begin()?;
        lock(&self.shared.state).history.clear();
        self.apply(Stage::Welcome, false);
        Ok(())
    }

    /// Jump to `stage` as if it had been reached along the canonical path:
    /// history is replaced by the stages that come before it.
    ///
    /// Later stages visited so far are forgotten, so going back from `stage`
    /// can never return to them.
    pub fn restart_at(&self, stage: Stage) -> Result<(), StageError> {
        let _guard = self.begin()?;
        {
            let mut state = lock(&self.shared.state);
            state.history = Stage::ALL[..stage.index()].iter().copied().collect();
            while state.history.len() > self.shared.history_limit {
                state.history.pop_front();
            }
        }
        self.apply(stage, false);
        Ok(())
    }

    /// Whether the UI may offer navigation to `stage`: it was visited before,
    /// or it is at most one step ahead of the current stage.
    pub fn can_navigate_to(&self, stage: Stage) -> bool {
        let state = lock(&self.shared.state);
        state.history.contains(&stage) || stage.index() <= state.current.index() + 1
    }

    /// Register a listener for every successful transition.
    pub fn subscribe<L>(&self, listener: L) -> Subscription
    where
        L: StageListener + 'static,
    {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).push((id, Arc::new(listener)));
        debug!(listener_id = id, "Stage listener subscribed");
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }

    fn begin(&self) -> Result<FlagGuard<'_>, StageError> {
        FlagGuard::acquire(&self.shared.transitioning).ok_or_else(|| {
            warn!("Rejected stage transition while another is in progress");
            StageError::TransitionInProgress
        })
    }

    /// Caller must hold the transition guard.
    fn apply(&self, to: Stage, record_history: bool) {
        let from = {
            let mut state = lock(&self.shared.state);
            let from = state.current;
            if from == to {
                debug!(stage = %to, "Transition to current stage ignored");
                return;
            }
            if record_history {
                state.history.push_back(from);
                while state.history.len() > self.shared.history_limit {
                    state.history.pop_front();
                }
            }
            state.current = to;
            from
        };

        info!(from = %from, to = %to, "Stage transition");
        self.notify(StageChange { to, from });
    }

    fn notify(&self, change: StageChange) {
        // Snapshot so listeners may subscribe or unsubscribe while notified.
        let listeners: Vec<(u64, Arc<dyn StageListener>)> =
            lock(&self.shared.listeners).clone();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_stage_change(change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(listener_id = id, to = %change.to, error = %e, "Stage listener failed");
                }
                Err(_) => {
                    error!(listener_id = id, to = %change.to, "Stage listener panicked");
                }
            }
        }
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StageMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("StageMachine")
            .field("current", &state.current)
            .field("history", &state.history)
            .finish()
    }
}

/// Capability to deregister a listener.
///
/// Dropping it leaves the listener registered.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove the listener. Does nothing if the machine is gone.
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.listeners).retain(|(id, _)| *id != self.id);
            debug!(listener_id = self.id, "Stage listener unsubscribed");
        }
    }
}
