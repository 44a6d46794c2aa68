use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::AutoSaveConfig;
use crate::errors::SaveError;
use crate::fingerprint::fingerprint;
use crate::notify::{SaveListener, TracingListener};
use crate::status::{SaveStatus, StatusSnapshot};

/// The caller-supplied save operation: performs the actual persistence
/// (e.g. a profile PUT against the backend) and fails with `anyhow::Error`
/// on any problem. The engine treats every failure uniformly — validation,
/// network and authorization errors all look the same from here.
#[async_trait]
pub trait SaveTarget<T>: Send + Sync {
    async fn save(&self, value: T) -> anyhow::Result<()>;
}

/// Adapter that turns a plain async closure into a [`SaveTarget`].
pub struct SaveFn<F>(pub F);

#[async_trait]
impl<T, F, Fut> SaveTarget<T> for SaveFn<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn save(&self, value: T) -> anyhow::Result<()> {
        (self.0)(value).await
    }
}

/// Dispatch state machine. At most one flight runs at a time;
/// `SavingWithPending` records that another dispatch was requested while
/// the flight was up, so the edit is re-dispatched after settle instead of
/// running concurrently or getting dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scheduled,
    Saving,
    SavingWithPending,
}

struct EngineState<T> {
    phase: Phase,
    /// Serialized form of the last value considered already saved or not
    /// yet eligible to trigger a save. `None` until the first observation.
    baseline: Option<String>,
    /// Most recent watched value; flights capture this at dispatch time,
    /// not at scheduling time, so a trailing edit is still included.
    latest: Option<T>,
    /// First false→true enable transition consumed (baseline recaptured).
    armed: bool,
    timer: Option<JoinHandle<()>>,
    timer_epoch: u64,
    /// Monotonic flight counter, guards the saved→idle revert.
    flight_seq: u64,
    /// Callers of `save_now` that joined an in-flight chain.
    settle_waiters: Vec<oneshot::Sender<Result<(), SaveError>>>,
}

struct EngineInner<T> {
    target: Arc<dyn SaveTarget<T>>,
    listener: Arc<dyn SaveListener>,
    config: AutoSaveConfig,
    state: Mutex<EngineState<T>>,
    status_tx: watch::Sender<StatusSnapshot>,
}

/// Auto-save engine: watches a value offered by the host on every change,
/// debounces edits, suppresses content-identical re-offers, and persists
/// through the supplied [`SaveTarget`] with single-flight dispatch.
///
/// One engine instance per editing surface; clones share the same state.
pub struct AutoSaveEngine<T> {
    inner: Arc<EngineInner<T>>,
}

impl<T> Clone for AutoSaveEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> AutoSaveEngine<T>
where
    T: Clone + Serialize + Send + 'static,
{
    pub fn new(target: Arc<dyn SaveTarget<T>>, config: AutoSaveConfig) -> Self {
        Self::with_listener(target, config, Arc::new(TracingListener))
    }

    pub fn with_listener(
        target: Arc<dyn SaveTarget<T>>,
        config: AutoSaveConfig,
        listener: Arc<dyn SaveListener>,
    ) -> Self {
        let (status_tx, _) = watch::channel(StatusSnapshot::default());
        Self {
            inner: Arc::new(EngineInner {
                target,
                listener,
                config,
                state: Mutex::new(EngineState {
                    phase: Phase::Idle,
                    baseline: None,
                    latest: None,
                    armed: false,
                    timer: None,
                    timer_epoch: 0,
                    flight_seq: 0,
                    settle_waiters: Vec::new(),
                }),
                status_tx,
            }),
        }
    }

    /// Explicit event intake: the host calls this on every relevant change
    /// of the watched value or the enabled flag.
    ///
    /// Must be called from within a Tokio runtime; the debounce timer is a
    /// spawned task.
    pub fn observe(&self, value: T, enabled: bool) {
        let key = match fingerprint(&value) {
            Ok(key) => key,
            Err(e) => {
                warn!("failed to fingerprint watched value: {e:#}");
                return;
            }
        };

        let mut st = self.inner.lock_state();

        // First observation: record the baseline only. Data that was merely
        // loaded, not edited, must never be saved.
        if st.baseline.is_none() {
            st.baseline = Some(key);
            st.latest = Some(value);
            st.armed = enabled;
            return;
        }

        // Until the first enable, offers are dormant and do not move the
        // baseline. The enable transition itself recaptures the baseline
        // without saving, so data that finished loading asynchronously
        // before the flag flipped is not mistaken for a user edit.
        if !st.armed {
            if enabled {
                st.armed = true;
                st.baseline = Some(key);
                st.latest = Some(value);
            }
            return;
        }

        if !enabled {
            // Dormant again: drop any scheduled save, keep the baseline.
            if st.phase == Phase::Scheduled {
                st.phase = Phase::Idle;
            }
            EngineInner::<T>::cancel_timer(&mut st);
            return;
        }

        if st.baseline.as_deref() == Some(key.as_str()) {
            return; // content-identical re-offer, no-op
        }

        // Save-eligible edit: move the baseline forward immediately so
        // rapid repeats collapse into one scheduled save, then re-arm.
        st.baseline = Some(key);
        st.latest = Some(value);
        EngineInner::arm_timer(&self.inner, &mut st);
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status_tx.borrow().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.status_tx.borrow().last_error.clone()
    }

    /// Consumer render surface: receives a snapshot on every status change.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status_tx.subscribe()
    }

    /// Manual save: cancels any pending debounce and dispatches immediately,
    /// subject to the same single-flight rule. Resolves once this attempt —
    /// including any coalesced chain it joins — settles. Unlike debounced
    /// saves, failure is surfaced to the caller.
    pub async fn save_now(&self) -> Result<(), SaveError> {
        enum Entry {
            Run,
            Join(oneshot::Receiver<Result<(), SaveError>>),
        }

        let entry = {
            let mut st = self.inner.lock_state();
            if st.latest.is_none() {
                return Ok(()); // nothing observed yet
            }
            EngineInner::<T>::cancel_timer(&mut st);
            match st.phase {
                Phase::Idle | Phase::Scheduled => {
                    st.phase = Phase::Saving;
                    Entry::Run
                }
                Phase::Saving | Phase::SavingWithPending => {
                    st.phase = Phase::SavingWithPending;
                    let (tx, rx) = oneshot::channel();
                    st.settle_waiters.push(tx);
                    Entry::Join(rx)
                }
            }
        };

        match entry {
            Entry::Run => EngineInner::run_flight(&self.inner).await,
            Entry::Join(rx) => rx.await.unwrap_or(Ok(())),
        }
    }
}

impl<T> EngineInner<T>
where
    T: Clone + Serialize + Send + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, EngineState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: SaveStatus, last_error: Option<String>) {
        self.status_tx.send_modify(|snapshot| {
            snapshot.status = status;
            snapshot.last_error = last_error;
        });
    }

    fn cancel_timer(st: &mut EngineState<T>) {
        if let Some(timer) = st.timer.take() {
            timer.abort();
            // Epoch bump guards against a fire that already left its sleep.
            st.timer_epoch += 1;
        }
    }

    fn arm_timer(inner: &Arc<Self>, st: &mut EngineState<T>) {
        Self::cancel_timer(st);
        st.timer_epoch += 1;
        if st.phase == Phase::Idle {
            st.phase = Phase::Scheduled;
        }
        let epoch = st.timer_epoch;
        let debounce = inner.config.debounce;
        let inner = Arc::clone(inner);
        st.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            Self::on_timer(inner, epoch).await;
        }));
    }

    /// Single transition point for a debounce timer firing.
    async fn on_timer(inner: Arc<Self>, epoch: u64) {
        let run = {
            let mut st = inner.lock_state();
            if epoch != st.timer_epoch {
                return; // superseded by a newer edit or a manual save
            }
            st.timer = None;
            match st.phase {
                Phase::Scheduled => {
                    st.phase = Phase::Saving;
                    true
                }
                // A flight is up: mark pending, the settle path re-dispatches.
                Phase::Saving => {
                    st.phase = Phase::SavingWithPending;
                    false
                }
                Phase::SavingWithPending | Phase::Idle => false,
            }
        };
        if run {
            // Debounced saves never propagate; failures land in
            // status/last_error and the listener.
            if let Err(e) = Self::run_flight(&inner).await {
                debug!("debounced save failed: {}", e.message);
            }
        }
    }

    /// Runs the save flight loop: one save at a time, re-dispatching while
    /// the pending flag is set, so an edit that lands mid-save is executed
    /// exactly once after the in-flight call completes, with the value
    /// current at that later time. Caller must have moved the phase to
    /// `Saving` already.
    async fn run_flight(inner: &Arc<Self>) -> Result<(), SaveError> {
        loop {
            let (value, seq) = {
                let mut st = inner.lock_state();
                let value = match st.latest.clone() {
                    Some(value) => value,
                    None => {
                        // A flight only starts after an observation.
                        st.phase = Phase::Idle;
                        return Ok(());
                    }
                };
                st.flight_seq += 1;
                (value, st.flight_seq)
            };

            inner.publish(SaveStatus::Saving, None);
            debug!("dispatching save (flight {seq})");

            let result = inner
                .target
                .save(value)
                .await
                .map_err(|e| SaveError::from_failure(&e));

            match &result {
                Ok(()) => {
                    inner.publish(SaveStatus::Saved, None);
                    inner.listener.on_saved();
                    Self::schedule_saved_revert(inner, seq);
                }
                Err(e) => {
                    inner.publish(SaveStatus::Error, Some(e.message.clone()));
                    inner.listener.on_save_failed(&e.message);
                }
            }

            let (again, waiters) = {
                let mut st = inner.lock_state();
                if st.phase == Phase::SavingWithPending {
                    // The re-dispatch consumes `latest`; a timer an edit
                    // armed while the flag was already set would re-save
                    // that same value, so it is stale now.
                    Self::cancel_timer(&mut st);
                    st.phase = Phase::Saving;
                    (true, Vec::new())
                } else {
                    // A timer armed during the flight stays live; the next
                    // fire dispatches normally.
                    st.phase = if st.timer.is_some() {
                        Phase::Scheduled
                    } else {
                        Phase::Idle
                    };
                    (false, std::mem::take(&mut st.settle_waiters))
                }
            };

            if !again {
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
                return result;
            }
        }
    }

    /// Reverts `saved` back to `idle` after the display window, unless a
    /// newer flight has touched status in the meantime.
    fn schedule_saved_revert(inner: &Arc<Self>, seq: u64) {
        let display = inner.config.saved_display;
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            let still_current = inner.lock_state().flight_seq == seq;
            if still_current && inner.status_tx.borrow().status == SaveStatus::Saved {
                inner.status_tx.send_modify(|s| s.status = SaveStatus::Idle);
            }
        });
    }
}
