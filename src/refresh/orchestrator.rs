use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::actions::{do_refresh, do_sign_out};
use super::api::{RefreshApi, RefreshOutcome, RefreshParams};
use crate::config::{RefreshSettings, MAX_REFRESH_INTERVAL_SECS};
use crate::error::AuthKitError;
use crate::models::{AuthKitState, UserState};
use crate::observable::{Observer, Subscription};
use crate::store::TokenStore;

/// The refresh setup: how often to refresh and whom to ask.
pub struct RefreshConfig<T: UserState> {
    interval: Duration,
    api: Arc<dyn RefreshApi<T>>,
    initial_placeholder: bool,
}

impl<T: UserState> RefreshConfig<T> {
    pub fn new(
        interval: Duration,
        api: impl RefreshApi<T> + 'static,
    ) -> Result<Self, AuthKitError> {
        let max = Duration::from_secs(MAX_REFRESH_INTERVAL_SECS as u64);
        if interval.is_zero() || interval > max {
            return Err(AuthKitError::Config(format!(
                "refresh interval must be between 1s and {}s, got {:?}",
                MAX_REFRESH_INTERVAL_SECS, interval
            )));
        }
        Ok(RefreshConfig {
            interval,
            api: Arc::new(api),
            initial_placeholder: true,
        })
    }

    /// Pairs the declarative settings from the config file with the callback.
    pub fn from_settings(
        settings: &RefreshSettings,
        api: impl RefreshApi<T> + 'static,
    ) -> Result<Self, AuthKitError> {
        if settings.interval_secs <= 0 || settings.interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(AuthKitError::Config(format!(
                "refresh interval must be between 1s and {}s, got {}s",
                MAX_REFRESH_INTERVAL_SECS, settings.interval_secs
            )));
        }
        let config = Self::new(settings.interval(), api)?;
        Ok(config.with_initial_placeholder(settings.initial_placeholder))
    }

    /// Whether `RefreshHandle::gate` may show a placeholder. On by default.
    pub fn with_initial_placeholder(mut self, initial_placeholder: bool) -> Self {
        self.initial_placeholder = initial_placeholder;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Drives the initial silent refresh and the periodic refresh of one store.
pub struct RefreshOrchestrator<T: UserState> {
    store: Arc<TokenStore<T>>,
    config: RefreshConfig<T>,
}

impl<T: UserState> RefreshOrchestrator<T> {
    pub fn new(store: Arc<TokenStore<T>>, config: RefreshConfig<T>) -> Self {
        RefreshOrchestrator { store, config }
    }

    /// Starts the orchestrator on the current tokio runtime.
    ///
    /// The initial refresh decision runs first; the periodic timer is armed
    /// whenever the store is signed in and torn down when it is not.
    pub fn mount(self) -> RefreshHandle {
        let (pending_tx, pending_rx) = watch::channel(true);
        let (signed_in_tx, signed_in_rx) = watch::channel(self.store.value().is_sign_in);

        let subscription = self
            .store
            .subscribe(Observer::new(move |state: &AuthKitState<T>| {
                let signed_in = state.is_sign_in;
                signed_in_tx.send_if_modified(|current| {
                    let changed = *current != signed_in;
                    *current = signed_in;
                    changed
                });
            }));

        let initial_placeholder = self.config.initial_placeholder;
        let task = tokio::spawn(self.run(pending_tx, signed_in_rx));

        RefreshHandle {
            task,
            pending: pending_rx,
            initial_placeholder,
            subscription: Some(subscription),
        }
    }

    async fn run(self, pending: watch::Sender<bool>, mut signed_in: watch::Receiver<bool>) {
        self.initial_refresh().await;
        pending.send_replace(false);

        loop {
            // Sleep until signed in. An error means the store was completed.
            if signed_in.wait_for(|signed_in| *signed_in).await.is_err() {
                debug!("Token store closed; refresh orchestrator exiting");
                return;
            }

            info!("Periodic refresh armed every {:?}", self.config.interval);
            let interval = self.config.interval;
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh_once().await;
                        if !self.store.value().is_sign_in {
                            break;
                        }
                    }
                    changed = signed_in.changed() => {
                        if changed.is_err() {
                            debug!("Token store closed; refresh orchestrator exiting");
                            return;
                        }
                        if !*signed_in.borrow_and_update() {
                            break;
                        }
                    }
                }
            }
            info!("Periodic refresh cancelled");
        }
    }

    async fn initial_refresh(&self) {
        let state = self.store.value();
        if state.is_sign_in {
            debug!("Already signed in; skipping initial refresh");
        } else if state.is_refresh_eligible() {
            info!("Attempting initial silent refresh");
            self.refresh_once().await;
        } else {
            debug!("No usable refresh token; settling initial refresh as signed out");
            do_sign_out(&self.store);
        }
    }

    /// Calls the callback once with the current tokens and applies the
    /// outcome to the store as it is at settlement. Returns whether the
    /// callback succeeded.
    pub async fn refresh_once(&self) -> bool {
        let params = RefreshParams::from_state(&self.store.value());
        let call = AssertUnwindSafe(self.config.api.refresh(params)).catch_unwind();

        match call.await {
            Ok(Ok(RefreshOutcome::Success(success))) => {
                do_refresh(&self.store, success);
                info!(signed_in = self.store.value().is_sign_in, "Refresh succeeded");
                true
            }
            Ok(Ok(RefreshOutcome::Failure)) => {
                warn!("Refresh rejected by backend; signing out");
                do_sign_out(&self.store);
                false
            }
            Ok(Err(e)) => {
                warn!("Refresh callback failed: {}; signing out", e);
                self.store.report_error(AuthKitError::Refresh(e.to_string()));
                do_sign_out(&self.store);
                false
            }
            Err(_) => {
                warn!("Refresh callback panicked; signing out");
                self.store
                    .report_error(AuthKitError::Refresh("callback panicked".to_string()));
                do_sign_out(&self.store);
                false
            }
        }
    }
}

/// Keeps a mounted orchestrator alive. Dropping it stops the timer and
/// detaches from the store.
pub struct RefreshHandle {
    task: JoinHandle<()>,
    pending: watch::Receiver<bool>,
    initial_placeholder: bool,
    subscription: Option<Subscription>,
}

impl RefreshHandle {
    /// True from mount until the first refresh decision has been applied.
    pub fn is_initial_refresh_pending(&self) -> bool {
        *self.pending.borrow()
    }

    /// Resolves once the initial refresh has settled.
    pub async fn initial_refresh_settled(&self) {
        let mut pending = self.pending.clone();
        // An error means the task is gone and nothing will settle it.
        let _ = pending.wait_for(|pending| !*pending).await;
    }

    /// The placeholder while the initial refresh is pending and a placeholder
    /// is configured, `children` otherwise.
    pub fn gate<R>(&self, placeholder: Option<R>, children: R) -> R {
        match placeholder {
            Some(placeholder) if self.initial_placeholder && self.is_initial_refresh_pending() => {
                placeholder
            }
            _ => children,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Unmounts the orchestrator.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
