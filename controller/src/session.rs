use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::{oneshot, Mutex as CommandLock},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use microwave_common::{
    CookingEngine, CookingStage, DefrostCalculator, HistoryLedger, HistoryRecord, PowerLevel,
    RuntimeConfig, SessionError, SessionStatus, StartOutcome, StatusSnapshot, TickOutcome,
};

/// Handle to the one background task that advances the running session.
struct TickActivity {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Resets the engine to idle if the tick task exits without disarming it,
/// e.g. after a panic inside a tick.
struct FaultGuard {
    engine: Arc<Mutex<CookingEngine>>,
    armed: bool,
}

impl FaultGuard {
    fn new(engine: Arc<Mutex<CookingEngine>>) -> Self {
        Self {
            engine,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FaultGuard {
    fn drop(&mut self) {
        if self.armed {
            lock(&self.engine).abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the cooking session, its tick activity and the history ledger.
///
/// Commands are serialized by an async lock around the activity slot, so a
/// new tick task is only ever spawned after the previous one has been joined.
/// Engine state sits behind a plain mutex that is never held across an
/// `.await`, which keeps [`SessionController::status`] synchronous.
pub struct SessionController {
    engine: Arc<Mutex<CookingEngine>>,
    ledger: Mutex<HistoryLedger>,
    defrost: DefrostCalculator,
    activity: CommandLock<Option<TickActivity>>,
    tick_interval: Duration,
}

impl SessionController {
    pub fn new(config: &RuntimeConfig, ledger: HistoryLedger) -> Self {
        Self::with_engine(
            CookingEngine::new(config.oven.clone()),
            DefrostCalculator::new(&config.defrost),
            ledger,
        )
    }

    pub fn with_engine(
        engine: CookingEngine,
        defrost: DefrostCalculator,
        ledger: HistoryLedger,
    ) -> Self {
        let tick_interval = Duration::from_millis(engine.config.tick_interval_ms.max(1));
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ledger: Mutex::new(ledger),
            defrost,
            activity: CommandLock::new(None),
            tick_interval,
        }
    }

    pub async fn start(
        &self,
        duration_secs: u32,
        power: PowerLevel,
        stage: CookingStage,
    ) -> Result<StartOutcome, SessionError> {
        let mut activity = self.activity.lock().await;
        if lock(&self.engine).is_running() {
            return Err(SessionError::AlreadyRunning);
        }

        // Nothing is running, so any leftover task is finished or about to be.
        self.halt(&mut activity).await;

        let outcome = lock(&self.engine).start(duration_secs, power, stage, Utc::now())?;
        match &outcome {
            StartOutcome::Started(record) => {
                lock(&self.ledger).append(record.clone());
                info!(
                    "cooking started: {}s at {} ({})",
                    record.duration_secs,
                    record.power.label(),
                    record.stage
                );
            }
            StartOutcome::Resumed => info!("cooking resumed via start"),
        }

        *activity = Some(self.spawn_activity());
        Ok(outcome)
    }

    pub async fn pause(&self) {
        let mut activity = self.activity.lock().await;
        let paused = lock(&self.engine).pause();
        match paused {
            Ok(true) => info!("cooking paused"),
            Ok(false) => {}
            Err(err) => debug!("pause ignored: {err}"),
        }
        self.halt(&mut activity).await;
    }

    pub async fn resume(&self) {
        let mut activity = self.activity.lock().await;
        if lock(&self.engine).status() != SessionStatus::Paused {
            debug!("resume ignored: no paused session");
            return;
        }

        self.halt(&mut activity).await;

        let resumed = lock(&self.engine).resume();
        match resumed {
            Ok(true) => {
                info!("cooking resumed");
                *activity = Some(self.spawn_activity());
            }
            Ok(false) => {}
            Err(err) => debug!("resume ignored: {err}"),
        }
    }

    pub async fn stop(&self) {
        let mut activity = self.activity.lock().await;
        let was_live = {
            let mut engine = lock(&self.engine);
            let live = engine.status().is_live();
            engine.stop();
            live
        };
        self.halt(&mut activity).await;
        if was_live {
            info!("cooking stopped");
        } else {
            debug!("stop with no live session");
        }
    }

    /// Consistent snapshot of the session. Never waits on the tick activity.
    pub fn status(&self) -> StatusSnapshot {
        lock(&self.engine).take_snapshot()
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<HistoryRecord> {
        lock(&self.ledger).all().to_vec()
    }

    pub fn history_newest_first(&self) -> Vec<HistoryRecord> {
        lock(&self.ledger).newest_first().cloned().collect()
    }

    pub fn ledger_snapshot(&self) -> HistoryLedger {
        lock(&self.ledger).clone()
    }

    pub fn defrost_seconds(&self, food: &str, thickness: &str, weight_grams: f64) -> u64 {
        self.defrost.calculate(food, thickness, weight_grams)
    }

    async fn halt(&self, activity: &mut Option<TickActivity>) {
        let Some(TickActivity { shutdown, handle }) = activity.take() else {
            return;
        };

        // The task may already be gone after completing the session.
        let _ = shutdown.send(());
        if let Err(err) = handle.await {
            warn!("tick activity ended abnormally: {err}");
            lock(&self.engine).abort();
        }
    }

    fn spawn_activity(&self) -> TickActivity {
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let engine = Arc::clone(&self.engine);
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut guard = FaultGuard::new(Arc::clone(&engine));
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let outcome = lock(&engine).tick();
                        match outcome {
                            Ok(TickOutcome::Advanced { remaining_secs, reading }) => {
                                debug!("tick: {remaining_secs}s left, cavity {reading:.1}C");
                            }
                            Ok(TickOutcome::Completed { reading }) => {
                                info!("cooking completed, cavity {reading:.1}C");
                                break;
                            }
                            Ok(TickOutcome::NotRunning) => break,
                            Err(err) => {
                                warn!("tick activity stopped: {err}");
                                break;
                            }
                        }
                    }
                }
            }

            guard.disarm();
        });

        TickActivity { shutdown, handle }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(activity) = self.activity.get_mut().take() {
            activity.handle.abort();
        }
    }
}
