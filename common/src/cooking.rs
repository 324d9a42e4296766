use chrono::{DateTime, Utc};

use crate::{
    config::OvenConfig,
    error::SessionError,
    history::HistoryRecord,
    sensor::SensorFeed,
    types::{CookingStage, PowerLevel, SessionStatus, StatusSnapshot},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh session; the record belongs in the history ledger.
    Started(HistoryRecord),
    /// A paused session picked up where it left off.
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Time was consumed and the session is still running.
    Advanced { remaining_secs: u32, reading: f64 },
    /// The last second elapsed; the session is now `Completed`.
    Completed { reading: f64 },
    /// Nothing is running. The tick activity should exit.
    NotRunning,
}

/// Synchronous cooking state machine. Owns the single session and the sensor
/// window; callers provide the clock and drive `tick` once per interval.
#[derive(Debug, Clone)]
pub struct CookingEngine {
    pub config: OvenConfig,

    status: SessionStatus,
    remaining_secs: u32,
    power: PowerLevel,
    stage: Option<CookingStage>,
    started_at: Option<DateTime<Utc>>,

    sensor: SensorFeed,
}

impl CookingEngine {
    pub fn new(mut config: OvenConfig) -> Self {
        config.sanitize();
        let sensor = SensorFeed::new(&config);
        Self::with_sensor(config, sensor)
    }

    pub fn with_sensor(config: OvenConfig, sensor: SensorFeed) -> Self {
        Self {
            config,
            status: SessionStatus::Idle,
            remaining_secs: 0,
            power: PowerLevel::default(),
            stage: None,
            started_at: None,
            sensor,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn power(&self) -> PowerLevel {
        self.power
    }

    pub fn stage(&self) -> Option<CookingStage> {
        self.stage
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn sensor(&self) -> &SensorFeed {
        &self.sensor
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Starts a new session, or resumes a paused one without touching its
    /// remaining time, power or stage.
    pub fn start(
        &mut self,
        duration_secs: u32,
        power: PowerLevel,
        stage: CookingStage,
        now: DateTime<Utc>,
    ) -> Result<StartOutcome, SessionError> {
        match self.status {
            SessionStatus::Running => return Err(SessionError::AlreadyRunning),
            SessionStatus::Paused if self.remaining_secs > 0 => {
                self.status = SessionStatus::Running;
                return Ok(StartOutcome::Resumed);
            }
            _ => {}
        }

        if duration_secs == 0 {
            return Err(SessionError::InvalidDuration);
        }
        let power = power.normalized();

        self.status = SessionStatus::Running;
        self.remaining_secs = duration_secs;
        self.power = power;
        self.stage = Some(stage);
        self.started_at = Some(now);

        Ok(StartOutcome::Started(HistoryRecord {
            started_at: now,
            duration_secs,
            power,
            stage,
        }))
    }

    /// Returns whether the session changed state; pausing twice is a no-op.
    pub fn pause(&mut self) -> Result<bool, SessionError> {
        match self.status {
            SessionStatus::Running => {
                self.status = SessionStatus::Paused;
                Ok(true)
            }
            SessionStatus::Paused => Ok(false),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    pub fn resume(&mut self) -> Result<bool, SessionError> {
        match self.status {
            SessionStatus::Paused if self.remaining_secs > 0 => {
                self.status = SessionStatus::Running;
                Ok(true)
            }
            SessionStatus::Running => Ok(false),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    pub fn stop(&mut self) {
        self.remaining_secs = 0;
        self.status = SessionStatus::Idle;
    }

    /// Forces the engine back to a clean idle state after a tick fault.
    pub fn abort(&mut self) {
        self.stop();
    }

    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.status != SessionStatus::Running {
            return Ok(TickOutcome::NotRunning);
        }

        if self.remaining_secs == 0 {
            self.abort();
            return Err(SessionError::TickFault("running session had no time remaining"));
        }

        self.remaining_secs -= 1;
        let reading = self.sensor.advance();

        if self.remaining_secs == 0 {
            self.status = SessionStatus::Completed;
            return Ok(TickOutcome::Completed { reading });
        }

        Ok(TickOutcome::Advanced {
            remaining_secs: self.remaining_secs,
            reading,
        })
    }

    /// Snapshot for observers. A `Completed` session is reported once and
    /// then folds back to `Idle`.
    pub fn take_snapshot(&mut self) -> StatusSnapshot {
        let snapshot = self.snapshot();
        if self.status == SessionStatus::Completed {
            self.status = SessionStatus::Idle;
        }
        snapshot
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            running: self.is_running(),
            remaining_secs: self.remaining_secs,
            power: self.power,
            stage: self.stage,
            started_at: self.started_at,
            last_sensor_reading: self.sensor.latest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn engine() -> CookingEngine {
        let config = OvenConfig::default();
        let sensor = SensorFeed::with_seed(&config, 11);
        CookingEngine::with_sensor(config, sensor)
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 30, second).unwrap()
    }

    #[test]
    fn start_from_idle_runs_with_full_duration() {
        let mut engine = engine();

        let outcome = engine
            .start(90, PowerLevel::Medium, CookingStage::Cook, at(0))
            .unwrap();

        assert_eq!(
            outcome,
            StartOutcome::Started(HistoryRecord {
                started_at: at(0),
                duration_secs: 90,
                power: PowerLevel::Medium,
                stage: CookingStage::Cook,
            })
        );
        assert_eq!(engine.status(), SessionStatus::Running);
        assert_eq!(engine.remaining_secs(), 90);
        assert_eq!(engine.started_at(), Some(at(0)));
    }

    #[test]
    fn start_while_running_is_rejected_without_changes() {
        let mut engine = engine();
        engine
            .start(30, PowerLevel::Low, CookingStage::Defrost, at(0))
            .unwrap();
        let before = engine.snapshot();

        let result = engine.start(120, PowerLevel::High, CookingStage::Cook, at(5));

        assert_eq!(result, Err(SessionError::AlreadyRunning));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn zero_duration_is_invalid() {
        let mut engine = engine();

        assert_eq!(
            engine.start(0, PowerLevel::High, CookingStage::Cook, at(0)),
            Err(SessionError::InvalidDuration)
        );
        assert_eq!(engine.status(), SessionStatus::Idle);
    }

    #[test]
    fn long_duration_starts() {
        let mut engine = CookingEngine::new(OvenConfig::default());

        let outcome = engine.start(7_200, PowerLevel::High, CookingStage::Cook, at(0));

        assert!(matches!(outcome, Ok(StartOutcome::Started(_))));
        assert_eq!(engine.status(), SessionStatus::Running);
        assert_eq!(engine.remaining_secs(), 7_200);
        assert_eq!(engine.snapshot().display_time(), "120:00");
    }

    #[test]
    fn custom_power_at_a_preset_is_stored_as_the_preset() {
        let mut engine = engine();

        engine
            .start(20, PowerLevel::Custom(60), CookingStage::Cook, at(0))
            .unwrap();

        assert!(matches!(engine.power(), PowerLevel::Medium));
        assert_eq!(engine.power().label(), "Medium (60%)");
    }

    #[test]
    fn start_while_paused_resumes_without_reset() {
        let mut engine = engine();
        engine
            .start(10, PowerLevel::Low, CookingStage::Warm, at(0))
            .unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();

        let outcome = engine
            .start(300, PowerLevel::High, CookingStage::Cook, at(20))
            .unwrap();

        assert_eq!(outcome, StartOutcome::Resumed);
        assert_eq!(engine.status(), SessionStatus::Running);
        assert_eq!(engine.remaining_secs(), 9);
        assert_eq!(engine.power(), PowerLevel::Low);
        assert_eq!(engine.stage(), Some(CookingStage::Warm));
        assert_eq!(engine.started_at(), Some(at(0)));
    }

    #[test]
    fn pause_and_resume_preserve_session() {
        let mut engine = engine();
        engine
            .start(45, PowerLevel::Custom(80), CookingStage::Reheat, at(0))
            .unwrap();
        engine.tick().unwrap();

        assert_eq!(engine.pause(), Ok(true));
        assert_eq!(engine.pause(), Ok(false));
        assert_eq!(engine.tick().unwrap(), TickOutcome::NotRunning);
        assert_eq!(engine.resume(), Ok(true));
        assert_eq!(engine.resume(), Ok(false));

        assert_eq!(engine.status(), SessionStatus::Running);
        assert_eq!(engine.remaining_secs(), 44);
        assert_eq!(engine.power(), PowerLevel::Custom(80));
        assert_eq!(engine.stage(), Some(CookingStage::Reheat));
    }

    #[test]
    fn pause_and_resume_without_session_report_no_active_session() {
        let mut engine = engine();

        assert_eq!(engine.pause(), Err(SessionError::NoActiveSession));
        assert_eq!(engine.resume(), Err(SessionError::NoActiveSession));
        assert_eq!(engine.status(), SessionStatus::Idle);
    }

    #[test]
    fn ticks_run_session_to_completion() {
        let mut engine = engine();
        engine
            .start(3, PowerLevel::High, CookingStage::Cook, at(0))
            .unwrap();

        assert!(matches!(
            engine.tick().unwrap(),
            TickOutcome::Advanced {
                remaining_secs: 2,
                ..
            }
        ));
        assert!(matches!(
            engine.tick().unwrap(),
            TickOutcome::Advanced {
                remaining_secs: 1,
                ..
            }
        ));
        assert!(matches!(
            engine.tick().unwrap(),
            TickOutcome::Completed { .. }
        ));
        assert_eq!(engine.tick().unwrap(), TickOutcome::NotRunning);

        assert_eq!(engine.sensor().len(), 3);
        let first = engine.take_snapshot();
        assert_eq!(first.status, SessionStatus::Completed);
        assert_eq!(first.remaining_secs, 0);
        assert_eq!(first.last_sensor_reading, engine.sensor().latest());

        let second = engine.take_snapshot();
        assert_eq!(second.status, SessionStatus::Idle);
        assert_eq!(second.remaining_secs, 0);
    }

    #[test]
    fn completed_session_can_be_restarted() {
        let mut engine = engine();
        engine
            .start(1, PowerLevel::High, CookingStage::Cook, at(0))
            .unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.status(), SessionStatus::Completed);

        let outcome = engine
            .start(5, PowerLevel::Low, CookingStage::Defrost, at(10))
            .unwrap();

        assert!(matches!(outcome, StartOutcome::Started(_)));
        assert_eq!(engine.remaining_secs(), 5);
        assert_eq!(engine.started_at(), Some(at(10)));
    }

    #[test]
    fn stop_is_unconditional_and_idempotent() {
        let mut engine = engine();
        engine.stop();
        assert_eq!(engine.status(), SessionStatus::Idle);

        engine
            .start(60, PowerLevel::High, CookingStage::Cook, at(0))
            .unwrap();
        engine.pause().unwrap();
        engine.stop();
        engine.stop();

        assert_eq!(engine.status(), SessionStatus::Idle);
        assert_eq!(engine.remaining_secs(), 0);
        assert_eq!(engine.resume(), Err(SessionError::NoActiveSession));
    }

    #[test]
    fn inconsistent_running_state_faults_to_idle() {
        let mut engine = engine();
        engine.status = SessionStatus::Running;
        engine.remaining_secs = 0;

        let result = engine.tick();

        assert!(matches!(result, Err(SessionError::TickFault(_))));
        assert_eq!(engine.status(), SessionStatus::Idle);
        assert_eq!(engine.remaining_secs(), 0);
    }

    #[test]
    fn snapshot_serializes_for_display() {
        let mut engine = engine();
        engine
            .start(75, PowerLevel::Medium, CookingStage::Defrost, at(0))
            .unwrap();

        let json = serde_json::to_value(engine.snapshot()).unwrap();

        assert_eq!(json["status"], "RUNNING");
        assert_eq!(json["running"], true);
        assert_eq!(json["remainingSeconds"], 75);
        assert_eq!(json["powerPercent"], 60);
        assert_eq!(json["stage"], "defrost");
        assert_eq!(json["lastSensorReading"], 0.0);
    }
}
