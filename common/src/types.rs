use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Running or paused.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Magnetron duty cycle. The three named levels are the control panel presets;
/// `Custom` carries any other percentage in `0..=100`. Levels compare by
/// percentage, so `Custom(30)` is the same level as `Low`.
#[derive(Debug, Clone, Copy, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PowerLevel {
    Low,
    Medium,
    #[default]
    High,
    Custom(u8),
}

impl PowerLevel {
    /// Presets in the order the control panel lists them.
    pub const PRESETS: [PowerLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn percent(self) -> u8 {
        match self {
            Self::Low => 30,
            Self::Medium => 60,
            Self::High => 100,
            Self::Custom(percent) => percent,
        }
    }

    pub fn from_percent(percent: u8) -> Result<Self, ParseError> {
        match percent {
            30 => Ok(Self::Low),
            60 => Ok(Self::Medium),
            100 => Ok(Self::High),
            0..=100 => Ok(Self::Custom(percent)),
            _ => Err(ParseError::PowerOutOfRange(percent.into())),
        }
    }

    /// Folds a `Custom` that holds a preset percentage into the preset.
    pub fn normalized(self) -> Self {
        match self {
            Self::Custom(percent) => Self::from_percent(percent).unwrap_or(self),
            preset => preset,
        }
    }

    pub fn label(self) -> String {
        match self.normalized() {
            Self::Low => "Low (30%)".to_string(),
            Self::Medium => "Medium (60%)".to_string(),
            Self::High => "High (100%)".to_string(),
            Self::Custom(percent) => format!("Custom ({percent}%)"),
        }
    }
}

impl PartialEq for PowerLevel {
    fn eq(&self, other: &Self) -> bool {
        self.percent() == other.percent()
    }
}

impl From<PowerLevel> for u8 {
    fn from(level: PowerLevel) -> Self {
        level.percent()
    }
}

impl TryFrom<u8> for PowerLevel {
    type Error = ParseError;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::from_percent(percent)
    }
}

impl FromStr for PowerLevel {
    type Err = ParseError;

    /// Accepts `low`/`medium`/`high`, the panel labels such as `Medium (60%)`,
    /// or a bare percentage with an optional `%` suffix.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let lower = value.to_ascii_lowercase();
        let name = lower.split_whitespace().next().unwrap_or_default();

        match name {
            "low" => return Ok(Self::Low),
            "medium" => return Ok(Self::Medium),
            "high" => return Ok(Self::High),
            _ => {}
        }

        let digits = lower.trim_end_matches('%');
        match digits.parse::<i64>() {
            Ok(percent) => {
                let percent =
                    u8::try_from(percent).map_err(|_| ParseError::PowerOutOfRange(percent))?;
                Self::from_percent(percent)
            }
            Err(_) => Err(ParseError::UnknownPowerLevel(value.to_string())),
        }
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingStage {
    Defrost,
    Cook,
    Warm,
    Reheat,
}

impl CookingStage {
    pub const ALL: [CookingStage; 4] = [Self::Defrost, Self::Cook, Self::Warm, Self::Reheat];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defrost => "defrost",
            Self::Cook => "cook",
            Self::Warm => "warm",
            Self::Reheat => "reheat",
        }
    }
}

impl FromStr for CookingStage {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| ParseError::UnknownStage(value.to_string()))
    }
}

impl fmt::Display for CookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the oven handed to display and reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: SessionStatus,
    pub running: bool,
    #[serde(rename = "remainingSeconds")]
    pub remaining_secs: u32,
    #[serde(rename = "powerPercent")]
    pub power: PowerLevel,
    pub stage: Option<CookingStage>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastSensorReading")]
    pub last_sensor_reading: f64,
}

impl StatusSnapshot {
    /// `MM:SS` countdown as shown on the oven display.
    pub fn display_time(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }
}
