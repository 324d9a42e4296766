use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OvenConfig {
    pub tick_interval_ms: u64,
    pub sensor_window: usize,
    pub sensor_min_c: f64,
    pub sensor_max_c: f64,
    pub status_publish_interval_ms: u64,
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            sensor_window: 10,
            sensor_min_c: 20.0,
            sensor_max_c: 100.0,
            status_publish_interval_ms: 1_000,
        }
    }
}

impl OvenConfig {
    pub fn sanitize(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(10, 60_000);
        self.sensor_window = self.sensor_window.clamp(1, 1_000);
        self.status_publish_interval_ms = self.status_publish_interval_ms.clamp(100, 60_000);

        let defaults = Self::default();
        if !self.sensor_min_c.is_finite() || !self.sensor_max_c.is_finite() {
            self.sensor_min_c = defaults.sensor_min_c;
            self.sensor_max_c = defaults.sensor_max_c;
        }
        if self.sensor_min_c > self.sensor_max_c {
            std::mem::swap(&mut self.sensor_min_c, &mut self.sensor_max_c);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefrostEntry {
    pub food: String,
    pub thickness: String,
    #[serde(rename = "baseMinutes")]
    pub base_minutes: f64,
}

impl DefrostEntry {
    fn new(food: &str, thickness: &str, base_minutes: f64) -> Self {
        Self {
            food: food.to_string(),
            thickness: thickness.to_string(),
            base_minutes,
        }
    }

    pub fn validate(&self) -> bool {
        !self.food.trim().is_empty()
            && !self.thickness.trim().is_empty()
            && self.base_minutes.is_finite()
            && self.base_minutes >= 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefrostConfig {
    pub default_base_minutes: f64,
    pub reference_weight_grams: f64,
    pub entries: Vec<DefrostEntry>,
}

impl Default for DefrostConfig {
    fn default() -> Self {
        Self {
            default_base_minutes: 3.0,
            reference_weight_grams: 500.0,
            entries: vec![
                DefrostEntry::new("chicken", "thin", 3.0),
                DefrostEntry::new("chicken", "thick", 6.0),
                DefrostEntry::new("beef", "thin", 4.0),
                DefrostEntry::new("beef", "thick", 8.0),
                DefrostEntry::new("fish", "thin", 2.0),
                DefrostEntry::new("fish", "thick", 4.0),
                DefrostEntry::new("vegetables", "thin", 2.0),
                DefrostEntry::new("vegetables", "thick", 3.0),
            ],
        }
    }
}

impl DefrostConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.default_base_minutes.is_finite() || self.default_base_minutes < 0.0 {
            self.default_base_minutes = defaults.default_base_minutes;
        }
        if !self.reference_weight_grams.is_finite() || self.reference_weight_grams <= 0.0 {
            self.reference_weight_grams = defaults.reference_weight_grams;
        }
        self.entries.retain(DefrostEntry::validate);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub oven: OvenConfig,
    #[serde(default)]
    pub defrost: DefrostConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.oven.sanitize();
        self.defrost.sanitize();
    }
}
