use std::collections::HashMap;

use crate::config::DefrostConfig;

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Base defrost minutes per (food type, thickness). Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct DefrostProfile {
    base_minutes: HashMap<(String, String), f64>,
}

impl DefrostProfile {
    pub fn from_config(config: &DefrostConfig) -> Self {
        let base_minutes = config
            .entries
            .iter()
            .filter(|entry| entry.validate())
            .map(|entry| {
                (
                    (normalize(&entry.food), normalize(&entry.thickness)),
                    entry.base_minutes,
                )
            })
            .collect();

        Self { base_minutes }
    }

    pub fn base_minutes(&self, food: &str, thickness: &str) -> Option<f64> {
        self.base_minutes
            .get(&(normalize(food), normalize(thickness)))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.base_minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_minutes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DefrostCalculator {
    profile: DefrostProfile,
    default_base_minutes: f64,
    reference_weight_grams: f64,
}

impl Default for DefrostCalculator {
    fn default() -> Self {
        Self::new(&DefrostConfig::default())
    }
}

impl DefrostCalculator {
    pub fn new(config: &DefrostConfig) -> Self {
        let mut config = config.clone();
        config.sanitize();
        Self {
            profile: DefrostProfile::from_config(&config),
            default_base_minutes: config.default_base_minutes,
            reference_weight_grams: config.reference_weight_grams,
        }
    }

    pub fn profile(&self) -> &DefrostProfile {
        &self.profile
    }

    /// Defrost time in seconds. Base minutes scale linearly with weight against
    /// the reference weight and are rounded to whole minutes. Unknown food or
    /// thickness uses the default base; unusable weights count as zero.
    pub fn calculate(&self, food: &str, thickness: &str, weight_grams: f64) -> u64 {
        let base = self
            .profile
            .base_minutes(food, thickness)
            .unwrap_or(self.default_base_minutes);
        let weight = if weight_grams.is_finite() {
            weight_grams.max(0.0)
        } else {
            0.0
        };

        let minutes = (base * weight / self.reference_weight_grams).round();
        (minutes as u64).saturating_mul(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefrostEntry;

    #[test]
    fn chicken_thin_scales_with_weight() {
        let calculator = DefrostCalculator::default();

        assert_eq!(calculator.calculate("chicken", "thin", 500.0), 180);
        assert_eq!(calculator.calculate("chicken", "thin", 1000.0), 360);
        assert_eq!(calculator.calculate("beef", "thick", 250.0), 240);
    }

    #[test]
    fn unknown_keys_fall_back_to_default_base() {
        let calculator = DefrostCalculator::default();

        assert_eq!(calculator.calculate("tofu", "thin", 500.0), 180);
        assert_eq!(calculator.calculate("fish", "medium", 1000.0), 360);
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let calculator = DefrostCalculator::default();

        assert_eq!(calculator.calculate(" Beef ", "THIN", 500.0), 240);
    }

    #[test]
    fn minutes_are_rounded_before_conversion() {
        let calculator = DefrostCalculator::default();

        // 2 * 600 / 500 = 2.4 minutes
        assert_eq!(calculator.calculate("fish", "thin", 600.0), 120);
        // 3 * 750 / 500 = 4.5 minutes
        assert_eq!(calculator.calculate("chicken", "thin", 750.0), 300);
    }

    #[test]
    fn unusable_weights_yield_zero() {
        let calculator = DefrostCalculator::default();

        assert_eq!(calculator.calculate("chicken", "thin", 0.0), 0);
        assert_eq!(calculator.calculate("chicken", "thin", -250.0), 0);
        assert_eq!(calculator.calculate("chicken", "thin", f64::NAN), 0);
        assert_eq!(calculator.calculate("chicken", "thin", f64::INFINITY), 0);
    }

    #[test]
    fn configured_entries_replace_builtin_table() {
        let config = DefrostConfig {
            default_base_minutes: 5.0,
            reference_weight_grams: 1000.0,
            entries: vec![DefrostEntry {
                food: "Pork".to_string(),
                thickness: "thick".to_string(),
                base_minutes: 10.0,
            }],
        };
        let calculator = DefrostCalculator::new(&config);

        assert_eq!(calculator.profile().len(), 1);
        assert_eq!(calculator.calculate("pork", "thick", 1000.0), 600);
        assert_eq!(calculator.calculate("chicken", "thin", 1000.0), 300);
    }
}
