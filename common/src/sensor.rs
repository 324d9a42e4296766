use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::OvenConfig;

/// Rolling window of simulated cavity temperature readings in Celsius.
#[derive(Debug, Clone)]
pub struct SensorFeed {
    readings: VecDeque<f64>,
    capacity: usize,
    min_c: f64,
    max_c: f64,
    rng: StdRng,
}

impl SensorFeed {
    pub fn new(config: &OvenConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic feed, for tests and replays.
    pub fn with_seed(config: &OvenConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &OvenConfig, rng: StdRng) -> Self {
        let capacity = config.sensor_window.max(1);
        let (min_c, max_c) = if config.sensor_min_c <= config.sensor_max_c {
            (config.sensor_min_c, config.sensor_max_c)
        } else {
            (config.sensor_max_c, config.sensor_min_c)
        };

        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            min_c,
            max_c,
            rng,
        }
    }

    /// Takes one sample, evicting the oldest once the window is full.
    pub fn advance(&mut self) -> f64 {
        let reading = self.rng.gen_range(self.min_c..=self.max_c);
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        reading
    }

    pub fn latest(&self) -> f64 {
        self.readings.back().copied().unwrap_or(0.0)
    }

    /// Oldest first.
    pub fn readings(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_feed_reads_zero() {
        let feed = SensorFeed::with_seed(&OvenConfig::default(), 7);

        assert!(feed.is_empty());
        assert_eq!(feed.latest(), 0.0);
    }

    #[test]
    fn window_keeps_last_ten_readings() {
        let mut feed = SensorFeed::with_seed(&OvenConfig::default(), 42);
        let produced: Vec<f64> = (0..15).map(|_| feed.advance()).collect();

        assert_eq!(feed.len(), 10);
        assert_eq!(feed.latest(), produced[14]);
        assert_eq!(feed.readings().collect::<Vec<_>>(), produced[5..].to_vec());
    }

    #[test]
    fn readings_stay_in_configured_range() {
        let mut feed = SensorFeed::with_seed(&OvenConfig::default(), 3);

        for _ in 0..500 {
            let reading = feed.advance();
            assert!((20.0..=100.0).contains(&reading), "{reading} out of range");
            assert!(feed.len() <= feed.capacity());
        }
    }

    #[test]
    fn same_seed_repeats_sequence() {
        let config = OvenConfig::default();
        let mut a = SensorFeed::with_seed(&config, 99);
        let mut b = SensorFeed::with_seed(&config, 99);

        for _ in 0..12 {
            assert_eq!(a.advance(), b.advance());
        }
    }
}
