use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;

use super::error::ProctorError;

/// Tuning for a proctored session.
#[derive(Debug, Clone)]
pub struct ProctorConfig {
    /// Period of the face and noise sampling tick.
    pub poll_interval: Duration,
    /// Each session draws its warning ceiling uniformly from this range.
    pub warning_ceiling: RangeInclusive<u32>,
    /// Mean absolute amplitude, on a normalized `[0, 1]` scale, above which a
    /// tick's audio counts as noise.
    pub noise_threshold: f32,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            warning_ceiling: 3..=5,
            noise_threshold: 0.2,
        }
    }
}

impl ProctorConfig {
    pub fn validate(&self) -> Result<(), ProctorError> {
        if self.poll_interval.is_zero() {
            return Err(ProctorError::Config("poll_interval must be positive".to_string()));
        }
        if *self.warning_ceiling.start() == 0 || self.warning_ceiling.is_empty() {
            return Err(ProctorError::Config(format!(
                "warning_ceiling {:?} must be a non-empty range starting at 1 or more",
                self.warning_ceiling
            )));
        }
        if !(self.noise_threshold > 0.0 && self.noise_threshold <= 1.0) {
            return Err(ProctorError::Config(format!(
                "noise_threshold {} must lie in (0, 1]",
                self.noise_threshold
            )));
        }
        Ok(())
    }

    pub fn pick_ceiling<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.warning_ceiling.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn default_is_valid() {
        let config = ProctorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_degenerate_settings() {
        let zero_ceiling = ProctorConfig {
            warning_ceiling: 0..=3,
            ..ProctorConfig::default()
        };
        assert!(zero_ceiling.validate().is_err());

        #[allow(clippy::reversed_empty_ranges)]
        let empty = ProctorConfig {
            warning_ceiling: 5..=3,
            ..ProctorConfig::default()
        };
        assert!(empty.validate().is_err());

        let loud = ProctorConfig {
            noise_threshold: 1.5,
            ..ProctorConfig::default()
        };
        assert!(loud.validate().is_err());

        let stalled = ProctorConfig {
            poll_interval: Duration::ZERO,
            ..ProctorConfig::default()
        };
        assert!(stalled.validate().is_err());
    }

    #[test]
    fn ceiling_stays_inside_range() {
        let config = ProctorConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 6];
        for _ in 0..200 {
            let ceiling = config.pick_ceiling(&mut rng);
            assert!((3..=5).contains(&ceiling));
            seen[ceiling as usize] = true;
        }
        assert!(seen[3] && seen[4] && seen[5]);
    }
}
