use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

use crate::config::{check_rate, ConfigurationError, Phase};

/// A validated rate parameter for one phase.
#[derive(Debug, Clone, Copy)]
pub struct Rate {
    phase: Phase,
    lambda: f64,
    distribution: Exp<f64>,
}

impl Rate {
    pub fn new(phase: Phase, lambda: f64) -> Result<Self, ConfigurationError> {
        check_rate(phase, lambda)?;
        let distribution = Exp::new(lambda)
            .map_err(|_| ConfigurationError::InvalidRate { phase, value: lambda })?;

        Ok(Self {
            phase,
            lambda,
            distribution,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

/// Exponentially distributed phase durations for a single worker.
///
/// Each worker owns its own generator. A raw sample `x` becomes `x * time_unit`.
#[derive(Debug)]
pub struct VariateSource {
    rng: StdRng,
    time_unit: Duration,
}

impl VariateSource {
    pub fn new(rng: StdRng, time_unit: Duration) -> Self {
        Self { rng, time_unit }
    }

    /// Create the generator for worker `index`. With a base seed the sequence is reproducible,
    /// otherwise the generator is seeded from the OS.
    pub fn for_worker(seed: Option<u64>, index: usize, time_unit: Duration) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };

        Self::new(rng, time_unit)
    }

    pub fn draw(&mut self, rate: &Rate) -> Duration {
        let sample: f64 = rate.distribution.sample(&mut self.rng);
        scale(sample, self.time_unit)
    }
}

/// Never negative. Samples that are not a usable number of nanoseconds collapse to zero, and very
/// large ones saturate.
fn scale(sample: f64, time_unit: Duration) -> Duration {
    let nanos = sample * time_unit.as_nanos() as f64;
    if nanos.is_finite() && nanos > 0.0 {
        Duration::from_nanos(nanos as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_close_to_inverse_rate() {
        let rate = Rate::new(Phase::On, 0.5).unwrap();
        let mut source = VariateSource::for_worker(Some(42), 0, Duration::from_millis(10));

        let n = 20_000;
        let total: Duration = (0..n).map(|_| source.draw(&rate)).sum();
        let mean_ms = total.as_secs_f64() * 1000.0 / n as f64;

        // 1 / 0.5 = 2 units of 10ms
        assert!((mean_ms - 20.0).abs() < 1.0, "mean was {mean_ms}ms");
    }

    #[test]
    fn same_seed_same_sequence() {
        let rate = Rate::new(Phase::Off, 0.8).unwrap();
        let mut a = VariateSource::for_worker(Some(7), 3, Duration::from_millis(10));
        let mut b = VariateSource::for_worker(Some(7), 3, Duration::from_millis(10));

        for _ in 0..100 {
            assert_eq!(a.draw(&rate), b.draw(&rate));
        }
    }

    #[test]
    fn workers_get_distinct_sequences() {
        let rate = Rate::new(Phase::On, 0.3).unwrap();
        let mut a = VariateSource::for_worker(Some(7), 0, Duration::from_millis(10));
        let mut b = VariateSource::for_worker(Some(7), 1, Duration::from_millis(10));

        let a = (0..10).map(|_| a.draw(&rate)).collect::<Vec<_>>();
        let b = (0..10).map(|_| b.draw(&rate)).collect::<Vec<_>>();
        assert_ne!(a, b);
    }

    #[test]
    fn scale_clamps_to_zero() {
        let unit = Duration::from_millis(10);
        assert_eq!(Duration::ZERO, scale(-1.0, unit));
        assert_eq!(Duration::ZERO, scale(f64::NAN, unit));
        assert_eq!(Duration::ZERO, scale(f64::INFINITY, unit));
        assert_eq!(Duration::from_millis(15), scale(1.5, unit));
    }

    #[test]
    fn scale_saturates() {
        assert_eq!(
            Duration::from_nanos(u64::MAX),
            scale(1e30, Duration::from_secs(1))
        );
    }

    #[test]
    fn rate_rejects_non_positive() {
        assert!(Rate::new(Phase::On, 0.0).is_err());
        assert!(Rate::new(Phase::Off, -2.0).is_err());
        assert_eq!(1.5, Rate::new(Phase::On, 1.5).unwrap().lambda());
    }
}
