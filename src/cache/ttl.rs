//! Jittered time-to-live.
//!
//! The TTL is derived once per service instance so that several instances
//! started together do not expire their caches at the same moment.

use std::time::Duration;

use rand::Rng;

/// Lower bound for the configured base and the jittered result.
pub const MIN_TTL: Duration = Duration::from_secs(5);

/// Upper bound for the configured base.
pub const MAX_TTL: Duration = Duration::from_secs(1800);

/// Base TTL used when none is configured.
pub const DEFAULT_TTL_SECS: u64 = 60;

const JITTER_LOW: f64 = 0.9;
const JITTER_HIGH: f64 = 1.1;

/// Clamp a configured base TTL into `[MIN_TTL, MAX_TTL]`.
pub fn clamp_base(base: Duration) -> Duration {
    base.clamp(MIN_TTL, MAX_TTL)
}

/// Apply a uniform `[0.9, 1.1]` multiplier to the clamped base.
///
/// The result never drops below [`MIN_TTL`]; it lies in
/// `[max(5s, 0.9b), min(1980s, 1.1b)]`.
pub fn jitter<R>(base: Duration, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let factor = rng.gen_range(JITTER_LOW..=JITTER_HIGH);
    clamp_base(base).mul_f64(factor).max(MIN_TTL)
}

/// Jittered TTL from a base in seconds, using the thread-local RNG.
pub fn jittered_ttl(base_secs: u64) -> Duration {
    jitter(Duration::from_secs(base_secs), &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn clamps_out_of_range_bases() {
        assert_eq!(clamp_base(Duration::from_secs(1)), MIN_TTL);
        assert_eq!(clamp_base(Duration::from_secs(10_000)), MAX_TTL);
        assert_eq!(
            clamp_base(Duration::from_secs(60)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for base in [5u64, 6, 30, 60, 300, 1799, 1800] {
            let b = base as f64;
            let low = (0.9 * b).max(5.0);
            let high = (1.1 * b).min(1800.0 * 1.1);
            for _ in 0..200 {
                let ttl = jitter(Duration::from_secs(base), &mut rng).as_secs_f64();
                assert!(
                    ttl >= low - 1e-6 && ttl <= high + 1e-6,
                    "ttl {ttl} outside [{low}, {high}] for base {base}"
                );
            }
        }
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let a = jitter(Duration::from_secs(60), &mut StdRng::seed_from_u64(42));
        let b = jitter(Duration::from_secs(60), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_base_is_clamped_before_jitter() {
        let mut rng = StdRng::seed_from_u64(1);
        let ttl = jitter(Duration::from_secs(86_400), &mut rng);
        assert!(ttl <= Duration::from_secs(1980));
        let ttl = jitter(Duration::from_secs(0), &mut rng);
        assert!(ttl >= MIN_TTL);
    }
}
