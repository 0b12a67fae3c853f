use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Below this size births and deaths are drawn as discrete events
pub const DEMOGRAPHIC_THRESHOLD: f64 = 100.0;

/// Apply demographic stochasticity to a kernel output.
///
/// Small populations are replaced by a Poisson draw with the same mean;
/// larger ones pass through. The result is never negative.
pub fn apply_demographic_noise(population: f64, rng: &mut impl Rng) -> f64 {
    if population <= 0.0 || population.is_nan() {
        return 0.0;
    }
    if population >= DEMOGRAPHIC_THRESHOLD {
        return population;
    }
    match Poisson::new(population) {
        Ok(poisson) => {
            let draw: f64 = poisson.sample(rng);
            draw.max(0.0)
        }
        // Only reachable for a mean Poisson rejects, e.g. subnormal values
        Err(_) => 0.0,
    }
}
