//! Injected randomness.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The engine's only source of chance.
///
/// Every probability check takes exactly one uniform draw from
/// [`Dice::unit`] and compares it with `< p`. A scripted dice replays a
/// fixed sequence of draws, which lets tests walk a turn through a
/// specific river mishap or hunting miss without searching for a seed.
#[derive(Clone)]
pub struct Dice {
    source: Source,
}

#[derive(Clone)]
enum Source {
    Seeded(StdRng),
    /// Replays `draws` in order, then repeats `last` forever.
    Scripted { draws: VecDeque<f64>, last: f64 },
}

impl Dice {
    /// Dice seeded from the thread-local OS-backed generator.
    pub fn from_entropy() -> Self {
        Self {
            source: Source::Seeded(StdRng::from_rng(&mut rand::rng())),
        }
    }

    /// Reproducible dice for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            source: Source::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    /// Dice that return `draws` in order and then keep returning the
    /// final value. Values are clamped into `[0, 1)`.
    pub fn scripted(draws: impl IntoIterator<Item = f64>) -> Self {
        let draws: VecDeque<f64> =
            draws.into_iter().map(clamp_unit).collect();
        let last = draws.back().copied().unwrap_or(0.5);
        Self {
            source: Source::Scripted { draws, last },
        }
    }

    /// A uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        match &mut self.source {
            Source::Seeded(rng) => rng.random::<f64>(),
            Source::Scripted { draws, last } => match draws.pop_front() {
                Some(v) => {
                    *last = v;
                    v
                }
                None => *last,
            },
        }
    }

    /// A uniform index in `0..n`. Returns 0 when `n` is 0.
    pub fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        if let Source::Seeded(rng) = &mut self.source {
            return rng.random_range(0..n);
        }
        let v = self.unit();
        ((v * n as f64) as usize).min(n - 1)
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Seeded(_) => f.write_str("Dice::Seeded"),
            Source::Scripted { draws, .. } => {
                write!(f, "Dice::Scripted({} left)", draws.len())
            }
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_dice_are_reproducible() {
        let mut a = Dice::seeded(7);
        let mut b = Dice::seeded(7);
        for _ in 0..20 {
            assert_eq!(a.unit(), b.unit());
        }
    }

    #[test]
    fn test_seeded_unit_stays_in_range() {
        let mut dice = Dice::seeded(99);
        for _ in 0..1000 {
            let v = dice.unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_scripted_replays_then_repeats_last() {
        let mut dice = Dice::scripted([0.1, 0.7]);
        assert_eq!(dice.unit(), 0.1);
        assert_eq!(dice.unit(), 0.7);
        assert_eq!(dice.unit(), 0.7);
        assert_eq!(dice.unit(), 0.7);
    }

    #[test]
    fn test_scripted_below_maps_draw_to_index() {
        let mut dice = Dice::scripted([0.0, 0.5, 0.99]);
        assert_eq!(dice.below(4), 0);
        assert_eq!(dice.below(4), 2);
        assert_eq!(dice.below(4), 3);
    }

    #[test]
    fn test_below_zero_is_zero() {
        let mut dice = Dice::seeded(1);
        assert_eq!(dice.below(0), 0);
    }

    #[test]
    fn test_chance_compares_strictly_less_than() {
        let mut dice = Dice::scripted([0.3]);
        assert!(!dice.chance(0.3));
        assert!(dice.chance(0.31));
    }
}
