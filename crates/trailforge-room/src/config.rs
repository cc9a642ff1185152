//! Room configuration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use trailforge_engine::{DecayRates, Dice};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a directory creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long a scheduled-room player has to act before the dysentery
    /// penalty lands.
    pub turn_time: Duration,

    /// Damage dealt to one random party member when the turn clock runs out.
    pub timeout_damage: u32,

    /// Finished rooms are swept once they have been finished this long.
    pub finished_grace: Duration,

    /// Rooms still waiting for their first player are swept after this.
    pub waiting_ttl: Duration,

    /// How loot sites spoil on each decay pass.
    pub decay: DecayRates,

    /// Where each new turn engine gets its dice.
    pub dice: DiceSource,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_time: Duration::from_secs(20),
            timeout_damage: 999,
            finished_grace: Duration::from_secs(10 * 60),
            waiting_ttl: Duration::from_secs(24 * 60 * 60),
            decay: DecayRates::default(),
            dice: DiceSource::Entropy,
        }
    }
}

// ---------------------------------------------------------------------------
// DiceSource
// ---------------------------------------------------------------------------

/// How a room seeds the dice of the engines it creates.
#[derive(Debug, Clone, Default)]
pub enum DiceSource {
    /// Fresh OS entropy for every engine.
    #[default]
    Entropy,
    /// Engine `n` gets `Dice::seeded(seed + n)`.
    Seeded(u64),
    /// Every engine gets its own copy of this dice.
    Fixed(Dice),
}

impl DiceSource {
    pub(crate) fn roll(&self, counter: &AtomicU64) -> Dice {
        match self {
            Self::Entropy => Dice::from_entropy(),
            Self::Seeded(seed) => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                Dice::seeded(seed.wrapping_add(n))
            }
            Self::Fixed(dice) => dice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default_matches_trail_rules() {
        let config = RoomConfig::default();
        assert_eq!(config.turn_time, Duration::from_secs(20));
        assert_eq!(config.timeout_damage, 999);
        assert_eq!(config.finished_grace, Duration::from_secs(600));
        assert_eq!(config.waiting_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_seeded_source_advances_per_engine() {
        let counter = AtomicU64::new(0);
        let source = DiceSource::Seeded(40);

        let mut a = source.roll(&counter);
        let mut b = source.roll(&counter);

        assert_eq!(a.unit(), Dice::seeded(40).unit());
        assert_eq!(b.unit(), Dice::seeded(41).unit());
    }
}
