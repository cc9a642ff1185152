//! Hunting: a reflex test that turns reaction time into food.

use trailforge_protocol::{PlayerId, Resource};

use crate::rules::HUNT_AMMUNITION;
use crate::state::{join, GameState, Pending};
use crate::{Dice, EngineError};

/// Maps a reaction time to shooting accuracy, 0 (perfect) to 9 (hopeless).
///
/// ```text
///    < 300 ms   0
///  300..600     1 → 2
///  600..1000    3 → 4.6
/// 1000..2000    6 → 8
///   ≥ 2000      9
/// ```
pub fn accuracy_from_reaction(reaction_ms: u32) -> f64 {
    let t = f64::from(reaction_ms);
    let accuracy = if t < 300.0 {
        0.0
    } else if t < 600.0 {
        1.0 + (t - 300.0) / 300.0
    } else if t < 1000.0 {
        3.0 + (t - 600.0) / 250.0
    } else if t < 2000.0 {
        6.0 + (t - 1000.0) / 500.0
    } else {
        9.0
    };
    accuracy.clamp(0.0, 9.0)
}

/// A plausible reaction time for an automated hunter.
pub(crate) fn automated_reaction(dice: &mut Dice) -> u32 {
    (400.0 + 1400.0 * dice.unit()) as u32
}

impl GameState {
    /// Spends the hunting ammunition and either waits for the shot
    /// (humans) or resolves it on the spot (automated players).
    pub(crate) fn start_hunt(&mut self, idx: usize) -> Result<String, EngineError> {
        let available = self.resources.ammunition;
        if available < HUNT_AMMUNITION {
            return Err(EngineError::Insufficient {
                resource: Resource::Ammunition,
                needed: HUNT_AMMUNITION,
                available,
            });
        }
        self.spend(Resource::Ammunition, HUNT_AMMUNITION);

        if !self.players[idx].is_human() {
            let reaction = automated_reaction(&mut self.dice);
            return Ok(self.finish_hunt(idx, reaction));
        }

        self.pending = Pending::AwaitingHunt;
        Ok(format!(
            "{} heads out to hunt. Shoot when the game appears!",
            self.players[idx].name
        ))
    }

    /// Resolves a pending hunt with the player's measured reaction time.
    pub fn resolve_hunt_shot(
        &mut self,
        id: PlayerId,
        reaction_ms: u32,
    ) -> Result<String, EngineError> {
        let idx = self.actor(id)?;
        if self.pending != Pending::AwaitingHunt {
            return Err(EngineError::WrongPhase {
                message: "you are not out hunting",
                phase: self.phase(),
            });
        }
        self.pending = Pending::None;
        Ok(self.finish_hunt(idx, reaction_ms))
    }

    fn finish_hunt(&mut self, idx: usize, reaction_ms: u32) -> String {
        let accuracy = accuracy_from_reaction(reaction_ms);
        let mut log = Vec::new();

        if accuracy <= 2.0 {
            let gain = 52.0 + 6.0 * self.dice.unit();
            self.resources.food += gain;
            log.push(format!(
                "Right between the eyes! You got a big one: {gain:.0} lbs of meat."
            ));
        } else if self.dice.chance(0.13 * accuracy) {
            log.push("You missed, and your dinner got away.".to_string());
        } else {
            let gain = 48.0 - 2.0 * accuracy;
            self.resources.food += gain;
            log.push(format!("Nice shot. You bring back {gain:.0} lbs of meat."));
        }

        self.spend(Resource::Ammunition, 10.0 + 3.0 * accuracy);
        let miles = 45.0 + 20.0 * self.dice.unit();
        self.mileage += miles;
        log.push(format!("The hunt carried you {miles:.0} miles."));

        self.clamp_resources();
        self.check_arrival(idx, &mut log);
        join(log)
    }
}
