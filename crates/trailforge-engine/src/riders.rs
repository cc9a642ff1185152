//! Rider encounters on the open trail.

use trailforge_protocol::{PlayerId, Tactic};

use crate::hunting::accuracy_from_reaction;
use crate::rules::{AUTOMATED_BASELINE_REACTION_MS, HUMAN_BASELINE_REACTION_MS};
use crate::state::{join, note, GameState, Pending};
use crate::{Dice, EngineError};

/// A band of riders that has come into view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encounter {
    pub hostile: bool,
    pub riders: u32,
}

impl Encounter {
    pub fn describe(&self) -> String {
        if self.hostile {
            format!("{} riders ahead. They look hostile!", self.riders)
        } else {
            format!("{} riders ahead. They don't look hostile.", self.riders)
        }
    }
}

/// Rolls for riders at the given mileage.
///
/// Encounters are likeliest around mile 400 and taper off either side.
pub(crate) fn roll_encounter(mileage: f64, dice: &mut Dice) -> Option<Encounter> {
    let b = mileage / 100.0 - 4.0;
    let shape = (b * b + 72.0) / (b * b + 12.0);
    if !dice.chance(1.0 / (10.0 * shape)) {
        return None;
    }
    let hostile = dice.chance(0.8);
    let riders = 3 + dice.below(8) as u32;
    Some(Encounter { hostile, riders })
}

/// Picks a tactic for an automated player.
pub(crate) fn automated_tactic(hostile: bool, dice: &mut Dice) -> Tactic {
    if !hostile {
        return Tactic::Proceed;
    }
    let r = dice.unit();
    if r < 0.2 {
        Tactic::Flee
    } else if r < 0.5 {
        Tactic::Fight
    } else if r < 0.7 {
        Tactic::Proceed
    } else {
        Tactic::CircleWagons
    }
}

impl GameState {
    /// Answers pending riders and finishes the rest of the turn.
    ///
    /// `reaction_ms` is the player's gun-draw time if the client measured
    /// one; otherwise a fixed baseline for the player kind is used.
    pub fn resolve_rider_tactic(
        &mut self,
        id: PlayerId,
        tactic: Tactic,
        reaction_ms: Option<u32>,
    ) -> Result<String, EngineError> {
        let idx = self.actor(id)?;
        let Pending::AwaitingRiderTactic {
            hostile,
            riders,
            eating,
        } = self.pending
        else {
            return Err(EngineError::WrongPhase {
                message: "there are no riders to answer",
                phase: self.phase(),
            });
        };
        self.pending = Pending::None;

        let baseline = if self.players[idx].is_human() {
            HUMAN_BASELINE_REACTION_MS
        } else {
            AUTOMATED_BASELINE_REACTION_MS
        };
        let encounter = Encounter { hostile, riders };
        let mut log = Vec::new();
        note(
            &mut log,
            self.resolve_encounter(idx, encounter, tactic, reaction_ms.unwrap_or(baseline)),
        );
        self.finish_turn(idx, eating, &mut log);
        Ok(join(log))
    }

    pub(crate) fn resolve_encounter(
        &mut self,
        idx: usize,
        encounter: Encounter,
        tactic: Tactic,
        reaction_ms: u32,
    ) -> String {
        let accuracy = accuracy_from_reaction(reaction_ms);
        let mut log = Vec::new();

        if encounter.hostile {
            match tactic {
                Tactic::Flee => {
                    self.mileage += 20.0;
                    self.resources.supplies -= 15.0;
                    self.resources.ammunition -= 50.0;
                    self.oxen -= 40.0;
                    log.push("You ran, burning supplies and driving the oxen hard.".to_string());
                    if self.dice.chance(0.3) {
                        note(&mut log, self.damage_random_member(idx, 15));
                    }
                }
                Tactic::Fight => {
                    self.resources.ammunition -= accuracy * 40.0 + 80.0;
                    if accuracy <= 1.0 {
                        log.push("Nice shooting. You drove them off.".to_string());
                    } else if accuracy > 4.0 {
                        self.resources.cash -= 20.0;
                        log.push("Lousy shooting. They got through and took some cash.".to_string());
                        note(&mut log, self.damage_random_member(idx, 25));
                    } else {
                        log.push("Kinda slow with your gun.".to_string());
                        note(&mut log, self.damage_random_member(idx, 15));
                    }
                }
                Tactic::Proceed => {
                    if self.dice.chance(0.8) {
                        self.resources.ammunition -= 50.0;
                        self.resources.supplies -= 15.0;
                        log.push("They attacked as you rolled on!".to_string());
                        note(&mut log, self.damage_random_member(idx, 20));
                    } else {
                        log.push("They let you pass.".to_string());
                    }
                }
                Tactic::CircleWagons => {
                    self.resources.ammunition -= accuracy * 30.0 + 80.0;
                    self.mileage -= 25.0;
                    if accuracy <= 1.0 {
                        log.push("You circled the wagons and held them off.".to_string());
                    } else if accuracy > 4.0 {
                        self.resources.cash -= 20.0;
                        log.push("The circle broke. They took some cash.".to_string());
                        note(&mut log, self.damage_random_member(idx, 30));
                    } else {
                        log.push("You held the circle, barely.".to_string());
                        note(&mut log, self.damage_random_member(idx, 15));
                    }
                }
            }
        } else {
            match tactic {
                Tactic::Flee => {
                    self.mileage += 15.0;
                    self.oxen -= 10.0;
                    log.push("You ran from friendly riders.".to_string());
                }
                Tactic::Fight => {
                    self.mileage -= 5.0;
                    self.resources.ammunition -= 50.0;
                    log.push("You attacked friendly riders. They fought back.".to_string());
                    note(&mut log, self.damage_random_member(idx, 20));
                }
                Tactic::Proceed => {
                    log.push("The riders were friendly and waved as they passed.".to_string());
                }
                Tactic::CircleWagons => {
                    self.mileage -= 20.0;
                    log.push("You circled the wagons for nothing and lost time.".to_string());
                }
            }
        }

        if self.resources.ammunition < 0.0 {
            log.push("You ran out of bullets in the fight.".to_string());
            note(&mut log, self.damage_random_member(idx, 50));
        }
        self.clamp_resources();
        join(log)
    }
}
