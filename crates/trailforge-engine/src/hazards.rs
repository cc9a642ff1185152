//! River crossings, random events, mountains, and illness.

use serde::{Deserialize, Serialize};
use trailforge_protocol::EatingTier;

use crate::hunting::{accuracy_from_reaction, automated_reaction};
use crate::rules::{MOUNTAIN_THRESHOLD, TRAIL_LENGTH};
use crate::state::{join, note, GameState};

/// Something that can happen to a wagon during a week on the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    WagonBreakdown,
    OxInjury,
    BrokenArm,
    OxWanders,
    LostChild,
    UnsafeWater,
    HeavyRains,
    Bandits,
    Fire,
    Fog,
    SnakeBite,
    Swamped,
    WildAnimals,
    Hail,
    BadFood,
}

/// A weighted table of hazards.
///
/// Weights need not sum to anything in particular; a draw in `[0, 1)` is
/// scaled to the total and walked down the table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTable {
    entries: Vec<(Hazard, f64)>,
    total: f64,
}

impl EventTable {
    /// The stock table, weighted out of 100.
    pub fn standard() -> Self {
        use Hazard::*;
        Self::from_weights([
            (WagonBreakdown, 6.0),
            (OxInjury, 5.0),
            (BrokenArm, 2.0),
            (OxWanders, 2.0),
            (LostChild, 2.0),
            (UnsafeWater, 5.0),
            (HeavyRains, 10.0),
            (Bandits, 3.0),
            (Fire, 2.0),
            (Fog, 5.0),
            (SnakeBite, 2.0),
            (Swamped, 10.0),
            (WildAnimals, 10.0),
            (Hail, 5.0),
            (BadFood, 31.0),
        ])
    }

    /// Builds a table, dropping entries whose weight is not positive.
    pub fn from_weights(weights: impl IntoIterator<Item = (Hazard, f64)>) -> Self {
        let entries: Vec<_> = weights.into_iter().filter(|(_, w)| *w > 0.0).collect();
        let total = entries.iter().map(|(_, w)| w).sum();
        Self { entries, total }
    }

    /// Maps a uniform draw in `[0, 1)` to a hazard.
    pub fn pick(&self, draw: f64) -> Option<Hazard> {
        if self.entries.is_empty() {
            return None;
        }
        let mut remaining = draw.clamp(0.0, 1.0) * self.total;
        for (hazard, weight) in &self.entries {
            if remaining < *weight {
                return Some(*hazard);
            }
            remaining -= weight;
        }
        self.entries.last().map(|(h, _)| *h)
    }

    /// Cumulative upper bounds, in table order.
    pub fn thresholds(&self) -> Vec<(Hazard, f64)> {
        let mut acc = 0.0;
        self.entries
            .iter()
            .map(|(h, w)| {
                acc += w;
                (*h, acc)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::standard()
    }
}

struct River {
    name: &'static str,
    from: f64,
    to: f64,
    mishap: f64,
    food: f64,
    clothing: f64,
    supplies: f64,
    ammunition: f64,
    delay_base: f64,
    delay_spread: f64,
    damage: u32,
}

static RIVERS: [River; 4] = [
    River {
        name: "Kansas",
        from: 600.0,
        to: 1200.0,
        mishap: 0.15,
        food: 30.0,
        clothing: 20.0,
        supplies: 0.0,
        ammunition: 0.0,
        delay_base: 20.0,
        delay_spread: 20.0,
        damage: 5,
    },
    River {
        name: "Green",
        from: 2000.0,
        to: 2600.0,
        mishap: 0.20,
        food: 40.0,
        clothing: 0.0,
        supplies: 10.0,
        ammunition: 0.0,
        delay_base: 25.0,
        delay_spread: 30.0,
        damage: 10,
    },
    River {
        name: "Snake",
        from: 3000.0,
        to: 3400.0,
        mishap: 0.22,
        food: 35.0,
        clothing: 0.0,
        supplies: 0.0,
        ammunition: 30.0,
        delay_base: 20.0,
        delay_spread: 25.0,
        damage: 15,
    },
    River {
        name: "Columbia",
        from: 3800.0,
        to: 4200.0,
        mishap: 0.25,
        food: 50.0,
        clothing: 30.0,
        supplies: 0.0,
        ammunition: 0.0,
        delay_base: 30.0,
        delay_spread: 40.0,
        damage: 20,
    },
];

impl GameState {
    /// Rolls for trouble if the wagon is on a river's banks.
    pub(crate) fn cross_rivers(&mut self, idx: usize) -> String {
        let Some(river) = RIVERS
            .iter()
            .find(|r| self.mileage >= r.from && self.mileage < r.to)
        else {
            return String::new();
        };
        if !self.dice.chance(river.mishap) {
            return format!("You reached the {} River and crossed safely.", river.name);
        }

        self.resources.food -= river.food;
        self.resources.clothing -= river.clothing;
        self.resources.supplies -= river.supplies;
        self.resources.ammunition -= river.ammunition;
        let lost = river.delay_base + river.delay_spread * self.dice.unit();
        self.mileage -= lost;
        self.clamp_resources();

        let mut log = vec![format!(
            "Trouble fording the {} River! Supplies washed away and you lost {lost:.0} miles.",
            river.name
        )];
        note(&mut log, self.damage_random_member(idx, river.damage));
        join(log)
    }

    /// Draws from the event table, then a small chance of finding an
    /// abandoned wagon.
    pub(crate) fn random_event(&mut self, idx: usize) -> String {
        let draw = self.dice.unit();
        let mut log = Vec::new();
        if let Some(hazard) = self.events.pick(draw) {
            tracing::trace!(?hazard, "random event");
            note(&mut log, self.apply_hazard(idx, hazard));
        }
        if self.players[idx].alive && self.dice.chance(0.05) {
            let cash = 20.0 + 30.0 * self.dice.unit();
            let food = 20.0 + 40.0 * self.dice.unit();
            let ammunition = 50.0 + 100.0 * self.dice.unit();
            self.resources.cash += cash;
            self.resources.food += food;
            self.resources.ammunition += ammunition;
            log.push(format!(
                "You found an abandoned wagon: ${cash:.0}, {food:.0} lbs of food, {ammunition:.0} bullets."
            ));
        }
        join(log)
    }

    fn apply_hazard(&mut self, idx: usize, hazard: Hazard) -> String {
        use Hazard::*;
        let mut log = Vec::new();
        match hazard {
            WagonBreakdown => {
                self.mileage -= 15.0 + 5.0 * self.dice.unit();
                self.resources.supplies -= 8.0;
                log.push("Your wagon broke down. You lose time and supplies fixing it.".to_string());
            }
            OxInjury => {
                self.mileage -= 25.0;
                self.oxen -= 20.0;
                log.push("An ox injured its leg. It slows you down for the rest of the trip.".to_string());
            }
            BrokenArm => {
                self.mileage -= 5.0 + 4.0 * self.dice.unit();
                self.resources.supplies -= 2.0 + 3.0 * self.dice.unit();
                log.push("Bad luck: your daughter broke her arm. You stop to make a sling.".to_string());
                note(&mut log, self.damage_member(idx, 3, 10));
            }
            OxWanders => {
                self.mileage -= 17.0;
                log.push("An ox wanders off. You spend time looking for it.".to_string());
            }
            LostChild => {
                self.mileage -= 10.0;
                log.push("Your son gets lost. You spend half the day looking for him.".to_string());
                note(&mut log, self.damage_member(idx, 2, 8));
            }
            UnsafeWater => {
                self.mileage -= 10.0 + 10.0 * self.dice.unit();
                log.push("Unsafe water. You lose time looking for a clean spring.".to_string());
                note(&mut log, self.damage_random_member(idx, 8));
            }
            HeavyRains if self.mileage > MOUNTAIN_THRESHOLD => {
                let needed = 22.0 + 4.0 * self.dice.unit();
                if self.resources.clothing > needed {
                    log.push("Cold weather, brr! You have enough clothing to keep warm.".to_string());
                } else {
                    log.push("Cold weather, and not enough clothing to go around.".to_string());
                    note(&mut log, self.damage_random_member(idx, 12));
                }
            }
            HeavyRains => {
                self.resources.food -= 10.0;
                self.resources.ammunition -= 50.0;
                self.resources.supplies -= 15.0;
                self.mileage -= 10.0 + 10.0 * self.dice.unit();
                log.push("Heavy rains. Time and supplies lost.".to_string());
            }
            Bandits => {
                let accuracy = accuracy_from_reaction(automated_reaction(&mut self.dice));
                self.resources.ammunition -= 20.0 * accuracy;
                if self.resources.ammunition < 0.0 {
                    self.resources.cash /= 3.0;
                    self.resources.cash -= 20.0;
                    self.oxen -= 20.0;
                    self.resources.supplies -= 5.0;
                    log.push("Bandits attack! You ran out of bullets and they took most of your cash.".to_string());
                    note(&mut log, self.damage_random_member(idx, 30));
                } else if accuracy <= 1.0 {
                    let cash = 30.0 + 50.0 * self.dice.unit();
                    let food = 15.0 + 25.0 * self.dice.unit();
                    let ammunition = 30.0 + 70.0 * self.dice.unit();
                    self.resources.cash += cash;
                    self.resources.food += food;
                    self.resources.ammunition += ammunition;
                    log.push("Bandits attack! Quickest draw outside of Dodge City. You took their loot.".to_string());
                } else {
                    self.oxen -= 20.0;
                    self.resources.supplies -= 5.0;
                    log.push("Bandits attack! They made off with an ox.".to_string());
                    note(&mut log, self.damage_random_member(idx, 20));
                }
            }
            Fire => {
                self.resources.food -= 40.0;
                self.resources.ammunition -= 40.0;
                self.resources.supplies -= 3.0 + 8.0 * self.dice.unit();
                self.mileage -= 15.0;
                log.push("There was a fire in your wagon. Food and supplies damaged.".to_string());
                if self.dice.chance(0.3) {
                    note(&mut log, self.damage_random_member(idx, 15));
                }
            }
            Fog => {
                self.mileage -= 10.0 + 5.0 * self.dice.unit();
                log.push("You lose your way in heavy fog. Time is lost.".to_string());
            }
            SnakeBite => {
                self.resources.ammunition -= 10.0;
                self.resources.supplies -= 5.0;
                if self.resources.supplies < 0.0 {
                    log.push("A snake bit someone, and there was no medicine.".to_string());
                    note(&mut log, self.damage_random_member(idx, 40));
                } else {
                    log.push("You killed a poisonous snake after it bit someone.".to_string());
                    note(&mut log, self.damage_random_member(idx, 25));
                }
            }
            Swamped => {
                self.resources.food -= 30.0;
                self.resources.clothing -= 20.0;
                self.mileage -= 20.0 + 20.0 * self.dice.unit();
                log.push("Your wagon was swamped fording a river. You lose food and clothes.".to_string());
            }
            WildAnimals if self.resources.ammunition < 40.0 => {
                log.push("Wild animals attack! You were too low on bullets and the wolves overpowered you.".to_string());
                note(&mut log, self.damage_random_member(idx, 35));
            }
            WildAnimals => {
                let accuracy = accuracy_from_reaction(automated_reaction(&mut self.dice));
                self.resources.ammunition -= 20.0 * accuracy;
                self.resources.clothing -= 4.0 * accuracy;
                self.resources.food -= 8.0 * accuracy;
                if accuracy <= 2.0 {
                    log.push("Wild animals attack! Nice shooting, they didn't get much.".to_string());
                } else {
                    log.push("Wild animals attack! Slow on the draw, they got at your food and clothes.".to_string());
                    note(&mut log, self.damage_random_member(idx, 15));
                }
            }
            Hail => {
                self.mileage -= 5.0 + 10.0 * self.dice.unit();
                self.resources.ammunition -= 20.0;
                self.resources.supplies -= 4.0 + 3.0 * self.dice.unit();
                log.push("Hail storm. Supplies damaged.".to_string());
                if self.dice.chance(0.2) {
                    note(&mut log, self.damage_random_member(idx, 10));
                }
            }
            BadFood => {
                log.push("Bad food. Someone in the party got sick.".to_string());
                note(&mut log, self.damage_random_member(idx, 12));
            }
        }
        join(log)
    }

    /// Mountain travel: slow going, getting lost, and blizzards near the
    /// end of the trail.
    pub(crate) fn mountains(&mut self, idx: usize) -> String {
        let b = self.mileage / 100.0 - 25.0;
        let factor = 9.0 - (b * b + 72.0) / (b * b + 12.0);
        let mut log = Vec::new();

        if self.dice.chance(factor / 9.0) {
            let r = self.dice.unit();
            if r < 0.1 {
                self.mileage -= 60.0;
                log.push("You got lost in the mountains. Valuable time lost finding the trail!".to_string());
            } else if r < 0.11 {
                self.resources.supplies -= 5.0;
                self.resources.ammunition -= 20.0;
                self.mileage -= 20.0 + 30.0 * self.dice.unit();
                log.push("The wagon was damaged on the rocks. Time and supplies lost.".to_string());
            } else {
                self.mileage -= 45.0 + 50.0 * self.dice.unit();
                log.push("The going gets slow in the mountains.".to_string());
            }
        }

        if self.mileage > 3800.0 && self.mileage < TRAIL_LENGTH && self.dice.chance(0.3) {
            self.resources.food -= 25.0;
            self.resources.supplies -= 10.0;
            self.resources.ammunition -= 30.0;
            self.mileage -= 30.0 + 40.0 * self.dice.unit();
            log.push("Blizzard in the mountain pass. Time and supplies lost.".to_string());
            let needed = 18.0 + 2.0 * self.dice.unit();
            if self.resources.clothing < needed {
                note(&mut log, self.illness(idx, EatingTier::Moderately));
            }
        }
        join(log)
    }

    /// Rolls for sickness; eating well keeps the party healthier.
    pub(crate) fn illness(&mut self, idx: usize, eating: EatingTier) -> String {
        let p = match eating {
            EatingTier::Poorly => 0.65,
            EatingTier::Moderately => 0.5,
            EatingTier::Well => 0.25,
        };
        if !self.dice.chance(p) {
            return String::new();
        }

        let mut log = Vec::new();
        let severity = self.dice.unit();
        if severity < 0.33 {
            self.mileage -= 5.0;
            self.resources.supplies -= 2.0;
            log.push("Mild illness in the party.".to_string());
            note(&mut log, self.damage_random_member(idx, 10));
        } else if severity < 0.66 {
            self.mileage -= 5.0;
            self.resources.supplies -= 5.0;
            log.push("Bad illness in the party.".to_string());
            note(&mut log, self.damage_random_member(idx, 20));
        } else {
            self.resources.supplies -= 10.0;
            self.resources.cash -= 20.0;
            log.push("Serious illness. You stop for medical attention.".to_string());
            note(&mut log, self.damage_random_member(idx, 30));
        }

        if self.resources.supplies < 0.0 && !self.finished && self.players[idx].alive {
            log.push("You ran out of medical supplies.".to_string());
            note(&mut log, self.damage_random_member(idx, 40));
        }
        join(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dice, Player};
    use trailforge_protocol::PlayerId;

    fn game(dice: Dice) -> GameState {
        let mut game = GameState::new(dice);
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.outfit();
        game.begin();
        game
    }

    #[test]
    fn test_standard_table_thresholds() {
        let bounds: Vec<f64> = EventTable::standard()
            .thresholds()
            .into_iter()
            .map(|(_, b)| b)
            .collect();
        assert_eq!(
            bounds,
            vec![6.0, 11.0, 13.0, 15.0, 17.0, 22.0, 32.0, 35.0, 37.0, 42.0, 44.0, 54.0, 64.0, 69.0, 100.0]
        );
    }

    #[test]
    fn test_pick_walks_weights() {
        let table = EventTable::standard();
        assert_eq!(table.pick(0.0), Some(Hazard::WagonBreakdown));
        assert_eq!(table.pick(0.07), Some(Hazard::OxInjury));
        assert_eq!(table.pick(0.5), Some(Hazard::Swamped));
        assert_eq!(table.pick(0.99), Some(Hazard::BadFood));
    }

    #[test]
    fn test_zero_weights_are_dropped() {
        let table = EventTable::from_weights([(Hazard::Fog, 0.0), (Hazard::Hail, 2.0)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.pick(0.0), Some(Hazard::Hail));
        assert_eq!(EventTable::from_weights([]).pick(0.5), None);
    }

    #[test]
    fn test_river_mishap_only_on_banks() {
        let mut g = game(Dice::scripted([0.0]));
        g.set_mileage(500.0);
        assert!(g.cross_rivers(0).is_empty());

        g.set_mileage(700.0);
        let story = g.cross_rivers(0);
        assert!(story.contains("Kansas"));
        assert_eq!(g.resources().food, 70.0);
        assert_eq!(g.resources().clothing, 0.0);
        assert_eq!(g.mileage(), 680.0);
    }

    #[test]
    fn test_river_crossed_safely_on_high_draw() {
        let mut g = game(Dice::scripted([0.99]));
        g.set_mileage(3900.0);
        let story = g.cross_rivers(0);
        assert!(story.contains("Columbia") && story.contains("safely"));
        assert_eq!(g.mileage(), 3900.0);
    }

    #[test]
    fn test_mountains_are_calm_on_high_draws() {
        let mut g = game(Dice::scripted([0.99]));
        g.set_mileage(3000.0);
        assert!(g.mountains(0).is_empty());
        assert_eq!(g.mileage(), 3000.0);
    }

    #[test]
    fn test_eating_well_avoids_illness_on_mid_draw() {
        let mut g = game(Dice::scripted([0.3]));
        assert!(g.illness(0, EatingTier::Well).is_empty());
        let story = g.illness(0, EatingTier::Poorly);
        assert!(story.contains("Mild illness"));
    }

    #[test]
    fn test_swamped_loses_food_and_clothes() {
        let mut g = game(Dice::scripted([0.5]));
        g.set_mileage(1000.0);
        g.apply_hazard(0, Hazard::Swamped);
        assert_eq!(g.resources().food, 70.0);
        assert_eq!(g.resources().clothing, 0.0);
        assert_eq!(g.mileage(), 970.0);
    }
}
