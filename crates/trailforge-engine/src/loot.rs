//! Wagons left behind by dead parties, and scavenging them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trailforge_protocol::{LootSiteView, PlayerId, Resources};

use crate::rules::LOOT_REACH;
use crate::state::GameState;
use crate::EngineError;

/// Fraction of each resource that survives one decay pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRates {
    pub food: f64,
    pub ammunition: f64,
    pub clothing: f64,
    pub supplies: f64,
    pub oxen: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            food: 0.90,
            ammunition: 0.95,
            clothing: 0.97,
            supplies: 0.95,
            oxen: 0.98,
        }
    }
}

/// An abandoned wagon at a fixed point on the trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootSite {
    pub id: String,
    pub owner: PlayerId,
    pub owner_name: String,
    pub mileage: f64,
    pub resources: Resources,
    pub oxen: f64,
    pub created_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl LootSite {
    /// Leaves `player`'s wagon where it stopped. `None` if the player is
    /// not on this journey.
    pub fn abandoned_by(state: &GameState, player: PlayerId, now: DateTime<Utc>) -> Option<Self> {
        let owner = state.player(player)?;
        Some(Self {
            id: format!("loot-{}-{}", player.0, now.timestamp()),
            owner: player,
            owner_name: owner.name.clone(),
            mileage: state.mileage(),
            resources: *state.resources(),
            oxen: state.oxen(),
            created_at: now,
            claimed_by: None,
            claimed_at: None,
        })
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }

    /// Spoils an unclaimed site by one step. Cash keeps.
    pub fn decay(&mut self, rates: &DecayRates) -> bool {
        if self.is_claimed() {
            return false;
        }
        self.resources.food *= rates.food;
        self.resources.ammunition *= rates.ammunition;
        self.resources.clothing *= rates.clothing;
        self.resources.supplies *= rates.supplies;
        self.oxen *= rates.oxen;
        true
    }

    pub fn view(&self) -> LootSiteView {
        LootSiteView {
            id: self.id.clone(),
            owner_name: self.owner_name.clone(),
            mileage: self.mileage,
            resources: self.resources,
            oxen: self.oxen,
            created_at: self.created_at,
            claimed_by: self.claimed_by.clone(),
        }
    }
}

impl GameState {
    /// Empties a loot site into `id`'s wagon.
    ///
    /// The wagon must be within [`LOOT_REACH`] miles of the site, and the
    /// site must not have been claimed already.
    pub fn scavenge(
        &mut self,
        id: PlayerId,
        site: &mut LootSite,
        now: DateTime<Utc>,
    ) -> Result<String, EngineError> {
        let idx = self.actor(id)?;
        self.expect_main_menu("finish the current decision first")?;
        if let Some(by) = &site.claimed_by {
            return Err(EngineError::LootClaimed(by.clone()));
        }
        let distance = (site.mileage - self.mileage).abs();
        if distance > LOOT_REACH {
            return Err(EngineError::LootOutOfReach { distance });
        }

        self.resources.absorb(&site.resources);
        self.oxen += site.oxen;
        self.clamp_resources();
        let name = self.players[idx].name.clone();
        site.claimed_by = Some(name.clone());
        site.claimed_at = Some(now);
        Ok(format!(
            "{name} scavenged {}'s abandoned wagon: {:.0} lbs of food, {:.0} bullets, ${:.0}.",
            site.owner_name, site.resources.food, site.resources.ammunition, site.resources.cash
        ))
    }
}
