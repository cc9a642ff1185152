//! Read-only views for snapshots.

use trailforge_protocol::{EncounterView, FortOffer, JourneyView, PartyMemberView, PlayerView};

use crate::fort::FORT_PRICES;
use crate::party::Player;
use crate::rules::TRAIL_LENGTH;
use crate::state::{GameState, Pending};

impl GameState {
    pub fn journey_view(&self) -> JourneyView {
        let encounter = match self.pending {
            Pending::AwaitingRiderTactic { hostile, riders, .. } => {
                Some(EncounterView { hostile, riders })
            }
            _ => None,
        };
        let fort_offers = matches!(self.pending, Pending::AtFort).then(|| {
            FORT_PRICES
                .iter()
                .map(|p| FortOffer {
                    item: p.item,
                    label: p.label.to_string(),
                    price: p.price,
                    pack: p.pack,
                })
                .collect()
        });

        JourneyView {
            turn: self.turn,
            week: self.week,
            mileage: self.mileage,
            trail_length: TRAIL_LENGTH,
            resources: self.resources,
            oxen: self.oxen,
            phase: self.phase(),
            fort_available: self.fort_available,
            finished: self.finished,
            won: self.won,
            arrival_date: self.arrival_date.clone(),
            encounter,
            fort_offers,
        }
    }

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }
}

impl Player {
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            alive: self.alive,
            connected: self.connected,
            party: self
                .party
                .iter()
                .map(|m| PartyMemberView {
                    name: m.name.clone(),
                    health: m.health,
                    alive: m.alive,
                    injured: m.injured,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dice, GameState, Player};
    use trailforge_protocol::{PlayerId, TurnPhase};

    #[test]
    fn test_fort_offers_only_at_fort() {
        let mut game = GameState::new(Dice::seeded(1));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.outfit();
        game.begin();
        assert!(game.journey_view().fort_offers.is_none());

        game.set_fort_available(true);
        game.enter_fort(PlayerId(1)).unwrap();

        let view = game.journey_view();
        assert_eq!(view.phase, TurnPhase::Fort);
        assert_eq!(view.fort_offers.map(|o| o.len()), Some(4));
        assert_eq!(view.trail_length, 4500.0);
    }

    #[test]
    fn test_player_view_mirrors_party() {
        let p = Player::human(PlayerId(7), "Ada");
        let view = p.view();
        assert_eq!(view.id, PlayerId(7));
        assert_eq!(view.party.len(), 5);
        assert_eq!(view.party[0].health, 100);
    }
}
