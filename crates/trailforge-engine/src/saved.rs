//! Serializable form of a journey, for persistence across restarts.

use serde::{Deserialize, Serialize};
use trailforge_protocol::{Resources, TurnPhase};

use crate::party::Player;
use crate::state::{GameState, Pending};
use crate::Dice;

/// Everything in a [`GameState`] except the event table and the dice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub players: Vec<Player>,
    pub current: usize,
    pub turn: u32,
    pub week: u32,
    pub mileage: f64,
    pub resources: Resources,
    pub oxen: f64,
    #[serde(default)]
    pub pending: Pending,
    /// Informational; the phase is rebuilt from `pending` on load.
    pub phase: TurnPhase,
    pub fort_available: bool,
    pub finished: bool,
    pub won: bool,
    pub arrival_date: Option<String>,
}

impl GameState {
    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            players: self.players.clone(),
            current: self.current,
            turn: self.turn,
            week: self.week,
            mileage: self.mileage,
            resources: self.resources,
            oxen: self.oxen,
            pending: self.pending,
            phase: self.phase(),
            fort_available: self.fort_available,
            finished: self.finished,
            won: self.won,
            arrival_date: self.arrival_date.clone(),
        }
    }

    /// Rebuilds a journey from a save, repairing anything out of range.
    pub fn from_saved(saved: SavedGame, dice: Dice) -> Self {
        let mut state = GameState::new(dice);
        state.players = saved.players;
        state.current = if saved.current < state.players.len() {
            saved.current
        } else {
            0
        };
        state.turn = saved.turn;
        state.week = saved.week;
        state.mileage = saved.mileage;
        state.resources = saved.resources;
        state.oxen = saved.oxen;
        state.pending = saved.pending;
        state.fort_available = saved.fort_available;
        state.finished = saved.finished;
        state.won = saved.won;
        state.arrival_date = saved.arrival_date;
        state.clamp_resources();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailforge_protocol::PlayerId;

    #[test]
    fn test_save_and_restore_keeps_progress() {
        let mut game = GameState::new(Dice::seeded(1));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.add_player(Player::human(PlayerId(2), "Bo"));
        game.outfit();
        game.begin();
        game.next_turn();
        game.set_mileage(1234.0);

        let json = serde_json::to_string(&game.to_saved()).unwrap();
        let saved: SavedGame = serde_json::from_str(&json).unwrap();
        let back = GameState::from_saved(saved, Dice::seeded(2));

        assert_eq!(back.turn(), 2);
        assert_eq!(back.mileage(), 1234.0);
        assert_eq!(back.current_player_id(), Some(PlayerId(2)));
        assert_eq!(back.players().len(), 2);
    }

    #[test]
    fn test_restore_repairs_bad_index_and_negatives() {
        let mut game = GameState::new(Dice::seeded(1));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.outfit();
        let mut saved = game.to_saved();
        saved.current = 9;
        saved.resources.food = -4.0;

        let back = GameState::from_saved(saved, Dice::seeded(1));

        assert_eq!(back.current_player_id(), Some(PlayerId(1)));
        assert_eq!(back.resources().food, 0.0);
    }
}
