//! End-to-end journeys through the public engine API.

use trailforge_engine::{Dice, EngineError, GameState, MainAction, Player};
use trailforge_protocol::{EatingTier, FortItem, PlayerId, Tactic, TurnPhase};

fn ada() -> PlayerId {
    PlayerId(1)
}

fn bo() -> PlayerId {
    PlayerId(2)
}

fn party_of_two(dice: Dice) -> GameState {
    let mut game = GameState::new(dice);
    game.add_player(Player::human(ada(), "Ada"));
    game.add_player(Player::human(bo(), "Bo"));
    game.outfit();
    game.begin();
    game
}

/// A draw of 0.99 makes every chance roll fail: no riders, no mountain
/// trouble, no illness, and the table's last entry (bad food).
fn calm_dice() -> Dice {
    Dice::scripted([0.99])
}

// =========================================================================
// Hunting
// =========================================================================

#[test]
fn test_quick_hunt_feeds_the_party() {
    let mut game = party_of_two(Dice::seeded(42));

    game.process_action(ada(), MainAction::Hunt).unwrap();
    assert_eq!(game.phase(), TurnPhase::Hunting);
    assert_eq!(game.resources().ammunition, 0.0);

    let story = game.resolve_hunt_shot(ada(), 250).unwrap();

    assert!(story.contains("big one"));
    let food = game.resources().food;
    assert!((152.0..158.0).contains(&food), "food = {food}");
    assert!((45.0..65.0).contains(&game.mileage()));
    assert_eq!(game.phase(), TurnPhase::MainMenu);
}

// =========================================================================
// Interrupted turns
// =========================================================================

#[test]
fn test_hunt_near_oregon_waits_for_the_shot() {
    let mut game = party_of_two(calm_dice());
    game.set_mileage(4490.0);

    game.process_action(ada(), MainAction::Hunt).unwrap();

    assert_eq!(game.phase(), TurnPhase::Hunting);
    assert_eq!(game.mileage(), 4490.0);
    assert!(!game.is_won());
    assert!(!game.is_finished());

    let story = game.resolve_hunt_shot(ada(), 250).unwrap();

    assert!(game.mileage() > 4500.0);
    assert!(game.is_won());
    assert!(story.contains("Oregon City"));
}

#[test]
fn test_riders_hold_the_rest_of_the_turn() {
    // Travel, riders appear, friendly band, then calm draws from there on.
    let mut game = party_of_two(Dice::scripted([0.5, 0.0, 0.99, 0.0, 0.99]));
    game.set_mileage(4490.0);

    let story = game
        .process_action(
            ada(),
            MainAction::Continue {
                eating: EatingTier::Moderately,
            },
        )
        .unwrap();

    assert_eq!(game.phase(), TurnPhase::Riders);
    assert!(game.mileage() > 4500.0);
    assert!(!game.is_won());
    assert!(!story.contains("Oregon City"));
    let unhurt = |game: &GameState| {
        game.player(ada())
            .unwrap()
            .party
            .iter()
            .all(|m| m.health == 100)
    };
    assert!(unhurt(&game));

    let story = game
        .resolve_rider_tactic(ada(), Tactic::Proceed, None)
        .unwrap();

    assert!(story.contains("friendly"));
    assert!(story.contains("Bad food"));
    assert!(!unhurt(&game));
    assert!(game.is_won());
    assert!(story.contains("Oregon City"));
    assert_eq!(game.phase(), TurnPhase::Finished);
}

// =========================================================================
// Arrival
// =========================================================================

#[test]
fn test_last_stretch_reaches_oregon() {
    let mut game = party_of_two(calm_dice());
    game.set_mileage(4495.0);

    let story = game
        .process_action(
            ada(),
            MainAction::Continue {
                eating: EatingTier::Moderately,
            },
        )
        .unwrap();

    assert!(game.is_finished());
    assert!(game.is_won());
    assert_eq!(game.phase(), TurnPhase::Finished);
    assert_eq!(game.arrival_date(), Some("April 5, 1847"));
    assert!(story.contains("Oregon City"));
    assert_eq!(game.current_player_id(), None);
}

#[test]
fn test_finished_journey_rejects_actions() {
    let mut game = party_of_two(calm_dice());
    game.set_mileage(4495.0);
    game.process_action(ada(), MainAction::Continue { eating: EatingTier::Well })
        .unwrap();

    assert_eq!(
        game.process_action(bo(), MainAction::Hunt),
        Err(EngineError::JourneyOver)
    );
}

// =========================================================================
// Turn handoff
// =========================================================================

#[test]
fn test_dead_leader_loses_the_turn() {
    let mut game = party_of_two(Dice::seeded(3));
    game.add_player(Player::human(PlayerId(3), "Cy"));

    game.damage_party_member(bo(), 0, 100).unwrap();
    game.next_turn();

    assert_eq!(game.current_player_id(), Some(PlayerId(3)));
    assert!(matches!(
        game.process_action(bo(), MainAction::Hunt),
        Err(EngineError::PartyLost(_))
    ));
}

#[test]
fn test_timeout_penalty_hurts_and_clears_pending() {
    let mut game = party_of_two(Dice::seeded(3));
    game.process_action(ada(), MainAction::Hunt).unwrap();

    let story = game.apply_timeout_penalty(ada(), 999).unwrap();

    assert!(story.contains("dysentery"));
    assert_eq!(game.phase(), TurnPhase::MainMenu);
    let dead = game
        .player(ada())
        .unwrap()
        .party
        .iter()
        .filter(|m| !m.alive)
        .count();
    assert_eq!(dead, 1);
}

// =========================================================================
// Fort round trip
// =========================================================================

#[test]
fn test_fort_visit_round_trip() {
    let mut game = party_of_two(Dice::seeded(9));
    game.set_mileage(600.0);
    game.set_fort_available(true);

    game.enter_fort(ada()).unwrap();
    game.buy(ada(), FortItem::Ammunition, 2).unwrap();
    game.sell(ada(), FortItem::Food, 1).unwrap();
    game.leave_fort(ada()).unwrap();

    assert_eq!(game.mileage(), 555.0);
    assert_eq!(game.resources().ammunition, 150.0);
    assert_eq!(game.resources().food, 75.0);
    assert_eq!(game.resources().cash, 695.0);
    assert_eq!(game.phase(), TurnPhase::MainMenu);
    assert_eq!(game.enter_fort(ada()), Err(EngineError::FortUnavailable));
}

// =========================================================================
// Invariants over long seeded runs
// =========================================================================

/// Drives whoever holds the turn through one decision.
fn step(game: &mut GameState, n: usize) {
    let Some(id) = game.current_player_id() else {
        return;
    };
    let result = match game.phase() {
        TurnPhase::MainMenu if n % 7 == 3 && game.resources().ammunition >= 50.0 => {
            game.process_action(id, MainAction::Hunt)
        }
        TurnPhase::MainMenu if n % 11 == 5 => {
            game.set_fort_available(true);
            game.enter_fort(id)
        }
        TurnPhase::MainMenu => game.process_action(
            id,
            MainAction::Continue {
                eating: [EatingTier::Poorly, EatingTier::Moderately, EatingTier::Well][n % 3],
            },
        ),
        TurnPhase::Hunting => game.resolve_hunt_shot(id, (n as u32 * 97) % 2500),
        TurnPhase::Riders => {
            let tactic = Tactic::from_code((n % 4) as u8 + 1).unwrap_or(Tactic::Proceed);
            game.resolve_rider_tactic(id, tactic, None)
        }
        TurnPhase::Fort => {
            let _ = game.buy(id, FortItem::Food, 1);
            game.leave_fort(id)
        }
        TurnPhase::Finished => return,
    };
    result.unwrap();
    if game.phase() == TurnPhase::MainMenu {
        game.next_turn();
    }
}

#[test]
fn test_resources_never_go_negative() {
    for seed in 0..25 {
        let mut game = party_of_two(Dice::seeded(seed));
        for n in 0..400 {
            step(&mut game, n);

            let r = game.resources();
            assert!(r.is_clamped(), "seed {seed} step {n}: {r:?}");
            assert!(game.oxen() >= 0.0);
            assert!(game.mileage() >= 0.0);

            if !game.is_finished() {
                let current = game.current_player().expect("someone holds the turn");
                assert!(current.alive && current.is_human());
            }
            if game.is_finished() {
                break;
            }
        }
    }
}
