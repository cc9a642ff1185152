//! Trading at forts.

use trailforge_protocol::{FortItem, PlayerId, Resource};

use crate::rules::FORT_BACKTRACK;
use crate::state::{GameState, Pending};
use crate::EngineError;

/// What a fort charges for one pack of an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FortPrice {
    pub item: FortItem,
    pub label: &'static str,
    /// Dollars per pack. Selling pays half.
    pub price: f64,
    /// Units of the resource in one pack.
    pub pack: f64,
}

impl FortPrice {
    pub fn sell_price(&self) -> f64 {
        self.price / 2.0
    }
}

pub static FORT_PRICES: [FortPrice; 4] = [
    FortPrice {
        item: FortItem::Food,
        label: "Food (25 lbs)",
        price: 10.0,
        pack: 25.0,
    },
    FortPrice {
        item: FortItem::Ammunition,
        label: "Box of bullets (50)",
        price: 5.0,
        pack: 50.0,
    },
    FortPrice {
        item: FortItem::Clothing,
        label: "Clothing (5)",
        price: 5.0,
        pack: 5.0,
    },
    FortPrice {
        item: FortItem::Supplies,
        label: "Medicine and supplies (5)",
        price: 5.0,
        pack: 5.0,
    },
];

pub fn price_of(item: FortItem) -> &'static FortPrice {
    match item {
        FortItem::Food => &FORT_PRICES[0],
        FortItem::Ammunition => &FORT_PRICES[1],
        FortItem::Clothing => &FORT_PRICES[2],
        FortItem::Supplies => &FORT_PRICES[3],
    }
}

/// Stock levels automated players shop up to.
const AUTOMATED_TARGETS: [(FortItem, f64); 4] = [
    (FortItem::Food, 150.0),
    (FortItem::Ammunition, 100.0),
    (FortItem::Clothing, 30.0),
    (FortItem::Supplies, 20.0),
];

impl GameState {
    /// Detours to the fort, costing miles.
    ///
    /// Humans stay at the fort until they leave; automated players buy
    /// what they need and are back on the trail at once.
    pub fn enter_fort(&mut self, id: PlayerId) -> Result<String, EngineError> {
        let idx = self.actor(id)?;
        self.expect_main_menu("you can only stop at a fort from the main menu")?;
        if !self.fort_available {
            return Err(EngineError::FortUnavailable);
        }

        self.mileage -= FORT_BACKTRACK;
        if !self.players[idx].is_human() {
            let story = self.provision_automated();
            self.fort_available = false;
            self.clamp_resources();
            return Ok(story);
        }

        self.pending = Pending::AtFort;
        self.clamp_resources();
        Ok(format!(
            "{} detours to the fort, losing {FORT_BACKTRACK:.0} miles.",
            self.players[idx].name
        ))
    }

    pub fn buy(&mut self, id: PlayerId, item: FortItem, qty: i64) -> Result<String, EngineError> {
        self.actor(id)?;
        self.expect_fort()?;
        if qty <= 0 {
            return Err(EngineError::InvalidQuantity(qty));
        }

        let price = price_of(item);
        let cost = price.price * qty as f64;
        let available = self.resources.cash;
        if cost > available {
            return Err(EngineError::Insufficient {
                resource: Resource::Cash,
                needed: cost,
                available,
            });
        }

        self.resources.cash -= cost;
        *self.resources.get_mut(item.resource()) += price.pack * qty as f64;
        Ok(format!("Bought {qty} x {} for ${cost:.0}.", price.label))
    }

    pub fn sell(&mut self, id: PlayerId, item: FortItem, qty: i64) -> Result<String, EngineError> {
        self.actor(id)?;
        self.expect_fort()?;
        if qty <= 0 {
            return Err(EngineError::InvalidQuantity(qty));
        }

        let price = price_of(item);
        let amount = price.pack * qty as f64;
        let resource = item.resource();
        let available = self.resources.get(resource);
        if amount > available {
            return Err(EngineError::Insufficient {
                resource,
                needed: amount,
                available,
            });
        }

        let proceeds = price.sell_price() * qty as f64;
        *self.resources.get_mut(resource) -= amount;
        self.resources.cash += proceeds;
        Ok(format!("Sold {qty} x {} for ${proceeds:.0}.", price.label))
    }

    pub fn leave_fort(&mut self, id: PlayerId) -> Result<String, EngineError> {
        self.actor(id)?;
        self.expect_fort()?;
        self.pending = Pending::None;
        self.fort_available = false;
        Ok("You leave the fort and return to the trail.".to_string())
    }

    fn expect_fort(&self) -> Result<(), EngineError> {
        match self.pending {
            Pending::AtFort => Ok(()),
            _ => Err(EngineError::WrongPhase {
                message: "you're not at a fort",
                phase: self.phase(),
            }),
        }
    }

    fn provision_automated(&mut self) -> String {
        let mut bought = Vec::new();
        for (item, target) in AUTOMATED_TARGETS {
            let price = price_of(item);
            let mut packs = 0;
            while self.resources.get(item.resource()) < target
                && self.resources.cash >= price.price
            {
                self.resources.cash -= price.price;
                *self.resources.get_mut(item.resource()) += price.pack;
                packs += 1;
            }
            if packs > 0 {
                bought.push(format!("{packs} x {}", price.label));
            }
        }
        if bought.is_empty() {
            "Stopped at the fort but bought nothing.".to_string()
        } else {
            format!("Stopped at the fort and bought {}.", bought.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dice, Player};
    use trailforge_protocol::TurnPhase;

    fn at_fort() -> GameState {
        let mut game = GameState::new(Dice::seeded(4));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.outfit();
        game.begin();
        game.set_mileage(500.0);
        game.set_fort_available(true);
        game.enter_fort(PlayerId(1)).unwrap();
        game
    }

    #[test]
    fn test_enter_costs_miles() {
        let game = at_fort();
        assert_eq!(game.mileage(), 455.0);
        assert_eq!(game.phase(), TurnPhase::Fort);
    }

    #[test]
    fn test_enter_without_fort_is_rejected() {
        let mut game = GameState::new(Dice::seeded(4));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.outfit();
        game.begin();
        assert_eq!(game.enter_fort(PlayerId(1)), Err(EngineError::FortUnavailable));
    }

    #[test]
    fn test_buy_food() {
        let mut game = at_fort();
        game.buy(PlayerId(1), FortItem::Food, 2).unwrap();
        assert_eq!(game.resources().food, 150.0);
        assert_eq!(game.resources().cash, 680.0);
    }

    #[test]
    fn test_buy_more_than_cash_leaves_state_alone() {
        let mut game = at_fort();
        let before = *game.resources();

        let err = game.buy(PlayerId(1), FortItem::Food, 71).unwrap_err();

        assert!(matches!(err, EngineError::Insufficient { resource: Resource::Cash, .. }));
        assert_eq!(*game.resources(), before);
    }

    #[test]
    fn test_sell_pays_half() {
        let mut game = at_fort();
        game.sell(PlayerId(1), FortItem::Clothing, 2).unwrap();
        assert_eq!(game.resources().clothing, 10.0);
        assert_eq!(game.resources().cash, 705.0);
    }

    #[test]
    fn test_sell_more_than_held_is_rejected() {
        let mut game = at_fort();
        let err = game.sell(PlayerId(1), FortItem::Supplies, 3).unwrap_err();
        assert!(matches!(err, EngineError::Insufficient { resource: Resource::Supplies, .. }));
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        let mut game = at_fort();
        assert_eq!(
            game.buy(PlayerId(1), FortItem::Food, 0),
            Err(EngineError::InvalidQuantity(0))
        );
    }

    #[test]
    fn test_buy_outside_fort_is_wrong_phase() {
        let mut game = at_fort();
        game.leave_fort(PlayerId(1)).unwrap();
        assert!(matches!(
            game.buy(PlayerId(1), FortItem::Food, 1),
            Err(EngineError::WrongPhase { .. })
        ));
        assert!(!game.fort_available());
    }

    #[test]
    fn test_automated_player_provisions_itself() {
        let mut game = GameState::new(Dice::seeded(4));
        game.add_player(Player::human(PlayerId(1), "Ada"));
        game.add_player(Player::automated(PlayerId(2), "Scout"));
        game.outfit();
        game.begin();
        game.set_fort_available(true);

        game.enter_fort(PlayerId(2)).unwrap();

        assert_eq!(game.phase(), TurnPhase::MainMenu);
        assert_eq!(game.resources().food, 150.0);
        assert_eq!(game.resources().ammunition, 100.0);
        assert!(game.resources().cash < 700.0);
    }
}
