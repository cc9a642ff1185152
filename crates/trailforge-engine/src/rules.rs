//! Fixed numbers of the journey.

/// Mileage at which a party arrives in Oregon.
pub const TRAIL_LENGTH: f64 = 4500.0;

/// Mountain hazards begin past this mileage.
pub const MOUNTAIN_THRESHOLD: f64 = 2500.0;

/// Ammunition needed to go hunting; spent up front.
pub const HUNT_AMMUNITION: f64 = 50.0;

/// Below this much food the party starves instead of eating.
pub const STARVATION_FLOOR: f64 = 13.0;

/// Damage dealt to every living member when the party starves.
pub const STARVATION_DAMAGE: u32 = 20;

/// Miles lost by detouring to a fort.
pub const FORT_BACKTRACK: f64 = 45.0;

/// Every this-many turns a fort comes into reach.
pub const FORT_INTERVAL: u32 = 3;

/// Radius within which a loot site can be scavenged.
pub const LOOT_REACH: f64 = 50.0;

/// Health every party member starts with.
pub const FULL_HEALTH: u8 = 100;

/// Shooting rank used by every player (1 is a crack shot).
pub const SHOOTING_RANK: u8 = 3;

/// Reaction time assumed for a human who answers riders from the menu.
pub const HUMAN_BASELINE_REACTION_MS: u32 = 250;

/// Reaction time assumed for automated players facing riders.
pub const AUTOMATED_BASELINE_REACTION_MS: u32 = 900;

/// Starting outfit for a human party.
pub const START_OXEN: f64 = 220.0;
pub const START_FOOD: f64 = 100.0;
pub const START_AMMUNITION: f64 = 50.0;
pub const START_CLOTHING: f64 = 20.0;
pub const START_SUPPLIES: f64 = 10.0;
pub const START_CASH: f64 = 700.0;

/// Calendar day the journey departs; each turn is one week.
pub const DEPARTURE: (i32, u32, u32) = (1847, 3, 29);
