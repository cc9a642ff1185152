//! Turn engine for Trailforge.
//!
//! A [`GameState`] is the authoritative record of one wagon party's
//! journey: who is travelling, whose turn it is, how far they have come,
//! and what is left in the wagon. It knows nothing about sockets or locks;
//! the room layer owns it and calls into it one action at a time.
//!
//! # Phases
//!
//! ```text
//!              ┌──(hunt)──────→ Hunting ──(resolve_hunt_shot)───┐
//!              │                                                ▼
//! MainMenu ────┼──(continue)──→ Riders  ──(resolve_rider_tactic)─→ MainMenu
//!              │                                                ▲
//!              └──(enter_fort)→ Fort    ──(leave_fort)──────────┘
//!
//! any phase ──(win or every human party lost)──→ Finished
//! ```
//!
//! Interactive phases are a [`Pending`] interaction that carries whatever
//! the rest of the turn needs once the player answers.
//!
//! # Randomness
//!
//! All chance comes from an injected [`Dice`]. Production code seeds it
//! from the OS; tests script the exact draws they need.

mod dice;
mod error;
mod fort;
mod hazards;
mod hunting;
mod loot;
mod party;
mod riders;
mod saved;
mod state;
mod view;

pub mod rules;

pub use dice::Dice;
pub use error::EngineError;
pub use fort::{price_of, FortPrice, FORT_PRICES};
pub use hazards::{EventTable, Hazard};
pub use hunting::accuracy_from_reaction;
pub use loot::{DecayRates, LootSite};
pub use party::{PartyMember, Player, PARTY_NAMES};
pub use riders::Encounter;
pub use saved::SavedGame;
pub use state::{GameState, MainAction, Pending, RemovedPlayer};
