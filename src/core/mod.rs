//! Core business logic - framework-agnostic game matching and bookkeeping.
//!
//! Nothing in here talks to Discord. The bot layer calls these functions
//! and turns their results into messages.

pub mod awards;
pub mod channels;
pub mod games;
pub mod guilds;
pub mod mirrors;
pub mod plays;
pub mod render;
pub mod users;
pub mod verifies;
pub mod watches;
