//! Discord interaction handlers
//!
//! This module provides handlers for Discord events that are not slash
//! commands, such as Join and Leave button clicks on game posts.

/// Button handlers for game posts
pub mod components;

pub use components::event_handler;
