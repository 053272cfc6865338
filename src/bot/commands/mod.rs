//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Award management commands
pub mod award;

/// Block list commands
pub mod block;

/// Channel, server and mirror configuration commands
pub mod config;

/// General utility commands
pub mod general;

/// Game commands
pub mod lfg;

/// User verification commands
pub mod verify;

/// Moderator watch list commands
pub mod watch;

// Export commands
pub use award::*;
pub use block::*;
pub use config::*;
pub use general::*;
pub use lfg::*;
pub use verify::*;
pub use watch::*;
