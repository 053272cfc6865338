//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod block;
pub mod channel;
pub mod enums;
pub mod game;
pub mod guild;
pub mod guild_award;
pub mod mirror;
pub mod play;
pub mod post;
pub mod queue;
pub mod user;
pub mod user_award;
pub mod verify;
pub mod watch;

// Re-export specific types to avoid conflicts
pub use block::{Entity as Block, Model as BlockModel};
pub use channel::{Entity as Channel, Model as ChannelModel};
pub use enums::{GameBracket, GameFormat, GameService, GameStatus};
pub use game::{Column as GameColumn, Entity as Game, Model as GameModel};
pub use guild::{Entity as Guild, Model as GuildModel};
pub use guild_award::{Entity as GuildAward, Model as GuildAwardModel};
pub use mirror::{Entity as Mirror, Model as MirrorModel};
pub use play::{Entity as Play, Model as PlayModel};
pub use post::{Entity as Post, Model as PostModel};
pub use queue::{Column as QueueColumn, Entity as Queue, Model as QueueModel};
pub use user::{Entity as User, Model as UserModel};
pub use user_award::{Entity as UserAward, Model as UserAwardModel};
pub use verify::{Entity as Verify, Model as VerifyModel};
pub use watch::{Entity as Watch, Model as WatchModel};
