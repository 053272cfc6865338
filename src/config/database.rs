//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    Block, Channel, Game, Guild, GuildAward, Mirror, Play, Post, Queue, User, UserAward, Verify,
    Watch,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/spellbot.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url()).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;

    for index in schema.create_index_from_entity(entity) {
        let mut index = index;
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

/// Creates every table (and its indexes) that does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Guild).await?;
    create_table(db, &schema, Channel).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Game).await?;
    create_table(db, &schema, Queue).await?;
    create_table(db, &schema, Play).await?;
    create_table(db, &schema, Post).await?;
    create_table(db, &schema, Block).await?;
    create_table(db, &schema, Watch).await?;
    create_table(db, &schema, GuildAward).await?;
    create_table(db, &schema, UserAward).await?;
    create_table(db, &schema, Mirror).await?;
    create_table(db, &schema, Verify).await?;

    Ok(())
}
