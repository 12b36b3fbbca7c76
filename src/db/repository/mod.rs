//! Database repository for campaigns, warbands, rosters and games.
//!
//! Queries live on [`UnitOfWork`], split by entity across the submodules.
//! [`CampaignRepository::read`] hands one out over a plain connection;
//! [`CampaignRepository::write`] runs it inside `BEGIN IMMEDIATE`, so every
//! check and write in the closure commits together or not at all.

mod games;
mod membership;
mod rosters;
mod warbands;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{Campaign, DbError, Membership, Player};

/// Migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

/// Database repository for campaign operations.
#[derive(Debug, Clone)]
pub struct CampaignRepository {
    db_path: String,
    busy_timeout_ms: u32,
}

/// Typed queries over one connection.
///
/// Obtained from [`CampaignRepository::read`] or [`CampaignRepository::write`].
pub struct UnitOfWork<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UnitOfWork<'c> {
    fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        self.conn
    }
}

impl CampaignRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// Each operation opens its own connection, so the path must name a file
    /// shared by all connections (not `":memory:"`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating CampaignRepository");
        Ok(Self {
            db_path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        })
    }

    /// Sets how long a connection waits on a locked database.
    pub fn with_busy_timeout(mut self, busy_timeout_ms: u32) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))?;
        Ok(conn)
    }

    /// Applies pending migrations and returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    /// Runs `f` over a plain connection.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a connection failure.
    #[instrument(skip(self, f))]
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.connection()?;
        f(&mut UnitOfWork::new(&mut conn))
    }

    /// Runs `f` inside an immediate transaction. Any error rolls back.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a connection/commit failure.
    #[instrument(skip(self, f))]
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T, E>,
        E: From<DbError> + From<diesel::result::Error>,
    {
        let mut conn = self.connection()?;
        conn.immediate_transaction(|conn| f(&mut UnitOfWork::new(conn)))
    }

    /// Creates a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the name is taken or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_campaign(&self, name: String) -> Result<Campaign, DbError> {
        self.write(|uow| uow.insert_campaign(name))
    }

    /// Creates a player profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the display name is taken or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_player(&self, display_name: String) -> Result<Player, DbError> {
        self.write(|uow| uow.insert_player(display_name))
    }

    /// Adds a player to a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if either id is unknown, the player already joined,
    /// or a database error occurs.
    #[instrument(skip(self))]
    pub fn join_campaign(&self, campaign_id: i32, player_id: i32) -> Result<Membership, DbError> {
        self.write(|uow| uow.add_member(campaign_id, player_id))
    }
}
