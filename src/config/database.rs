//! Database configuration module.
//!
//! Handles `SQLite` connection setup and idempotent table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`; the composite unique keys that the
//! entity attributes cannot express are added as explicit indexes.

use crate::entities::{
    GuildSettings, RewardMultiplier, RewardMultiplierColumn, Transaction, TransactionColumn,
    Wallet, WalletColumn,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/guild_economy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(Wallet),
        schema.create_table_from_entity(Transaction),
        schema.create_table_from_entity(GuildSettings),
        schema.create_table_from_entity(RewardMultiplier),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let wallet_key = Index::create()
        .name("idx_wallets_guild_user_currency")
        .table(Wallet)
        .col(WalletColumn::GuildId)
        .col(WalletColumn::UserId)
        .col(WalletColumn::Currency)
        .unique()
        .if_not_exists()
        .to_owned();
    let leaderboard = Index::create()
        .name("idx_wallets_leaderboard")
        .table(Wallet)
        .col(WalletColumn::GuildId)
        .col(WalletColumn::Currency)
        .col(WalletColumn::Balance)
        .if_not_exists()
        .to_owned();
    let ledger_by_wallet = Index::create()
        .name("idx_transactions_wallet")
        .table(Transaction)
        .col(TransactionColumn::GuildId)
        .col(TransactionColumn::UserId)
        .col(TransactionColumn::Currency)
        .if_not_exists()
        .to_owned();
    let multiplier_key = Index::create()
        .name("idx_reward_multipliers_target")
        .table(RewardMultiplier)
        .col(RewardMultiplierColumn::GuildId)
        .col(RewardMultiplierColumn::TargetKind)
        .col(RewardMultiplierColumn::TargetId)
        .unique()
        .if_not_exists()
        .to_owned();

    for index in [wallet_key, leaderboard, ledger_by_wallet, multiplier_key] {
        db.execute(builder.build(&index)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GuildSettingsModel, RewardMultiplierModel, TransactionModel, WalletModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<WalletModel> = Wallet::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<GuildSettingsModel> = GuildSettings::find().limit(1).all(&db).await?;
        let _: Vec<RewardMultiplierModel> = RewardMultiplier::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
