//! Reward multiplier entity - boosts (or disables) rewards per channel or role.

use super::sea_orm_active_enums::MultiplierTarget;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward multiplier database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_multipliers")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord guild ID
    pub guild_id: String,
    /// Whether `target_id` is a channel or a role
    pub target_kind: MultiplierTarget,
    /// Discord channel or role ID
    pub target_id: String,
    /// Factor applied to rewards; 0 disables rewards for the target
    pub multiplier: f64,
}

/// Multipliers have no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
