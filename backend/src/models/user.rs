use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub day_start_hour: i32,
    pub overall_streak: i32,
    pub longest_overall_streak: i32,
    pub last_overall_streak_date: Option<String>,
    pub streak_shields: i32,
    pub last_shield_earned_at: i32,
    /// JSON array of `ShieldUse`
    pub streak_shields_used: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_shared(&self) -> Result<shared::User, crate::models::ModelError> {
        let streak_shields_used = serde_json::from_str(&self.streak_shields_used)?;

        Ok(shared::User {
            id: Uuid::parse_str(&self.id)?,
            username: self.username.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            day_start_hour: self.day_start_hour,
            overall_streak: self.overall_streak,
            longest_overall_streak: self.longest_overall_streak,
            last_overall_streak_date: self.last_overall_streak_date.clone(),
            streak_shields: self.streak_shields,
            last_shield_earned_at: self.last_shield_earned_at,
            streak_shields_used,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
