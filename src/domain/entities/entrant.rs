use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Product area the entrant cares most about. Stored as lowercase text.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Interest {
    Shopping,
    Food,
    Payments,
    #[default]
    All,
}

/// A waitlist entrant as stored. Append-only: created once on signup,
/// never updated or deleted.
#[derive(Debug, Clone)]
pub struct Entrant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Interest,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub waitlist_position: i64,
    pub early_access: bool,
    pub created_at: Option<NaiveDateTime>,
}
