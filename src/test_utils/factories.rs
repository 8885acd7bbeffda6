//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entities::entrant::{Entrant, Interest};

/// Create a test entrant with sensible defaults.
pub fn create_test_entrant(overrides: impl FnOnce(&mut Entrant)) -> Entrant {
    let mut entrant = Entrant {
        id: Uuid::new_v4(),
        name: "Test Entrant".to_string(),
        email: "entrant@example.com".to_string(),
        phone: None,
        interest: Interest::All,
        referral_code: "ONETEST01".to_string(),
        referred_by: None,
        waitlist_position: 1,
        early_access: true,
        created_at: Some(test_datetime()),
    };
    overrides(&mut entrant);
    entrant
}

/// Fixed timestamp for reproducible fixtures.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .expect("valid timestamp")
        .naive_utc()
}
