use async_trait::async_trait;
use sqlx::Row;
use std::collections::BTreeMap;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::entrant::{Entrant, Interest},
    use_cases::waitlist::{EntrantRepo, InsertOutcome, NewEntrant},
};

const ENTRANT_COLUMNS: &str = "id, name, email, phone, interest, referral_code, referred_by, \
     waitlist_position, early_access, created_at";

fn row_to_entrant(row: &sqlx::postgres::PgRow) -> Entrant {
    let interest: String = row.get("interest");
    Entrant {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        // Unknown stored values fall back to the schema default.
        interest: interest.parse().unwrap_or_default(),
        referral_code: row.get("referral_code"),
        referred_by: row.get("referred_by"),
        waitlist_position: row.get("waitlist_position"),
        early_access: row.get("early_access"),
        created_at: row.get("created_at"),
    }
}

/// Maps a unique-constraint violation to the matching insert outcome, by
/// the violated constraint's name.
fn conflict_outcome(err: &sqlx::Error) -> Option<InsertOutcome> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    match db_err.constraint() {
        Some("waitlist_entrants_email_key") => Some(InsertOutcome::DuplicateEmail),
        Some("waitlist_entrants_referral_code_key") => Some(InsertOutcome::DuplicateReferralCode),
        Some("waitlist_entrants_position_key") => Some(InsertOutcome::DuplicatePosition),
        _ => None,
    }
}

#[async_trait]
impl EntrantRepo for PostgresPersistence {
    async fn insert(
        &self,
        new: &NewEntrant,
        referral_code: &str,
        early_access_limit: i64,
    ) -> AppResult<InsertOutcome> {
        // Position and early access are computed inside the insert so the
        // count and the row land atomically; a concurrent insert that races
        // to the same position trips waitlist_entrants_position_key and is
        // retried by the caller with a fresh count.
        let result = sqlx::query(&format!(
            r#"
                INSERT INTO waitlist_entrants
                    (id, name, email, phone, interest, referral_code, referred_by,
                     waitlist_position, early_access, signup_ip, user_agent, signup_source)
                SELECT $1::uuid, $2::text, $3::text, $4::text, $5::text, $6::text, $7::text,
                       COUNT(*) + 1, COUNT(*) + 1 <= $8::bigint, $9::text, $10::text, $11::text
                FROM waitlist_entrants
                RETURNING {ENTRANT_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.interest.to_string())
        .bind(referral_code)
        .bind(&new.referred_by)
        .bind(early_access_limit)
        .bind(&new.metadata.ip_address)
        .bind(&new.metadata.user_agent)
        .bind(&new.metadata.signup_source)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Inserted(row_to_entrant(&row))),
            Err(err) => match conflict_outcome(&err) {
                Some(outcome) => Ok(outcome),
                None => Err(AppError::from(err)),
            },
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Entrant>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRANT_COLUMNS} FROM waitlist_entrants WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_entrant))
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<Entrant>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRANT_COLUMNS} FROM waitlist_entrants WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_entrant))
    }

    async fn count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entrants")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn count_early_access(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entrants WHERE early_access")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn count_referred_by(&self, code: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entrants WHERE referred_by = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn interest_counts(&self) -> AppResult<BTreeMap<Interest, i64>> {
        let rows =
            sqlx::query("SELECT interest, COUNT(*) AS count FROM waitlist_entrants GROUP BY interest")
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let interest: String = row.get("interest");
                let count: i64 = row.get("count");
                interest.parse::<Interest>().ok().map(|i| (i, count))
            })
            .collect())
    }

    async fn list_page(&self, page: i64, per_page: i64) -> AppResult<(Vec<Entrant>, i64)> {
        let offset = (page - 1) * per_page;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entrants")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;

        let rows = sqlx::query(&format!(
            r#"
                SELECT {ENTRANT_COLUMNS}
                FROM waitlist_entrants
                ORDER BY created_at DESC, waitlist_position DESC
                LIMIT $1 OFFSET $2
            "#
        ))
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok((rows.iter().map(row_to_entrant).collect(), total))
    }
}
