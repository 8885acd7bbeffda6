//! In-memory mock implementations for the entrant repository and the rate
//! limiter. The repo mirrors the storage contract: position assignment is
//! atomic (one lock around count-then-append) and unique constraints are
//! reported as insert outcomes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::entrant::{Entrant, Interest},
    infra::RateLimiterTrait,
    use_cases::waitlist::{EntrantRepo, InsertOutcome, NewEntrant},
};

/// In-memory implementation of EntrantRepo for testing.
#[derive(Default)]
pub struct InMemoryEntrantRepo {
    pub entrants: Mutex<Vec<Entrant>>,
}

impl InMemoryEntrantRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repo with initial entrants for testing.
    pub fn with_entrants(entrants: Vec<Entrant>) -> Self {
        Self {
            entrants: Mutex::new(entrants),
        }
    }

    /// Get all entrants (for test assertions).
    pub fn get_all(&self) -> Vec<Entrant> {
        self.entrants.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntrantRepo for InMemoryEntrantRepo {
    async fn insert(
        &self,
        new: &NewEntrant,
        referral_code: &str,
        early_access_limit: i64,
    ) -> AppResult<InsertOutcome> {
        let mut entrants = self.entrants.lock().unwrap();

        if entrants
            .iter()
            .any(|e| e.email.eq_ignore_ascii_case(&new.email))
        {
            return Ok(InsertOutcome::DuplicateEmail);
        }
        if entrants.iter().any(|e| e.referral_code == referral_code) {
            return Ok(InsertOutcome::DuplicateReferralCode);
        }

        let waitlist_position = entrants.len() as i64 + 1;
        let entrant = Entrant {
            id: new.id,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            interest: new.interest,
            referral_code: referral_code.to_string(),
            referred_by: new.referred_by.clone(),
            waitlist_position,
            early_access: waitlist_position <= early_access_limit,
            created_at: Some(chrono::Utc::now().naive_utc()),
        };

        entrants.push(entrant.clone());
        Ok(InsertOutcome::Inserted(entrant))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Entrant>> {
        Ok(self
            .entrants
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<Entrant>> {
        Ok(self
            .entrants
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.referral_code == code)
            .cloned())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.entrants.lock().unwrap().len() as i64)
    }

    async fn count_early_access(&self) -> AppResult<i64> {
        Ok(self
            .entrants
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.early_access)
            .count() as i64)
    }

    async fn count_referred_by(&self, code: &str) -> AppResult<i64> {
        Ok(self
            .entrants
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.referred_by.as_deref() == Some(code))
            .count() as i64)
    }

    async fn interest_counts(&self) -> AppResult<BTreeMap<Interest, i64>> {
        let mut counts = BTreeMap::new();
        for entrant in self.entrants.lock().unwrap().iter() {
            *counts.entry(entrant.interest).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn list_page(&self, page: i64, per_page: i64) -> AppResult<(Vec<Entrant>, i64)> {
        let entrants = self.entrants.lock().unwrap();
        let total = entrants.len() as i64;

        // Position order mirrors creation order, newest first.
        let mut sorted: Vec<Entrant> = entrants.clone();
        sorted.sort_by(|a, b| b.waitlist_position.cmp(&a.waitlist_position));

        let offset = ((page - 1) * per_page) as usize;
        let page_items = sorted
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Ok((page_items, total))
    }
}

/// In-memory rate limiter with a fixed per-IP cap and no window expiry;
/// enough to exercise limit behavior in tests.
pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_requests: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Create a permissive rate limiter that never blocks (for most tests).
    pub fn permissive() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, ip: &str) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();
        let hits = counts.entry(format!("rate:ip:{ip}")).or_insert(0);
        *hits += 1;
        if *hits > self.max_requests {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}
