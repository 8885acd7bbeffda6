use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::Rng;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult, FieldError},
    domain::entities::entrant::{Entrant, Interest},
    validators,
};

/// The first N entrants get early access.
pub const EARLY_ACCESS_LIMIT: i64 = 1000;

/// Referrals needed before rewards unlock.
pub const REWARDS_THRESHOLD: i64 = 5;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

const REFERRAL_CODE_PREFIX: &str = "ONE";
const REFERRAL_CODE_SUFFIX_LEN: usize = 6;
const REFERRAL_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const MAX_CODE_ATTEMPTS: u32 = 10;
const MAX_POSITION_ATTEMPTS: u32 = 10;

/// Raw signup input as received from the HTTP layer. `interest` stays a
/// string here so an unknown value becomes a field error alongside the
/// others instead of a deserialization failure.
#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Option<String>,
    pub referral_code: Option<String>,
}

/// Request context recorded with the signup.
#[derive(Debug, Clone)]
pub struct SignupMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub signup_source: String,
}

impl Default for SignupMetadata {
    fn default() -> Self {
        Self {
            ip_address: None,
            user_agent: None,
            signup_source: "website".to_string(),
        }
    }
}

/// A fully validated signup handed to storage. Position, early access and
/// creation time are computed at insert time.
#[derive(Debug, Clone)]
pub struct NewEntrant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Interest,
    pub referred_by: Option<String>,
    pub metadata: SignupMetadata,
}

/// Result of a single insert attempt. Unique-constraint conflicts are
/// reported by which constraint fired so the registrar can decide whether
/// to retry; anything else is a hard error.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Entrant),
    DuplicateEmail,
    DuplicateReferralCode,
    DuplicatePosition,
}

#[async_trait]
pub trait EntrantRepo: Send + Sync {
    /// Insert the entrant with position = (current count) + 1 and
    /// early_access = position <= `early_access_limit`, computed atomically
    /// with respect to concurrent inserts.
    async fn insert(
        &self,
        new: &NewEntrant,
        referral_code: &str,
        early_access_limit: i64,
    ) -> AppResult<InsertOutcome>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Entrant>>;
    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<Entrant>>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_early_access(&self) -> AppResult<i64>;
    async fn count_referred_by(&self, code: &str) -> AppResult<i64>;
    async fn interest_counts(&self) -> AppResult<BTreeMap<Interest, i64>>;
    /// Page of entrants ordered by creation time descending, plus the total
    /// count.
    async fn list_page(&self, page: i64, per_page: i64) -> AppResult<(Vec<Entrant>, i64)>;
}

#[derive(Debug, Clone)]
pub struct EntrantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub waitlist_position: i64,
    pub early_access: bool,
    pub referral_code: String,
    pub created_at: Option<NaiveDateTime>,
}

impl From<Entrant> for EntrantSummary {
    fn from(entrant: Entrant) -> Self {
        Self {
            id: entrant.id,
            name: entrant.name,
            email: entrant.email,
            waitlist_position: entrant.waitlist_position,
            early_access: entrant.early_access,
            referral_code: entrant.referral_code,
            created_at: entrant.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaitlistStats {
    pub total_entrants: i64,
    pub early_access_entrants: i64,
    pub early_access_spots_left: i64,
    pub interest_breakdown: BTreeMap<Interest, i64>,
}

#[derive(Debug, Clone)]
pub struct ReferralStats {
    pub referrer_name: String,
    pub referral_code: String,
    pub referral_count: i64,
    pub rewards_eligible: bool,
}

#[derive(Debug, Clone)]
pub struct EntrantPage {
    pub entrants: Vec<Entrant>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Clone)]
pub struct WaitlistUseCases {
    repo: Arc<dyn EntrantRepo>,
}

impl WaitlistUseCases {
    pub fn new(repo: Arc<dyn EntrantRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, metadata))]
    pub async fn register(
        &self,
        request: JoinRequest,
        metadata: SignupMetadata,
    ) -> AppResult<EntrantSummary> {
        let request = normalize(request);
        let interest = validate(&request)?;

        if self.repo.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        if let Some(code) = &request.referral_code
            && self.repo.find_by_referral_code(code).await?.is_none()
        {
            return Err(AppError::InvalidReferralCode);
        }

        let new = NewEntrant {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            interest,
            referred_by: request.referral_code,
            metadata,
        };

        // The storage-level unique constraints are the source of truth for
        // the pre-checks above; conflicts here retry with a fresh count or
        // a fresh code, both bounded.
        let mut code_attempts = 0u32;
        let mut position_attempts = 0u32;
        while code_attempts < MAX_CODE_ATTEMPTS && position_attempts < MAX_POSITION_ATTEMPTS {
            let code = generate_referral_code();
            match self.repo.insert(&new, &code, EARLY_ACCESS_LIMIT).await? {
                InsertOutcome::Inserted(entrant) => {
                    tracing::info!(
                        position = entrant.waitlist_position,
                        early_access = entrant.early_access,
                        "entrant joined waitlist"
                    );
                    return Ok(EntrantSummary::from(entrant));
                }
                InsertOutcome::DuplicateEmail => return Err(AppError::DuplicateEmail),
                InsertOutcome::DuplicateReferralCode => code_attempts += 1,
                InsertOutcome::DuplicatePosition => position_attempts += 1,
            }
        }

        if code_attempts >= MAX_CODE_ATTEMPTS {
            return Err(AppError::ReferralCodeExhausted);
        }
        Err(AppError::Database(
            "could not assign a waitlist position after repeated conflicts".into(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> AppResult<WaitlistStats> {
        let total_entrants = self.repo.count().await?;
        let early_access_entrants = self.repo.count_early_access().await?;
        let interest_breakdown = self.repo.interest_counts().await?;

        Ok(WaitlistStats {
            total_entrants,
            early_access_entrants,
            early_access_spots_left: (EARLY_ACCESS_LIMIT - early_access_entrants).max(0),
            interest_breakdown,
        })
    }

    #[instrument(skip(self))]
    pub async fn referral_stats(&self, code: &str) -> AppResult<ReferralStats> {
        let entrant = self
            .repo
            .find_by_referral_code(code.trim())
            .await?
            .ok_or(AppError::NotFound)?;

        let referral_count = self.repo.count_referred_by(&entrant.referral_code).await?;

        Ok(ReferralStats {
            referrer_name: entrant.name,
            referral_code: entrant.referral_code,
            referral_count,
            rewards_eligible: referral_count >= REWARDS_THRESHOLD,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_entrants(&self, page: i64, per_page: i64) -> AppResult<EntrantPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);

        let (entrants, total) = self.repo.list_page(page, per_page).await?;
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(EntrantPage {
            entrants,
            page,
            per_page,
            total,
            total_pages,
        })
    }
}

fn normalize(request: JoinRequest) -> JoinRequest {
    JoinRequest {
        name: request.name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: non_empty(request.phone),
        interest: non_empty(request.interest),
        referral_code: non_empty(request.referral_code),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects every field violation instead of failing on the first. Returns
/// the parsed interest (defaulting to `all` when absent).
fn validate(request: &JoinRequest) -> AppResult<Interest> {
    let mut errors = Vec::new();

    if !validators::is_valid_name(&request.name) {
        errors.push(FieldError::new(
            "name",
            "Name must be between 2 and 50 characters",
        ));
    }
    if !validators::is_valid_email(&request.email) {
        errors.push(FieldError::new("email", "Please include a valid email"));
    }
    if let Some(phone) = &request.phone
        && !validators::is_valid_phone(phone)
    {
        errors.push(FieldError::new(
            "phone",
            "Please include a valid phone number",
        ));
    }
    let interest = match &request.interest {
        None => Interest::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.push(FieldError::new(
                "interest",
                "Interest must be one of: shopping, food, payments, all",
            ));
            Interest::default()
        }),
    };

    if errors.is_empty() {
        Ok(interest)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(REFERRAL_CODE_PREFIX.len() + REFERRAL_CODE_SUFFIX_LEN);
    code.push_str(REFERRAL_CODE_PREFIX);
    for _ in 0..REFERRAL_CODE_SUFFIX_LEN {
        code.push(REFERRAL_CODE_CHARS[rng.gen_range(0..REFERRAL_CODE_CHARS.len())] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::test_utils::{InMemoryEntrantRepo, create_test_entrant};

    fn use_cases(repo: Arc<InMemoryEntrantRepo>) -> WaitlistUseCases {
        WaitlistUseCases::new(repo as Arc<dyn EntrantRepo>)
    }

    fn join_request(email: &str) -> JoinRequest {
        JoinRequest {
            name: "Test Person".to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_assigns_sequential_positions() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
            .iter()
            .enumerate()
        {
            let summary = waitlist
                .register(join_request(email), SignupMetadata::default())
                .await
                .unwrap();
            assert_eq!(summary.waitlist_position, i as i64 + 1);
            assert!(summary.early_access);
        }

        assert_eq!(repo.get_all().len(), 3);
    }

    #[tokio::test]
    async fn register_normalizes_email_and_trims_name() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        let summary = waitlist
            .register(
                JoinRequest {
                    name: "  Amina Yusuf  ".to_string(),
                    email: " Amina@Example.COM ".to_string(),
                    ..Default::default()
                },
                SignupMetadata::default(),
            )
            .await
            .unwrap();

        assert_eq!(summary.email, "amina@example.com");
        assert_eq!(summary.name, "Amina Yusuf");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_case_insensitively() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        waitlist
            .register(join_request("dup@example.com"), SignupMetadata::default())
            .await
            .unwrap();

        let err = waitlist
            .register(join_request("DUP@Example.com"), SignupMetadata::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(repo.get_all().len(), 1);
    }

    #[tokio::test]
    async fn register_collects_all_validation_errors() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        let err = waitlist
            .register(
                JoinRequest {
                    name: "A".to_string(),
                    email: "not-an-email".to_string(),
                    phone: Some("call me".to_string()),
                    interest: Some("gaming".to_string()),
                    referral_code: None,
                },
                SignupMetadata::default(),
            )
            .await
            .unwrap_err();

        let AppError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "phone", "interest"]);
        assert!(repo.get_all().is_empty());
    }

    #[tokio::test]
    async fn register_rejects_unknown_referral_code() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        let mut request = join_request("a@example.com");
        request.referral_code = Some("ONEZZZZZZ".to_string());

        let err = waitlist
            .register(request, SignupMetadata::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidReferralCode));
        assert!(repo.get_all().is_empty());
    }

    #[tokio::test]
    async fn register_records_referrer() {
        let referrer = create_test_entrant(|e| {
            e.referral_code = "ONEAAA111".to_string();
        });
        let repo = Arc::new(InMemoryEntrantRepo::with_entrants(vec![referrer]));
        let waitlist = use_cases(repo.clone());

        let mut request = join_request("friend@example.com");
        request.referral_code = Some("ONEAAA111".to_string());
        waitlist
            .register(request, SignupMetadata::default())
            .await
            .unwrap();

        let stored = repo.get_all();
        let friend = stored
            .iter()
            .find(|e| e.email == "friend@example.com")
            .unwrap();
        assert_eq!(friend.referred_by.as_deref(), Some("ONEAAA111"));
    }

    #[tokio::test]
    async fn generated_codes_match_issued_format() {
        for _ in 0..100 {
            let code = generate_referral_code();
            assert!(
                validators::is_valid_referral_code(&code),
                "bad code: {code}"
            );
        }
    }

    #[tokio::test]
    async fn early_access_flips_after_position_1000() {
        let seeded: Vec<_> = (1..=999)
            .map(|i| {
                create_test_entrant(|e| {
                    e.email = format!("user{i}@example.com");
                    e.referral_code = format!("ONE{i:06}");
                    e.waitlist_position = i;
                })
            })
            .collect();
        let repo = Arc::new(InMemoryEntrantRepo::with_entrants(seeded));
        let waitlist = use_cases(repo.clone());

        let at_limit = waitlist
            .register(join_request("n1000@example.com"), SignupMetadata::default())
            .await
            .unwrap();
        assert_eq!(at_limit.waitlist_position, 1000);
        assert!(at_limit.early_access);

        let past_limit = waitlist
            .register(join_request("n1001@example.com"), SignupMetadata::default())
            .await
            .unwrap();
        assert_eq!(past_limit.waitlist_position, 1001);
        assert!(!past_limit.early_access);
    }

    #[tokio::test]
    async fn concurrent_registrations_get_distinct_contiguous_positions() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = Arc::new(use_cases(repo.clone()));

        let mut handles = Vec::new();
        for i in 0..20 {
            let waitlist = waitlist.clone();
            handles.push(tokio::spawn(async move {
                waitlist
                    .register(
                        join_request(&format!("c{i}@example.com")),
                        SignupMetadata::default(),
                    )
                    .await
                    .unwrap()
                    .waitlist_position
            }));
        }

        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap());
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn stats_reports_totals_and_interest_breakdown() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo.clone());

        for (email, interest) in [
            ("s1@example.com", "shopping"),
            ("s2@example.com", "shopping"),
            ("f1@example.com", "food"),
        ] {
            let mut request = join_request(email);
            request.interest = Some(interest.to_string());
            waitlist
                .register(request, SignupMetadata::default())
                .await
                .unwrap();
        }

        let stats = waitlist.stats().await.unwrap();
        assert_eq!(stats.total_entrants, 3);
        assert_eq!(stats.early_access_entrants, 3);
        assert_eq!(stats.early_access_spots_left, 997);
        assert_eq!(stats.interest_breakdown.get(&Interest::Shopping), Some(&2));
        assert_eq!(stats.interest_breakdown.get(&Interest::Food), Some(&1));
        assert_eq!(stats.interest_breakdown.get(&Interest::Payments), None);
    }

    #[tokio::test]
    async fn referral_rewards_unlock_at_threshold() {
        let referrer = create_test_entrant(|e| {
            e.referral_code = "ONEREF001".to_string();
        });
        let mut seeded = vec![referrer];
        for i in 0..4 {
            seeded.push(create_test_entrant(|e| {
                e.email = format!("ref{i}@example.com");
                e.referral_code = format!("ONEXYZ{i:03}");
                e.referred_by = Some("ONEREF001".to_string());
                e.waitlist_position = i + 2;
            }));
        }
        let repo = Arc::new(InMemoryEntrantRepo::with_entrants(seeded));
        let waitlist = use_cases(repo.clone());

        let stats = waitlist.referral_stats("ONEREF001").await.unwrap();
        assert_eq!(stats.referral_count, 4);
        assert!(!stats.rewards_eligible);

        let mut request = join_request("fifth@example.com");
        request.referral_code = Some("ONEREF001".to_string());
        waitlist
            .register(request, SignupMetadata::default())
            .await
            .unwrap();

        let stats = waitlist.referral_stats("ONEREF001").await.unwrap();
        assert_eq!(stats.referral_count, 5);
        assert!(stats.rewards_eligible);
    }

    #[tokio::test]
    async fn referral_stats_unknown_code_is_not_found() {
        let repo = Arc::new(InMemoryEntrantRepo::new());
        let waitlist = use_cases(repo);

        let err = waitlist.referral_stats("ONENOPE00").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn list_entrants_paginates_newest_first() {
        let seeded: Vec<_> = (1..=3)
            .map(|i| {
                create_test_entrant(|e| {
                    e.email = format!("p{i}@example.com");
                    e.referral_code = format!("ONEPAG{i:03}");
                    e.waitlist_position = i;
                })
            })
            .collect();
        let repo = Arc::new(InMemoryEntrantRepo::with_entrants(seeded));
        let waitlist = use_cases(repo);

        let page = waitlist.list_entrants(1, 2).await.unwrap();
        assert_eq!(page.entrants.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        // Newest (highest position) first
        assert_eq!(page.entrants[0].waitlist_position, 3);

        // Out-of-range page inputs are clamped
        let page = waitlist.list_entrants(0, 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
    }

    /// Repo wrapper that reports a fixed number of unique-constraint
    /// conflicts before delegating to the in-memory repo.
    struct ConflictRepo {
        inner: InMemoryEntrantRepo,
        code_conflicts: AtomicU32,
        position_conflicts: AtomicU32,
    }

    impl ConflictRepo {
        fn new(code_conflicts: u32, position_conflicts: u32) -> Self {
            Self {
                inner: InMemoryEntrantRepo::new(),
                code_conflicts: AtomicU32::new(code_conflicts),
                position_conflicts: AtomicU32::new(position_conflicts),
            }
        }

        fn take(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl EntrantRepo for ConflictRepo {
        async fn insert(
            &self,
            new: &NewEntrant,
            referral_code: &str,
            early_access_limit: i64,
        ) -> AppResult<InsertOutcome> {
            if Self::take(&self.code_conflicts) {
                return Ok(InsertOutcome::DuplicateReferralCode);
            }
            if Self::take(&self.position_conflicts) {
                return Ok(InsertOutcome::DuplicatePosition);
            }
            self.inner.insert(new, referral_code, early_access_limit).await
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<Entrant>> {
            self.inner.find_by_email(email).await
        }

        async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<Entrant>> {
            self.inner.find_by_referral_code(code).await
        }

        async fn count(&self) -> AppResult<i64> {
            self.inner.count().await
        }

        async fn count_early_access(&self) -> AppResult<i64> {
            self.inner.count_early_access().await
        }

        async fn count_referred_by(&self, code: &str) -> AppResult<i64> {
            self.inner.count_referred_by(code).await
        }

        async fn interest_counts(&self) -> AppResult<BTreeMap<Interest, i64>> {
            self.inner.interest_counts().await
        }

        async fn list_page(&self, page: i64, per_page: i64) -> AppResult<(Vec<Entrant>, i64)> {
            self.inner.list_page(page, per_page).await
        }
    }

    #[tokio::test]
    async fn code_generation_is_bounded() {
        let repo = Arc::new(ConflictRepo::new(u32::MAX, 0));
        let waitlist = WaitlistUseCases::new(repo as Arc<dyn EntrantRepo>);

        let err = waitlist
            .register(join_request("x@example.com"), SignupMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferralCodeExhausted));
    }

    #[tokio::test]
    async fn position_conflicts_retry_then_succeed() {
        let repo = Arc::new(ConflictRepo::new(0, 3));
        let waitlist = WaitlistUseCases::new(repo as Arc<dyn EntrantRepo>);

        let summary = waitlist
            .register(join_request("x@example.com"), SignupMetadata::default())
            .await
            .unwrap();
        assert_eq!(summary.waitlist_position, 1);
    }

    #[tokio::test]
    async fn position_conflicts_are_bounded() {
        let repo = Arc::new(ConflictRepo::new(0, u32::MAX));
        let waitlist = WaitlistUseCases::new(repo as Arc<dyn EntrantRepo>);

        let err = waitlist
            .register(join_request("x@example.com"), SignupMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
