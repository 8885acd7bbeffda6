use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::ClientIp},
    app_error::{AppError, AppResult},
    domain::entities::entrant::{Entrant, Interest},
    use_cases::waitlist::{DEFAULT_PAGE_SIZE, JoinRequest, SignupMetadata},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/join", post(join))
        .route("/stats", get(stats))
        .route("/referral/{code}", get(referral))
        .route("/users", get(list_users))
}

/// Missing fields deserialize to empty values so they surface as field
/// errors alongside the rest instead of a body rejection.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct JoinPayload {
    name: String,
    email: String,
    phone: Option<String>,
    interest: Option<String>,
    referral_code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinData {
    id: Uuid,
    name: String,
    email: String,
    waitlist_position: i64,
    early_access: bool,
    referral_code: String,
    join_date: Option<NaiveDateTime>,
}

async fn join(
    State(app_state): State<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    headers: HeaderMap,
    Json(payload): Json<JoinPayload>,
) -> AppResult<impl IntoResponse> {
    let request = JoinRequest {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        interest: payload.interest,
        referral_code: payload.referral_code,
    };
    let metadata = SignupMetadata {
        ip_address: client_ip.map(|Extension(ClientIp(ip))| ip),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ..SignupMetadata::default()
    };

    let summary = app_state
        .waitlist_use_cases
        .register(request, metadata)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Successfully joined waitlist!",
            "data": JoinData {
                id: summary.id,
                name: summary.name,
                email: summary.email,
                waitlist_position: summary.waitlist_position,
                early_access: summary.early_access,
                referral_code: summary.referral_code,
                join_date: summary.created_at,
            },
        })),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsData {
    total_users: i64,
    early_access_users: i64,
    early_access_spots_left: i64,
    interest_stats: BTreeMap<Interest, i64>,
}

async fn stats(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = app_state.waitlist_use_cases.stats().await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": StatsData {
            total_users: stats.total_entrants,
            early_access_users: stats.early_access_entrants,
            early_access_spots_left: stats.early_access_spots_left,
            interest_stats: stats.interest_breakdown,
        },
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReferralData {
    referrer_name: String,
    referral_code: String,
    referral_count: i64,
    rewards_eligible: bool,
}

async fn referral(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let stats = app_state.waitlist_use_cases.referral_stats(&code).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": ReferralData {
            referrer_name: stats.referrer_name,
            referral_code: stats.referral_code,
            referral_count: stats.referral_count,
            rewards_eligible: stats.rewards_eligible,
        },
    })))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminEntrant {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    interest: Interest,
    referral_code: String,
    referred_by: Option<String>,
    waitlist_position: i64,
    early_access: bool,
    join_date: Option<NaiveDateTime>,
}

impl From<Entrant> for AdminEntrant {
    fn from(entrant: Entrant) -> Self {
        Self {
            id: entrant.id,
            name: entrant.name,
            email: entrant.email,
            phone: entrant.phone,
            interest: entrant.interest,
            referral_code: entrant.referral_code,
            referred_by: entrant.referred_by,
            waitlist_position: entrant.waitlist_position,
            early_access: entrant.early_access,
            join_date: entrant.created_at,
        }
    }
}

async fn list_users(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &app_state)?;

    let page = app_state
        .waitlist_use_cases
        .list_entrants(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    let users: Vec<AdminEntrant> = page.entrants.into_iter().map(AdminEntrant::from).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "users": users,
            "pagination": {
                "current": page.page,
                "pages": page.total_pages,
                "total": page.total,
            },
        },
    })))
}

fn require_admin(headers: &HeaderMap, app_state: &AppState) -> AppResult<()> {
    let expected = format!("Bearer {}", app_state.config.admin_token.expose_secret());
    match headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}
