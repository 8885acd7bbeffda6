use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{adapters::http::app_state::AppState, app_error::AppError};

/// Client address as resolved by the rate-limit middleware, made available
/// to handlers via request extensions (the join handler records it in the
/// signup metadata).
#[derive(Clone, Debug)]
pub struct ClientIp(pub String);

pub async fn rate_limit_middleware(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Only trust forwarded headers if explicitly configured (when behind a reverse proxy)
    let ip = if app_state.config.trust_proxy {
        forwarded_ip(&request).unwrap_or_else(|| addr.ip().to_string())
    } else {
        addr.ip().to_string()
    };

    tracing::debug!(
        trust_proxy = app_state.config.trust_proxy,
        connect_ip = %addr.ip(),
        using_ip = %ip,
        "Rate limiting request"
    );

    app_state.rate_limiter.check(&ip).await?;

    request.extensions_mut().insert(ClientIp(ip));

    Ok(next.run(request).await)
}

fn forwarded_ip(req: &Request) -> Option<String> {
    // Extract IP from X-Forwarded-For or X-Real-IP headers
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let trimmed = first.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    if let Some(real) = req.headers().get("x-real-ip")
        && let Ok(val) = real.to_str()
        && !val.trim().is_empty()
    {
        return Some(val.trim().to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/waitlist/stats");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn forwarded_ip_prefers_first_x_forwarded_for_entry() {
        let req = request_with_headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(forwarded_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn forwarded_ip_falls_back_to_x_real_ip() {
        let req = request_with_headers(&[("x-real-ip", " 198.51.100.4 ")]);
        assert_eq!(forwarded_ip(&req).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn forwarded_ip_ignores_empty_headers() {
        let req = request_with_headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "")]);
        assert_eq!(forwarded_ip(&req), None);
    }
}
