use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer(allowed_origins: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(parse_allowed_origins(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("idempotency-key"),
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn parse_allowed_origins(origins: &str) -> AllowOrigin {
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    // Credentials are allowed, so a wildcard origin is never an option here.
    if parsed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, falling back to the defaults");
        return AllowOrigin::list(
            DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .map(HeaderValue::from_static),
        );
    }

    tracing::info!("CORS: Configured with {} allowed origin(s)", parsed.len());
    AllowOrigin::list(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer() {
        let _layer = create_cors_layer(DEFAULT_ALLOWED_ORIGINS);
    }

    #[test]
    fn test_empty_origin_list_still_builds() {
        let _layer = create_cors_layer(" , ");
    }

    #[test]
    fn test_default_origins_are_valid() {
        for origin in DEFAULT_ALLOWED_ORIGINS.split(',') {
            let trimmed = origin.trim();
            assert!(
                trimmed.parse::<HeaderValue>().is_ok(),
                "Default origin '{}' should be a valid HeaderValue",
                trimmed
            );
        }
    }
}
