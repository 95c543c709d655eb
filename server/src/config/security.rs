use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const XSS_BLOCK: &str = "1; mode=block";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

fn security_headers() -> [(HeaderName, HeaderValue); 6] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static(NOSNIFF)),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static(DENY)),
        (header::X_XSS_PROTECTION, HeaderValue::from_static(XSS_BLOCK)),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CSP_API_VALUE),
        ),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static(REFERRER_POLICY_VALUE),
        ),
        (
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY_VALUE),
        ),
    ]
}

/// Stamps the API security headers on every response. HSTS is only sent in
/// production, where the server sits behind HTTPS.
pub fn with_security_headers<S>(router: Router<S>, include_hsts: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if include_hsts {
        tracing::info!("Security: HSTS header enabled (production mode)");
    } else {
        tracing::info!("Security: HSTS header disabled (development mode)");
    }

    let router = security_headers()
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name, value))
        });

    if include_hsts {
        router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ))
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_distinct() {
        let headers = security_headers();
        for (i, (name, _)) in headers.iter().enumerate() {
            assert!(headers[i + 1..].iter().all(|(other, _)| other != name));
        }
    }
}
