//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the credential endpoints are limited (~10 requests per minute per IP)
//! to slow down password guessing. Rejections use the JSON error body.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Proxy headers carrying the client IP, most specific first.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// Keys requests by client IP.
///
/// The socket peer is used unless the server is configured to sit behind a
/// trusted proxy, in which case the proxy headers win so that every client
/// gets its own bucket.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trust_proxy_headers: bool) -> Self {
        Self {
            trust_proxy_headers,
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            // X-Forwarded-For lists the client first
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        self.trust_proxy_headers
            .then(|| forwarded_ip(req.headers()))
            .flatten()
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Render a limiter rejection like any other API error, keeping the
/// `retry-after` style headers governor attaches.
fn rejection_response(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { headers, .. } => {
            let mut response = AppError::RateLimited.into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("unable to determine client address".to_string()).into_response()
        }
        GovernorError::Other { msg, .. } => {
            AppError::Internal(msg.unwrap_or_else(|| "rate limiter failed".to_string()))
                .into_response()
        }
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build a limiter that refills one token every `replenish_secs` up to `burst`.
///
/// # Panics
///
/// Panics if either argument is zero; callers pass constants.
fn limiter(
    key_extractor: ClientIpKeyExtractor,
    replenish_secs: u64,
    burst: u32,
) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key_extractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter period and burst are non-zero");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection_response)
}

/// Auth endpoints: one request every 6 seconds, burst of 5.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    limiter(ClientIpKeyExtractor::new(trust_proxy_headers), 6, 5)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderValue, StatusCode};
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request_from(peer: [u8; 4], forwarded_for: &'static str) -> Request<()> {
        let mut req = Request::new(());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        req.headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static(forwarded_for));
        req
    }

    #[test]
    fn test_first_forwarded_ip_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(forwarded_ip(&headers), Some("203.0.113.9".parse().unwrap()));

        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(forwarded_ip(&headers), Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_proxy_headers_ignored_by_default() {
        let extractor = ClientIpKeyExtractor::new(false);
        let first = extractor.extract(&request_from([192, 0, 2, 1], "203.0.113.1")).unwrap();
        let second = extractor.extract(&request_from([192, 0, 2, 1], "203.0.113.2")).unwrap();
        assert_eq!(first, "192.0.2.1".parse::<IpAddr>().unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_proxy_headers_used_when_trusted() {
        let extractor = ClientIpKeyExtractor::new(true);
        let ip = extractor.extract(&request_from([10, 0, 0, 2], "203.0.113.1")).unwrap();
        assert_eq!(ip, "203.0.113.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_trusted_mode_falls_back_to_peer_address() {
        let mut req = Request::new(());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        let ip = ClientIpKeyExtractor::new(true).extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_address_is_an_error() {
        assert!(
            ClientIpKeyExtractor::new(false)
                .extract(&Request::new(()))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_rejection_is_json_429() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("6"));
        let response = rejection_response(GovernorError::TooManyRequests {
            wait_time: 6,
            headers: Some(headers),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "6");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Too many requests, please slow down");
    }
}
