//! Forwards browser requests to TMDB, adding the server-held bearer token.

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::config::ProxyConfig;

pub const MISSING_SECRET_ERROR: &str = "TMDB_BEARER is not configured on the server";
pub const PROXY_FAILURE_ERROR: &str = "Failed to proxy TMDB request";

#[derive(Debug, Clone)]
pub struct TmdbProxy {
    config: ProxyConfig,
    client: Client,
}

/// What the upstream answered, relayed without interpretation.
#[derive(Debug)]
struct Relayed {
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
}

impl TmdbProxy {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self {
            config,
            client: crate::tmdb::http_client()?,
        })
    }

    /// `path` is the raw request path after the proxy prefix and `query` the raw
    /// query string (`None` when the URI had no `?`).
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> Response {
        let ProxyConfig::Enabled { bearer, upstream } = &self.config else {
            warn!("Rejecting proxy request: TMDB_BEARER is not configured");
            return error_response(MISSING_SECRET_ERROR);
        };

        let url = upstream_url(upstream, path, query);
        debug!(%method, url = %url, "Forwarding TMDB request");

        match self.relay(method, &url, bearer, body).await {
            Ok(relayed) => {
                let mut res = Response::new(Body::from(relayed.body));
                *res.status_mut() = relayed.status;
                res.headers_mut()
                    .insert(header::CONTENT_TYPE, relayed.content_type);
                res
            }
            Err(e) => {
                error!("TMDB proxy error: {:#}", e);
                error_response(PROXY_FAILURE_ERROR)
            }
        }
    }

    async fn relay(&self, method: Method, url: &str, bearer: &str, body: Bytes) -> Result<Relayed> {
        let mut req = self
            .client
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"));
        if carries_body(&method) {
            req = req
                .header(header::CONTENT_TYPE, "application/json")
                .body(json_body(&body));
        }

        let res = req.send().await.context("upstream request failed")?;
        let status = StatusCode::from_u16(res.status().as_u16())
            .context("upstream returned an invalid status")?;
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        let body = res.bytes().await.context("reading upstream body failed")?;
        Ok(Relayed {
            status,
            content_type,
            body,
        })
    }
}

/// `path` is taken as it appeared on the wire, so percent-escapes and
/// sub-delimiters (`,` `:` `+` `@`) reach the upstream untouched.
pub fn upstream_url(upstream: &str, path: &str, query: Option<&str>) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    match query {
        Some(q) => format!("{upstream}/{joined}?{q}"),
        None => format!("{upstream}/{joined}"),
    }
}

pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Empty input becomes `{}`; JSON passes through; anything else is sent as a
/// JSON string.
fn json_body(body: &Bytes) -> Vec<u8> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return b"{}".to_vec();
    }
    if serde_json::from_slice::<serde::de::IgnoredAny>(body).is_ok() {
        return body.to_vec();
    }
    serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
        .to_string()
        .into_bytes()
}

fn error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.themoviedb.org/3";

    #[test]
    fn joins_segments_and_keeps_query() {
        assert_eq!(
            upstream_url(BASE, "search/movie", Some("query=dune&page=2")),
            "https://api.themoviedb.org/3/search/movie?query=dune&page=2"
        );
        assert_eq!(
            upstream_url(BASE, "movie/550/videos", None),
            "https://api.themoviedb.org/3/movie/550/videos"
        );
        assert_eq!(
            upstream_url(BASE, "trending/movie/week", Some("")),
            "https://api.themoviedb.org/3/trending/movie/week?"
        );
    }

    #[test]
    fn path_segments_are_not_reencoded() {
        assert_eq!(
            upstream_url(BASE, "movie/550,551", None),
            "https://api.themoviedb.org/3/movie/550,551"
        );
        assert_eq!(
            upstream_url(BASE, "list/a:b/tt+1/star%20wars", None),
            "https://api.themoviedb.org/3/list/a:b/tt+1/star%20wars"
        );
    }

    #[test]
    fn query_is_not_reencoded() {
        assert_eq!(
            upstream_url(BASE, "search/movie", Some("query=star%20wars")),
            "https://api.themoviedb.org/3/search/movie?query=star%20wars"
        );
    }

    #[test]
    fn only_payload_methods_carry_body() {
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::PUT));
        assert!(carries_body(&Method::PATCH));
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::DELETE));
        assert!(!carries_body(&Method::HEAD));
    }

    #[test]
    fn body_encoding() {
        assert_eq!(json_body(&Bytes::new()), b"{}".to_vec());
        assert_eq!(
            json_body(&Bytes::from_static(br#"{"value":8.5}"#)),
            br#"{"value":8.5}"#.to_vec()
        );
        assert_eq!(
            json_body(&Bytes::from_static(b"plain")),
            br#""plain""#.to_vec()
        );
    }
}
