//! Probe execution.
//!
//! Performs one HTTP request against a target with a hard per-attempt
//! timeout, an optional retry-on-failure loop, and delegates judging to the
//! assertion evaluator. Produces a normalized [`CheckResult`] and never
//! mutates the target config.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Method;
use tracing::{debug, warn};

use crate::assertions::evaluate;
use crate::config::CheckTarget;
use crate::types::CheckResult;

/// Body capture is capped to bound memory; assertions operate on the
/// possibly-truncated prefix.
pub const MAX_BODY_CAPTURE_BYTES: usize = 64 * 1024;

/// Executes probes over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    user_agent: String,
}

impl Prober {
    /// Create a prober. Timeouts are per-request (from each target's
    /// config), so the client itself carries none.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    /// Probe a target, retrying after failed attempts up to
    /// `target.retry_count` extra times with a fixed delay between
    /// attempts. A passing attempt short-circuits immediately; the returned
    /// result is always from the last attempt made.
    ///
    /// `resolved_url` is supplied by the caller: URL placeholder
    /// substitution is an external collaborator's responsibility, done once
    /// before invocation.
    pub async fn run(&self, target: &CheckTarget, resolved_url: &str) -> CheckResult {
        // A malformed method is a config error; retrying cannot fix it.
        let method = match Method::from_bytes(target.method.to_ascii_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => {
                return CheckResult {
                    target_id: target.id.clone(),
                    success: false,
                    status_code: None,
                    elapsed_ms: 0,
                    error: Some(format!("Invalid HTTP method \"{}\"", target.method)),
                };
            }
        };

        let mut result = self.attempt(target, &method, resolved_url).await;

        for attempt in 1..=target.retry_count {
            if result.success {
                break;
            }
            debug!(
                target_id = %target.id,
                attempt,
                max_retries = target.retry_count,
                error = result.error.as_deref().unwrap_or(""),
                "probe attempt failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(target.retry_delay_ms)).await;
            result = self.attempt(target, &method, resolved_url).await;
        }

        result
    }

    /// One request attempt, judged by the assertion evaluator.
    async fn attempt(&self, target: &CheckTarget, method: &Method, url: &str) -> CheckResult {
        let assertions = target.effective_assertions();
        let wants_body = assertions.iter().any(crate::config::Assertion::needs_body);
        let timeout = Duration::from_millis(target.timeout_ms);

        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(timeout)
            .headers(self.build_headers(target));

        // Bodies are only attached for methods that carry one.
        if *method != Method::GET && *method != Method::HEAD {
            if let Some(body) = &target.body {
                request = request.body(body.clone());
            }
        }

        let started = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(target, started, &e),
        };

        let status_code = response.status().as_u16();
        let headers = lowercase_headers(response.headers());

        // The body is read only when an assertion needs it, and capped.
        let body = if wants_body {
            match read_capped(response, MAX_BODY_CAPTURE_BYTES).await {
                Ok(body) => Some(body),
                Err(e) => return transport_failure(target, started, &e),
            }
        } else {
            None
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let failures = evaluate(
            &assertions,
            Some(status_code),
            &headers,
            elapsed_ms,
            body.as_deref(),
        );

        CheckResult {
            target_id: target.id.clone(),
            success: failures.is_empty(),
            status_code: Some(status_code),
            elapsed_ms,
            error: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
        }
    }

    /// Build request headers: the engine's User-Agent first, then target
    /// headers, which win on conflict.
    fn build_headers(&self, target: &CheckTarget) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        for (name, value) in &target.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => {
                    warn!(target_id = %target.id, header = %name, "skipping invalid header");
                }
            }
        }
        headers
    }

}

/// Normalize a transport-level error, keeping timeouts distinguishable
/// from other failures.
fn transport_failure(
    target: &CheckTarget,
    started: Instant,
    error: &reqwest::Error,
) -> CheckResult {
    let message = if error.is_timeout() {
        format!("Timeout after {}ms", target.timeout_ms)
    } else {
        error.to_string()
    };
    CheckResult {
        target_id: target.id.clone(),
        success: false,
        status_code: None,
        elapsed_ms: started.elapsed().as_millis() as u64,
        error: Some(message),
    }
}

/// Collect response headers with lowercase names for case-insensitive
/// assertion lookup. Non-UTF8 values are lossily converted.
fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Read up to `cap` bytes of the response body and drop the rest.
async fn read_capped(mut response: reqwest::Response, cap: usize) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = cap - buf.len();
        if chunk.len() >= remaining {
            buf.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Assertion, AssertionOp};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(url_path: &str) -> CheckTarget {
        serde_json::from_value(serde_json::json!({
            "id": "t1",
            "name": "API",
            "url": format!("http://placeholder{url_path}"),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn passing_probe_with_default_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = Prober::new("test-agent/1.0");
        let result = prober
            .run(&target("/health"), &format!("{}/health", server.uri()))
            .await;

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn assertion_failures_are_joined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("status: error"))
            .mount(&server)
            .await;

        let mut t = target("/");
        t.assertions = vec![
            Assertion::StatusCode {
                op: AssertionOp::Is,
                expected: 200,
            },
            Assertion::Body {
                op: AssertionOp::Contains,
                expected: "ok".to_string(),
            },
        ];

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;

        assert!(!result.success);
        assert_eq!(result.status_code, Some(500));
        let error = result.error.unwrap();
        assert_eq!(
            error,
            "Status code is 500, expected 200; Body does not contain \"ok\""
        );
    }

    #[tokio::test]
    async fn retry_stops_on_first_success() {
        let server = MockServer::start().await;
        // First attempt fails, second succeeds; the two remaining retries
        // must not be consumed.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut t = target("/");
        t.retry_count = 3;
        t.retry_delay_ms = 10;

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
    }

    #[tokio::test]
    async fn retry_bound_is_retry_count_plus_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let mut t = target("/");
        t.retry_count = 2;
        t.retry_delay_ms = 10;

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;

        // Result comes from the last attempt.
        assert!(!result.success);
        assert_eq!(result.status_code, Some(503));
    }

    #[tokio::test]
    async fn timeout_surfaces_with_configured_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut t = target("/");
        t.timeout_ms = 100;

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;

        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert_eq!(result.error.as_deref(), Some("Timeout after 100ms"));
    }

    #[tokio::test]
    async fn connection_error_is_not_reported_as_timeout() {
        // Nothing listens on port 1.
        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&target("/"), "http://127.0.0.1:1/").await;

        assert!(!result.success);
        assert_eq!(result.status_code, None);
        let error = result.error.unwrap();
        assert!(!error.starts_with("Timeout after"), "got: {error}");
    }

    #[tokio::test]
    async fn default_user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "test-agent/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&target("/"), &server.uri()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn target_headers_override_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "custom-agent"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut t = target("/");
        t.headers = vec![
            ("User-Agent".to_string(), "custom-agent".to_string()),
            ("X-Api-Key".to_string(), "secret".to_string()),
        ];

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn post_attaches_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string("ping"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut t = target("/");
        t.method = "POST".to_string();
        t.body = Some("ping".to_string());

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn body_capture_is_capped() {
        let server = MockServer::start().await;
        let mut big = "a".repeat(MAX_BODY_CAPTURE_BYTES);
        big.push_str("MARKER");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let mut t = target("/");
        t.assertions = vec![Assertion::Body {
            op: AssertionOp::Contains,
            expected: "MARKER".to_string(),
        }];

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, &server.uri()).await;

        // The marker sits past the capture cap, so the assertion only sees
        // the truncated prefix.
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Body does not contain \"MARKER\"")
        );
    }

    #[tokio::test]
    async fn invalid_method_fails_without_a_request() {
        let mut t = target("/");
        t.method = "NOT A METHOD".to_string();

        let prober = Prober::new("test-agent/1.0");
        let result = prober.run(&t, "http://127.0.0.1:1/").await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Invalid HTTP method \"NOT A METHOD\"")
        );
    }
}
