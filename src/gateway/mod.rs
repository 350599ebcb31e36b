//! The single outbound request channel to the backend.
//!
//! Every request is marshaled into one JSON body carrying the action name,
//! the page security token, and the theme version, deep-merged with the
//! caller's fields. The wire itself is an injected [`Transport`] seam so the
//! runtime stays deterministic; [`StaticTransport`] is the canned
//! implementation used by tests and demos.

use std::sync::{Arc, Mutex, RwLock};

use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::ThemeConfig;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::util::deep_merge;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Structured data for one gateway call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    action: String,
    fields: Map<String, Value>,
}

impl RequestOptions {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            fields: Map::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// What the backend answers with. `success: false` is a resolved call (the
/// backend declined the action); rejection is reserved for transport and
/// protocol failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Wire seam. Implementations return `Ok` for any completed HTTP exchange
/// (status mapping is the gateway's concern) and `Err` only for
/// transport-level failures.
pub trait Transport: Send + Sync {
    fn send(&self, request: &TransportRequest) -> GatewayResult<TransportResponse>;
}

pub struct Gateway {
    url: String,
    token: String,
    version: String,
    transport: Arc<dyn Transport>,
    logger: RwLock<Option<Logger>>,
    requests: Mutex<GatewayCounters>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GatewayCounters {
    pub sent: u64,
    pub failed: u64,
}

impl Gateway {
    pub fn new(config: &ThemeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: config.gateway_url.clone(),
            token: config.security_token.clone(),
            version: config.version.clone(),
            transport,
            logger: RwLock::new(None),
            requests: Mutex::new(GatewayCounters::default()),
        }
    }

    /// Attach the runtime logger. Called once during core init.
    pub fn attach_logger(&self, logger: Logger) {
        *self.logger.write().expect("gateway logger poisoned") = Some(logger);
    }

    /// Marshal and send one request, mapping non-2xx responses and
    /// unparsable bodies to errors. Callers treat every `Err` uniformly:
    /// log and skip the dependent update.
    pub fn request(&self, options: RequestOptions) -> GatewayResult<ResponseEnvelope> {
        let request = TransportRequest {
            url: self.url.clone(),
            body: self.marshal(&options),
        };
        let outcome = self.transport.send(&request).and_then(|response| {
            if !(200..300).contains(&response.status) {
                return Err(GatewayError::Http {
                    status: response.status,
                    body: response.body,
                });
            }
            Ok(serde_json::from_str::<ResponseEnvelope>(&response.body)?)
        });

        let mut counters = self.requests.lock().expect("gateway counters poisoned");
        counters.sent += 1;
        if outcome.is_err() {
            counters.failed += 1;
        }
        drop(counters);

        match &outcome {
            Ok(envelope) => self.log(
                LogLevel::Debug,
                "request_completed",
                [
                    json_kv("action", json!(options.action())),
                    json_kv("success", json!(envelope.success)),
                ],
            ),
            Err(err) => self.log(
                LogLevel::Warn,
                "request_failed",
                [
                    json_kv("action", json!(options.action())),
                    json_kv("error", json!(err.to_string())),
                ],
            ),
        }
        outcome
    }

    pub fn counters(&self) -> GatewayCounters {
        *self.requests.lock().expect("gateway counters poisoned")
    }

    fn marshal(&self, options: &RequestOptions) -> String {
        let mut body = json!({
            "action": options.action,
            "nonce": self.token,
            "version": self.version,
        });
        deep_merge(&mut body, &Value::Object(options.fields.clone()));
        body.to_string()
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) {
        if let Some(logger) = self.logger.read().expect("gateway logger poisoned").as_ref() {
            let event = event_with_fields(level, "marquee::gateway", message, fields);
            let _ = logger.log_event(event);
        }
    }
}

enum CannedOutcome {
    Respond { status: u16, body: String },
    Fail(String),
}

/// Canned transport for tests and demos: answers every request with the same
/// outcome and records the marshaled requests it saw.
pub struct StaticTransport {
    outcome: CannedOutcome,
    seen: Mutex<Vec<TransportRequest>>,
}

impl StaticTransport {
    /// Successful envelope wrapping `data`.
    pub fn ok(data: Value) -> Arc<Self> {
        let body = json!({ "success": true, "data": data }).to_string();
        Arc::new(Self {
            outcome: CannedOutcome::Respond { status: 200, body },
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Resolved envelope the backend declined (`success: false`).
    pub fn rejected(message: &str) -> Arc<Self> {
        let body = json!({ "success": false, "data": { "message": message } }).to_string();
        Arc::new(Self {
            outcome: CannedOutcome::Respond { status: 200, body },
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Completed exchange with a non-2xx status.
    pub fn http_error(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: CannedOutcome::Respond {
                status,
                body: body.to_string(),
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Transport-level failure (network unreachable and the like).
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: CannedOutcome::Fail(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().expect("transport log poisoned").clone()
    }
}

impl Transport for StaticTransport {
    fn send(&self, request: &TransportRequest) -> GatewayResult<TransportResponse> {
        self.seen
            .lock()
            .expect("transport log poisoned")
            .push(request.clone());
        match &self.outcome {
            CannedOutcome::Respond { status, body } => Ok(TransportResponse {
                status: *status,
                body: body.clone(),
            }),
            CannedOutcome::Fail(message) => Err(GatewayError::Transport(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ThemeConfig {
        ThemeConfig {
            gateway_url: "https://example.test/gateway".to_string(),
            security_token: "nonce-123".to_string(),
            debug_enabled: false,
            version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn marshals_action_token_and_fields() {
        let transport = StaticTransport::ok(json!({ "videos": [] }));
        let gateway = Gateway::new(&config(), transport.clone());

        let envelope = gateway
            .request(
                RequestOptions::new("load_featured_videos")
                    .field("count", 12)
                    .field("category", "trending"),
            )
            .unwrap();
        assert!(envelope.success);

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://example.test/gateway");
        let body: Value = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(body["action"], json!("load_featured_videos"));
        assert_eq!(body["nonce"], json!("nonce-123"));
        assert_eq!(body["version"], json!("1.2.0"));
        assert_eq!(body["count"], json!(12));
        assert_eq!(body["category"], json!("trending"));
    }

    #[test]
    fn declined_envelope_is_a_resolved_call() {
        let transport = StaticTransport::rejected("invalid credentials");
        let gateway = Gateway::new(&config(), transport);
        let envelope = gateway.request(RequestOptions::new("user_login")).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.data["message"], json!("invalid credentials"));
    }

    #[test]
    fn non_2xx_maps_to_http_error() {
        let transport = StaticTransport::http_error(403, "forbidden");
        let gateway = Gateway::new(&config(), transport);
        let err = gateway.request(RequestOptions::new("user_login")).unwrap_err();
        match err {
            GatewayError::Http { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = StaticTransport::failing("connection reset");
        let gateway = Gateway::new(&config(), transport);
        let err = gateway.request(RequestOptions::new("track_view")).unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn unparsable_body_is_malformed() {
        let transport = StaticTransport::http_error(200, "<html>not json</html>");
        let gateway = Gateway::new(&config(), transport);
        let err = gateway
            .request(RequestOptions::new("load_performers"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[test]
    fn counters_track_outcomes() {
        let gateway = Gateway::new(&config(), StaticTransport::failing("down"));
        let _ = gateway.request(RequestOptions::new("a"));
        let _ = gateway.request(RequestOptions::new("b"));
        let counters = gateway.counters();
        assert_eq!(counters.sent, 2);
        assert_eq!(counters.failed, 2);
    }
}
