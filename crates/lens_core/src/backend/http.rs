//! REST implementation of the lens-data contract.
//!
//! # Responsibility
//! - Map `LensBackend` calls onto `/lens-data/{domain}/{type}[/{id}]` and
//!   `/lens-data/{domain}/artifacts/{id}/actions/{action}`.
//! - Unwrap the success/error envelope servers commonly put around payloads.
//!
//! # Invariants
//! - Path segments are percent-encoded by `Url`; never string-concatenated.
//! - A 404 on an id-addressed call maps to `BackendError::NotFound`.
//! - Response bodies are never logged.

use crate::backend::{BackendError, BackendResult, CollectionKey, LensBackend};
use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId, ArtifactPatch};
use log::{error, info};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const RESOURCE: &str = "lens-data";
const LIST_KEYS: &[&str] = &["artifacts", "items", "data"];
const SINGLE_KEYS: &[&str] = &["artifact", "data"];
const ACTION_RESULT_KEY: &str = "result";
const MAX_ERROR_CHARS: usize = 200;

/// Blocking HTTP client for one lens-data server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a backend rooted at `base_url` (e.g. `http://host/api`).
    pub fn new(base_url: &str, timeout: Duration) -> BackendResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| BackendError::Transport(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/lens-data/{domain}/{type}` or `.../{type}/{id}`.
    pub fn collection_url(
        &self,
        key: &CollectionKey,
        id: Option<&ArtifactId>,
    ) -> BackendResult<Url> {
        key.validate()?;
        let mut segments = vec![RESOURCE, key.domain(), key.artifact_type()];
        if let Some(id) = id {
            segments.push(id.as_str());
        }
        self.endpoint(&segments)
    }

    /// `{base}/lens-data/{domain}/artifacts/{id}/actions/{action}`.
    pub fn action_url(&self, domain: &str, id: &ArtifactId, action: &str) -> BackendResult<Url> {
        super::validate_segment(domain)?;
        self.endpoint(&[
            RESOURCE,
            domain,
            "artifacts",
            id.as_str(),
            "actions",
            action.trim(),
        ])
    }

    fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Transport(format!("base url cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn execute(
        &self,
        op: &str,
        key: &str,
        request: RequestBuilder,
        id: Option<&ArtifactId>,
    ) -> BackendResult<Value> {
        let started_at = Instant::now();
        info!("event=http_request module=backend status=start op={op} key={key}");

        let result = send(request, id);
        match &result {
            Ok(_) => info!(
                "event=http_request module=backend status=ok op={op} key={key} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=http_request module=backend status=error op={op} key={key} duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }
}

fn send(request: RequestBuilder, id: Option<&ArtifactId>) -> BackendResult<Value> {
    let response = request
        .send()
        .map_err(|err| BackendError::Transport(err.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| BackendError::Transport(err.to_string()))?;
    check_status(status, &body, id)?;

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(&body)
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    reject_failed_envelope(status, &value)?;
    Ok(value)
}

fn check_status(status: StatusCode, body: &str, id: Option<&ArtifactId>) -> BackendResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(BackendError::NotFound(id.clone()));
        }
    }
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message: error_message(body),
    })
}

/// `{ok: false, error: "..."}` with a 2xx status still reports a failure.
fn reject_failed_envelope(status: StatusCode, value: &Value) -> BackendResult<()> {
    if value.get("ok").and_then(Value::as_bool) == Some(false) {
        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message: envelope_message(value).unwrap_or_else(|| "request failed".to_string()),
        });
    }
    Ok(())
}

fn envelope_message(value: &Value) -> Option<String> {
    ["error", "message"].iter().find_map(|field| match value.get(*field) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Object(inner)) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

/// Error text from a JSON envelope when present, else the truncated body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = envelope_message(&value) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_CHARS).collect()
}

/// Decodes a payload that is either bare or wrapped under one of `keys`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(value: Value, keys: &[&str]) -> BackendResult<T> {
    let bare_error = match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => return Ok(decoded),
        Err(err) => err,
    };
    if let Value::Object(map) = &value {
        for key in keys {
            if let Some(inner) = map.get(*key) {
                if let Ok(decoded) = serde_json::from_value::<T>(inner.clone()) {
                    return Ok(decoded);
                }
            }
        }
    }
    Err(BackendError::InvalidResponse(bare_error.to_string()))
}

impl LensBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn list(&self, key: &CollectionKey) -> BackendResult<Vec<Artifact>> {
        let url = self.collection_url(key, None)?;
        let body = self.execute("list", &key.to_string(), self.client.get(url), None)?;
        decode_envelope(body, LIST_KEYS)
    }

    fn create(&self, key: &CollectionKey, draft: &ArtifactDraft) -> BackendResult<Artifact> {
        draft.validate()?;
        let url = self.collection_url(key, None)?;
        let body = self.execute("create", &key.to_string(), self.client.post(url).json(draft), None)?;
        decode_envelope(body, SINGLE_KEYS)
    }

    fn update(
        &self,
        key: &CollectionKey,
        id: &ArtifactId,
        patch: &ArtifactPatch,
    ) -> BackendResult<Artifact> {
        patch.validate()?;
        let url = self.collection_url(key, Some(id))?;
        let body = self.execute(
            "update",
            &key.to_string(),
            self.client.patch(url).json(patch),
            Some(id),
        )?;
        decode_envelope(body, SINGLE_KEYS)
    }

    fn remove(&self, key: &CollectionKey, id: &ArtifactId) -> BackendResult<()> {
        let url = self.collection_url(key, Some(id))?;
        self.execute("remove", &key.to_string(), self.client.delete(url), Some(id))?;
        Ok(())
    }

    fn run_action(
        &self,
        domain: &str,
        id: &ArtifactId,
        action: &str,
        params: &Value,
    ) -> BackendResult<Value> {
        let url = self.action_url(domain, id, action)?;
        let body = match params {
            Value::Null => json!({}),
            other => other.clone(),
        };
        let response = self.execute(
            "run_action",
            domain,
            self.client.post(url).json(&body),
            Some(id),
        )?;
        match response {
            Value::Object(mut map) if map.contains_key(ACTION_RESULT_KEY) => {
                Ok(map.remove(ACTION_RESULT_KEY).unwrap_or(Value::Null))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{check_status, decode_envelope, error_message, HttpBackend, LIST_KEYS, SINGLE_KEYS};
    use crate::backend::{BackendError, CollectionKey};
    use crate::model::artifact::{Artifact, ArtifactId};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    fn artifact_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Fence permit",
            "type": "Permit",
            "data": {"valuation": 1000},
            "meta": {"status": "submitted"},
            "createdAt": "2026-01-02T03:04:05Z"
        })
    }

    #[test]
    fn builds_collection_and_item_urls() {
        let backend = backend("http://localhost:8080/api/");
        let key = CollectionKey::new("government", "Permit");
        assert_eq!(
            backend.collection_url(&key, None).unwrap().as_str(),
            "http://localhost:8080/api/lens-data/government/Permit"
        );
        assert_eq!(
            backend
                .collection_url(&key, Some(&ArtifactId::new("a b")))
                .unwrap()
                .as_str(),
            "http://localhost:8080/api/lens-data/government/Permit/a%20b"
        );
    }

    #[test]
    fn builds_action_url() {
        let backend = backend("https://lens.example.com");
        let url = backend
            .action_url("government", &ArtifactId::new("42"), "escalate")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://lens.example.com/lens-data/government/artifacts/42/actions/escalate"
        );
    }

    #[test]
    fn rejects_unsafe_collection_key() {
        let backend = backend("http://localhost/api");
        let key = CollectionKey::new("..", "Permit");
        assert!(matches!(
            backend.collection_url(&key, None),
            Err(BackendError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(HttpBackend::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpBackend::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn decodes_bare_and_wrapped_lists() {
        let bare: Vec<Artifact> =
            decode_envelope(json!([artifact_json("1"), artifact_json("2")]), LIST_KEYS).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped: Vec<Artifact> = decode_envelope(
            json!({"ok": true, "artifacts": [artifact_json("3")]}),
            LIST_KEYS,
        )
        .unwrap();
        assert_eq!(wrapped[0].id, ArtifactId::new("3"));

        let mut row = artifact_json("unused");
        row["id"] = json!(7);
        let numeric: Vec<Artifact> = decode_envelope(json!({"data": [row]}), LIST_KEYS).unwrap();
        assert_eq!(numeric[0].id.as_str(), "7");
    }

    #[test]
    fn decodes_bare_artifact_before_trying_wrapper_keys() {
        let artifact: Artifact = decode_envelope(artifact_json("9"), SINGLE_KEYS).unwrap();
        assert_eq!(artifact.id.as_str(), "9");
        assert_eq!(artifact.status(), Some("submitted"));

        let wrapped: Artifact =
            decode_envelope(json!({"artifact": artifact_json("10")}), SINGLE_KEYS).unwrap();
        assert_eq!(wrapped.id.as_str(), "10");
    }

    #[test]
    fn undecodable_payload_is_invalid_response() {
        let result: Result<Vec<Artifact>, _> = decode_envelope(json!({"rows": 3}), LIST_KEYS);
        assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
    }

    #[test]
    fn maps_status_codes() {
        let id = ArtifactId::new("gone");
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "", Some(&id)),
            Err(BackendError::NotFound(found)) if found == id
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "", None),
            Err(BackendError::Rejected { status: 404, .. })
        ));
        let err = check_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"ok":false,"error":"title required"}"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Rejected { status: 422, ref message } if message == "title required"
        ));
        assert!(check_status(StatusCode::NO_CONTENT, "", Some(&id)).is_ok());
    }

    #[test]
    fn error_message_truncates_plain_bodies() {
        let body = "x".repeat(500);
        assert_eq!(error_message(&body).len(), 200);
        assert_eq!(error_message("  "), "empty response body");
        assert_eq!(
            error_message(r#"{"error":{"message":"nested"}}"#),
            "nested"
        );
    }
}
