//! Sumo Logic REST API backend.
//!
//! This module provides the [`HttpBackend`] implementation of [`Backend`]
//! on top of a blocking `ureq` agent.
//!
//! # Concurrency Control
//!
//! The API requires an `If-Match` header carrying the resource's current
//! `ETag` on every PUT. Updates therefore fetch the resource first and send
//! the tag back; a concurrent change in between surfaces as HTTP 412.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    CollectorInfo, CollectorMetadata, Credentials, LOCAL_FILE_SOURCE, RemoteSource,
    SourceDefinition, SyncMode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sumo Logic collector API backend.
///
/// # Example
///
/// ```no_run
/// use sumokit::backend::Backend;
/// use sumokit::backend::http::HttpBackend;
/// use sumokit::{Credentials, DEFAULT_ENDPOINT};
/// use std::time::Duration;
///
/// let backend = HttpBackend::new(
///     DEFAULT_ENDPOINT,
///     &Credentials::new("access-id", "access-key"),
///     Duration::from_secs(30),
/// );
/// let collectors = backend.list_collectors(100).unwrap();
/// println!("Found {} collectors", collectors.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without trailing slash.
    endpoint: String,
    /// Precomputed `Authorization` header value.
    authorization: String,
}

impl HttpBackend {
    /// Create a backend whose calls time out after `timeout`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, credentials: &Credentials, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let endpoint: String = endpoint.into();
        Self {
            agent: config.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            authorization: basic_auth(credentials),
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn collectors_url(&self, limit: u32) -> String {
        format!("{}/collectors?limit={}", self.endpoint, limit)
    }

    fn collector_url(&self, id: u64) -> String {
        format!("{}/collectors/{}", self.endpoint, id)
    }

    fn sources_url(&self, collector_id: u64) -> String {
        format!("{}/collectors/{}/sources", self.endpoint, collector_id)
    }

    fn source_url(&self, collector_id: u64, source_id: u64) -> String {
        format!(
            "{}/collectors/{}/sources/{}",
            self.endpoint, collector_id, source_id
        )
    }

    /// GET a JSON document, returning it with its `ETag`, if any.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, Option<String>)> {
        log::trace!("GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .call()?;

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: T = response.body_mut().read_json()?;
        Ok((body, etag))
    }

    /// PUT a JSON body with an optional `If-Match` tag and timeout override.
    fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        etag: Option<&str>,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        log::trace!("PUT {}", url);
        let mut request = self.agent.put(url);
        if let Some(timeout) = timeout {
            request = request.config().timeout_global(Some(timeout)).build();
        }
        request = request
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json");
        if let Some(etag) = etag {
            request = request.header("If-Match", etag);
        }

        let body: T = request.send_json(body)?.body_mut().read_json()?;
        Ok(body)
    }
}

impl Backend for HttpBackend {
    fn list_collectors(&self, limit: u32) -> Result<Vec<CollectorInfo>> {
        let (response, _): (CollectorsEnvelope, _) = self.get_json(&self.collectors_url(limit))?;
        Ok(response
            .collectors
            .into_iter()
            .map(|c| CollectorInfo {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    fn collector(&self, id: u64) -> Result<CollectorMetadata> {
        let (response, _): (CollectorEnvelope, _) = self.get_json(&self.collector_url(id))?;
        Ok(response.collector.into())
    }

    fn set_sync_mode(&self, id: u64, mode: SyncMode) -> Result<()> {
        let url = self.collector_url(id);

        // The PUT must carry the whole collector; only the mode changes.
        let (mut document, etag): (serde_json::Value, _) = self.get_json(&url)?;
        let collector = document
            .get_mut("collector")
            .and_then(serde_json::Value::as_object_mut)
            .ok_or_else(|| Error::InvalidResponse("missing `collector` object".to_string()))?;
        collector.insert("sourceSyncMode".to_string(), serde_json::to_value(mode)?);

        let _: serde_json::Value = self.put_json(&url, etag.as_deref(), &document, None)?;
        Ok(())
    }

    fn list_sources(&self, collector_id: u64) -> Result<Vec<RemoteSource>> {
        let (response, _): (SourcesEnvelope, _) = self.get_json(&self.sources_url(collector_id))?;
        response.sources.into_iter().map(TryInto::try_into).collect()
    }

    fn add_source(
        &self,
        collector_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let url = self.sources_url(collector_id);
        log::trace!("POST {}", url);

        let body = SourceEnvelope {
            source: WireSource::from(definition),
        };
        let response: SourceEnvelope = self
            .agent
            .post(&url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .send_json(&body)?
            .body_mut()
            .read_json()?;

        response.source.try_into()
    }

    fn update_source(
        &self,
        collector_id: u64,
        source_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let url = self.source_url(collector_id, source_id);
        let (_, etag): (serde_json::Value, _) = self.get_json(&url)?;

        let mut source = WireSource::from(definition);
        source.id = Some(source_id);
        let response: SourceEnvelope =
            self.put_json(&url, etag.as_deref(), &SourceEnvelope { source }, Some(timeout))?;

        response.source.try_into()
    }

    fn delete_source(&self, collector_id: u64, source_id: u64) -> Result<()> {
        let url = self.source_url(collector_id, source_id);
        log::trace!("DELETE {}", url);

        self.agent
            .delete(&url)
            .header("Authorization", self.authorization.as_str())
            .call()?;
        Ok(())
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.access_id, credentials.access_key);
    format!("Basic {}", STANDARD.encode(pair))
}

/// Empty strings from the API mean "unset".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Sumo Logic API request/response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CollectorsEnvelope {
    collectors: Vec<WireCollector>,
}

#[derive(Debug, Deserialize)]
struct CollectorEnvelope {
    collector: WireCollector,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCollector {
    id: u64,
    name: String,
    #[serde(default)]
    collector_type: Option<String>,
    #[serde(default)]
    alive: Option<bool>,
    #[serde(default)]
    source_sync_mode: Option<SyncMode>,
}

impl From<WireCollector> for CollectorMetadata {
    fn from(c: WireCollector) -> Self {
        Self {
            id: c.id,
            name: c.name,
            collector_type: c.collector_type,
            alive: c.alive,
            source_sync_mode: c.source_sync_mode,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcesEnvelope {
    sources: Vec<WireSource>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SourceEnvelope {
    source: WireSource,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    force_time_zone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    automatic_date_parsing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multiline_processing_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    use_autoline_matching: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manual_prefix_regexp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_date_format: Option<String>,
}

impl From<&SourceDefinition> for WireSource {
    fn from(d: &SourceDefinition) -> Self {
        Self {
            id: None,
            name: d.name.clone(),
            source_type: Some(LOCAL_FILE_SOURCE.to_string()),
            path_expression: Some(d.path.clone()),
            category: d.category.clone(),
            time_zone: d.default_timezone.clone(),
            force_time_zone: Some(d.force_timezone),
            automatic_date_parsing: Some(d.automatic_date_parsing),
            multiline_processing_enabled: Some(d.multiline_processing_enabled),
            use_autoline_matching: Some(d.use_autoline_matching),
            manual_prefix_regexp: d.manual_prefix_regexp.clone(),
            default_date_format: d.default_date_format.clone(),
        }
    }
}

impl TryFrom<WireSource> for RemoteSource {
    type Error = Error;

    fn try_from(s: WireSource) -> Result<Self> {
        let id = s
            .id
            .ok_or_else(|| Error::InvalidResponse(format!("source '{}' has no id", s.name)))?;
        let defaults = SourceDefinition::new(s.name.clone(), String::new());

        Ok(Self {
            id,
            source_type: s.source_type,
            definition: SourceDefinition {
                name: s.name,
                path: s.path_expression.unwrap_or_default(),
                category: non_empty(s.category),
                default_timezone: non_empty(s.time_zone),
                force_timezone: s.force_time_zone.unwrap_or(defaults.force_timezone),
                automatic_date_parsing: s
                    .automatic_date_parsing
                    .unwrap_or(defaults.automatic_date_parsing),
                multiline_processing_enabled: s
                    .multiline_processing_enabled
                    .unwrap_or(defaults.multiline_processing_enabled),
                use_autoline_matching: s
                    .use_autoline_matching
                    .unwrap_or(defaults.use_autoline_matching),
                manual_prefix_regexp: non_empty(s.manual_prefix_regexp),
                default_date_format: non_empty(s.default_date_format),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};
    use std::time::Instant;

    fn backend() -> HttpBackend {
        HttpBackend::new(
            "https://api.us2.sumologic.com/api/v1/",
            &Credentials::new("id", "key"),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_urls() {
        let b = backend();
        assert_eq!(b.endpoint(), "https://api.us2.sumologic.com/api/v1");
        assert_eq!(
            b.collectors_url(1000),
            "https://api.us2.sumologic.com/api/v1/collectors?limit=1000"
        );
        assert_eq!(
            b.source_url(7, 42),
            "https://api.us2.sumologic.com/api/v1/collectors/7/sources/42"
        );
        assert_eq!(
            b.sources_url(7),
            "https://api.us2.sumologic.com/api/v1/collectors/7/sources"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth(&Credentials::new("user", "pass")),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_add_payload() {
        let def = SourceDefinition::new("app-logs", "/var/log/app/*.log")
            .with_category("app")
            .with_timezone("UTC")
            .with_force_timezone(false);

        let body = serde_json::to_value(SourceEnvelope {
            source: WireSource::from(&def),
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "source": {
                    "name": "app-logs",
                    "sourceType": "LocalFile",
                    "pathExpression": "/var/log/app/*.log",
                    "category": "app",
                    "timeZone": "UTC",
                    "forceTimeZone": false,
                    "automaticDateParsing": true,
                    "multilineProcessingEnabled": true,
                    "useAutolineMatching": true
                }
            })
        );
    }

    #[test]
    fn test_source_response_conversion() {
        let wire: SourceEnvelope = serde_json::from_value(json!({
            "source": {
                "id": 101,
                "name": "app-logs",
                "sourceType": "LocalFile",
                "pathExpression": "/var/log/app/*.log",
                "category": "",
                "timeZone": "UTC",
                "forceTimeZone": true,
                "multilineProcessingEnabled": false,
                "manualPrefixRegexp": "",
                "alive": true
            }
        }))
        .unwrap();

        let source: RemoteSource = wire.source.try_into().unwrap();
        assert_eq!(source.id, 101);
        assert_eq!(source.definition.category, None);
        assert_eq!(source.definition.default_timezone.as_deref(), Some("UTC"));
        assert!(source.definition.force_timezone);
        assert!(source.definition.automatic_date_parsing);
        assert!(!source.definition.multiline_processing_enabled);
        assert_eq!(source.definition.manual_prefix_regexp, None);
    }

    #[test]
    fn test_source_without_id_is_rejected() {
        let wire = WireSource {
            name: "x".into(),
            ..Default::default()
        };
        let result: Result<RemoteSource> = wire.try_into();
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_collector_conversion() {
        let wire: CollectorEnvelope = serde_json::from_value(json!({
            "collector": {
                "id": 7,
                "name": "web-01",
                "collectorType": "Installable",
                "alive": true,
                "sourceSyncMode": "Json",
                "ephemeral": false
            }
        }))
        .unwrap();

        let meta: CollectorMetadata = wire.collector.into();
        assert_eq!(meta.id, 7);
        assert!(meta.is_file_synced());
    }

    #[test]
    fn test_hosted_collector_has_no_sync_mode() {
        let wire: CollectorsEnvelope = serde_json::from_value(json!({
            "collectors": [{"id": 1, "name": "hosted", "collectorType": "Hosted"}]
        }))
        .unwrap();
        assert_eq!(wire.collectors[0].source_sync_mode, None);
    }

    // =========================================================================
    // Local listener
    // =========================================================================

    struct Reply {
        status: u16,
        etag: Option<&'static str>,
        body: serde_json::Value,
        delay: Duration,
    }

    impl Reply {
        fn ok(body: serde_json::Value) -> Self {
            Self {
                status: 200,
                etag: None,
                body,
                delay: Duration::ZERO,
            }
        }

        fn status(status: u16) -> Self {
            Self {
                status,
                ..Self::ok(json!({"status": status, "code": "error"}))
            }
        }

        fn with_etag(mut self, etag: &'static str) -> Self {
            self.etag = Some(etag);
            self
        }

        fn after(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[derive(Debug)]
    struct Seen {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        }

        fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    fn read_request(stream: &TcpStream) -> Seen {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }

        let find = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v): &(String, String)| v.clone())
        };
        let mut body = Vec::new();
        if let Some(len) = find("content-length") {
            body.resize(len.parse().unwrap(), 0);
            reader.read_exact(&mut body).unwrap();
        } else if find("transfer-encoding").is_some_and(|v| v.contains("chunked")) {
            loop {
                let mut size = String::new();
                reader.read_line(&mut size).unwrap();
                let size = usize::from_str_radix(size.trim(), 16).unwrap();
                let mut chunk = vec![0; size + 2];
                reader.read_exact(&mut chunk).unwrap();
                if size == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..size]);
            }
        }

        Seen {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(body).unwrap(),
        }
    }

    /// Answer one connection per reply, in order, returning what was received.
    fn serve(replies: Vec<Reply>) -> (String, JoinHandle<Vec<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&stream));
                thread::sleep(reply.delay);

                let body = reply.body.to_string();
                let reason = match reply.status {
                    200 => "OK",
                    401 => "Unauthorized",
                    412 => "Precondition Failed",
                    _ => "Error",
                };
                let mut head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reason,
                    body.len()
                );
                if let Some(etag) = reply.etag {
                    head.push_str(&format!("ETag: {etag}\r\n"));
                }
                head.push_str("\r\n");
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body.as_bytes());
                let _ = stream.flush();
            }
            seen
        });

        (format!("http://{addr}/api/v1"), handle)
    }

    fn local_backend(endpoint: &str, timeout: Duration) -> HttpBackend {
        HttpBackend::new(endpoint, &Credentials::new("user", "pass"), timeout)
    }

    fn wire_source(id: u64, timezone: &str) -> serde_json::Value {
        json!({
            "source": {
                "id": id,
                "name": "app-logs",
                "sourceType": "LocalFile",
                "pathExpression": "/var/log/app/*.log",
                "timeZone": timezone
            }
        })
    }

    #[test]
    fn test_update_source_sends_etag_back() {
        let (endpoint, server) = serve(vec![
            Reply::ok(wire_source(42, "UTC")).with_etag("\"v7\""),
            Reply::ok(wire_source(42, "America/New_York")),
        ]);
        let desired =
            SourceDefinition::new("app-logs", "/var/log/app/*.log").with_timezone("America/New_York");

        let updated = local_backend(&endpoint, Duration::from_secs(5))
            .update_source(7, 42, &desired, Duration::from_secs(5))
            .unwrap();
        assert_eq!(updated.id, 42);
        assert_eq!(
            updated.definition.default_timezone.as_deref(),
            Some("America/New_York")
        );

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].request_line.starts_with("GET /api/v1/collectors/7/sources/42 "));
        assert!(seen[1].request_line.starts_with("PUT /api/v1/collectors/7/sources/42 "));
        assert_eq!(seen[1].header("if-match"), Some("\"v7\""));
        assert_eq!(seen[1].header("authorization"), Some("Basic dXNlcjpwYXNz"));

        let body = seen[1].json();
        assert_eq!(body["source"]["id"], 42);
        assert_eq!(body["source"]["timeZone"], "America/New_York");
        assert_eq!(body["source"]["sourceType"], "LocalFile");
    }

    #[test]
    fn test_set_sync_mode_puts_whole_collector() {
        let collector = json!({
            "collector": {
                "id": 7,
                "name": "web-01",
                "collectorType": "Installable",
                "sourceSyncMode": "Json",
                "hostName": "web-01.internal"
            }
        });
        let (endpoint, server) = serve(vec![
            Reply::ok(collector.clone()).with_etag("\"c3\""),
            Reply::ok(collector),
        ]);

        local_backend(&endpoint, Duration::from_secs(5))
            .set_sync_mode(7, SyncMode::Ui)
            .unwrap();

        let seen = server.join().unwrap();
        assert!(seen[1].request_line.starts_with("PUT /api/v1/collectors/7 "));
        assert_eq!(seen[1].header("if-match"), Some("\"c3\""));
        let body = seen[1].json();
        assert_eq!(body["collector"]["sourceSyncMode"], "UI");
        assert_eq!(body["collector"]["hostName"], "web-01.internal");
    }

    #[test]
    fn test_stale_etag_maps_to_http_error() {
        let (endpoint, server) = serve(vec![
            Reply::ok(wire_source(42, "UTC")).with_etag("\"v7\""),
            Reply::status(412),
        ]);

        let err = local_backend(&endpoint, Duration::from_secs(5))
            .update_source(
                7,
                42,
                &SourceDefinition::new("app-logs", "/var/log/app/*.log"),
                Duration::from_secs(5),
            )
            .unwrap_err();

        assert_eq!(err.status(), Some(412));
        assert_eq!(err.category(), crate::ErrorCategory::Api);
        server.join().unwrap();
    }

    #[test]
    fn test_rejected_credentials_map_to_http_error() {
        let (endpoint, server) = serve(vec![Reply::status(401)]);

        let err = local_backend(&endpoint, Duration::from_secs(5))
            .list_collectors(10)
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        let seen = server.join().unwrap();
        assert!(seen[0].request_line.starts_with("GET /api/v1/collectors?limit=10 "));
    }

    #[test]
    fn test_add_source_uses_per_call_timeout() {
        let (endpoint, _server) = serve(vec![
            Reply::ok(wire_source(1, "UTC")).after(Duration::from_secs(3)),
        ]);

        let started = Instant::now();
        let err = local_backend(&endpoint, Duration::from_secs(30))
            .add_source(
                7,
                &SourceDefinition::new("app-logs", "/var/log/app/*.log"),
                Duration::from_millis(200),
            )
            .unwrap_err();

        assert_eq!(err.status(), None);
        assert_eq!(err.category(), crate::ErrorCategory::Network);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
