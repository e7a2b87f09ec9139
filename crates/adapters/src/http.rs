use async_trait::async_trait;
use chill_core::config::ClientConfig;
use chill_core::transport::{
    Method, RawBody, RawResponse, Request, ResponseKind, TablePayload, Transport, TransportError,
};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum HttpTransportError {
    #[error("base url `{0}` must start with http:// or https://")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Talks to the store over plain HTTP: one GET listing route and JSON POSTs
/// for everything else.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn from_config(config: &ClientConfig) -> Result<Self, HttpTransportError> {
        let base_url = config.base_url().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpTransportError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(HttpTransportError::Client)?;

        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &Request) -> String {
        format!("{}{}", self.base_url, request.endpoint.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let url = self.url_for(request);
        let builder = match request.endpoint.method() {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        debug!(%url, "sending request");
        let response = builder
            .send()
            .await
            .map_err(|error| to_transport_error(&url, &error))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|error| to_transport_error(&url, &error))?;
        trace!(%url, status, bytes = text.len(), "response received");

        let ok = (200..300).contains(&status);
        let body = match request.endpoint.response_kind() {
            ResponseKind::Structured if ok => decode_structured(text),
            _ => RawBody::Text(text),
        };

        Ok(RawResponse { status, body })
    }
}

/// Falls back to the raw text when the body is not a row payload, so the
/// classifier can still apply its text rules.
fn decode_structured(text: String) -> RawBody {
    match serde_json::from_str::<TablePayload>(&text) {
        Ok(payload) => RawBody::Structured(payload),
        Err(error) => {
            debug!(%error, "row payload was not json, keeping text");
            RawBody::Text(text)
        }
    }
}

fn to_transport_error(url: &str, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::TimedOut {
            url: url.to_string(),
        }
    } else if error.is_body() || error.is_decode() {
        TransportError::Body {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Unreachable {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chill_core::config::ClientConfig;
    use chill_core::transport::RawBody;

    use super::{decode_structured, HttpTransport, HttpTransportError};

    #[test]
    fn base_url_must_be_http() {
        let config = ClientConfig {
            base_url: "localhost:8080".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpTransport::from_config(&config),
            Err(HttpTransportError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            ..ClientConfig::default()
        };
        let transport = HttpTransport::from_config(&config).expect("valid config");
        assert_eq!(transport.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn non_json_row_payload_stays_text() {
        assert_eq!(
            decode_structured("Error: missing table".to_string()),
            RawBody::Text("Error: missing table".to_string())
        );
        assert!(matches!(
            decode_structured(r#"{"columns":["id"],"rows":[["1"]]}"#.to_string()),
            RawBody::Structured(_)
        ));
    }
}
