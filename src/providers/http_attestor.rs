//! HTTP attestor service client.

use std::time::Duration;

use alloy_primitives::Bytes;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::error::{RelayError, Result};
use crate::protocol::{Attestation, SignatureRequest, SignatureResponse};
use crate::traits::AttestationProvider;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Attestation provider backed by an HTTP signing service.
///
/// The service receives `{"data": "0x.."}` with the canonical envelope
/// encoding and answers `{"signature": "0x.."}`. Anything else, including a
/// non-200 status, is reported as
/// [`RelayError::AttestationUnavailable`].
///
/// # Examples
///
/// ```rust,no_run
/// use hashi_vrf_rs::providers::HttpAttestor;
/// use hashi_vrf_rs::AttestationProvider;
/// use alloy_primitives::Bytes;
///
/// # async fn example() -> Result<(), hashi_vrf_rs::RelayError> {
/// let attestor = HttpAttestor::new("https://attestor.example.org/sign".parse().unwrap());
/// let attestation = attestor.request_signature(&Bytes::from_static(&[1, 2])).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpAttestor {
    endpoint: Url,
    client: Client,
    timeout: Duration,
}

impl HttpAttestor {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn unavailable(reason: impl Into<String>) -> RelayError {
    RelayError::AttestationUnavailable {
        reason: reason.into(),
    }
}

#[async_trait]
impl AttestationProvider for HttpAttestor {
    #[instrument(skip(self, encoded), fields(endpoint = %self.endpoint, encoded_len = encoded.len()))]
    async fn request_signature(&self, encoded: &Bytes) -> Result<Attestation> {
        let body = SignatureRequest {
            data: encoded.clone(),
        };

        trace!("Requesting signature from attestor");
        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(format!("attestor request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                status_code = status.as_u16(),
                event = "attestor_http_error"
            );
            return Err(unavailable(format!("attestor returned HTTP {}", status.as_u16())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| unavailable(format!("attestor response unreadable: {e}")))?;
        let parsed: SignatureResponse = serde_json::from_str(&text)
            .map_err(|e| unavailable(format!("malformed attestor response: {e}")))?;

        let signature = parsed
            .signature
            .ok_or_else(|| unavailable("attestor response carried no signature"))?;
        debug!(
            signature_len = signature.len(),
            event = "attestation_received"
        );

        Attestation::new(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use rstest::rstest;
    use serde_json::json;

    #[tokio::test]
    async fn test_unreachable_attestor_is_unavailable() {
        // Port 9 (discard) is closed on loopback in test environments.
        let attestor = HttpAttestor::new("http://127.0.0.1:9/sign".parse().unwrap())
            .with_timeout(Duration::from_secs(2));

        let err = attestor
            .request_signature(&Bytes::from_static(&[1]))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::AttestationUnavailable { .. }));
    }

    async fn attestor_answering(status: u16, body: &str) -> Result<Attestation> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/sign")
                    .header("content-type", "application/json")
                    .json_body(json!({ "data": "0x0102" }));
                then.status(status).body(body);
            })
            .await;

        let attestor = HttpAttestor::new(server.url("/sign").parse().unwrap());
        let result = attestor
            .request_signature(&Bytes::from_static(&[1, 2]))
            .await;
        mock.assert_hits_async(1).await;
        result
    }

    #[tokio::test]
    async fn test_signature_is_returned() {
        let result = attestor_answering(200, r#"{"signature":"0x5151"}"#).await;
        assert_eq!(result.unwrap().as_bytes().to_vec(), vec![0x51, 0x51]);
    }

    #[rstest]
    #[case::service_unavailable(503, r#"{"signature":"0x5151"}"#, "Attestation unavailable: attestor returned HTTP 503")]
    #[case::accepted_is_not_ok(202, r#"{"signature":"0x5151"}"#, "Attestation unavailable: attestor returned HTTP 202")]
    #[case::missing_signature(200, "{}", "Attestation unavailable: attestor response carried no signature")]
    #[tokio::test]
    async fn test_rejected_responses_are_unavailable(
        #[case] status: u16,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let result = attestor_answering(status, body).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::AttestationUnavailable { .. }));
        assert_eq!(err.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_hex(r#"{"signature":"not_valid_hex"}"#)]
    #[case::not_json("<html>bad gateway</html>")]
    #[tokio::test]
    async fn test_malformed_body_is_unavailable(#[case] body: &str) {
        let result = attestor_answering(200, body).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::AttestationUnavailable { .. }));
        assert!(
            err.to_string().contains("malformed attestor response"),
            "{err}"
        );
    }

    #[test]
    fn test_endpoint_is_kept() {
        let url: Url = "https://attestor.example.org/sign".parse().unwrap();
        let attestor = HttpAttestor::new(url.clone());
        assert_eq!(attestor.endpoint(), &url);
    }
}
