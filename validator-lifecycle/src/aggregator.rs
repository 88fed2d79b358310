//! Quorum Signature Aggregation Client
//!
//! Client for the external signature-aggregation service: it accepts a
//! hex-encoded unsigned message (plus, for some message types, justification
//! bytes), collects signatures until the required quorum percentage is
//! reached, and returns the signed message. The service's internal quorum
//! logic is opaque to this client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::AggregatorConfig;

/// Errors from the aggregation service.
///
/// `QuorumNotReached` is retryable by design (the caller's retry-from-step),
/// never retried automatically here.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The service could not collect enough signatures.
    #[error("quorum not reached: {detail}")]
    QuorumNotReached { detail: String },

    /// The service answered with some other failure.
    #[error("aggregation service error: {detail}")]
    Service { detail: String },

    /// The request never completed.
    #[error("aggregation transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct AggregateRequest<'a> {
    /// Hex-encoded unsigned message.
    message: String,
    /// Hex-encoded justification bytes, when the message type needs them.
    #[serde(skip_serializing_if = "Option::is_none")]
    justification: Option<String>,
    /// Subnet whose validators sign.
    #[serde(rename = "signingSubnetId", skip_serializing_if = "Option::is_none")]
    signing_subnet_id: Option<&'a str>,
    /// Required stake percentage.
    #[serde(rename = "quorumPercentage")]
    quorum_percentage: u32,
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(rename = "signedMessage")]
    signed_message: Option<String>,
    error: Option<String>,
}

/// Client for the quorum signature-aggregation service.
pub struct AggregatorClient {
    client: Client,
    config: AggregatorConfig,
}

impl AggregatorClient {
    /// Creates a new aggregation client. Aggregation can take multi-second
    /// wall time, so the timeout is generous.
    pub fn new(config: AggregatorConfig) -> Result<Self, AggregatorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    /// Submits an unsigned message (with optional justification) and returns
    /// the signed message bytes.
    pub async fn aggregate_signatures(
        &self,
        unsigned_message: &[u8],
        justification: Option<&[u8]>,
    ) -> Result<Vec<u8>, AggregatorError> {
        let url = format!(
            "{}/v1/signatureAggregator/aggregateSignatures",
            self.config.url.trim_end_matches('/')
        );
        info!(
            "Requesting signature aggregation ({} byte message, justification: {})",
            unsigned_message.len(),
            justification.is_some()
        );

        let request = AggregateRequest {
            message: format!("0x{}", hex::encode(unsigned_message)),
            justification: justification.map(|j| format!("0x{}", hex::encode(j))),
            signing_subnet_id: self.config.signing_subnet_id.as_deref(),
            quorum_percentage: self.config.quorum_percentage,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body: AggregateResponse = response.json().await?;

        if let Some(error) = body.error {
            // The service reports a failed quorum as an error message rather
            // than a distinct status code.
            if error.to_lowercase().contains("quorum") {
                return Err(AggregatorError::QuorumNotReached { detail: error });
            }
            return Err(AggregatorError::Service { detail: error });
        }

        let signed_hex = body.signed_message.ok_or_else(|| AggregatorError::Service {
            detail: format!("empty response with status {}", status),
        })?;

        let clean = signed_hex.strip_prefix("0x").unwrap_or(&signed_hex);
        hex::decode(clean).map_err(|e| AggregatorError::Service {
            detail: format!("invalid signed message hex: {}", e),
        })
    }
}
