use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::ScoringError;
use crate::features::derive_features;
use crate::models::{LeadIntake, PriceRange, ScoreResult, ScoringFeatures, Season};

/// Default `customer_type` sent with every request: 1 = new customer.
const CUSTOMER_TYPE_NEW: u8 = 1;

/// Intent questionnaire grouping mirrored onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentData {
    pub engagement: f64,
    pub engagement_score: u8,
}

/// Sentiment questionnaire grouping mirrored onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentData {
    pub balance: f64,
    pub sentiment_score: u8,
}

/// Contextual grouping mirrored onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextData {
    pub price_range: PriceRange,
    pub season: Season,
}

/// Request body for the external scoring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Correlation identifier for traceability. Generated fresh per
    /// request; collisions are accepted as negligible, uniqueness is not
    /// guaranteed.
    pub user_id: u64,
    pub final_profit: f64,
    pub urgency: u8,
    pub intent: u8,
    pub interest_level: u8,
    pub customer_type: u8,
    pub intent_data: IntentData,
    pub sentiment_data: SentimentData,
    pub context_data: ContextData,
}

impl ScoringRequest {
    /// Assemble a request from derived features with a fresh correlation id.
    pub fn from_features(features: &ScoringFeatures) -> Self {
        Self {
            user_id: generate_correlation_id(),
            final_profit: features.final_profit,
            urgency: features.urgency,
            intent: features.intent,
            interest_level: features.interest_level,
            customer_type: CUSTOMER_TYPE_NEW,
            intent_data: IntentData {
                engagement: features.intent_engagement,
                engagement_score: features.engagement_score,
            },
            sentiment_data: SentimentData {
                balance: features.sentiment_balance,
                sentiment_score: features.sentiment_score,
            },
            context_data: ContextData {
                price_range: features.price_range,
                season: features.season,
            },
        }
    }
}

/// Correlation identifier in the documented 1000..10_000_000 range.
pub fn generate_correlation_id() -> u64 {
    rand::thread_rng().gen_range(1_000..=9_999_999)
}

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    score: i64,
}

/// Client for the external lead scoring service.
#[derive(Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScoringClient {
    /// Creates a new `ScoringClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the scoring service.
    /// * `timeout` - Per-request deadline.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ScoringError::Unreachable(format!("Failed to create scoring client: {}", e))
            })?;

        Ok(Self { client, base_url })
    }

    /// Submit a scoring request and return the classified score.
    ///
    /// Failures are surfaced to the caller as typed errors. There is no
    /// silent default score and no automatic retry: a scoring failure must
    /// never store a fabricated rating.
    pub async fn score(&self, request: &ScoringRequest) -> Result<ScoreResult, ScoringError> {
        let url = format!("{}/score_lead/", self.base_url);
        tracing::info!(
            "Scoring lead (correlation_id: {}) via {}",
            request.user_id,
            url
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(ScoringError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ScoringError::Unreachable(format!(
                "Scoring service returned {}: {}",
                status, error_text
            )));
        }

        let body: ScoringResponse = response.json().await.map_err(|e| {
            ScoringError::MalformedResponse(format!("Failed to parse scoring response: {}", e))
        })?;

        if !(1..=5).contains(&body.score) {
            return Err(ScoringError::MalformedResponse(format!(
                "Score {} outside the 1-5 scale",
                body.score
            )));
        }

        tracing::info!(
            "✓ Lead scored: {} (correlation_id: {})",
            body.score,
            request.user_id
        );

        Ok(ScoreResult {
            correlation_id: request.user_id,
            score: body.score as u8,
        })
    }

    /// Score a raw intake submission: validate, derive features, assemble
    /// the request and call the service.
    pub async fn score_lead(&self, intake: &LeadIntake) -> Result<ScoreResult, crate::errors::AppError> {
        intake.validate()?;
        let features = derive_features(intake);
        let request = ScoringRequest::from_features(&features);
        Ok(self.score(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ScoringClient::new(
            "https://example.com".to_string(),
            Duration::from_secs(30),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn correlation_ids_stay_in_documented_range() {
        for _ in 0..1_000 {
            let id = generate_correlation_id();
            assert!((1_000..=9_999_999).contains(&id));
        }
    }

    #[test]
    fn request_mirrors_feature_groupings() {
        let features = ScoringFeatures {
            final_profit: 80_000.0,
            urgency: 4,
            intent: 4,
            interest_level: 4,
            intent_engagement: 0.8,
            engagement_score: 4,
            sentiment_balance: 1.5,
            sentiment_score: 4,
            price_range: PriceRange::Medium,
            season: Season::Spring,
        };
        let request = ScoringRequest::from_features(&features);

        assert_eq!(request.customer_type, CUSTOMER_TYPE_NEW);
        assert_eq!(request.final_profit, 80_000.0);
        assert_eq!(request.intent_data.engagement_score, 4);
        assert_eq!(request.sentiment_data.balance, 1.5);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["context_data"]["price_range"], "medium");
        assert_eq!(json["context_data"]["season"], "spring");
        assert!(json["user_id"].as_u64().unwrap() >= 1_000);
    }
}
