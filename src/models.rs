use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

// ============ Lead intake ============

/// Buyer timeframe answer from the intent questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "0-3 months")]
    ZeroToThree,
    #[serde(rename = "3-6 months")]
    ThreeToSix,
    #[serde(rename = "6-12 months")]
    SixToTwelve,
    #[serde(rename = "12+ months")]
    OverTwelve,
}

/// Financing progress answer from the intent questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinancingStatus {
    #[serde(rename = "pre-approved")]
    PreApproved,
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "not-started")]
    NotStarted,
}

/// Bucketed count of properties the lead has already viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewedBucket {
    #[serde(rename = "0")]
    None,
    #[serde(rename = "1-5")]
    OneToFive,
    #[serde(rename = "6-10")]
    SixToTen,
    #[serde(rename = "11-20")]
    ElevenToTwenty,
    #[serde(rename = "20+")]
    TwentyPlus,
}

/// What drives the purchase decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotivationFactor {
    Practical,
    Emotional,
    Mixed,
}

/// How the lead makes decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStyle {
    Logical,
    Intuitive,
    Mixed,
}

/// Optional intent questionnaire attached to an intake submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentQuestions {
    pub timeframe: Option<Timeframe>,
    pub financing: Option<FinancingStatus>,
    pub viewed_properties: Option<ViewedBucket>,
}

/// Optional sentiment questionnaire attached to an intake submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentQuestions {
    pub motivation_factor: Option<MotivationFactor>,
    pub decision_style: Option<DecisionStyle>,
}

/// Raw lead-intake submission. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadIntake {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub property_type: String,
    /// Currency string as typed by the lead, e.g. "1,200,000".
    pub budget: String,
    /// 1 (least likely) to 5 (highly likely).
    pub urgency_level: u8,
    pub location: String,
    /// Whether the lead has a specific property in mind.
    pub specific_property_interest: bool,
    pub intent_questions: Option<IntentQuestions>,
    pub sentiment_questions: Option<SentimentQuestions>,
}

impl LeadIntake {
    /// Pre-flight validation of required fields.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::Validation("email is required".to_string()));
        }
        if !(1..=5).contains(&self.urgency_level) {
            return Err(AppError::Validation(
                "urgency_level must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }
}

// ============ Derived features ============

/// Budget bracket derived from the parsed budget value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Low,
    Medium,
    High,
}

/// Calendar season bucket, derived from the 0-indexed month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Fixed quarterly buckets over 0-indexed months: spring 2-4,
    /// summer 5-7, fall 8-10, winter otherwise.
    pub fn from_month0(month0: u32) -> Self {
        match month0 {
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            8..=10 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

/// Normalized numeric features derived from an intake submission.
///
/// Every bounded field is clamped to its declared range before this
/// struct is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringFeatures {
    /// Profit potential after the fixed 20% property cost.
    pub final_profit: f64,
    /// 1-5.
    pub urgency: u8,
    /// 1-5.
    pub intent: u8,
    /// 1-5.
    pub interest_level: u8,
    /// Raw engagement in [0, 1].
    pub intent_engagement: f64,
    /// Engagement mapped onto 1-5.
    pub engagement_score: u8,
    /// Practical/emotional balance in [1, 5]; 3 is neutral.
    pub sentiment_balance: f64,
    /// Distance-from-neutral mapped onto 1-5.
    pub sentiment_score: u8,
    pub price_range: PriceRange,
    pub season: Season,
}

/// Outcome of one scoring call. Produced once per request, never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correlation_id: u64,
    /// 1-5.
    pub score: u8,
}

// ============ Campaign selection & dispatch ============

/// Priority bucket derived from a stored lead score. Governs which email
/// template family is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    /// Score >= 4, personalized template family.
    High,
    /// Score == 3, promotional template family.
    Medium,
    /// Score <= 2, basic template family.
    Low,
}

impl PriorityTier {
    pub fn from_score(score: u8) -> Self {
        if score >= 4 {
            PriorityTier::High
        } else if score == 3 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    /// Template family name, used in prompts and logs.
    pub fn template_family(self) -> &'static str {
        match self {
            PriorityTier::High => "personalized",
            PriorityTier::Medium => "promotional",
            PriorityTier::Low => "basic",
        }
    }
}

/// Stored lead as returned by the lead store. The `context` field carries
/// the opaque intake JSON captured at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    /// 1-5, assigned by the scoring pipeline.
    pub rating: u8,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A stored lead joined with its score and contact info, ready for
/// content generation. Re-derived per dispatch request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLead {
    pub lead_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub budget: String,
    pub urgency: String,
    pub score: u8,
    pub tier: PriorityTier,
    pub property_type: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

/// Generated email, sanitized and ready for transport. Ephemeral:
/// produced per send, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    /// Sanitized HTML body.
    pub body: String,
}

/// How many leads to select per priority tier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Dispatch execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Generate and send (or simulate) email for every selected lead.
    Live,
    /// Dry run: return the selected leads without generating or sending.
    Test,
}

/// Per-recipient outcome of one dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub lead_id: Uuid,
    pub name: String,
    pub email: String,
    pub tier: PriorityTier,
    pub success: bool,
    /// Provider message id for real deliveries.
    pub message_id: Option<String>,
    pub error: Option<String>,
    /// Recorded without contacting a real mail transport.
    pub simulated: bool,
}

/// Selected leads partitioned by tier, returned by test-mode dispatches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierSelection {
    pub high: Vec<CampaignLead>,
    pub medium: Vec<CampaignLead>,
    pub low: Vec<CampaignLead>,
}

/// Aggregated outcome of one campaign dispatch. Pure aggregation with no
/// independent identity or storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub test_mode: bool,
    pub details: Vec<DispatchResult>,
    /// Populated only by test-mode dispatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<TierSelection>,
}
