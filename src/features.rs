/// Feature derivation for the scoring pipeline.
///
/// Pure mapping from a raw intake submission to normalized numeric
/// features. Malformed numeric strings resolve to 0, never to an error.
/// The two questionnaire-absent fallbacks are the only non-deterministic
/// branches.
use chrono::{Datelike, Utc};
use rand::Rng;

use crate::models::{
    DecisionStyle, FinancingStatus, LeadIntake, MotivationFactor, PriceRange, ScoringFeatures,
    Season, Timeframe, ViewedBucket,
};

/// Share of the budget left after the fixed 20% property cost.
const PROFIT_FACTOR: f64 = 0.8;

/// Parse a currency string as typed by a lead ("1,200,000", "₹ 85,000").
///
/// Strips grouping separators and any non-numeric decoration. Unparsable
/// or negative input resolves to 0.
pub fn parse_currency(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Derive all scoring features from an intake submission.
pub fn derive_features(intake: &LeadIntake) -> ScoringFeatures {
    let budget = parse_currency(&intake.budget);
    let final_profit = budget * PROFIT_FACTOR;

    // Binary property-specific signal mapped to fixed points on the 1-5
    // scale: a concrete property in mind reads as strong intent.
    let intent = if intake.specific_property_interest { 4 } else { 2 };
    let interest_level = intent;

    let engagement = intent_engagement(intake.intent_questions.as_ref().map(|q| {
        (
            q.timeframe,
            q.financing,
            q.viewed_properties,
        )
    }));
    let engagement_score = engagement_to_score(engagement);

    let balance = sentiment_balance(
        intake
            .sentiment_questions
            .as_ref()
            .map(|q| (q.motivation_factor, q.decision_style)),
        budget,
    );
    let sentiment_score = balance_to_score(balance);

    ScoringFeatures {
        final_profit,
        urgency: intake.urgency_level.clamp(1, 5),
        intent,
        interest_level,
        intent_engagement: engagement,
        engagement_score,
        sentiment_balance: balance,
        sentiment_score,
        price_range: price_range(budget),
        season: Season::from_month0(Utc::now().month0()),
    }
}

/// Engagement in [0, 1]: baseline 0.5 plus additive questionnaire bonuses.
///
/// When the questionnaire is absent a uniformly random engagement in
/// [0.3, 1.0] is substituted instead of failing. Callers relying on
/// determinism must supply the questionnaire.
pub fn intent_engagement(
    questions: Option<(
        Option<Timeframe>,
        Option<FinancingStatus>,
        Option<ViewedBucket>,
    )>,
) -> f64 {
    let Some((timeframe, financing, viewed)) = questions else {
        return rand::thread_rng().gen_range(0.3..=1.0);
    };

    let mut engagement: f64 = 0.5;

    engagement += match timeframe {
        Some(Timeframe::ZeroToThree) => 0.3,
        Some(Timeframe::ThreeToSix) => 0.2,
        Some(Timeframe::SixToTwelve) => 0.1,
        _ => 0.0,
    };

    engagement += match financing {
        Some(FinancingStatus::PreApproved) | Some(FinancingStatus::Cash) => 0.3,
        Some(FinancingStatus::Started) => 0.15,
        _ => 0.0,
    };

    engagement += match viewed {
        Some(ViewedBucket::ElevenToTwenty) | Some(ViewedBucket::TwentyPlus) => 0.2,
        Some(ViewedBucket::SixToTen) => 0.1,
        _ => 0.0,
    };

    engagement.clamp(0.0, 1.0)
}

/// Map raw engagement onto the 1-5 integer scale.
pub fn engagement_to_score(engagement: f64) -> u8 {
    ((engagement * 5.0).round() as i64).clamp(1, 5) as u8
}

/// Practical/emotional balance in [1, 5]; 3 is neutral.
///
/// Without the questionnaire the balance is approximated from budget
/// magnitude plus random jitter, so that branch is non-deterministic.
pub fn sentiment_balance(
    questions: Option<(Option<MotivationFactor>, Option<DecisionStyle>)>,
    budget: f64,
) -> f64 {
    let balance = match questions {
        Some((motivation, style)) => {
            let mut balance = 3.0;
            balance += match motivation {
                Some(MotivationFactor::Practical) => -1.5,
                Some(MotivationFactor::Emotional) => 1.5,
                _ => 0.0,
            };
            balance += match style {
                Some(DecisionStyle::Logical) => -0.5,
                Some(DecisionStyle::Intuitive) => 0.5,
                _ => 0.0,
            };
            balance
        }
        None => {
            let jitter = rand::thread_rng().gen_range(-1.0..=1.0);
            5.0 - (budget / 500_000.0) * 4.0 + jitter
        }
    };

    balance.clamp(1.0, 5.0)
}

/// Both extremes score higher than the neutral middle.
pub fn balance_to_score(balance: f64) -> u8 {
    let score = ((balance - 3.0).abs() * 2.0).round() as i64 + 1;
    score.clamp(1, 5) as u8
}

/// Budget bracket boundaries.
pub fn price_range(budget: f64) -> PriceRange {
    if budget <= 30_000.0 {
        PriceRange::Low
    } else if budget <= 100_000.0 {
        PriceRange::Medium
    } else {
        PriceRange::High
    }
}
