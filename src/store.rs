use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::LeadRecord;

/// Ordering applied when selecting leads from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadOrder {
    /// Highest rating first; creation time breaks ties.
    RatingDesc,
    /// Oldest first.
    CreatedAt,
}

/// Narrow read contract over the external lead persistence.
///
/// Implementations must return a stable selection: the same stored set
/// always yields the same records in the same order (secondary sort by
/// creation time).
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Fetch up to `limit` leads whose rating lies in `min..=max`.
    async fn find_leads_by_score_range(
        &self,
        min: u8,
        max: u8,
        limit: usize,
        order: LeadOrder,
    ) -> Result<Vec<LeadRecord>, AppError>;

    /// Fetch one lead by id. Unknown ids surface as `NotFound`.
    async fn get_lead(&self, id: Uuid) -> Result<LeadRecord, AppError>;
}

/// In-memory lead store backed by a fixed record set.
///
/// Used by the campaign-runner binary (leads loaded from a JSON export)
/// and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLeadStore {
    leads: Vec<LeadRecord>,
}

impl StaticLeadStore {
    pub fn new(leads: Vec<LeadRecord>) -> Self {
        Self { leads }
    }
}

#[async_trait]
impl LeadStore for StaticLeadStore {
    async fn find_leads_by_score_range(
        &self,
        min: u8,
        max: u8,
        limit: usize,
        order: LeadOrder,
    ) -> Result<Vec<LeadRecord>, AppError> {
        let mut matching: Vec<LeadRecord> = self
            .leads
            .iter()
            .filter(|lead| (min..=max).contains(&lead.rating))
            .cloned()
            .collect();

        match order {
            LeadOrder::RatingDesc => {
                matching.sort_by(|a, b| {
                    b.rating
                        .cmp(&a.rating)
                        .then_with(|| a.created_at.cmp(&b.created_at))
                });
            }
            LeadOrder::CreatedAt => {
                matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            }
        }

        matching.truncate(limit);
        Ok(matching)
    }

    async fn get_lead(&self, id: Uuid) -> Result<LeadRecord, AppError> {
        self.leads
            .iter()
            .find(|lead| lead.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn record(name: &str, rating: u8, age_mins: i64) -> LeadRecord {
        LeadRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            location: Some("Pune".to_string()),
            rating,
            context: json!({"budget": "50,000"}),
            created_at: Utc::now() - Duration::minutes(age_mins),
        }
    }

    #[tokio::test]
    async fn range_selection_respects_limit_and_order() {
        let store = StaticLeadStore::new(vec![
            record("Asha", 4, 30),
            record("Ravi", 5, 10),
            record("Meera", 5, 20),
            record("Dev", 3, 5),
        ]);

        let selected = store
            .find_leads_by_score_range(4, 5, 2, LeadOrder::RatingDesc)
            .await
            .unwrap();
        assert_eq!(selected.len(), 2);
        // Both fives before the four; older five first.
        assert_eq!(selected[0].name, "Meera");
        assert_eq!(selected[1].name, "Ravi");
    }

    #[tokio::test]
    async fn selection_is_stable_across_calls() {
        let store = StaticLeadStore::new(vec![
            record("Asha", 2, 30),
            record("Ravi", 2, 20),
            record("Meera", 1, 10),
        ]);

        let first = store
            .find_leads_by_score_range(1, 2, 3, LeadOrder::CreatedAt)
            .await
            .unwrap();
        let second = store
            .find_leads_by_score_range(1, 2, 3, LeadOrder::CreatedAt)
            .await
            .unwrap();
        let names = |v: &[LeadRecord]| v.iter().map(|l| l.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), vec!["Asha", "Ravi", "Meera"]);
    }

    #[tokio::test]
    async fn unknown_lead_id_is_not_found() {
        let store = StaticLeadStore::new(vec![record("Asha", 4, 0)]);
        let result = store.get_lead(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
