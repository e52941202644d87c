use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::content::ContentGenerator;
use crate::errors::AppError;
use crate::mailer::{MailTransport, OutgoingEmail};
use crate::models::{
    CampaignLead, CampaignReport, DispatchMode, DispatchResult, EmailContent, LeadRecord,
    PriorityTier, TierCounts, TierSelection,
};
use crate::sanitize::sanitize;
use crate::store::{LeadOrder, LeadStore};

/// Drives tiered campaign dispatches: selects scored leads, generates and
/// sanitizes content, and submits sends sequentially through the mail
/// transport.
///
/// One engine processes one dispatch at a time; recipient sends within a
/// batch are strictly sequential with a fixed inter-send delay to respect
/// third-party rate limits.
pub struct CampaignEngine {
    store: Arc<dyn LeadStore>,
    transport: Arc<dyn MailTransport>,
    generator: ContentGenerator,
    send_delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl CampaignEngine {
    pub fn new(
        store: Arc<dyn LeadStore>,
        transport: Arc<dyn MailTransport>,
        generator: ContentGenerator,
        send_delay: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            generator,
            send_delay,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for abandoning the in-flight dispatch. Checked between
    /// sends only; an individual send already submitted runs to
    /// completion before the batch loop stops.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one campaign dispatch.
    ///
    /// Always returns a report describing exactly which recipients
    /// succeeded or failed: a single recipient's failure never aborts the
    /// batch. Only the pre-flight validation rejects the whole operation.
    pub async fn dispatch(
        &self,
        counts: TierCounts,
        mode: DispatchMode,
    ) -> Result<CampaignReport, AppError> {
        if counts.total() == 0 {
            return Err(AppError::Validation(
                "You must select at least one lead to send emails to".to_string(),
            ));
        }
        self.cancel.store(false, Ordering::Relaxed);

        let selection = self.select_leads(&counts).await?;
        let selected_total =
            selection.high.len() + selection.medium.len() + selection.low.len();
        tracing::info!(
            "Selected {} lead(s) for dispatch (high: {}, medium: {}, low: {})",
            selected_total,
            selection.high.len(),
            selection.medium.len(),
            selection.low.len()
        );

        if mode == DispatchMode::Test {
            return Ok(CampaignReport {
                total: selected_total,
                successful: 0,
                failed: 0,
                test_mode: true,
                details: Vec::new(),
                selection: Some(selection),
            });
        }

        let leads: Vec<CampaignLead> = selection
            .high
            .into_iter()
            .chain(selection.medium)
            .chain(selection.low)
            .collect();

        let mut details = Vec::with_capacity(leads.len());
        let mut successful = 0;
        let mut failed = 0;

        for (index, lead) in leads.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::warn!(
                    "Dispatch cancelled after {} of {} send(s)",
                    index,
                    leads.len()
                );
                break;
            }

            let result = self.send_one(lead, None).await;
            if result.success {
                successful += 1;
            } else {
                failed += 1;
            }
            details.push(result);

            // Rate-limiting discipline: fixed delay between sends,
            // skipped after the last item.
            if index + 1 < leads.len() && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
        }

        let report = CampaignReport {
            total: details.len(),
            successful,
            failed,
            test_mode: false,
            details,
            selection: None,
        };
        tracing::info!(
            "Campaign finished: {} total, {} successful, {} failed",
            report.total,
            report.successful,
            report.failed
        );
        Ok(report)
    }

    /// Generate the sanitized email for a stored lead without sending.
    pub async fn preview_content(
        &self,
        lead_id: Uuid,
        tier: Option<PriorityTier>,
    ) -> Result<EmailContent, AppError> {
        let record = self.store.get_lead(lead_id).await?;
        let lead = transform_lead(&record);
        let tier = tier.unwrap_or_else(|| PriorityTier::from_score(lead.score));

        let raw = self.generator.generate(&lead, tier).await;
        Ok(sanitize(&raw, &lead, tier, self.generator.sender()))
    }

    /// Send one email to a single stored lead, optionally overriding the
    /// recipient address (used for test deliveries).
    pub async fn send_single(
        &self,
        lead_id: Uuid,
        tier: Option<PriorityTier>,
        override_recipient: Option<String>,
    ) -> Result<DispatchResult, AppError> {
        let record = self.store.get_lead(lead_id).await?;
        let mut lead = transform_lead(&record);
        if let Some(recipient) = override_recipient {
            lead.email = recipient;
        }
        if let Some(tier) = tier {
            lead.tier = tier;
        }
        Ok(self.send_one(&lead, Some(lead.tier)).await)
    }

    /// Select and transform leads per tier. Missing tiers select nothing;
    /// tie order is stable (rating desc, then creation time).
    async fn select_leads(&self, counts: &TierCounts) -> Result<TierSelection, AppError> {
        let high = if counts.high > 0 {
            self.store
                .find_leads_by_score_range(4, 5, counts.high, LeadOrder::RatingDesc)
                .await?
        } else {
            Vec::new()
        };

        let medium = if counts.medium > 0 {
            self.store
                .find_leads_by_score_range(3, 3, counts.medium, LeadOrder::CreatedAt)
                .await?
        } else {
            Vec::new()
        };

        let low = if counts.low > 0 {
            self.store
                .find_leads_by_score_range(1, 2, counts.low, LeadOrder::CreatedAt)
                .await?
        } else {
            Vec::new()
        };

        Ok(TierSelection {
            high: high.iter().map(transform_lead).collect(),
            medium: medium.iter().map(transform_lead).collect(),
            low: low.iter().map(transform_lead).collect(),
        })
    }

    /// Generate, sanitize and submit one email, capturing the outcome.
    /// Transport failures are recorded, never propagated.
    async fn send_one(&self, lead: &CampaignLead, tier: Option<PriorityTier>) -> DispatchResult {
        // Recomputed from the score even though selection already
        // partitioned: the content family must always match the rating.
        let tier = tier.unwrap_or_else(|| PriorityTier::from_score(lead.score));

        let raw = self.generator.generate(lead, tier).await;
        let content = sanitize(&raw, lead, tier, self.generator.sender());

        let outgoing = OutgoingEmail {
            to: lead.email.clone(),
            subject: content.subject,
            html: content.body,
        };

        match self.transport.send(&outgoing).await {
            Ok(receipt) => {
                tracing::info!(
                    "✓ {} email to {} <{}>{}",
                    tier.template_family(),
                    lead.name,
                    lead.email,
                    if receipt.simulated { " (simulated)" } else { "" }
                );
                DispatchResult {
                    lead_id: lead.lead_id,
                    name: lead.name.clone(),
                    email: lead.email.clone(),
                    tier,
                    success: true,
                    message_id: receipt.message_id,
                    error: None,
                    simulated: receipt.simulated,
                }
            }
            Err(e) => {
                tracing::error!("✗ Failed to send to {} <{}>: {}", lead.name, lead.email, e);
                DispatchResult {
                    lead_id: lead.lead_id,
                    name: lead.name.clone(),
                    email: lead.email.clone(),
                    tier,
                    success: false,
                    message_id: None,
                    error: Some(e.to_string()),
                    simulated: false,
                }
            }
        }
    }
}

/// Join a stored lead record with its contact info into a send-ready
/// campaign lead. The opaque intake context is parsed defensively; any
/// missing field falls back to "N/A" rather than failing the dispatch.
pub fn transform_lead(record: &LeadRecord) -> CampaignLead {
    let context = &record.context;
    let field = |key: &str| -> String {
        context
            .get(key)
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "N/A".to_string())
    };

    CampaignLead {
        lead_id: record.id,
        name: record.name.clone(),
        email: record.email.clone(),
        phone: field("phone"),
        budget: field("budget"),
        urgency: field("urgency"),
        score: record.rating,
        tier: PriorityTier::from_score(record.rating),
        property_type: field("property_type"),
        location: record
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| field("location")),
        created_at: record.created_at,
    }
}
