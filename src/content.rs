use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::{GenerativeBackend, SenderIdentity};
use crate::models::{CampaignLead, PriorityTier};

/// Markers that open actual email content. Everything before the first
/// occurrence is generator preamble or meta-commentary and is discarded.
pub const CONTENT_START_MARKERS: [&str; 6] =
    ["Subject:", "Hello", "Dear", "Hi,", "Hi ", "Greetings"];

/// Build the generation prompt for a lead and template family.
pub fn build_prompt(lead: &CampaignLead, tier: PriorityTier, sender: &SenderIdentity) -> String {
    let name = non_empty(&lead.name, "Valued Customer");
    let location = non_empty(&lead.location, "your area");
    let property_type = non_empty(&lead.property_type, "property");
    let budget = non_empty(&lead.budget, "undisclosed");
    let signature_details = format!(
        "End the email with a signature but do not use any placeholders like [Your Name] or \
         [Company Name]. Use these details in the signature: Name: {}, Company: {}, Phone: {}, \
         Email: {}.",
        sender.contact_person, sender.company, sender.phone, sender.email
    );

    match tier {
        PriorityTier::Low => format!(
            "Write a friendly check-in email to {}, who recently showed interest in properties. \
             Subject: A Quick Hello from {}! Keep it short and simple. {}",
            name, sender.company, signature_details
        ),
        PriorityTier::Medium => format!(
            "Write a promotional email to {} about our real estate services. Subject: Exclusive \
             Property Opportunities in {}. They showed interest in {} in {}. {}",
            name, location, property_type, location, signature_details
        ),
        PriorityTier::High => format!(
            "Write a personalized marketing email to {} who is highly interested in buying a {} \
             in {} with a budget of {}. Subject: Your Dream Home Awaits in {}. Focus on why this \
             would be a great investment. Mention their urgency level which is {} out of 5. {}",
            name, property_type, location, budget, location, lead.urgency, signature_details
        ),
    }
}

/// Deterministic per-tier HTML template. Total: always produces a
/// sendable message regardless of generator availability.
pub fn fallback_template(
    lead: &CampaignLead,
    tier: PriorityTier,
    sender: &SenderIdentity,
) -> String {
    let name = non_empty(&lead.name, "Valued Customer");
    let location = non_empty(&lead.location, "your desired location");
    let property_type = non_empty(&lead.property_type, "property");
    let signature = format!(
        "{}<br>{}<br>{}<br>{}",
        sender.contact_person, sender.company, sender.phone, sender.email
    );

    match tier {
        PriorityTier::Low => format!(
            "<p>Hello {},</p>\
             <p>I hope this email finds you well. I wanted to check in regarding your recent \
             interest in our properties.</p>\
             <p>If you have any questions or would like more information, please don't hesitate \
             to reach out.</p>\
             <p>Best regards,<br>{}</p>",
            name, signature
        ),
        PriorityTier::Medium => format!(
            "<p>Hello {},</p>\
             <p>Thank you for your interest in our properties in {}.</p>\
             <p>We currently have several exciting options that might match your preferences. \
             Our team has helped hundreds of clients find their dream homes in this area.</p>\
             <p>Would you be available for a quick call this week to discuss your requirements \
             in more detail?</p>\
             <p>Best regards,<br>{}</p>",
            name, location, signature
        ),
        PriorityTier::High => format!(
            "<p>Hello {},</p>\
             <p>I hope this email finds you well. I wanted to personally reach out regarding \
             your interest in {} properties in {}.</p>\
             <p>Based on your preferences, I believe we have several options that would be \
             perfect for you. Many of our clients with similar requirements have found \
             exceptional value in this area.</p>\
             <p>I've taken the liberty to prepare some information about specific properties \
             that match your criteria. Would you prefer to discuss these options over a call, \
             or would you like me to send the details directly?</p>\
             <p>Best regards,<br>{}</p>",
            name, property_type, location, signature
        ),
    }
}

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() || value == "N/A" {
        default
    } else {
        value
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: Option<String>,
}

/// Client for the external generative content service.
#[derive(Clone)]
pub struct GenerativeClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GenerativeClient {
    pub fn new(backend: &GenerativeBackend) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(backend.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: backend.url.clone(),
            api_key: backend.api_key.clone(),
        })
    }

    /// Call the generative backend with a prompt.
    ///
    /// Returns `Ok(None)` on any unusable outcome (non-success status,
    /// empty output array, missing text). Backend failure is not an error
    /// the pipeline surfaces; it selects the fallback template instead.
    pub async fn complete(&self, prompt: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "inputs": prompt }))
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                "Generative backend returned non-success status: {}",
                response.status()
            );
            return Ok(None);
        }

        let outputs: Vec<GeneratedText> = match response.json().await {
            Ok(outputs) => outputs,
            Err(e) => {
                tracing::warn!("Failed to parse generative response: {}", e);
                return Ok(None);
            }
        };

        Ok(outputs.into_iter().next().and_then(|o| o.generated_text))
    }
}

/// Content generator for a lead + campaign-tier pair.
///
/// Attempts the configured generative backend and falls back to the
/// deterministic templates on any failure or malformed output. The
/// fallback path never raises.
#[derive(Clone)]
pub struct ContentGenerator {
    backend: Option<GenerativeClient>,
    sender: SenderIdentity,
}

impl ContentGenerator {
    pub fn new(backend: Option<GenerativeClient>, sender: SenderIdentity) -> Self {
        Self { backend, sender }
    }

    pub fn sender(&self) -> &SenderIdentity {
        &self.sender
    }

    /// Generate email body text for a lead and tier. Total.
    pub async fn generate(&self, lead: &CampaignLead, tier: PriorityTier) -> String {
        let prompt = build_prompt(lead, tier, &self.sender);

        if let Some(ref backend) = self.backend {
            match backend.complete(&prompt).await {
                Ok(Some(raw)) if !raw.trim().is_empty() => {
                    if let Some(content) = extract_email_content(&raw, &prompt) {
                        tracing::debug!(
                            "Generated {} content for lead {} ({} chars)",
                            tier.template_family(),
                            lead.lead_id,
                            content.len()
                        );
                        return content;
                    }
                    tracing::warn!(
                        "Generator output for lead {} had no recognizable email content, \
                         using fallback template",
                        lead.lead_id
                    );
                }
                Ok(_) => {
                    tracing::warn!(
                        "Generator returned empty output for lead {}, using fallback template",
                        lead.lead_id
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Generator call failed for lead {}: {}, using fallback template",
                        lead.lead_id,
                        e
                    );
                }
            }
        }

        fallback_template(lead, tier, &self.sender)
    }
}

/// Strip the echoed prompt if the response restates it, then discard
/// everything before the first greeting/subject marker.
///
/// Generative output is unverified free text; the marker scan keeps
/// echoed instructions out of the customer-visible email.
pub fn extract_email_content(raw: &str, prompt: &str) -> Option<String> {
    let mut text = raw;
    if let Some(stripped) = text.strip_prefix(prompt) {
        text = stripped;
    } else if text.contains(prompt) {
        // Prompt echoed mid-output; drop it and everything before it.
        let idx = text.find(prompt).unwrap_or(0);
        text = &text[idx + prompt.len()..];
    }
    let text = text.trim();

    CONTENT_START_MARKERS
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .map(|idx| text[idx..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_sender() -> SenderIdentity {
        SenderIdentity {
            contact_person: "Property Specialist Team".to_string(),
            company: "DrCode".to_string(),
            phone: "+91 9876543210".to_string(),
            email: "DrCode@gmail.com".to_string(),
        }
    }

    fn test_lead() -> CampaignLead {
        CampaignLead {
            lead_id: Uuid::new_v4(),
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 5551234".to_string(),
            budget: "1,200,000".to_string(),
            urgency: "4".to_string(),
            score: 5,
            tier: PriorityTier::High,
            property_type: "Villa".to_string(),
            location: "Pune".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prompts_interpolate_lead_fields() {
        let lead = test_lead();
        let prompt = build_prompt(&lead, PriorityTier::High, &test_sender());
        assert!(prompt.contains("Asha Rao"));
        assert!(prompt.contains("Villa"));
        assert!(prompt.contains("Pune"));
        assert!(prompt.contains("1,200,000"));
        assert!(prompt.contains("4 out of 5"));

        let prompt = build_prompt(&lead, PriorityTier::Low, &test_sender());
        assert!(prompt.contains("friendly check-in email"));
        assert!(prompt.contains("A Quick Hello from DrCode!"));
    }

    #[test]
    fn prompts_default_missing_fields() {
        let mut lead = test_lead();
        lead.name = String::new();
        lead.location = "N/A".to_string();
        let prompt = build_prompt(&lead, PriorityTier::Medium, &test_sender());
        assert!(prompt.contains("Valued Customer"));
        assert!(prompt.contains("your area"));
    }

    #[test]
    fn fallback_templates_carry_signature_and_no_placeholders() {
        let lead = test_lead();
        for tier in [PriorityTier::Low, PriorityTier::Medium, PriorityTier::High] {
            let body = fallback_template(&lead, tier, &test_sender());
            assert!(body.contains("Best regards,"));
            assert!(body.contains("Property Specialist Team"));
            assert!(!body.contains('['), "placeholder leaked in {:?}", tier);
        }
    }

    #[test]
    fn extract_content_strips_echoed_prompt() {
        let prompt = "Write a friendly check-in email to Asha.";
        let raw = format!("{}\n\nHello Asha,\n\nJust checking in.", prompt);
        let content = extract_email_content(&raw, prompt).unwrap();
        assert!(content.starts_with("Hello Asha,"));
    }

    #[test]
    fn extract_content_discards_preamble_before_marker() {
        let raw = "Sure! Here is the email you asked for:\n\nSubject: A Quick Hello\n\nHi Asha,";
        let content = extract_email_content(raw, "unrelated prompt").unwrap();
        assert!(content.starts_with("Subject: A Quick Hello"));
    }

    #[test]
    fn extract_content_uses_earliest_marker() {
        let raw = "Dear Asha, greetings!\nHello again.";
        let content = extract_email_content(raw, "unrelated prompt").unwrap();
        assert!(content.starts_with("Dear Asha"));
    }

    #[test]
    fn extract_content_returns_none_without_marker() {
        assert!(extract_email_content("no email here at all", "prompt").is_none());
    }

    #[tokio::test]
    async fn generator_without_backend_uses_fallback() {
        let generator = ContentGenerator::new(None, test_sender());
        let lead = test_lead();
        let body = generator.generate(&lead, PriorityTier::Low).await;
        assert_eq!(body, fallback_template(&lead, PriorityTier::Low, &test_sender()));
    }
}
