use regex::Regex;

use crate::config::SenderIdentity;
use crate::content::CONTENT_START_MARKERS;
use crate::models::{CampaignLead, EmailContent, PriorityTier};

/// Closing phrases that open a trailing signature block, checked in order.
/// The comma is part of the phrase so that body text like "Thank you for
/// your interest" is not mistaken for a signature.
const CLOSING_PHRASES: [&str; 7] = [
    "Best regards,",
    "Warm regards,",
    "Kind regards,",
    "Regards,",
    "Sincerely,",
    "Thank you,",
    "Yours truly,",
];

/// Bracketed placeholder tokens the generator may leave behind, with
/// their sender-identity substitutions resolved per entry.
const PLACEHOLDERS: [&str; 10] = [
    "[Your Name]",
    "[Your Contact Information]",
    "[Company Name]",
    "[Phone Number]",
    "[Email Address]",
    "[Name]",
    "[Contact]",
    "[Email]",
    "[Phone]",
    "[Company]",
];

/// Normalize raw generated content into a final, sendable email.
///
/// Every step is total: sanitization never fails, it only rewrites. The
/// output body contains exactly one canonical signature block and no
/// bracketed placeholder.
pub fn sanitize(
    raw: &str,
    lead: &CampaignLead,
    tier: PriorityTier,
    sender: &SenderIdentity,
) -> EmailContent {
    // Already-wrapped output passes through untouched so that sanitizing
    // twice cannot duplicate signatures or shells.
    if raw.contains("<!DOCTYPE html>") {
        return EmailContent {
            subject: default_subject(lead, tier),
            body: raw.to_string(),
        };
    }

    let mut content = strip_instruction_lines(raw);
    content = trim_to_content_start(&content);

    // Plain text gets line breaks; markup is kept as authored.
    if !content.contains('<') {
        content = content.replace('\n', "<br>");
    }
    content = substitute_placeholders(&content, sender);

    let (subject, body) = match extract_subject_line(&content) {
        Some((subject, rest)) => (subject, rest),
        None => (default_subject(lead, tier), content),
    };

    let body = canonicalize_signature(&body, sender);

    EmailContent {
        subject,
        body: wrap_html_shell(&body, sender),
    }
}

/// Per-tier default subject when the generated content carries none.
pub fn default_subject(lead: &CampaignLead, tier: PriorityTier) -> String {
    match tier {
        PriorityTier::Low => "Following Up on Your Property Interest".to_string(),
        PriorityTier::Medium => "Exclusive Property Opportunities for You".to_string(),
        PriorityTier::High => {
            let location = if lead.location.trim().is_empty() || lead.location == "N/A" {
                "Your Desired Area"
            } else {
                &lead.location
            };
            format!("Your Perfect Property Match in {}", location)
        }
    }
}

/// Remove residual instruction lines the generator may have echoed.
pub fn strip_instruction_lines(content: &str) -> String {
    let cleanup_patterns = [
        r"(?i)Write a.*email to.*\n?",
        r"(?i)Focus on why.*\n?",
        r"(?i)End the email with.*\n?",
        r"(?i)Mention their urgency level.*\n?",
        r"(?i)Do not include any placeholders.*\n?",
        r"(?i)Use these details in the signature:.*\n?",
    ];

    let mut cleaned = content.to_string();
    for pattern in cleanup_patterns {
        let re = Regex::new(pattern).unwrap();
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Discard any remaining preamble before the first content marker.
///
/// Markers already at (or near) the head are left alone, which makes the
/// trim idempotent with the generator's own marker scan.
pub fn trim_to_content_start(content: &str) -> String {
    let earliest = CONTENT_START_MARKERS
        .iter()
        .filter_map(|marker| content.find(marker))
        .min();

    match earliest {
        Some(idx) if idx > 10 => content[idx..].to_string(),
        _ => content.to_string(),
    }
}

/// Replace every known bracketed placeholder token with sender-identity
/// fields, then drop any unrecognized bracketed token outright. Nothing
/// bracket-shaped survives into a customer-visible email.
pub fn substitute_placeholders(content: &str, sender: &SenderIdentity) -> String {
    let contact_info = format!("{}, {}", sender.phone, sender.email);
    let mut result = content.to_string();
    for placeholder in PLACEHOLDERS {
        let replacement = match placeholder {
            "[Your Name]" | "[Name]" => sender.contact_person.as_str(),
            "[Your Contact Information]" | "[Contact]" => contact_info.as_str(),
            "[Company Name]" | "[Company]" => sender.company.as_str(),
            "[Phone Number]" | "[Phone]" => sender.phone.as_str(),
            "[Email Address]" | "[Email]" => sender.email.as_str(),
            _ => continue,
        };
        result = result.replace(placeholder, replacement);
    }

    let residual = Regex::new(r"\[[^\[\]\n]+\]").unwrap();
    residual.replace_all(&result, "").into_owned()
}

/// Extract a `Subject:` line into the subject field, removing it from the
/// body. Returns `None` when no subject line is present.
pub fn extract_subject_line(content: &str) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)Subject:([^\n<]+)").unwrap();
    let captures = re.captures(content)?;
    let subject = captures.get(1)?.as_str().trim().to_string();
    let body = re.replace(content, "").into_owned();
    Some((subject, body))
}

/// The one signature block every outbound email ends with.
pub fn canonical_signature(sender: &SenderIdentity) -> String {
    format!(
        "Best regards,<br>{}<br>{}<br>{}<br>{}",
        sender.contact_person, sender.company, sender.phone, sender.email
    )
}

/// Replace a trailing signature block with the canonical one, or append
/// the canonical block when no closing phrase is found. Idempotent: the
/// canonical block itself opens with a closing phrase and re-canonicalizes
/// to the same text.
pub fn canonicalize_signature(content: &str, sender: &SenderIdentity) -> String {
    let signature = canonical_signature(sender);

    for phrase in CLOSING_PHRASES {
        if let Some(idx) = find_ascii_case_insensitive(content, phrase) {
            let mut result = content[..idx].to_string();
            result.push_str(&signature);
            return result;
        }
    }

    format!("{}<br><br>{}", content.trim_end(), signature)
}

/// Case-insensitive substring search for an ASCII needle. The returned
/// offset is always a char boundary because the needle starts with an
/// ASCII byte.
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Wrap the sanitized body in the fixed transport shell.
pub fn wrap_html_shell(content: &str, sender: &SenderIdentity) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background-color: #4F46E5; color: white; padding: 20px; text-align: center; }}
    .content {{ padding: 20px; background-color: #f9f9f9; }}
    .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>{company}</h1>
    </div>
    <div class="content">
      {content}
    </div>
    <div class="footer">
      <p>This is an automated email from our Lead Management System. Please do not reply directly.</p>
      <p>© 2025 {company}. All rights reserved.</p>
    </div>
  </div>
</body>
</html>"#,
        company = sender.company,
        content = content
    )
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
    fn instruction_lines_are_stripped() {
        let raw = "Write a friendly check-in email to Asha.\nHello Asha,\nFocus on why this is great.\nSee you soon.\n";
        let cleaned = strip_instruction_lines(raw);
        assert!(!cleaned.contains("Write a"));
        assert!(!cleaned.contains("Focus on why"));
        assert!(cleaned.contains("Hello Asha,"));
        assert!(cleaned.contains("See you soon."));
    }

    #[test]
    fn preamble_before_marker_is_discarded() {
        let content = "Here is a draft for you to review:\n\nHello Asha,\nWelcome.";
        let trimmed = trim_to_content_start(content);
        assert!(trimmed.starts_with("Hello Asha,"));
    }

    #[test]
    fn marker_near_head_is_left_alone() {
        let content = "Hello Asha,\nWelcome.";
        assert_eq!(trim_to_content_start(content), content);
    }

    #[test]
    fn placeholders_are_substituted() {
        let content = "Contact [Your Name] at [Phone] or [Email Address]. — [Company]";
        let result = substitute_placeholders(content, &test_sender());
        assert!(!result.contains('['));
        assert!(result.contains("Property Specialist Team"));
        assert!(result.contains("+91 9876543210"));
        assert!(result.contains("DrCode@gmail.com"));
    }

    #[test]
    fn unknown_bracketed_tokens_are_removed() {
        let content =
            "Hello A,\nWe found options for [Specific Property Type] in [location].\nBest regards,";
        let result = substitute_placeholders(content, &test_sender());
        assert!(!result.contains("[Specific Property Type]"));
        assert!(!result.contains("[location]"));
        assert!(!result.contains('['));

        let sanitized = sanitize(content, &test_lead(), PriorityTier::High, &test_sender());
        assert!(!sanitized.body.contains('['));
    }

    #[test]
    fn subject_line_is_extracted_and_removed() {
        let content = "Subject: A Quick Hello\nHello Asha,\nWelcome.";
        let (subject, body) = extract_subject_line(content).unwrap();
        assert_eq!(subject, "A Quick Hello");
        assert!(!body.contains("Subject:"));
        assert!(body.contains("Hello Asha,"));
    }

    #[test]
    fn default_subjects_per_tier() {
        let lead = test_lead();
        assert_eq!(
            default_subject(&lead, PriorityTier::Low),
            "Following Up on Your Property Interest"
        );
        assert_eq!(
            default_subject(&lead, PriorityTier::Medium),
            "Exclusive Property Opportunities for You"
        );
        assert_eq!(
            default_subject(&lead, PriorityTier::High),
            "Your Perfect Property Match in Pune"
        );
    }

    #[test]
    fn trailing_signature_is_canonicalized() {
        let sender = test_sender();
        let content = "Hello Asha,<br>Welcome.<br><br>warm regards,<br>Some Bot<br>bot@example.com";
        let result = canonicalize_signature(content, &sender);
        assert!(result.ends_with(&canonical_signature(&sender)));
        assert!(!result.contains("Some Bot"));
    }

    #[test]
    fn missing_signature_is_appended() {
        let sender = test_sender();
        let content = "Hello Asha,<br>Welcome.";
        let result = canonicalize_signature(content, &sender);
        assert!(result.ends_with(&canonical_signature(&sender)));
        assert!(result.starts_with("Hello Asha,"));
    }

    #[test]
    fn thank_you_body_text_is_not_a_signature() {
        let sender = test_sender();
        let content = "Thank you for your interest in our properties.<br>More soon.";
        let result = canonicalize_signature(content, &sender);
        assert!(result.starts_with("Thank you for your interest"));
        assert!(result.ends_with(&canonical_signature(&sender)));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let sender = test_sender();
        let content = "Hello Asha,<br>Welcome.<br><br>Sincerely,<br>Someone Else";
        let once = canonicalize_signature(content, &sender);
        let twice = canonicalize_signature(&once, &sender);
        assert_eq!(once, twice);
        assert_eq!(once.matches("Best regards,").count(), 1);
    }

    #[test]
    fn sanitize_plain_text_end_to_end() {
        let raw = "Subject: Your Dream Home Awaits in Pune\nDear Asha,\nYour villa search ends here.\nBest regards,\n[Your Name]\n[Company]";
        let content = sanitize(raw, &test_lead(), PriorityTier::High, &test_sender());
        assert_eq!(content.subject, "Your Dream Home Awaits in Pune");
        assert!(content.body.contains("Dear Asha,"));
        assert!(content.body.contains("<!DOCTYPE html>"));
        assert!(!content.body.contains('['));
        assert_eq!(content.body.matches("Best regards,").count(), 1);
    }

    #[test]
    fn sanitize_is_idempotent_on_sanitized_output() {
        let raw = "Hello Asha,\nWelcome back.";
        let lead = test_lead();
        let sender = test_sender();
        let once = sanitize(raw, &lead, PriorityTier::Low, &sender);
        let twice = sanitize(&once.body, &lead, PriorityTier::Low, &sender);
        assert_eq!(once.body, twice.body);
        assert_eq!(twice.body.matches("Best regards,").count(), 1);
    }

    #[test]
    fn sanitize_html_fallback_keeps_single_signature() {
        let lead = test_lead();
        let sender = test_sender();
        let raw = crate::content::fallback_template(&lead, PriorityTier::Medium, &sender);
        let content = sanitize(&raw, &lead, PriorityTier::Medium, &sender);
        assert_eq!(content.subject, "Exclusive Property Opportunities for You");
        assert_eq!(content.body.matches("Best regards,").count(), 1);
        assert!(!content.body.contains('['));
    }
}
