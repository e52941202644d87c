use serde::Deserialize;

/// Identity used to sign outbound campaign email.
///
/// Replaces every `[Your Name]`-style placeholder the generator may leak
/// and feeds the canonical signature block.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderIdentity {
    pub contact_person: String,
    pub company: String,
    pub phone: String,
    pub email: String,
}

/// SMTP credentials. Absent credentials put the dispatcher in simulated mode.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpCredentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// Generative content backend. Absent config means fallback templates only.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerativeBackend {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scoring_base_url: String,
    pub scoring_timeout_secs: u64,
    pub generative: Option<GenerativeBackend>,
    pub smtp: Option<SmtpCredentials>,
    pub sender: SenderIdentity,
    /// Fixed inter-send delay in milliseconds (rate-limiting discipline).
    pub send_delay_ms: u64,
    /// Forces simulated sends even when SMTP credentials are present.
    pub test_environment: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            scoring_base_url: std::env::var("SCORING_BASE_URL")
                .map_err(|_| anyhow::anyhow!("SCORING_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("SCORING_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("SCORING_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            scoring_timeout_secs: std::env::var("SCORING_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCORING_TIMEOUT_SECS must be a valid number"))?,
            generative: match std::env::var("GENERATIVE_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(url) => {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("GENERATIVE_API_URL must start with http:// or https://");
                    }
                    Some(GenerativeBackend {
                        url,
                        api_key: std::env::var("GENERATIVE_API_KEY").unwrap_or_default(),
                        timeout_secs: std::env::var("GENERATIVE_TIMEOUT_SECS")
                            .unwrap_or_else(|_| "30".to_string())
                            .parse()
                            .map_err(|_| {
                                anyhow::anyhow!("GENERATIVE_TIMEOUT_SECS must be a valid number")
                            })?,
                    })
                }
                None => None,
            },
            smtp: match std::env::var("SMTP_USERNAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(username) => Some(SmtpCredentials {
                    host: std::env::var("SMTP_HOST")
                        .map_err(|_| anyhow::anyhow!("SMTP_HOST required when SMTP_USERNAME set"))?,
                    port: std::env::var("SMTP_PORT")
                        .unwrap_or_else(|_| "587".to_string())
                        .parse()
                        .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a valid port number"))?,
                    password: std::env::var("SMTP_PASSWORD").map_err(|_| {
                        anyhow::anyhow!("SMTP_PASSWORD required when SMTP_USERNAME set")
                    })?,
                    from_address: std::env::var("SMTP_FROM_ADDRESS")
                        .unwrap_or_else(|_| username.clone()),
                    username,
                }),
                None => None,
            },
            sender: SenderIdentity {
                contact_person: std::env::var("SENDER_CONTACT_PERSON")
                    .unwrap_or_else(|_| "Property Specialist Team".to_string()),
                company: std::env::var("SENDER_COMPANY")
                    .unwrap_or_else(|_| "DrCode".to_string()),
                phone: std::env::var("SENDER_PHONE")
                    .unwrap_or_else(|_| "+91 9876543210".to_string()),
                email: std::env::var("SENDER_EMAIL")
                    .unwrap_or_else(|_| "DrCode@gmail.com".to_string()),
            },
            send_delay_ms: std::env::var("SEND_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SEND_DELAY_MS must be a valid number"))?,
            test_environment: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("test"))
                .unwrap_or(false),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Scoring base URL: {}", config.scoring_base_url);
        if let Some(ref backend) = config.generative {
            tracing::info!("Generative backend configured: {}", backend.url);
        } else {
            tracing::info!("No generative backend configured, using fallback templates only");
        }
        if config.smtp.is_none() {
            tracing::warn!("No SMTP credentials configured, sends will be simulated");
        }
        tracing::debug!("Inter-send delay: {}ms", config.send_delay_ms);

        Ok(config)
    }

    /// Whether dispatches should record simulated sends instead of
    /// contacting a real mail transport.
    pub fn simulate_sends(&self) -> bool {
        self.smtp.is_none() || self.test_environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sender() -> SenderIdentity {
        SenderIdentity {
            contact_person: "Property Specialist Team".to_string(),
            company: "DrCode".to_string(),
            phone: "+91 9876543210".to_string(),
            email: "DrCode@gmail.com".to_string(),
        }
    }

    #[test]
    fn simulate_sends_without_smtp() {
        let config = Config {
            scoring_base_url: "http://localhost:8000".to_string(),
            scoring_timeout_secs: 30,
            generative: None,
            smtp: None,
            sender: test_sender(),
            send_delay_ms: 1000,
            test_environment: false,
        };
        assert!(config.simulate_sends());
    }

    #[test]
    fn simulate_sends_in_test_environment() {
        let config = Config {
            scoring_base_url: "http://localhost:8000".to_string(),
            scoring_timeout_secs: 30,
            generative: None,
            smtp: Some(SmtpCredentials {
                host: "smtp.test.com".to_string(),
                port: 587,
                username: "user".to_string(),
                password: "pass".to_string(),
                from_address: "user@test.com".to_string(),
            }),
            sender: test_sender(),
            send_delay_ms: 1000,
            test_environment: true,
        };
        assert!(config.simulate_sends());
    }
}
