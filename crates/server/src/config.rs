use std::env;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub upstream_timeout_secs: u64,
    pub email_from: String,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(15),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@civicvoice.org".to_string()),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            openai_base_url: "http://localhost:0/v1".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o".to_string(),
            upstream_timeout_secs: 1,
            email_from: "noreply@civicvoice.org".to_string(),
            seed_demo_data: false,
        }
    }
}
