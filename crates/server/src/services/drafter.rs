//! Generative text service for outreach emails and photo classification.
//!
//! Works against any OpenAI-compatible chat completions API. Every operation
//! degrades to a deterministic local substitute when the service is missing,
//! errors or times out; degradation is reported through the outcome's
//! `warning` field rather than as a request failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    models::{IssueType, UrgencyLevel},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub draft: EmailDraft,
    /// Set when the service failed and the deterministic fallback was used.
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToneOutcome {
    pub body: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAnalysis {
    pub issue_type: IssueType,
    pub confidence: f32,
    pub description: String,
}

#[async_trait]
pub trait DraftService: Send + Sync {
    async fn draft_email(
        &self,
        issue_type: IssueType,
        location: &str,
        description: &str,
        urgency: UrgencyLevel,
    ) -> DraftOutcome;

    async fn adjust_tone(&self, body: &str, tone: &str) -> ToneOutcome;

    /// Never fails: classification errors return a neutral "other" result
    /// with zero confidence.
    async fn classify_photo(&self, base64_image: &str) -> PhotoAnalysis;
}

/// Municipal department address responsible for an issue type.
pub fn department_address(issue_type: IssueType) -> &'static str {
    match issue_type {
        IssueType::Crosswalk => "transportation@cityname.gov",
        IssueType::Pothole => "streetmaintenance@cityname.gov",
        IssueType::Sidewalk => "publicworks@cityname.gov",
        IssueType::Streetlight => "utilities@cityname.gov",
        IssueType::Other => "cityhall@cityname.gov",
    }
}

pub fn department_name(issue_type: IssueType) -> &'static str {
    match issue_type {
        IssueType::Crosswalk => "Transportation Department",
        IssueType::Pothole => "Street Maintenance Department",
        IssueType::Sidewalk => "Public Works Department",
        IssueType::Streetlight => "Utilities Department",
        IssueType::Other => "City Hall",
    }
}

/// Deterministic template draft, used whenever the text service is absent or
/// fails.
pub fn fallback_draft(
    issue_type: IssueType,
    location: &str,
    description: &str,
    urgency: UrgencyLevel,
) -> EmailDraft {
    let issue = issue_type.label();
    let urgency_note = if urgency == UrgencyLevel::High {
        "This is an urgent safety issue."
    } else {
        ""
    };
    let body = format!(
        "Dear {department},\n\nI'm writing about a {issue} at {location} that needs your \
         attention. {urgency_note}\n\n{description}\n\nCould someone from your office look into \
         this matter? I'm available to provide any additional information if needed.\n\nThanks \
         for your consideration,\n[Your Name]",
        department = department_name(issue_type),
    );
    EmailDraft {
        subject: format!("{location} {issue} needs attention"),
        body,
        recipient: department_address(issue_type).to_string(),
    }
}

const SIGNOFF_MARKERS: [&str; 6] = [
    "Sincerely",
    "Regards",
    "Thank you",
    "Best regards",
    "Yours truly",
    "Respectfully",
];

const ISSUE_KEYWORDS: [&str; 4] = ["pothole", "crosswalk", "sidewalk", "streetlight"];

/// Deterministic tone rewrite. Keeps the original salutation and signoff and
/// swaps the body for a tone-specific template; unknown tones return the
/// email unchanged.
pub fn fallback_tone(email: &str, tone: &str) -> String {
    let salutation = email
        .lines()
        .find(|line| line.starts_with("Dear"))
        .map(|line| line.trim_end_matches([',', ':']))
        .unwrap_or("Dear City Official");

    let signoff = email
        .lines()
        .find(|line| SIGNOFF_MARKERS.iter().any(|m| line.starts_with(m)))
        .map(|line| format!("{line}\n[Your Name]"))
        .unwrap_or_else(|| "Sincerely,\n[Your Name]".to_string());

    let lowered = email.to_lowercase();
    let issue = ISSUE_KEYWORDS
        .iter()
        .find(|k| lowered.contains(*k))
        .copied()
        .unwrap_or("infrastructure issue");

    let middle = match tone.to_lowercase().as_str() {
        "professional" => format!(
            "I'm writing to inform you about a {issue} in our community that requires \
             attention. This presents a safety concern for residents using this area.\n\nWould \
             your department be able to address this matter? I'm available to provide any \
             additional information that might be helpful."
        ),
        "formal" => format!(
            "I'm writing to request your department's attention to a {issue} in our \
             community.\n\nThis infrastructure issue falls under your department's \
             responsibility and should be addressed per municipal standards."
        ),
        "assertive" => format!(
            "The {issue} in our community needs immediate attention. This presents a clear \
             safety risk that should be addressed promptly.\n\nI expect this matter to be \
             resolved soon. Please inform me of what steps will be taken to fix this issue."
        ),
        "concerned" => format!(
            "I'm concerned about the {issue} in our community. This issue creates difficulties \
             for residents and could lead to injuries if not addressed.\n\nPlease consider the \
             safety impact this has on our community and address it soon."
        ),
        "personal" => format!(
            "I wanted to reach out about the {issue} that I frequently encounter. This has \
             been causing problems for myself and others in the area.\n\nOur neighborhood would \
             really benefit from having this fixed. I appreciate your consideration of this \
             request."
        ),
        _ => return email.to_string(),
    };

    format!("{salutation},\n\n{middle}\n\n{signoff}")
}

pub struct OpenAiDrafter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiDrafter {
    pub fn from_config(config: &Config) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, String> {
        let api_key = self.api_key.as_ref().ok_or("no API key configured")?;

        let response = self
            .client
            .post(self.chat_completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("text service request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(format!("text service returned HTTP {status}"));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid text service response: {e}"))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "empty text service response".to_string())
    }

    fn draft_request(
        &self,
        issue_type: IssueType,
        location: &str,
        description: &str,
        urgency: UrgencyLevel,
    ) -> ChatRequest {
        let system = "You are an assistant helping citizens write brief, friendly emails to \
                      local officials about infrastructure issues. Create short, fact-based \
                      emails that sound natural but ONLY use the information provided. Limit \
                      emails to 2-3 short paragraphs. Include a subject line and determine the \
                      most appropriate municipal department to address the email to.";
        let user = format!(
            "Please write a clear, concise email to a local city official about a {} issue at \
             {location}. The urgency level is {:?}. Here's a description of the issue: \
             \"{description}\". Use ONLY the information provided. Format your response as JSON \
             with fields: emailSubject, emailTo (department email), and emailBody.",
            issue_type.label(),
            urgency,
        );
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", system),
                ChatMessage::text("user", user),
            ],
            temperature: Some(0.7),
            response_format: Some(ResponseFormatRequest {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl DraftService for OpenAiDrafter {
    async fn draft_email(
        &self,
        issue_type: IssueType,
        location: &str,
        description: &str,
        urgency: UrgencyLevel,
    ) -> DraftOutcome {
        if self.api_key.is_none() {
            tracing::debug!("no text service configured, using template draft");
            return DraftOutcome {
                draft: fallback_draft(issue_type, location, description, urgency),
                warning: None,
            };
        }

        let request = self.draft_request(issue_type, location, description, urgency);
        match self.chat(request).await.and_then(|content| {
            serde_json::from_str::<DraftPayload>(&content)
                .map_err(|e| format!("invalid draft payload: {e}"))
        }) {
            Ok(payload) => DraftOutcome {
                draft: EmailDraft {
                    subject: payload.email_subject,
                    body: payload.email_body,
                    recipient: payload
                        .email_to
                        .filter(|to| !to.is_empty())
                        .unwrap_or_else(|| department_address(issue_type).to_string()),
                },
                warning: None,
            },
            Err(err) => {
                tracing::warn!("email draft generation failed: {err}");
                DraftOutcome {
                    draft: fallback_draft(issue_type, location, description, urgency),
                    warning: Some("Email was generated from a local template because the text \
                                   service was unavailable."
                        .to_string()),
                }
            }
        }
    }

    async fn adjust_tone(&self, body: &str, tone: &str) -> ToneOutcome {
        if self.api_key.is_none() {
            return ToneOutcome {
                body: fallback_tone(body, tone),
                warning: None,
            };
        }

        let system = format!(
            "You are an assistant helping citizens write brief emails to local officials. \
             You'll be given an existing email and asked to rewrite it with a {tone} tone. \
             Don't add any fictional details, names, or scenarios that weren't in the original \
             email. Keep it short (2-3 paragraphs)."
        );
        let user = format!(
            "Please rewrite this email with a {tone} tone. Keep it brief and stick ONLY to the \
             information provided in the original email:\n\n{body}"
        );
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", system),
                ChatMessage::text("user", user),
            ],
            temperature: Some(0.7),
            response_format: None,
        };

        match self.chat(request).await {
            Ok(content) => ToneOutcome {
                body: content,
                warning: None,
            },
            Err(err) => {
                tracing::warn!("tone adjustment failed: {err}");
                ToneOutcome {
                    body: fallback_tone(body, tone),
                    warning: Some(
                        "Unable to adjust email tone due to a service error.".to_string(),
                    ),
                }
            }
        }
    }

    async fn classify_photo(&self, base64_image: &str) -> PhotoAnalysis {
        let neutral = |description: String| PhotoAnalysis {
            issue_type: IssueType::Other,
            confidence: 0.0,
            description,
        };

        if self.api_key.is_none() {
            return neutral(
                "Unable to analyze image. Please select the issue type manually.".to_string(),
            );
        }

        let system = "You are an AI specialized in identifying urban infrastructure issues. \
                      Analyze the provided photo and determine which category the issue falls \
                      into: 'pothole', 'sidewalk', 'crosswalk', 'streetlight', or 'other'. \
                      Provide a confidence score (0-1) and a brief description. Format your \
                      response as a JSON object with keys: issueType, confidence, and \
                      description.";
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", system),
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: "Analyze this infrastructure issue and classify it based on \
                                   what you see."
                                .to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:image/jpeg;base64,{base64_image}"),
                            },
                        },
                    ]),
                },
            ],
            temperature: None,
            response_format: Some(ResponseFormatRequest {
                format_type: "json_object".to_string(),
            }),
        };

        match self.chat(request).await.and_then(|content| {
            serde_json::from_str::<ClassificationPayload>(&content)
                .map_err(|e| format!("invalid classification payload: {e}"))
        }) {
            Ok(payload) => PhotoAnalysis {
                issue_type: IssueType::parse(&payload.issue_type).unwrap_or(IssueType::Other),
                confidence: payload.confidence.clamp(0.0, 1.0),
                description: payload.description,
            },
            Err(err) => {
                tracing::warn!("photo classification failed: {err}");
                neutral(format!(
                    "Analysis error: {err}. Please manually select the issue type."
                ))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatRequest>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: MessageContent::Text(content.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormatRequest {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftPayload {
    email_subject: String,
    email_body: String,
    email_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationPayload {
    issue_type: String,
    confidence: f32,
    description: String,
}
