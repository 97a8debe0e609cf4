use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{EmailRecord, IssueType, NewEmailRecord, UrgencyLevel},
    services::mailer::{normalize_email, Attachment, OutboundEmail},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-email", post(generate_email))
        .route("/regenerate-email", post(regenerate_email))
        .route("/send-email", post(send_email))
        .route("/analyze-photo", post(analyze_photo))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailRequest {
    pub issue_type: IssueType,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub urgency_level: UrgencyLevel,
    // Optional customization prompts folded into the description.
    pub impact_description: Option<String>,
    pub affected_groups: Option<String>,
    pub desired_outcome: Option<String>,
    pub proposed_solution: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailResponse {
    pub email_subject: String,
    pub email_to: String,
    pub email_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateEmailRequest {
    pub email_body: String,
    pub tone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateEmailResponse {
    pub email_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub project_id: i64,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub custom_body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePhotoRequest {
    pub photo_data: String,
}

/// Title-case a snake_case form value ("elderly_residents" -> "Elderly Residents").
fn humanize(value: &str) -> String {
    value
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

async fn generate_email(
    State(state): State<AppState>,
    Json(body): Json<GenerateEmailRequest>,
) -> Result<Json<GenerateEmailResponse>> {
    if body.location.trim().is_empty() {
        return Err(AppError::Validation("location is required".to_string()));
    }
    if body.description.trim().is_empty() {
        return Err(AppError::Validation("description is required".to_string()));
    }

    let mut description = body.description.clone();
    if let Some(impact) = body.impact_description.filter(|v| !v.trim().is_empty()) {
        description.push_str(&format!("\n\nImpact: {impact}"));
    }
    if let Some(groups) = body.affected_groups.filter(|v| !v.trim().is_empty()) {
        description.push_str(&format!("\n\nAffected Groups: {}", humanize(&groups)));
    }
    if let Some(outcome) = body.desired_outcome.filter(|v| !v.trim().is_empty()) {
        description.push_str(&format!("\n\nDesired Outcome: {}", humanize(&outcome)));
    }
    if let Some(solution) = body.proposed_solution.filter(|v| !v.trim().is_empty()) {
        description.push_str(&format!("\n\nProposed Solution: {solution}"));
    }

    let outcome = state
        .drafter
        .draft_email(body.issue_type, &body.location, &description, body.urgency_level)
        .await;

    Ok(Json(GenerateEmailResponse {
        email_subject: outcome.draft.subject,
        email_to: outcome.draft.recipient,
        email_body: outcome.draft.body,
        warning: outcome.warning,
    }))
}

async fn regenerate_email(
    State(state): State<AppState>,
    Json(body): Json<RegenerateEmailRequest>,
) -> Result<Json<RegenerateEmailResponse>> {
    if body.email_body.trim().is_empty() {
        return Err(AppError::Validation("emailBody is required".to_string()));
    }
    if body.tone.trim().is_empty() {
        return Err(AppError::Validation("tone is required".to_string()));
    }

    let outcome = state.drafter.adjust_tone(&body.email_body, &body.tone).await;
    Ok(Json(RegenerateEmailResponse {
        email_body: outcome.body,
        warning: outcome.warning,
    }))
}

async fn send_email(
    State(state): State<AppState>,
    Json(body): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<EmailRecord>)> {
    let project = state
        .store
        .project_by_id(body.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let content = body
        .custom_body
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| project.email_body.clone());

    let mut attachments = Vec::new();
    if let Some(photo_data) = &project.photo_data {
        if let Some(attachment) = decode_photo_attachment(photo_data) {
            attachments.push(attachment);
        }
    }

    let from = body
        .sender_email
        .as_deref()
        .and_then(normalize_email)
        .unwrap_or_else(|| state.config.email_from.clone());

    let outbound = OutboundEmail {
        from,
        sender_name: body.sender_name.clone(),
        to: project.email_recipient.clone(),
        subject: project.email_subject.clone(),
        body: content,
        attachments,
    };

    // Transport failure aborts here: no email record, no counter movement.
    state.mailer.send(&outbound).await?;

    let (record, _project) = state
        .store
        .record_email(NewEmailRecord {
            project_id: body.project_id,
            sender_email: body.sender_email,
            sender_name: body.sender_name,
            custom_body: body.custom_body,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn analyze_photo(
    State(state): State<AppState>,
    Json(body): Json<AnalyzePhotoRequest>,
) -> Result<Json<crate::services::drafter::PhotoAnalysis>> {
    if body.photo_data.trim().is_empty() {
        return Err(AppError::Validation("photoData is required".to_string()));
    }

    let base64_data = body
        .photo_data
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(&body.photo_data);

    Ok(Json(state.drafter.classify_photo(base64_data).await))
}

/// Parse a `data:<content-type>;base64,<payload>` URL into a mail attachment.
/// Anything malformed is skipped rather than failing the send.
fn decode_photo_attachment(photo_data: &str) -> Option<Attachment> {
    let rest = photo_data.strip_prefix("data:")?;
    let (content_type, payload) = rest.split_once(";base64,")?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;

    let extension = if content_type.contains("png") {
        "png"
    } else if content_type.contains("gif") {
        "gif"
    } else {
        "jpg"
    };

    Some(Attachment {
        filename: format!("issue-photo.{extension}"),
        content_type: content_type.to_string(),
        data,
    })
}
