use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Crosswalk,
    Pothole,
    Sidewalk,
    Streetlight,
    Other,
}

impl IssueType {
    /// Human-readable label used in generated email copy.
    pub fn label(self) -> &'static str {
        match self {
            IssueType::Crosswalk => "crosswalk",
            IssueType::Pothole => "pothole",
            IssueType::Sidewalk => "sidewalk",
            IssueType::Streetlight => "streetlight",
            IssueType::Other => "infrastructure issue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "crosswalk" => Some(IssueType::Crosswalk),
            "pothole" => Some(IssueType::Pothole),
            "sidewalk" => Some(IssueType::Sidewalk),
            "streetlight" => Some(IssueType::Streetlight),
            "other" => Some(IssueType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle of an issue report. The variants are ordered: the first three are
/// derived automatically from community engagement, the last four are set
/// manually by administrators and are never overwritten by derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    IdeaSubmitted,
    CommunitySupport,
    EmailCampaignActive,
    OfficialAcknowledgment,
    PlanningStage,
    Implementation,
    Completed,
}

impl ProgressStatus {
    /// Manual statuses are sticky: automatic derivation leaves them untouched.
    pub fn is_manual(self) -> bool {
        self >= ProgressStatus::OfficialAcknowledgment
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::IdeaSubmitted => "idea_submitted",
            ProgressStatus::CommunitySupport => "community_support",
            ProgressStatus::EmailCampaignActive => "email_campaign_active",
            ProgressStatus::OfficialAcknowledgment => "official_acknowledgment",
            ProgressStatus::PlanningStage => "planning_stage",
            ProgressStatus::Implementation => "implementation",
            ProgressStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idea_submitted" => Some(ProgressStatus::IdeaSubmitted),
            "community_support" => Some(ProgressStatus::CommunitySupport),
            "email_campaign_active" => Some(ProgressStatus::EmailCampaignActive),
            "official_acknowledgment" => Some(ProgressStatus::OfficialAcknowledgment),
            "planning_stage" => Some(ProgressStatus::PlanningStage),
            "implementation" => Some(ProgressStatus::Implementation),
            "completed" => Some(ProgressStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProjectCreated,
    Upvote,
    StatusChange,
    EmailSent,
    CommentAdded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub urgency_level: UrgencyLevel,
    pub contact_email: Option<String>,
    pub email_subject: String,
    pub email_body: String,
    pub email_recipient: String,
    pub photo_url: Option<String>,
    pub photo_data: Option<String>,
    pub upvote_count: i64,
    pub emails_sent_count: i64,
    pub progress_status: ProgressStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

/// Validated input for project creation. Counters, status and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub urgency_level: UrgencyLevel,
    pub contact_email: Option<String>,
    pub email_subject: String,
    pub email_body: String,
    pub email_recipient: String,
    pub photo_url: Option<String>,
    pub photo_data: Option<String>,
    pub created_by: Option<i64>,
}

/// Partial update for a project; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub progress_status: Option<ProgressStatus>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub email_recipient: Option<String>,
    pub contact_email: Option<String>,
    pub photo_url: Option<String>,
    pub photo_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upvote {
    pub id: i64,
    pub project_id: i64,
    pub user_id: Option<i64>,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: i64,
    pub project_id: i64,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub custom_body: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailRecord {
    pub project_id: i64,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub custom_body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub project_id: i64,
    pub text: String,
    pub commenter_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub project_id: i64,
    pub text: String,
    pub commenter_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub project_id: i64,
    pub activity_type: ActivityKind,
    pub actor_name: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub project_id: i64,
    pub activity_type: ActivityKind,
    pub actor_name: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub active_issues: i64,
    pub issues_resolved: i64,
    pub total_emails_sent: i64,
    pub success_rate_percent: i64,
}
