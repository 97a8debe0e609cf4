//! In-memory storage backend: one map per entity type keyed by integer id,
//! with monotonic id counters. A single `RwLock` over the whole state means
//! every compound mutation (upvote, email, comment) runs under one write
//! guard and counters stay consistent under concurrent requests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::{
        Activity, ActivityKind, Comment, CommunityStats, EmailRecord, IssueType, NewActivity,
        NewComment, NewEmailRecord, NewProject, NewUser, Project, ProjectPatch, ProgressStatus,
        Upvote, User, UserRole,
    },
    status::derive_status,
    store::Storage,
};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
    upvotes: BTreeMap<i64, Upvote>,
    emails: BTreeMap<i64, EmailRecord>,
    activities: BTreeMap<i64, Activity>,
    comments: BTreeMap<i64, Comment>,
    next_user_id: i64,
    next_project_id: i64,
    next_upvote_id: i64,
    next_email_id: i64,
    next_activity_id: i64,
    next_comment_id: i64,
}

impl State {
    fn new() -> Self {
        Self {
            next_user_id: 1,
            next_project_id: 1,
            next_upvote_id: 1,
            next_email_id: 1,
            next_activity_id: 1,
            next_comment_id: 1,
            ..Default::default()
        }
    }

    fn record_activity(&mut self, activity: NewActivity) -> Activity {
        let id = self.next_activity_id;
        self.next_activity_id += 1;
        let activity = Activity {
            id,
            project_id: activity.project_id,
            activity_type: activity.activity_type,
            actor_name: activity.actor_name,
            description: activity.description,
            created_at: Utc::now(),
        };
        self.activities.insert(id, activity.clone());
        activity
    }

    fn apply_project_patch(&mut self, id: i64, patch: ProjectPatch) -> Option<Project> {
        let project = self.projects.get_mut(&id)?;
        let previous_status = project.progress_status;

        if let Some(status) = patch.progress_status {
            project.progress_status = status;
        }
        if let Some(subject) = patch.email_subject {
            project.email_subject = subject;
        }
        if let Some(body) = patch.email_body {
            project.email_body = body;
        }
        if let Some(recipient) = patch.email_recipient {
            project.email_recipient = recipient;
        }
        if let Some(contact) = patch.contact_email {
            project.contact_email = Some(contact);
        }
        if let Some(url) = patch.photo_url {
            project.photo_url = Some(url);
        }
        if let Some(data) = patch.photo_data {
            project.photo_data = Some(data);
        }

        let updated = project.clone();
        if updated.progress_status != previous_status {
            self.record_activity(NewActivity {
                project_id: id,
                activity_type: ActivityKind::StatusChange,
                actor_name: Some("System".to_string()),
                description: format!(
                    "Project status updated to: {}",
                    updated.progress_status.as_str()
                ),
            });
        }
        Some(updated)
    }

    /// Set counters and re-derived status on a project, recording a
    /// `status_change` activity when the derivation moved the status.
    fn bump_counters(&mut self, id: i64, upvotes: i64, emails_sent: i64) -> Option<Project> {
        let project = self.projects.get_mut(&id)?;
        let previous_status = project.progress_status;
        project.upvote_count = upvotes;
        project.emails_sent_count = emails_sent;
        project.progress_status = derive_status(previous_status, upvotes, emails_sent);
        let updated = project.clone();

        if updated.progress_status != previous_status {
            self.record_activity(NewActivity {
                project_id: id,
                activity_type: ActivityKind::StatusChange,
                actor_name: Some("System".to_string()),
                description: format!(
                    "Project status updated to: {}",
                    updated.progress_status.as_str()
                ),
            });
        }
        Some(updated)
    }

    fn sorted_by_upvotes(&self, mut projects: Vec<Project>) -> Vec<Project> {
        // Stable sort: insertion order (ascending id) breaks ties.
        projects.sort_by(|a, b| b.upvote_count.cmp(&a.upvote_count));
        projects
    }
}

pub struct MemStore {
    state: RwLock<State>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::new()),
        }
    }

    /// Seed a handful of representative projects, activities and comments for
    /// local development.
    pub async fn seed_demo_data(&self) {
        let samples = [
            (
                "Crosswalk Needed at Lincoln & 5th Ave",
                "Dangerous intersection with high pedestrian traffic and no safe crossing.",
                IssueType::Crosswalk,
                "Lincoln & 5th Ave",
                ("37.7749", "-122.4194"),
                "Request for Crosswalk Installation at Lincoln & 5th Avenue",
                "transportation@cityname.gov",
                45,
                38,
                ProgressStatus::CommunitySupport,
            ),
            (
                "Broken Sidewalk on Oak Street",
                "Multiple large cracks making it difficult for wheelchair access.",
                IssueType::Sidewalk,
                "Oak Street",
                ("37.7746", "-122.4184"),
                "Request for Sidewalk Repair on Oak Street",
                "publicworks@cityname.gov",
                23,
                12,
                ProgressStatus::IdeaSubmitted,
            ),
            (
                "Large Pothole on Main Street",
                "Deep pothole causing vehicle damage and traffic backup during rush hours.",
                IssueType::Pothole,
                "Main Street & Broadway",
                ("37.7739", "-122.4174"),
                "Urgent: Hazardous Pothole on Main Street Requiring Immediate Repair",
                "streetmaintenance@cityname.gov",
                67,
                52,
                ProgressStatus::OfficialAcknowledgment,
            ),
        ];

        let mut state = self.state.write().await;
        for (title, description, issue_type, location, (lat, lon), subject, recipient, upvotes, emails, status) in
            samples
        {
            let id = state.next_project_id;
            state.next_project_id += 1;
            let body = format!(
                "Dear {},\n\nI am writing about a {} at {}. {}\n\nCould someone from your \
                 office look into this matter?\n\nSincerely,\n[Your Name]",
                crate::services::drafter::department_name(issue_type),
                issue_type.label(),
                location,
                description,
            );
            state.projects.insert(
                id,
                Project {
                    id,
                    title: title.to_string(),
                    description: description.to_string(),
                    issue_type,
                    location: location.to_string(),
                    latitude: lat.to_string(),
                    longitude: lon.to_string(),
                    urgency_level: Default::default(),
                    contact_email: None,
                    email_subject: subject.to_string(),
                    email_body: body,
                    email_recipient: recipient.to_string(),
                    photo_url: None,
                    photo_data: None,
                    upvote_count: upvotes,
                    emails_sent_count: emails,
                    progress_status: status,
                    created_at: Utc::now(),
                    created_by: None,
                },
            );
        }

        state.record_activity(NewActivity {
            project_id: 1,
            activity_type: ActivityKind::EmailSent,
            actor_name: Some("Alex Johnson".to_string()),
            description: "Sent an email about Crosswalk Needed at Lincoln & 5th Ave".to_string(),
        });
        state.record_activity(NewActivity {
            project_id: 3,
            activity_type: ActivityKind::StatusChange,
            actor_name: Some("City Council".to_string()),
            description: "Acknowledged Large Pothole on Main Street".to_string(),
        });
        state.record_activity(NewActivity {
            project_id: 2,
            activity_type: ActivityKind::ProjectCreated,
            actor_name: Some("Maria Lopez".to_string()),
            description: "Submitted a new issue: Broken Sidewalk on Oak Street".to_string(),
        });

        for (project_id, text, commenter) in [
            (
                1,
                "I cross this intersection daily and it's very dangerous. We definitely need a crosswalk here.",
                "David Chen",
            ),
            (
                1,
                "I witnessed a near-miss accident here last week. The city needs to take action quickly.",
                "Sarah Williams",
            ),
            (
                3,
                "My car was damaged by this pothole. It's much worse after the recent rain.",
                "Michael Rodriguez",
            ),
        ] {
            let id = state.next_comment_id;
            state.next_comment_id += 1;
            state.comments.insert(
                id,
                Comment {
                    id,
                    project_id,
                    text: text.to_string(),
                    commenter_name: commenter.to_string(),
                    created_at: Utc::now(),
                },
            );
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        let id = state.next_user_id;
        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: UserRole::User,
            verified: false,
            verification_token: Some(uuid::Uuid::new_v4().to_string()),
            reset_password_token: None,
            reset_password_expires: None,
            profile_picture: user.profile_picture,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_project(&self, project: NewProject) -> Result<Project> {
        let mut state = self.state.write().await;
        let id = state.next_project_id;
        state.next_project_id += 1;
        let project = Project {
            id,
            title: project.title,
            description: project.description,
            issue_type: project.issue_type,
            location: project.location,
            latitude: project.latitude,
            longitude: project.longitude,
            urgency_level: project.urgency_level,
            contact_email: project.contact_email,
            email_subject: project.email_subject,
            email_body: project.email_body,
            email_recipient: project.email_recipient,
            photo_url: project.photo_url,
            photo_data: project.photo_data,
            upvote_count: 0,
            emails_sent_count: 0,
            progress_status: ProgressStatus::IdeaSubmitted,
            created_at: Utc::now(),
            created_by: project.created_by,
        };
        state.projects.insert(id, project.clone());
        state.record_activity(NewActivity {
            project_id: id,
            activity_type: ActivityKind::ProjectCreated,
            actor_name: Some("Anonymous User".to_string()),
            description: format!("New issue submitted: {}", project.title),
        });
        Ok(project)
    }

    async fn project_by_id(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn all_projects(&self) -> Result<Vec<Project>> {
        let state = self.state.read().await;
        Ok(state.sorted_by_upvotes(state.projects.values().cloned().collect()))
    }

    async fn projects_by_type(&self, issue_type: IssueType) -> Result<Vec<Project>> {
        let state = self.state.read().await;
        Ok(state.sorted_by_upvotes(
            state
                .projects
                .values()
                .filter(|p| p.issue_type == issue_type)
                .cloned()
                .collect(),
        ))
    }

    async fn projects_by_status(&self, status: ProgressStatus) -> Result<Vec<Project>> {
        let state = self.state.read().await;
        Ok(state.sorted_by_upvotes(
            state
                .projects
                .values()
                .filter(|p| p.progress_status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn search_projects(&self, query: &str) -> Result<Vec<Project>> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        Ok(state.sorted_by_upvotes(
            state
                .projects
                .values()
                .filter(|p| {
                    p.title.to_lowercase().contains(&needle)
                        || p.description.to_lowercase().contains(&needle)
                        || p.location.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect(),
        ))
    }

    async fn update_project(&self, id: i64, patch: ProjectPatch) -> Result<Option<Project>> {
        let mut state = self.state.write().await;
        Ok(state.apply_project_patch(id, patch))
    }

    async fn upvote_project(
        &self,
        project_id: i64,
        user_id: Option<i64>,
        ip_address: &str,
    ) -> Result<Project> {
        let mut state = self.state.write().await;

        let project = state
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        let already_voted = state
            .upvotes
            .values()
            .any(|u| u.project_id == project_id && u.ip_address == ip_address);
        if already_voted {
            return Err(AppError::DuplicateVote(
                "You have already upvoted this project".to_string(),
            ));
        }

        let id = state.next_upvote_id;
        state.next_upvote_id += 1;
        state.upvotes.insert(
            id,
            Upvote {
                id,
                project_id,
                user_id,
                ip_address: ip_address.to_string(),
                created_at: Utc::now(),
            },
        );

        let updated = state
            .bump_counters(
                project_id,
                project.upvote_count + 1,
                project.emails_sent_count,
            )
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        state.record_activity(NewActivity {
            project_id,
            activity_type: ActivityKind::Upvote,
            actor_name: Some("Anonymous User".to_string()),
            description: format!("Someone upvoted: {}", updated.title),
        });

        Ok(updated)
    }

    async fn has_upvoted(&self, project_id: i64, ip_address: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .upvotes
            .values()
            .any(|u| u.project_id == project_id && u.ip_address == ip_address))
    }

    async fn upvotes_for_project(&self, project_id: i64) -> Result<Vec<Upvote>> {
        let state = self.state.read().await;
        Ok(state
            .upvotes
            .values()
            .filter(|u| u.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn record_email(&self, email: NewEmailRecord) -> Result<(EmailRecord, Project)> {
        let mut state = self.state.write().await;

        let project = state
            .projects
            .get(&email.project_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        let id = state.next_email_id;
        state.next_email_id += 1;
        let record = EmailRecord {
            id,
            project_id: email.project_id,
            sender_email: email.sender_email,
            sender_name: email.sender_name,
            custom_body: email.custom_body,
            sent_at: Utc::now(),
        };
        state.emails.insert(id, record.clone());

        let updated = state
            .bump_counters(
                project.id,
                project.upvote_count,
                project.emails_sent_count + 1,
            )
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        state.record_activity(NewActivity {
            project_id: project.id,
            activity_type: ActivityKind::EmailSent,
            actor_name: Some(
                record
                    .sender_name
                    .clone()
                    .unwrap_or_else(|| "Anonymous User".to_string()),
            ),
            description: format!("Email sent regarding: {}", updated.title),
        });

        Ok((record, updated))
    }

    async fn emails_for_project(&self, project_id: i64) -> Result<Vec<EmailRecord>> {
        let state = self.state.read().await;
        let mut emails: Vec<EmailRecord> = state
            .emails
            .values()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect();
        emails.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        Ok(emails)
    }

    async fn add_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        let id = state.next_comment_id;
        state.next_comment_id += 1;
        let comment = Comment {
            id,
            project_id: comment.project_id,
            text: comment.text,
            commenter_name: comment.commenter_name,
            created_at: Utc::now(),
        };
        state.comments.insert(id, comment.clone());

        // The parent title is best-effort; recording the activity must not fail.
        let title = state
            .projects
            .get(&comment.project_id)
            .map(|p| p.title.clone())
            .unwrap_or_else(|| "Unknown Project".to_string());
        state.record_activity(NewActivity {
            project_id: comment.project_id,
            activity_type: ActivityKind::CommentAdded,
            actor_name: Some(comment.commenter_name.clone()),
            description: format!("New comment on project: {title}"),
        });

        Ok(comment)
    }

    async fn comments_for_project(&self, project_id: i64) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(comments)
    }

    async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        let state = self.state.read().await;
        let mut activities: Vec<Activity> = state.activities.values().cloned().collect();
        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        activities.truncate(limit);
        Ok(activities)
    }

    async fn activities_for_project(&self, project_id: i64) -> Result<Vec<Activity>> {
        let state = self.state.read().await;
        let mut activities: Vec<Activity> = state
            .activities
            .values()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(activities)
    }

    async fn community_stats(&self) -> Result<CommunityStats> {
        let state = self.state.read().await;
        let total = state.projects.len() as i64;
        let resolved = state
            .projects
            .values()
            .filter(|p| p.progress_status == ProgressStatus::Completed)
            .count() as i64;
        let success_rate = if total > 0 {
            ((resolved as f64 / total as f64) * 100.0).round() as i64
        } else {
            0
        };
        Ok(CommunityStats {
            active_issues: total - resolved,
            issues_resolved: resolved,
            total_emails_sent: state.emails.len() as i64,
            success_rate_percent: success_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UrgencyLevel;

    fn new_project(title: &str) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: "A deep pothole near the bus stop.".to_string(),
            issue_type: IssueType::Pothole,
            location: "Main Street".to_string(),
            latitude: "37.77".to_string(),
            longitude: "-122.41".to_string(),
            urgency_level: UrgencyLevel::High,
            contact_email: None,
            email_subject: "Pothole on Main Street".to_string(),
            email_body: "Dear Street Maintenance Department, ...".to_string(),
            email_recipient: "streetmaintenance@cityname.gov".to_string(),
            photo_url: None,
            photo_data: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn create_project_fills_defaults_and_records_activity() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        assert_eq!(project.id, 1);
        assert_eq!(project.upvote_count, 0);
        assert_eq!(project.emails_sent_count, 0);
        assert_eq!(project.progress_status, ProgressStatus::IdeaSubmitted);

        let activities = store.activities_for_project(project.id).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, ActivityKind::ProjectCreated);
        assert!(activities[0].description.contains("Pothole"));
    }

    #[tokio::test]
    async fn duplicate_origin_is_rejected_and_count_unchanged() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        let updated = store
            .upvote_project(project.id, None, "10.0.0.1")
            .await
            .unwrap();
        assert_eq!(updated.upvote_count, 1);

        let err = store
            .upvote_project(project.id, None, "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateVote(_)));

        let project = store.project_by_id(project.id).await.unwrap().unwrap();
        assert_eq!(project.upvote_count, 1);
    }

    #[tokio::test]
    async fn upvote_unknown_project_is_not_found() {
        let store = MemStore::new();
        let err = store.upvote_project(42, None, "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn accepted_upvotes_count_and_promote_status() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        let mut latest = project.clone();
        for i in 0..25 {
            latest = store
                .upvote_project(project.id, None, &format!("10.0.0.{i}"))
                .await
                .unwrap();
        }
        assert_eq!(latest.upvote_count, 25);
        assert_eq!(latest.progress_status, ProgressStatus::CommunitySupport);
    }

    #[tokio::test]
    async fn fifty_emails_promote_to_campaign_active() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        let mut latest = project.clone();
        for _ in 0..50 {
            let (_, updated) = store
                .record_email(NewEmailRecord {
                    project_id: project.id,
                    sender_email: None,
                    sender_name: None,
                    custom_body: None,
                })
                .await
                .unwrap();
            latest = updated;
        }
        assert_eq!(latest.emails_sent_count, 50);
        assert_eq!(latest.progress_status, ProgressStatus::EmailCampaignActive);
    }

    #[tokio::test]
    async fn manual_status_survives_further_engagement() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        store
            .update_project(
                project.id,
                ProjectPatch {
                    progress_status: Some(ProgressStatus::PlanningStage),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let mut latest = project.clone();
        for i in 0..100 {
            latest = store
                .upvote_project(project.id, None, &format!("10.1.{}.{}", i / 256, i % 256))
                .await
                .unwrap();
        }
        assert_eq!(latest.upvote_count, 100);
        assert_eq!(latest.progress_status, ProgressStatus::PlanningStage);
    }

    #[tokio::test]
    async fn status_change_records_activity_only_when_changed() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();

        store
            .update_project(
                project.id,
                ProjectPatch {
                    progress_status: Some(ProgressStatus::OfficialAcknowledgment),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        // Same value again: no second status_change record.
        store
            .update_project(
                project.id,
                ProjectPatch {
                    progress_status: Some(ProgressStatus::OfficialAcknowledgment),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let changes: Vec<_> = store
            .activities_for_project(project.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.activity_type == ActivityKind::StatusChange)
            .collect();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].description.contains("official_acknowledgment"));
    }

    #[tokio::test]
    async fn activities_are_newest_first_with_monotonic_timestamps() {
        let store = MemStore::new();
        let project = store.create_project(new_project("Pothole")).await.unwrap();
        store
            .upvote_project(project.id, None, "10.0.0.1")
            .await
            .unwrap();
        store
            .add_comment(NewComment {
                project_id: project.id,
                text: "Agreed, this is bad.".to_string(),
                commenter_name: "David Chen".to_string(),
            })
            .await
            .unwrap();

        let activities = store.activities_for_project(project.id).await.unwrap();
        assert_eq!(activities.len(), 3);
        assert_eq!(activities[0].activity_type, ActivityKind::CommentAdded);
        assert_eq!(activities[2].activity_type, ActivityKind::ProjectCreated);
        for pair in activities.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn comment_on_missing_project_still_records_activity() {
        let store = MemStore::new();
        let comment = store
            .add_comment(NewComment {
                project_id: 99,
                text: "Orphaned".to_string(),
                commenter_name: "Sarah Williams".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(comment.project_id, 99);

        let activities = store.activities_for_project(99).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert!(activities[0].description.contains("Unknown Project"));
    }

    #[tokio::test]
    async fn listing_sorts_by_upvotes_with_insertion_order_ties() {
        let store = MemStore::new();
        let first = store.create_project(new_project("First")).await.unwrap();
        let second = store.create_project(new_project("Second")).await.unwrap();
        let third = store.create_project(new_project("Third")).await.unwrap();
        store
            .upvote_project(second.id, None, "10.0.0.1")
            .await
            .unwrap();

        let all = store.all_projects().await.unwrap();
        let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First", "Third"]);
        assert_eq!(all[0].id, second.id);
        let _ = (first, third);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_title_description_location() {
        let store = MemStore::new();
        store.create_project(new_project("Dark corner")).await.unwrap();
        let mut other = new_project("Streetlight out");
        other.location = "Elm Avenue".to_string();
        store.create_project(other).await.unwrap();

        let by_title = store.search_projects("STREETLIGHT").await.unwrap();
        assert_eq!(by_title.len(), 1);
        let by_location = store.search_projects("elm").await.unwrap();
        assert_eq!(by_location.len(), 1);
        let by_description = store.search_projects("bus stop").await.unwrap();
        assert_eq!(by_description.len(), 2);
    }

    #[tokio::test]
    async fn stats_bounds_and_zero_project_case() {
        let store = MemStore::new();
        let empty = store.community_stats().await.unwrap();
        assert_eq!(empty.success_rate_percent, 0);
        assert_eq!(empty.active_issues, 0);

        let a = store.create_project(new_project("A")).await.unwrap();
        store.create_project(new_project("B")).await.unwrap();
        store
            .update_project(
                a.id,
                ProjectPatch {
                    progress_status: Some(ProgressStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stats = store.community_stats().await.unwrap();
        assert_eq!(stats.active_issues, 1);
        assert_eq!(stats.issues_resolved, 1);
        assert_eq!(stats.success_rate_percent, 50);
        assert!((0..=100).contains(&stats.success_rate_percent));
    }

    #[tokio::test]
    async fn email_total_comes_from_records_not_counters() {
        let store = MemStore::new();
        let a = store.create_project(new_project("A")).await.unwrap();
        let b = store.create_project(new_project("B")).await.unwrap();
        for project_id in [a.id, a.id, b.id] {
            store
                .record_email(NewEmailRecord {
                    project_id,
                    sender_email: Some("alex@example.com".to_string()),
                    sender_name: Some("Alex Johnson".to_string()),
                    custom_body: None,
                })
                .await
                .unwrap();
        }

        let stats = store.community_stats().await.unwrap();
        assert_eq!(stats.total_emails_sent, 3);
        assert_eq!(store.emails_for_project(a.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn user_lookups_are_case_insensitive() {
        let store = MemStore::new();
        let user = store
            .create_user(NewUser {
                username: "MariaLopez".to_string(),
                email: "Maria@Example.com".to_string(),
                password_hash: "hash".to_string(),
                full_name: None,
                profile_picture: None,
            })
            .await
            .unwrap();

        assert!(store.user_by_username("marialopez").await.unwrap().is_some());
        assert!(store.user_by_email("maria@example.com").await.unwrap().is_some());
        assert_eq!(store.user_by_id(user.id).await.unwrap().unwrap().id, user.id);
        assert_eq!(user.role, UserRole::User);
        assert!(user.verification_token.is_some());
    }
}
