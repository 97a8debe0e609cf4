//! Entity storage. All entities are owned by the store; other components hold
//! references and go through the store's mutation operations, which are each
//! serialized so counters never see lost updates.

pub mod memory;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        Activity, Comment, CommunityStats, EmailRecord, IssueType, NewComment, NewEmailRecord,
        NewProject, NewUser, Project, ProjectPatch, ProgressStatus, Upvote, User,
    },
};

pub use memory::MemStore;

/// Storage backend seam. The shipped backend is [`MemStore`]; a table-backed
/// implementation can be swapped in without touching the core logic.
#[async_trait]
pub trait Storage: Send + Sync {
    // User operations
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    // Project operations
    async fn create_project(&self, project: NewProject) -> Result<Project>;
    async fn project_by_id(&self, id: i64) -> Result<Option<Project>>;
    async fn all_projects(&self) -> Result<Vec<Project>>;
    async fn projects_by_type(&self, issue_type: IssueType) -> Result<Vec<Project>>;
    async fn projects_by_status(&self, status: ProgressStatus) -> Result<Vec<Project>>;
    async fn search_projects(&self, query: &str) -> Result<Vec<Project>>;

    /// Merge `patch` into the stored project (last-write-wins) and return the
    /// updated entity, or `None` if the id is absent. A status change records
    /// a `status_change` activity.
    async fn update_project(&self, id: i64, patch: ProjectPatch) -> Result<Option<Project>>;

    // Upvote operations
    /// Record an upvote, bump the project's counter, re-derive its status and
    /// record the matching activities, as one serialized unit. Fails with
    /// `NotFound` for an unknown project and `DuplicateVote` for a repeated
    /// origin address.
    async fn upvote_project(
        &self,
        project_id: i64,
        user_id: Option<i64>,
        ip_address: &str,
    ) -> Result<Project>;
    async fn has_upvoted(&self, project_id: i64, ip_address: &str) -> Result<bool>;
    async fn upvotes_for_project(&self, project_id: i64) -> Result<Vec<Upvote>>;

    // Email operations
    /// Record a sent email, bump the project's counter, re-derive its status
    /// and record the matching activities, as one serialized unit. Callers
    /// must only invoke this after the mail transport reported success.
    async fn record_email(&self, email: NewEmailRecord) -> Result<(EmailRecord, Project)>;
    async fn emails_for_project(&self, project_id: i64) -> Result<Vec<EmailRecord>>;

    // Comment operations
    async fn add_comment(&self, comment: NewComment) -> Result<Comment>;
    async fn comments_for_project(&self, project_id: i64) -> Result<Vec<Comment>>;

    // Activity operations
    async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>>;
    async fn activities_for_project(&self, project_id: i64) -> Result<Vec<Activity>>;

    // Stats operations
    async fn community_stats(&self) -> Result<CommunityStats>;
}
