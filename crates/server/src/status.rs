//! Derivation of a project's progress status from community engagement.

use crate::models::ProgressStatus;

/// Emails sent at which a campaign is considered active.
pub const EMAIL_CAMPAIGN_THRESHOLD: i64 = 50;

/// Upvotes at which an issue is considered community-supported.
pub const COMMUNITY_SUPPORT_THRESHOLD: i64 = 25;

/// Compute the next status for a project given its engagement counters.
///
/// Manual statuses (official acknowledgment and beyond) are sticky and are
/// returned unchanged. Otherwise the email threshold takes priority over the
/// upvote threshold. Pure and deterministic; callers must invoke this after
/// every counter mutation.
pub fn derive_status(current: ProgressStatus, upvotes: i64, emails_sent: i64) -> ProgressStatus {
    if current.is_manual() {
        return current;
    }
    if emails_sent >= EMAIL_CAMPAIGN_THRESHOLD {
        ProgressStatus::EmailCampaignActive
    } else if upvotes >= COMMUNITY_SUPPORT_THRESHOLD {
        ProgressStatus::CommunitySupport
    } else {
        ProgressStatus::IdeaSubmitted
    }
}
