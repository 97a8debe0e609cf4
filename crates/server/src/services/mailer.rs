//! Outbound mail transport seam.
//!
//! Actual SMTP delivery is an external collaborator; the shipped transport is
//! the simulation mode that logs the message and reports success. Transport
//! failure aborts the whole send-email operation, so implementations must only
//! return `Ok` once the message has been handed off.

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from: String,
    pub sender_name: Option<String>,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Logs the message instead of delivering it. Used outside production and
/// whenever no SMTP host is configured.
pub struct SimulatedMailer;

#[async_trait]
impl MailTransport for SimulatedMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let from = match &email.sender_name {
            Some(name) => format!("{name} <{}>", email.from),
            None => email.from.clone(),
        };
        tracing::info!(
            from = %from,
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "simulated outbound email"
        );
        tracing::debug!("email body:\n{}", email.body);
        Ok(())
    }
}

/// Lowercase, trim and shallow-validate an email address. Returns `None` for
/// anything that does not look like an address.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    if email.chars().any(char::is_whitespace) || domain.contains('@') {
        return None;
    }
    Some(email)
}
