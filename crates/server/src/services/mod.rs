pub mod drafter;
pub mod mailer;
