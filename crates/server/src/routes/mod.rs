pub mod activities;
pub mod comments;
pub mod emails;
pub mod projects;
pub mod stats;
pub mod users;
