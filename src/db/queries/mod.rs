pub mod approvals;
pub mod attachments;
pub mod counters;
pub mod details;
pub mod history;
pub mod requests;
pub mod user;
