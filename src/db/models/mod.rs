pub mod approval;
pub mod attachment;
pub mod details;
pub mod history;
pub mod requests;
pub mod user;
