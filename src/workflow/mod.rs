pub mod diff;
pub mod error;
pub mod request_id;
pub mod service;
pub mod status;
