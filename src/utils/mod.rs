pub mod api_response;
pub mod blob_store;
pub mod notification;
