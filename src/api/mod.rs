use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi};

pub mod approvals;
pub mod attachments;
pub mod details;
pub mod health;
pub mod history;
pub mod requests;
pub mod user;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Code approvals",
        description = "Approval workflow for plant and company code master data"
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// The full OpenAPI document served at `/api-docs/openapi.json`.
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
        .merge_from(requests::RequestDoc::openapi())
        .merge_from(details::DetailsDoc::openapi())
        .merge_from(approvals::ApprovalDoc::openapi())
        .merge_from(history::HistoryDoc::openapi())
        .merge_from(attachments::AttachmentDoc::openapi())
        .merge_from(user::UserDoc::openapi())
}
