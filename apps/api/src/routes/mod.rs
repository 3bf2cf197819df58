pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::form::handlers;
use crate::state::AppState;

/// Room for a maximum-size image plus multipart framing, so oversize files
/// reach the image validator instead of being cut off by the transport.
const IMAGE_BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Form session
        .route(
            "/api/v1/form",
            get(handlers::handle_get_form).delete(handlers::handle_reset_form),
        )
        .route("/api/v1/form/navigate", post(handlers::handle_navigate))
        .route("/api/v1/form/snapshot", post(handlers::handle_save_snapshot))
        .route("/api/v1/form/submit", post(handlers::handle_submit))
        // Personal
        .route("/api/v1/form/personal", patch(handlers::handle_update_personal))
        .route(
            "/api/v1/form/personal/contact-icons",
            patch(handlers::handle_set_contact_icons),
        )
        .route(
            "/api/v1/form/personal/image",
            put(handlers::handle_upload_image)
                .delete(handlers::handle_clear_image)
                .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        // Education
        .route("/api/v1/form/education", post(handlers::handle_add_education))
        .route(
            "/api/v1/form/education/:id",
            patch(handlers::handle_update_education).delete(handlers::handle_remove_education),
        )
        .route(
            "/api/v1/form/education/:id/achievements",
            post(handlers::handle_add_achievement),
        )
        .route(
            "/api/v1/form/education/:id/achievements/:index",
            patch(handlers::handle_update_achievement).delete(handlers::handle_remove_achievement),
        )
        // Experience
        .route("/api/v1/form/experience", post(handlers::handle_add_experience))
        .route(
            "/api/v1/form/experience/:id",
            patch(handlers::handle_update_experience).delete(handlers::handle_remove_experience),
        )
        .route(
            "/api/v1/form/experience/:id/kind",
            put(handlers::handle_set_experience_kind),
        )
        .route(
            "/api/v1/form/experience/:id/technologies",
            post(handlers::handle_add_technology),
        )
        .route(
            "/api/v1/form/experience/:id/technologies/:index",
            patch(handlers::handle_update_technology).delete(handlers::handle_remove_technology),
        )
        .route(
            "/api/v1/form/experience/:id/repository",
            put(handlers::handle_link_repository).delete(handlers::handle_unlink_repository),
        )
        // Repositories
        .route("/api/v1/repositories", get(handlers::handle_list_repositories))
        .route(
            "/api/v1/form/repositories/:repo_id",
            put(handlers::handle_select_repository).delete(handlers::handle_deselect_repository),
        )
        .with_state(state)
}
