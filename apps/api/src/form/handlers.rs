use axum::{
    extract::{
        multipart::MultipartRejection, FromRequest, FromRequestParts, Multipart, Path, Query,
        State,
    },
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend_client::SubmissionResult;
use crate::errors::AppError;
use crate::form::education::EducationField;
use crate::form::experience::ExperienceField;
use crate::form::orchestrator::FormView;
use crate::form::personal::PersonalField;
use crate::form::Section;
use crate::models::record::{EntryId, ExperienceKind};
use crate::models::repository::RepositorySummary;
use crate::state::AppState;

const IMAGE_PART: &str = "image";

/// `Query` that rejects with the JSON error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Path` that rejects with the JSON error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// `Json` body that rejects with the JSON error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigateAction {
    Next,
    Previous,
    Jump,
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    pub action: NavigateAction,
    pub section: Option<Section>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResponse {
    pub moved: bool,
    pub form: FormView,
}

#[derive(Deserialize)]
pub struct FieldUpdate<F> {
    pub field: F,
    pub value: String,
}

#[derive(Deserialize)]
pub struct ItemUpdate {
    pub value: String,
}

#[derive(Deserialize)]
pub struct ContactIconsToggle {
    pub show: bool,
}

#[derive(Deserialize)]
pub struct KindRequest {
    #[serde(default)]
    pub kind: ExperienceKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub repository_id: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntry {
    pub id: EntryId,
    pub form: FormView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub saved: bool,
}

/// GET /api/v1/form
pub async fn handle_get_form(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let view = form.lock().await.view();
    Json(view)
}

/// DELETE /api/v1/form
pub async fn handle_reset_form(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.reset().await;
    Json(form.view())
}

/// POST /api/v1/form/navigate
pub async fn handle_navigate(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<NavigateRequest>,
) -> Result<Json<NavigateResponse>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    let moved = match req.action {
        NavigateAction::Next => form.next(),
        NavigateAction::Previous => form.previous(),
        NavigateAction::Jump => {
            let section = req.section.ok_or_else(|| {
                AppError::Validation("'section' is required for jump".to_string())
            })?;
            form.jump(section)
        }
    };
    Ok(Json(NavigateResponse {
        moved,
        form: form.view(),
    }))
}

/// POST /api/v1/form/snapshot
pub async fn handle_save_snapshot(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<SnapshotResponse> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let saved = form.lock().await.save_snapshot().await;
    Json(SnapshotResponse { saved })
}

/// PATCH /api/v1/form/personal
pub async fn handle_update_personal(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<FieldUpdate<PersonalField>>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.update_personal(req.field, &req.value).await;
    Json(form.view())
}

/// PATCH /api/v1/form/personal/contact-icons
pub async fn handle_set_contact_icons(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<ContactIconsToggle>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.set_show_icons(req.show).await;
    Json(form.view())
}

/// PUT /api/v1/form/personal/image
/// Multipart upload; the file goes in the `image` part.
pub async fn handle_upload_image(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FormView>, AppError> {
    let mut multipart = multipart?;
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(IMAGE_PART) {
            continue;
        }
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((mime_type, data));
        break;
    }

    let (mime_type, data) =
        upload.ok_or_else(|| AppError::Validation(format!("Missing '{IMAGE_PART}' part")))?;

    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.set_profile_image(&mime_type, &data).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/personal/image
pub async fn handle_clear_image(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.clear_profile_image().await;
    Json(form.view())
}

/// POST /api/v1/form/education
pub async fn handle_add_education(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<CreatedEntry> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    let id = form.add_education().await;
    Json(CreatedEntry {
        id,
        form: form.view(),
    })
}

/// PATCH /api/v1/form/education/:id
pub async fn handle_update_education(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<FieldUpdate<EducationField>>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.update_education(id, req.field, &req.value).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/education/:id
pub async fn handle_remove_education(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.remove_education(id).await?;
    Ok(Json(form.view()))
}

/// POST /api/v1/form/education/:id/achievements
pub async fn handle_add_achievement(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.add_achievement(id).await?;
    Ok(Json(form.view()))
}

/// PATCH /api/v1/form/education/:id/achievements/:index
pub async fn handle_update_achievement(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(EntryId, usize)>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<ItemUpdate>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.update_achievement(id, index, &req.value).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/education/:id/achievements/:index
pub async fn handle_remove_achievement(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(EntryId, usize)>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.remove_achievement(id, index).await?;
    Ok(Json(form.view()))
}

/// POST /api/v1/form/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<KindRequest>,
) -> Json<CreatedEntry> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    let id = form.add_experience(req.kind).await;
    Json(CreatedEntry {
        id,
        form: form.view(),
    })
}

/// PATCH /api/v1/form/experience/:id
pub async fn handle_update_experience(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<FieldUpdate<ExperienceField>>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.update_experience(id, req.field, &req.value).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/experience/:id
pub async fn handle_remove_experience(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.remove_experience(id).await?;
    Ok(Json(form.view()))
}

/// PUT /api/v1/form/experience/:id/kind
pub async fn handle_set_experience_kind(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<KindRequest>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.set_experience_kind(id, req.kind).await?;
    Ok(Json(form.view()))
}

/// POST /api/v1/form/experience/:id/technologies
pub async fn handle_add_technology(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.add_technology(id).await?;
    Ok(Json(form.view()))
}

/// PATCH /api/v1/form/experience/:id/technologies/:index
pub async fn handle_update_technology(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(EntryId, usize)>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<ItemUpdate>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.update_technology(id, index, &req.value).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/experience/:id/technologies/:index
pub async fn handle_remove_technology(
    State(state): State<AppState>,
    AppPath((id, index)): AppPath<(EntryId, usize)>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.remove_technology(id, index).await?;
    Ok(Json(form.view()))
}

/// PUT /api/v1/form/experience/:id/repository
pub async fn handle_link_repository(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
    AppJson(req): AppJson<LinkRequest>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.link_repository(id, req.repository_id).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/experience/:id/repository
pub async fn handle_unlink_repository(
    State(state): State<AppState>,
    AppPath(id): AppPath<EntryId>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.unlink_repository(id).await?;
    Ok(Json(form.view()))
}

/// GET /api/v1/repositories
/// Fetches without holding the session lock, then caches the list.
pub async fn handle_list_repositories(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<Vec<RepositorySummary>>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let source = form.lock().await.repository_source();
    let repositories = source.list_repositories().await?;
    form.lock().await.cache_repositories(repositories.clone());
    Ok(Json(repositories))
}

/// PUT /api/v1/form/repositories/:repo_id
pub async fn handle_select_repository(
    State(state): State<AppState>,
    AppPath(repo_id): AppPath<u64>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.select_repository(repo_id).await?;
    Ok(Json(form.view()))
}

/// DELETE /api/v1/form/repositories/:repo_id
pub async fn handle_deselect_repository(
    State(state): State<AppState>,
    AppPath(repo_id): AppPath<u64>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Json<FormView> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let mut form = form.lock().await;
    form.deselect_repository(repo_id).await;
    Json(form.view())
}

/// POST /api/v1/form/submit
///
/// The collaborator call runs in its own task with the session unlocked, so
/// edits keep flowing and the pending flag is cleared even if the client
/// goes away mid-request. A task that dies without an outcome also clears it.
pub async fn handle_submit(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<OwnerQuery>,
) -> Result<Json<SubmissionResult>, AppError> {
    let form = state.sessions.get_or_open(q.user_id).await;
    let (request, submitter) = {
        let mut guard = form.lock().await;
        (guard.begin_submission()?, guard.submitter())
    };

    let task = tokio::spawn({
        let form = form.clone();
        async move {
            let outcome = submitter.submit(&request).await;
            let mut guard = form.lock().await;
            guard.finish_submission(outcome)
        }
    });

    match task.await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => {
            form.lock().await.abandon_submission();
            Err(anyhow::anyhow!("submission task failed: {e}").into())
        }
    }
}
