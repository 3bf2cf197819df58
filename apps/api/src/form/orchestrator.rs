//! Form orchestrator. Owns one user's in-progress record.
//!
//! Holds the section cursor, routes edits to the section models, commits the
//! updates they hand back and writes the full record through to the session
//! tier after every commit. Submission runs whole-record validation first and
//! only then calls the generation backend.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend_client::{SubmissionBackend, SubmissionRequest, SubmissionResult};
use crate::errors::CollaboratorError;
use crate::form::education::{EducationField, EducationSection};
use crate::form::experience::{ExperienceField, ExperienceSection};
use crate::form::field_errors::FieldErrorView;
use crate::form::personal::{PersonalField, PersonalSection};
use crate::form::validation::{validate_record, SubmissionIssue};
use crate::form::validators::ImageRejection;
use crate::form::{Section, SectionUpdate};
use crate::github::RepositorySource;
use crate::models::record::{AggregateRecord, EntryId, ExperienceKind};
use crate::models::repository::RepositorySummary;
use crate::persistence::FormPersistence;

/// Stores and collaborators every orchestrator is built with.
#[derive(Clone)]
pub struct FormContext {
    pub persistence: FormPersistence,
    pub submitter: Arc<dyn SubmissionBackend>,
    pub repositories: Arc<dyn RepositorySource>,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Entry {0} not found")]
    EntryNotFound(EntryId),

    #[error("Entry {id} has no item at index {index}")]
    ItemNotFound { id: EntryId, index: usize },

    #[error("Repository {0} is not in the loaded repository list")]
    RepositoryNotFound(u64),

    #[error("Image rejected: {0}")]
    Image(#[from] ImageRejection),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission is only possible from the final section")]
    NotOnFinalSection,

    #[error("A submission is already in progress")]
    AlreadyPending,

    #[error("Form has {} blocking issue(s)", .0.len())]
    Invalid(Vec<SubmissionIssue>),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFieldError {
    pub section: Section,
    #[serde(flatten)]
    pub error: FieldErrorView,
}

/// Read-only snapshot of an orchestrator, as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub owner: Uuid,
    pub active_section: Section,
    pub sections: [Section; 3],
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub record: AggregateRecord,
    pub field_errors: Vec<SectionFieldError>,
    pub issues: Vec<SubmissionIssue>,
    pub submission_pending: bool,
    pub cached_repositories: usize,
}

pub struct FormOrchestrator {
    owner: Uuid,
    ctx: FormContext,
    record: AggregateRecord,
    active: Section,
    personal: PersonalSection,
    education: EducationSection,
    experience: ExperienceSection,
    issues: Vec<SubmissionIssue>,
    pending: bool,
    repositories: Vec<RepositorySummary>,
}

impl FormOrchestrator {
    /// Restores the owner's record from persistence, or starts from the template.
    pub async fn open(owner: Uuid, ctx: FormContext) -> Self {
        let record = ctx.persistence.load(owner).await;
        Self {
            owner,
            ctx,
            record,
            active: Section::first(),
            personal: PersonalSection::default(),
            education: EducationSection::default(),
            experience: ExperienceSection::default(),
            issues: Vec::new(),
            pending: false,
            repositories: Vec::new(),
        }
    }

    pub fn record(&self) -> &AggregateRecord {
        &self.record
    }

    pub fn active_section(&self) -> Section {
        self.active
    }

    pub fn next(&mut self) -> bool {
        match self.active.next() {
            Some(section) => {
                self.active = section;
                true
            }
            None => false,
        }
    }

    pub fn previous(&mut self) -> bool {
        match self.active.previous() {
            Some(section) => {
                self.active = section;
                true
            }
            None => false,
        }
    }

    pub fn jump(&mut self, section: Section) -> bool {
        self.active = section;
        true
    }

    pub async fn update_personal(&mut self, field: PersonalField, value: &str) {
        let update = self.personal.update(&self.record.personal, field, value);
        self.commit(update).await;
    }

    pub async fn set_profile_image(
        &mut self,
        mime_type: &str,
        data: &[u8],
    ) -> Result<(), FormError> {
        let update = self
            .personal
            .set_image(&self.record.personal, mime_type, data)?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn clear_profile_image(&mut self) {
        let update = self.personal.clear_image(&self.record.personal);
        self.commit(update).await;
    }

    pub async fn set_show_icons(&mut self, show: bool) {
        let update = self.personal.set_show_icons(&self.record.personal, show);
        self.commit(update).await;
    }

    pub async fn add_education(&mut self) -> EntryId {
        let (id, update) = self.education.add(&self.record.education);
        self.commit(update).await;
        id
    }

    pub async fn update_education(
        &mut self,
        id: EntryId,
        field: EducationField,
        value: &str,
    ) -> Result<(), FormError> {
        let update = self
            .education
            .update(&self.record.education, id, field, value)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn remove_education(&mut self, id: EntryId) -> Result<(), FormError> {
        let update = self
            .education
            .remove(&self.record.education, id)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn add_achievement(&mut self, id: EntryId) -> Result<(), FormError> {
        let update = self
            .education
            .add_achievement(&self.record.education, id)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn update_achievement(
        &mut self,
        id: EntryId,
        index: usize,
        value: &str,
    ) -> Result<(), FormError> {
        self.require_education(id)?;
        let update = self
            .education
            .update_achievement(&self.record.education, id, index, value)
            .ok_or(FormError::ItemNotFound { id, index })?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn remove_achievement(&mut self, id: EntryId, index: usize) -> Result<(), FormError> {
        self.require_education(id)?;
        let update = self
            .education
            .remove_achievement(&self.record.education, id, index)
            .ok_or(FormError::ItemNotFound { id, index })?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn add_experience(&mut self, kind: ExperienceKind) -> EntryId {
        let (id, update) = self.experience.add(&self.record.experience, kind);
        self.commit(update).await;
        debug!("Added {} entry {id} for {}", kind.as_str(), self.owner);
        id
    }

    pub async fn update_experience(
        &mut self,
        id: EntryId,
        field: ExperienceField,
        value: &str,
    ) -> Result<(), FormError> {
        let update = self
            .experience
            .update(&self.record.experience, id, field, value)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn set_experience_kind(
        &mut self,
        id: EntryId,
        kind: ExperienceKind,
    ) -> Result<(), FormError> {
        let update = self
            .experience
            .set_kind(&self.record.experience, id, kind)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn remove_experience(&mut self, id: EntryId) -> Result<(), FormError> {
        let update = self
            .experience
            .remove(&self.record.experience, id)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn add_technology(&mut self, id: EntryId) -> Result<(), FormError> {
        let update = self
            .experience
            .add_technology(&self.record.experience, id)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn update_technology(
        &mut self,
        id: EntryId,
        index: usize,
        value: &str,
    ) -> Result<(), FormError> {
        self.require_experience(id)?;
        let update = self
            .experience
            .update_technology(&self.record.experience, id, index, value)
            .ok_or(FormError::ItemNotFound { id, index })?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn remove_technology(&mut self, id: EntryId, index: usize) -> Result<(), FormError> {
        self.require_experience(id)?;
        let update = self
            .experience
            .remove_technology(&self.record.experience, id, index)
            .ok_or(FormError::ItemNotFound { id, index })?;
        self.commit(update).await;
        Ok(())
    }

    /// Links an entry to a repository from the loaded list.
    pub async fn link_repository(
        &mut self,
        id: EntryId,
        repository_id: u64,
    ) -> Result<(), FormError> {
        let repository = self
            .repositories
            .iter()
            .find(|r| r.id == repository_id)
            .ok_or(FormError::RepositoryNotFound(repository_id))?;
        let update = self
            .experience
            .link_repository(&self.record.experience, id, repository)
            .ok_or(FormError::EntryNotFound(id))?;
        self.commit(update).await;
        Ok(())
    }

    pub async fn unlink_repository(&mut self, id: EntryId) -> Result<(), FormError> {
        self.require_experience(id)?;
        if let Some(update) = self.experience.unlink_repository(&self.record.experience, id) {
            self.commit(update).await;
        }
        Ok(())
    }

    pub async fn select_repository(&mut self, repository_id: u64) -> Result<(), FormError> {
        if !self.repositories.iter().any(|r| r.id == repository_id) {
            return Err(FormError::RepositoryNotFound(repository_id));
        }
        if let Some(update) = self
            .experience
            .select_repository(&self.record.selected_repositories, repository_id)
        {
            self.commit(update).await;
        }
        Ok(())
    }

    pub async fn deselect_repository(&mut self, repository_id: u64) {
        if let Some(update) = self
            .experience
            .deselect_repository(&self.record.selected_repositories, repository_id)
        {
            self.commit(update).await;
        }
    }

    pub fn repository_source(&self) -> Arc<dyn RepositorySource> {
        self.ctx.repositories.clone()
    }

    pub fn cache_repositories(&mut self, repositories: Vec<RepositorySummary>) {
        debug!("Cached {} repositories for {}", repositories.len(), self.owner);
        self.repositories = repositories;
    }

    /// Fetches the repository list and caches it while holding `&mut self`.
    #[cfg(test)]
    pub async fn load_repositories(&mut self) -> Result<&[RepositorySummary], CollaboratorError> {
        let repositories = self.ctx.repositories.list_repositories().await?;
        self.cache_repositories(repositories);
        Ok(&self.repositories)
    }

    /// Runs whole-record validation and keeps the result for the view.
    pub fn validate(&mut self) -> &[SubmissionIssue] {
        self.issues = validate_record(&self.record);
        &self.issues
    }

    /// Checks the preconditions, marks the submission pending and builds the
    /// request. Pair with [`finish_submission`](Self::finish_submission).
    pub fn begin_submission(&mut self) -> Result<SubmissionRequest, SubmitError> {
        if self.active != Section::last() {
            return Err(SubmitError::NotOnFinalSection);
        }
        if self.pending {
            return Err(SubmitError::AlreadyPending);
        }
        if !self.validate().is_empty() {
            info!(
                "Submission for {} blocked by {} issue(s)",
                self.owner,
                self.issues.len()
            );
            return Err(SubmitError::Invalid(self.issues.clone()));
        }

        self.pending = true;
        Ok(SubmissionRequest {
            form_data: self.record.clone(),
            repositories: self.selected_repository_summaries(),
        })
    }

    /// Clears the pending flag and passes the collaborator outcome through.
    /// The record is never touched here.
    pub fn finish_submission(
        &mut self,
        outcome: Result<SubmissionResult, CollaboratorError>,
    ) -> Result<SubmissionResult, SubmitError> {
        self.pending = false;
        match outcome {
            Ok(result) => {
                info!("Submission for {} succeeded: {}", self.owner, result.pdf_url);
                Ok(result)
            }
            Err(e) => {
                warn!("Submission for {} failed: {e}", self.owner);
                Err(SubmitError::Collaborator(e))
            }
        }
    }

    /// Validates and submits while holding `&mut self` for the whole call.
    #[cfg(test)]
    pub async fn submit(&mut self) -> Result<SubmissionResult, SubmitError> {
        let request = self.begin_submission()?;
        let outcome = self.ctx.submitter.submit(&request).await;
        self.finish_submission(outcome)
    }

    /// Clears the pending flag when the submission task ended without an outcome.
    pub fn abandon_submission(&mut self) {
        if std::mem::take(&mut self.pending) {
            warn!("Submission for {} abandoned without an outcome", self.owner);
        }
    }

    pub fn submitter(&self) -> Arc<dyn SubmissionBackend> {
        self.ctx.submitter.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Stores the current record in the durable tier.
    pub async fn save_snapshot(&self) -> bool {
        self.ctx.persistence.save_durable(self.owner, &self.record).await
    }

    /// Back to the template on the first section, with no errors.
    pub async fn reset(&mut self) {
        self.record = AggregateRecord::template();
        self.active = Section::first();
        self.personal.reset();
        self.education.reset();
        self.experience.reset();
        self.issues.clear();
        self.pending = false;
        self.ctx.persistence.clear_session(self.owner).await;
        info!("Form for {} reset", self.owner);
    }

    pub fn view(&self) -> FormView {
        let sections = [
            (Section::Personal, self.personal.errors()),
            (Section::Education, self.education.errors()),
            (Section::Experience, self.experience.errors()),
        ];
        let field_errors = sections
            .into_iter()
            .flat_map(|(section, errors)| {
                errors
                    .views()
                    .map(move |error| SectionFieldError { section, error })
            })
            .collect();

        FormView {
            owner: self.owner,
            active_section: self.active_section(),
            sections: Section::ALL,
            can_go_back: self.active.previous().is_some(),
            can_go_forward: self.active.next().is_some(),
            record: self.record().clone(),
            field_errors,
            issues: self.issues.clone(),
            submission_pending: self.is_pending(),
            cached_repositories: self.repositories.len(),
        }
    }

    /// Applies an update and writes the full record through to the session tier.
    /// Outstanding submission issues are recomputed so they track the edits.
    async fn commit(&mut self, update: SectionUpdate) {
        update.apply(&mut self.record);
        if !self.issues.is_empty() {
            self.issues = validate_record(&self.record);
        }
        self.ctx.persistence.save(self.owner, &self.record).await;
    }

    fn require_education(&self, id: EntryId) -> Result<(), FormError> {
        if self.record.education.iter().any(|e| e.id == id) {
            Ok(())
        } else {
            Err(FormError::EntryNotFound(id))
        }
    }

    fn require_experience(&self, id: EntryId) -> Result<(), FormError> {
        if self.record.experience.iter().any(|e| e.id == id) {
            Ok(())
        } else {
            Err(FormError::EntryNotFound(id))
        }
    }

    /// Selected ids resolved against the cached list, falling back to the
    /// snapshot of a linked entry. Unresolvable ids are skipped.
    fn selected_repository_summaries(&self) -> Vec<RepositorySummary> {
        self.record
            .selected_repositories
            .iter()
            .filter_map(|id| {
                let cached = self.repositories.iter().find(|r| r.id == *id).cloned();
                cached.or_else(|| {
                    self.record
                        .experience
                        .iter()
                        .filter_map(|e| e.repository.as_ref())
                        .find(|link| link.repository_id == *id)
                        .map(|link| link.snapshot.clone())
                })
            })
            .collect()
    }
}
