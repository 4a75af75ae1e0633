//! Submission form state machine
//!
//! `Editing -> Verifying -> {Verified | Conflicted} -> Submitting -> {Submitted | Failed}`.
//! Any edit while Verified, Conflicted or Failed re-arms the form to Editing,
//! so a submit always follows a verify of exactly the data being sent.

use crate::config::ValidationConfig;
use crate::errors::{AppError, Result};
use crate::models::{BatchOutcome, Branch, PdfUpload, RecordDraft, SubmissionBatch};
use crate::remote::{ExistenceCheck, ExistenceKey};
use tracing::debug;
use uuid::Uuid;

/// Form state with the data each state carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Editing,
    Verifying,
    Verified,
    Conflicted { branches: Vec<Branch> },
    Submitting,
    Submitted { record_ids: Vec<String> },
    Failed { failed: Vec<Branch>, message: String },
}

/// Data-free form of [`FormState`] for the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormPhase {
    Editing,
    Verifying,
    Verified,
    Conflicted,
    Submitting,
    Submitted,
    Failed,
}

impl FormState {
    pub fn phase(&self) -> FormPhase {
        match self {
            FormState::Editing => FormPhase::Editing,
            FormState::Verifying => FormPhase::Verifying,
            FormState::Verified => FormPhase::Verified,
            FormState::Conflicted { .. } => FormPhase::Conflicted,
            FormState::Submitting => FormPhase::Submitting,
            FormState::Submitted { .. } => FormPhase::Submitted,
            FormState::Failed { .. } => FormPhase::Failed,
        }
    }
}

pub fn allowed_transitions(from: FormPhase) -> Vec<FormPhase> {
    use FormPhase::*;
    match from {
        Editing => vec![Verifying],
        Verifying => vec![Verified, Conflicted, Editing],
        Verified => vec![Submitting, Editing],
        Conflicted => vec![Editing],
        Submitting => vec![Submitted, Failed],
        Submitted => vec![Editing],
        Failed => vec![Editing],
    }
}

fn allowed(from: FormPhase, to: FormPhase) -> bool {
    allowed_transitions(from).contains(&to)
}

/// One paper submission being prepared for one or more branches
#[derive(Debug, Clone)]
pub struct SubmissionForm {
    batch_id: String,
    draft: RecordDraft,
    branches: Vec<Branch>,
    upload: Option<PdfUpload>,
    state: FormState,
}

impl SubmissionForm {
    /// Empty form for a submitter
    pub fn new(email: &str) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            draft: RecordDraft {
                email: email.trim().to_lowercase(),
                ..Default::default()
            },
            branches: Vec::new(),
            upload: None,
            state: FormState::Editing,
        }
    }

    pub fn with_draft(draft: RecordDraft, branches: Vec<Branch>) -> Self {
        let mut form = Self::new(&draft.email);
        form.draft = draft;
        for branch in branches {
            if !form.branches.contains(&branch) {
                form.branches.push(branch);
            }
        }
        form
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn draft(&self) -> &RecordDraft {
        &self.draft
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn upload(&self) -> Option<&PdfUpload> {
        self.upload.as_ref()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    fn transition(&mut self, next: FormState) -> Result<()> {
        let (from, to) = (self.state.phase(), next.phase());
        if !allowed(from, to) {
            return Err(AppError::InvalidState {
                message: format!("cannot go from {:?} to {:?}", from, to),
            });
        }
        debug!(batch_id = %self.batch_id, ?from, ?to, "Form transition");
        self.state = next;
        Ok(())
    }

    /// Prepare for a field change; drops any verification result
    fn rearm(&mut self) -> Result<()> {
        match self.state.phase() {
            FormPhase::Editing => Ok(()),
            FormPhase::Verifying | FormPhase::Submitting => Err(AppError::InvalidState {
                message: "form is busy".to_string(),
            }),
            FormPhase::Submitted => Err(AppError::InvalidState {
                message: "form was already submitted; reset it first".to_string(),
            }),
            _ => self.transition(FormState::Editing),
        }
    }

    /// Change draft fields
    pub fn edit<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut RecordDraft),
    {
        self.rearm()?;
        change(&mut self.draft);
        Ok(())
    }

    pub fn select_branch(&mut self, branch: Branch) -> Result<()> {
        self.rearm()?;
        if !self.branches.contains(&branch) {
            self.branches.push(branch);
        }
        Ok(())
    }

    pub fn deselect_branch(&mut self, branch: Branch) -> Result<()> {
        self.rearm()?;
        self.branches.retain(|b| *b != branch);
        Ok(())
    }

    pub fn set_branches(&mut self, branches: Vec<Branch>) -> Result<()> {
        self.rearm()?;
        self.branches.clear();
        for branch in branches {
            if !self.branches.contains(&branch) {
                self.branches.push(branch);
            }
        }
        Ok(())
    }

    /// Attach PDF metadata after checking type and size
    pub fn attach_pdf(&mut self, upload: PdfUpload, max_bytes: u64) -> Result<()> {
        upload.validate(max_bytes)?;
        self.rearm()?;
        self.upload = Some(upload);
        Ok(())
    }

    /// Validate locally and move to Verifying. Validation errors leave the
    /// form in Editing and nothing is sent.
    pub fn begin_verify(&mut self, rules: &ValidationConfig) -> Result<ExistenceKey> {
        if self.state.phase() != FormPhase::Editing {
            return Err(AppError::InvalidState {
                message: format!("cannot verify from {:?}", self.state.phase()),
            });
        }

        let code = self.draft.check(rules)?;
        if self.branches.is_empty() {
            return Err(AppError::Validation {
                message: "select at least one branch".to_string(),
                field: Some("branches".into()),
            });
        }
        if let Some(upload) = &self.upload {
            upload.validate(rules.max_pdf_bytes)?;
        }

        let key = ExistenceKey {
            year: self.draft.year.trim().to_string(),
            semester: self.draft.semester.trim().to_string(),
            paper_code: code.to_string(),
            paper_type: self.draft.type_label().to_string(),
            branches: self.branches.clone(),
        };
        self.transition(FormState::Verifying)?;
        Ok(key)
    }

    /// Apply the existence-check answer
    pub fn finish_verify(&mut self, check: &ExistenceCheck) -> Result<()> {
        if !check.exists {
            return self.transition(FormState::Verified);
        }
        let branches = if check.conflicting_branches.is_empty() {
            self.branches.clone()
        } else {
            check.conflicting_branches.clone()
        };
        self.transition(FormState::Conflicted { branches })
    }

    /// The check never completed; back to Editing
    pub fn abort_verify(&mut self) -> Result<()> {
        self.transition(FormState::Editing)
    }

    /// Move to Submitting and produce the batch to create
    pub fn begin_submit(&mut self) -> Result<SubmissionBatch> {
        if let FormState::Conflicted { branches } = &self.state {
            return Err(AppError::Conflict {
                branches: branches.iter().map(|b| b.code().to_string()).collect(),
            });
        }
        if self.state.phase() != FormPhase::Verified {
            return Err(AppError::InvalidState {
                message: "verify the submission before submitting".to_string(),
            });
        }

        self.transition(FormState::Submitting)?;
        Ok(SubmissionBatch::new(
            self.batch_id.clone(),
            self.draft.clone(),
            self.branches.clone(),
        ))
    }

    /// Record the fan-out result
    pub fn finish_submit(&mut self, outcome: &BatchOutcome) -> Result<()> {
        if outcome.is_complete() {
            let record_ids = outcome.saved.iter().map(|(_, id)| id.clone()).collect();
            return self.transition(FormState::Submitted { record_ids });
        }

        let message = outcome
            .failed
            .first()
            .map(|f| f.error.user_message())
            .unwrap_or_default();
        self.transition(FormState::Failed {
            failed: outcome.failed_branches(),
            message,
        })
    }

    /// The whole create call failed
    pub fn fail(&mut self, error: &AppError) -> Result<()> {
        self.transition(FormState::Failed {
            failed: self.branches.clone(),
            message: error.user_message(),
        })
    }

    /// Keep only the branches that failed, ready to verify and send again.
    /// The batch id is kept so re-sent records carry the same ids.
    pub fn retain_failed(&mut self) -> Result<()> {
        let FormState::Failed { failed, .. } = &self.state else {
            return Err(AppError::InvalidState {
                message: "no failed submission to retry".to_string(),
            });
        };
        let failed = failed.clone();
        self.transition(FormState::Editing)?;
        self.branches.retain(|b| failed.contains(b));
        Ok(())
    }

    /// Start over with a new batch, keeping the submitter
    pub fn reset(&mut self) -> Result<()> {
        if matches!(self.state.phase(), FormPhase::Verifying | FormPhase::Submitting) {
            return Err(AppError::InvalidState {
                message: "form is busy".to_string(),
            });
        }
        *self = Self::new(&self.draft.email);
        Ok(())
    }
}
