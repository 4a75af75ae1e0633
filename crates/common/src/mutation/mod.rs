//! Writes against the remote store and their reflection in the cache

mod coordinator;
mod form;

pub use coordinator::{BulkAction, BulkOutcome, MutationCoordinator};
pub use form::{allowed_transitions, FormPhase, FormState, SubmissionForm};
