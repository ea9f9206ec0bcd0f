use std::sync::Arc;

use crate::{
    error::{CaptionError, ValidationError},
    model::{
        CaptionRequest, CaptionResult, FileInput, ImageMediaType, RequestState, SelectedFile,
        Submission, SubmissionId,
    },
    services::{PreviewHandle, PreviewService},
};

/// The submission currently awaiting a response.
struct Pending {
    id: SubmissionId,
    file: SelectedFile,
}

/// Drives one credential + image through validation, submission and result
/// display. Every method is a complete transition; responses are fed back in
/// through [`CaptionWorkflow::apply_response`].
pub struct CaptionWorkflow {
    state: RequestState,
    credential: String,
    file: Option<SelectedFile>,
    error: Option<String>,
    result: Option<CaptionResult>,
    preview: Option<PreviewHandle>,
    pending: Option<Pending>,
    last_submission: SubmissionId,
    previews: Arc<dyn PreviewService>,
}

impl CaptionWorkflow {
    pub fn new(previews: Arc<dyn PreviewService>) -> Self {
        Self {
            state: RequestState::Idle,
            credential: String::new(),
            file: None,
            error: None,
            result: None,
            preview: None,
            pending: None,
            last_submission: SubmissionId(0),
            previews,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == RequestState::InFlight
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&CaptionResult> {
        self.result.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_ref().map(PreviewHandle::location)
    }

    pub fn pending_submission(&self) -> Option<SubmissionId> {
        self.pending.as_ref().map(|pending| pending.id)
    }

    pub fn set_credential(&mut self, value: impl Into<String>) {
        if self.is_busy() {
            tracing::debug!("credential edit ignored while a request is in flight");
            return;
        }
        self.credential = value.into();
        self.error = None;
        self.settle_to_idle();
    }

    /// Replaces the selected file. `None` means the picker was dismissed.
    pub fn select_file(&mut self, input: Option<FileInput>) -> Result<(), ValidationError> {
        if self.is_busy() {
            tracing::debug!("file selection ignored while a request is in flight");
            return Ok(());
        }

        self.release_preview();
        self.result = None;
        self.file = None;
        self.state = RequestState::Idle;

        let Some(input) = input else {
            self.error = None;
            return Ok(());
        };

        match ImageMediaType::parse(&input.media_type) {
            Some(media_type) => {
                tracing::debug!(file = %input.name, %media_type, "file selected");
                self.error = None;
                self.file = Some(SelectedFile {
                    name: input.name,
                    media_type,
                    data: Arc::from(input.data),
                });
                Ok(())
            }
            None => {
                tracing::debug!(file = %input.name, media_type = %input.media_type, "file rejected");
                let err = ValidationError::UnsupportedMediaType(input.media_type);
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Validates the inputs and, when they pass, moves to `InFlight` and hands
    /// back the one request to send. Returns `None` while busy or on a
    /// validation failure (the error is then stored for display).
    pub fn submit(&mut self) -> Option<Submission> {
        if self.is_busy() {
            tracing::debug!("submit ignored while a request is in flight");
            return None;
        }

        self.state = RequestState::Validating;
        let file = match self.validate() {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!(error = %err, "submission rejected");
                self.fail(err.to_string());
                return None;
            }
        };

        self.error = None;
        self.result = None;
        self.release_preview();

        let id = self.last_submission.next();
        self.last_submission = id;
        self.pending = Some(Pending {
            id,
            file: file.clone(),
        });
        self.state = RequestState::InFlight;
        tracing::info!(submission = %id, file = %file.name, "caption requested");

        Some(Submission {
            id,
            request: CaptionRequest {
                credential: self.credential.trim().to_string(),
                file,
            },
        })
    }

    /// Applies the response for submission `id`. Responses for anything but
    /// the latest pending submission are dropped; returns whether it applied.
    pub fn apply_response(
        &mut self,
        id: SubmissionId,
        outcome: Result<CaptionResult, CaptionError>,
    ) -> bool {
        let pending = match self.pending.take() {
            Some(pending) if pending.id == id => pending,
            other => {
                self.pending = other;
                tracing::debug!(submission = %id, "stale response discarded");
                return false;
            }
        };

        match outcome {
            Ok(result) => {
                self.release_preview();
                self.preview = match PreviewHandle::acquire(&self.previews, &pending.file) {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        tracing::warn!(error = %err, "preview unavailable");
                        None
                    }
                };
                self.result = Some(result);
                self.error = None;
                self.state = RequestState::Succeeded;
                tracing::info!(submission = %id, "caption received");
            }
            Err(err) => {
                tracing::info!(submission = %id, error = %err, "caption request failed");
                self.fail(err.to_string());
            }
        }
        true
    }

    /// Clears everything and returns to `Idle`. Any in-flight response is
    /// discarded when it arrives.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(submission = %pending.id, "in-flight submission abandoned");
        }
        self.credential.clear();
        self.file = None;
        self.error = None;
        self.result = None;
        self.release_preview();
        self.state = RequestState::Idle;
    }

    fn validate(&self) -> Result<SelectedFile, ValidationError> {
        if self.credential.trim().is_empty() {
            return Err(ValidationError::MissingCredential);
        }
        self.file.clone().ok_or(ValidationError::MissingFile)
    }

    fn fail(&mut self, message: String) {
        self.result = None;
        self.release_preview();
        self.error = Some(message);
        self.state = RequestState::Failed;
    }

    // Leaving a settled state drops its result and preview.
    fn settle_to_idle(&mut self) {
        if matches!(self.state, RequestState::Succeeded | RequestState::Failed) {
            self.result = None;
            self.release_preview();
            self.state = RequestState::Idle;
        }
    }

    fn release_preview(&mut self) {
        drop(self.preview.take());
    }
}
