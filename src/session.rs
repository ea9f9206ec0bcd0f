use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    error::CaptionError,
    model::{CaptionResult, SubmissionId},
    provider::CaptionProvider,
    state_machine::CaptionWorkflow,
};

type Response = (SubmissionId, Result<CaptionResult, CaptionError>);

/// Runs a [`CaptionWorkflow`] against a provider: requests go out on tokio
/// tasks and their responses come back through a channel, so the workflow is
/// only ever touched from the owner of the session.
pub struct CaptionSession {
    workflow: CaptionWorkflow,
    provider: Arc<dyn CaptionProvider>,
    responses_tx: mpsc::UnboundedSender<Response>,
    responses_rx: mpsc::UnboundedReceiver<Response>,
}

impl CaptionSession {
    pub fn new(workflow: CaptionWorkflow, provider: Arc<dyn CaptionProvider>) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            workflow,
            provider,
            responses_tx,
            responses_rx,
        }
    }

    pub fn workflow(&self) -> &CaptionWorkflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut CaptionWorkflow {
        &mut self.workflow
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.display_name()
    }

    /// Submits through the workflow and dispatches the resulting request.
    /// Must be called inside a tokio runtime.
    pub fn submit(&mut self) -> Option<SubmissionId> {
        let submission = self.workflow.submit()?;
        let id = submission.id;
        let provider = Arc::clone(&self.provider);
        let responses = self.responses_tx.clone();

        tokio::spawn(async move {
            let outcome = provider.generate(submission.request).await;
            if responses.send((id, outcome)).is_err() {
                tracing::debug!(submission = %id, "session gone before response arrived");
            }
        });
        Some(id)
    }

    /// Waits for the next response and applies it. Returns whether it was the
    /// current submission's response. Cancel safe.
    pub async fn next_response(&mut self) -> bool {
        match self.responses_rx.recv().await {
            Some((id, outcome)) => self.workflow.apply_response(id, outcome),
            // unreachable while `responses_tx` is held
            None => false,
        }
    }

    /// Waits until the workflow has no request in flight.
    pub async fn settle(&mut self) {
        while self.workflow.is_busy() {
            self.next_response().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        model::{CaptionRequest, FileInput, RequestState},
        services::InMemoryPreviewService,
    };

    type Script = oneshot::Receiver<Result<CaptionResult, CaptionError>>;

    /// Answers each call with whatever the test later sends on its script slot.
    #[derive(Default)]
    struct ScriptedProvider {
        calls: AtomicUsize,
        scripts: Mutex<VecDeque<Script>>,
        credentials: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn expect_call(&self) -> oneshot::Sender<Result<CaptionResult, CaptionError>> {
            let (tx, rx) = oneshot::channel();
            self.scripts.lock().expect("lock").push_back(rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptionProvider for ScriptedProvider {
        fn display_name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, request: CaptionRequest) -> Result<CaptionResult, CaptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.credentials.lock().expect("lock").push(request.credential);
            let script = self.scripts.lock().expect("lock").pop_front();
            match script {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(CaptionError::Transport("script dropped".into()))),
                None => Err(CaptionError::Transport("unexpected call".into())),
            }
        }
    }

    fn session() -> (CaptionSession, Arc<ScriptedProvider>, Arc<InMemoryPreviewService>) {
        let provider = Arc::new(ScriptedProvider::default());
        let previews = Arc::new(InMemoryPreviewService::default());
        let session = CaptionSession::new(CaptionWorkflow::new(previews.clone()), provider.clone());
        (session, provider, previews)
    }

    fn ready(session: &mut CaptionSession) {
        let workflow = session.workflow_mut();
        workflow.set_credential(" hf_key ");
        workflow
            .select_file(Some(FileInput::new("cat.jpg", "image/jpeg", vec![7; 4])))
            .expect("valid");
    }

    #[tokio::test]
    async fn successful_round_trip() {
        let (mut session, provider, previews) = session();
        ready(&mut session);
        let reply = provider.expect_call();

        session.submit().expect("dispatched");
        assert!(session.workflow().is_busy());
        reply
            .send(Ok(CaptionResult::new(Some("a cat"), Some("seekor kucing"))))
            .expect("send");
        session.settle().await;

        let workflow = session.workflow();
        assert_eq!(workflow.state(), RequestState::Succeeded);
        assert_eq!(workflow.result().and_then(CaptionResult::ms), Some("seekor kucing"));
        assert_eq!(previews.live(), 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(*provider.credentials.lock().expect("lock"), vec!["hf_key".to_string()]);
    }

    #[tokio::test]
    async fn validation_failures_never_reach_provider() {
        let (mut session, provider, _) = session();

        assert!(session.submit().is_none());
        assert_eq!(session.workflow().error(), Some("credential required"));

        session.workflow_mut().set_credential("hf_key");
        assert!(session.submit().is_none());
        assert_eq!(session.workflow().error(), Some("file required"));

        tokio::task::yield_now().await;
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn stale_success_after_resubmission_is_ignored() {
        let (mut session, provider, previews) = session();
        ready(&mut session);
        let first_reply = provider.expect_call();
        let second_reply = provider.expect_call();

        session.submit().expect("first");
        session.workflow_mut().cancel();
        ready(&mut session);
        session.submit().expect("second");

        first_reply
            .send(Ok(CaptionResult::new(Some("stale"), None)))
            .expect("send");
        assert!(!session.next_response().await);
        assert_eq!(session.workflow().state(), RequestState::InFlight);
        assert!(session.workflow().result().is_none());
        assert_eq!(previews.created(), 0);

        second_reply
            .send(Err(CaptionError::Protocol {
                status: 500,
                message: Some("model overloaded".into()),
            }))
            .expect("send");
        assert!(session.next_response().await);
        assert_eq!(session.workflow().state(), RequestState::Failed);
        assert_eq!(session.workflow().error(), Some("model overloaded"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn stale_failure_after_cancel_is_ignored() {
        let (mut session, provider, _) = session();
        ready(&mut session);
        let reply = provider.expect_call();

        session.submit().expect("dispatched");
        session.workflow_mut().cancel();
        reply
            .send(Err(CaptionError::Transport("timed out".into())))
            .expect("send");

        assert!(!session.next_response().await);
        assert_eq!(session.workflow().state(), RequestState::Idle);
        assert!(session.workflow().error().is_none());
    }
}
