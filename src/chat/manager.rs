//! ConversationManager: owns the transcript and mediates single-flight
//! requests to the answering service.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::answering::{AnsweringService, AskRequest, AskResponse};
use super::message::{Message, MessageIds, Role, Transcript};
use crate::error::{SubmitError, TransportError};
use crate::profile::Profile;
use crate::sync::{FlagGuard, lock};

/// Returned by [`ConversationManager::export_history`] for an empty transcript.
pub const NO_HISTORY: &str = "No conversation history.";

/// Shown in the transcript when the answering service could not be reached.
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't reach the coach right now. Please check your connection and try again.";

/// Opening assistant message for a conversation.
pub fn greeting(profile: &Profile) -> String {
    if !profile.is_complete() {
        return "Hi! I'm your personal fitness coach. Your profile is incomplete, so my advice \
                will be general for now. You can finish your profile anytime to get plans \
                tailored to you. What would you like to know?"
            .to_string();
    }

    let name = if profile.name.is_empty() {
        "there"
    } else {
        profile.name.as_str()
    };
    let goals = profile.goals().join(", ").to_lowercase();
    format!(
        "Hi {name}! I'm your personal fitness coach. I see you're working toward: {goals}. \
         Ask me for a workout plan, help with an exercise, or anything else about your training."
    )
}

/// One conversation: its transcript, the profile it was started with, and
/// the collaborator that answers it.
///
/// At most one submission is outstanding at a time; further calls are
/// rejected with [`SubmitError::Busy`] until it settles.
pub struct ConversationManager {
    answering: Arc<dyn AnsweringService>,
    profile: Profile,
    transcript: Mutex<Transcript>,
    in_flight: AtomicBool,
    timeout: Option<Duration>,
}

impl ConversationManager {
    pub fn new(answering: Arc<dyn AnsweringService>, profile: Profile, ids: MessageIds) -> Self {
        Self {
            answering,
            profile,
            transcript: Mutex::new(Transcript::new(ids)),
            in_flight: AtomicBool::new(false),
            timeout: None,
        }
    }

    /// Give up on a request after `limit`; the miss is reported like any
    /// other transport failure.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Whether a submission is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot of the full transcript.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.transcript).messages().to_vec()
    }

    /// Number of messages the model would see.
    pub fn context_len(&self) -> usize {
        lock(&self.transcript).context().len()
    }

    /// Append the greeting for this conversation's profile.
    pub fn seed_greeting(&self) -> Message {
        lock(&self.transcript).push(Role::Assistant, greeting(&self.profile))
    }

    /// Send `text` and wait for the reply.
    ///
    /// Failures reported by the service or in reaching it are written to the
    /// transcript as system messages and returned as errors; the
    /// conversation stays usable either way.
    pub async fn submit(&self, text: &str) -> Result<Message, SubmitError> {
        let Some(_in_flight) = FlagGuard::acquire(&self.in_flight) else {
            warn!("Rejected chat submission while another is outstanding");
            return Err(SubmitError::Busy);
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyMessage);
        }

        let (history, user_message) = {
            let mut transcript = lock(&self.transcript);
            let history = transcript.context();
            let user_message = transcript.push(Role::User, text);
            (history, user_message)
        };
        debug!(
            message_id = user_message.id,
            history = history.len(),
            "Submitting chat message"
        );

        let request = AskRequest {
            message: text.to_string(),
            profile: self.profile.context(),
            history,
        };

        match self.ask(request).await {
            Ok(AskResponse::Answer { message, usage }) if !message.trim().is_empty() => {
                let reply = lock(&self.transcript).push(Role::Assistant, message);
                info!(
                    message_id = reply.id,
                    input_tokens = usage.map(|u| u.input_tokens),
                    output_tokens = usage.map(|u| u.output_tokens),
                    "Chat reply received"
                );
                Ok(reply)
            }
            Ok(AskResponse::Answer { .. }) => {
                let err = TransportError::MalformedResponse("empty answer".to_string());
                Err(self.record_transport_failure(err))
            }
            Ok(AskResponse::Failure { error, details }) => {
                warn!(error = %error, details = ?details, "Answering service reported failure");
                let notice = match &details {
                    Some(d) => format!("Error: {error} ({d})"),
                    None => format!("Error: {error}"),
                };
                lock(&self.transcript).push(Role::System, notice);
                Err(SubmitError::Rejected { error, details })
            }
            Err(e) => Err(self.record_transport_failure(e)),
        }
    }

    async fn ask(&self, request: AskRequest) -> Result<AskResponse, TransportError> {
        let call = AssertUnwindSafe(self.answering.ask(request)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(TransportError::Timeout(limit)),
            },
            None => call.await,
        };
        outcome.unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(TransportError::Crashed(reason))
        })
    }

    fn record_transport_failure(&self, err: TransportError) -> SubmitError {
        warn!(error = %err, "Chat request failed");
        lock(&self.transcript).push(Role::System, TRANSPORT_FAILURE_MESSAGE);
        SubmitError::Transport(err)
    }

    /// The whole transcript, system messages included, as `ROLE: content`
    /// blocks separated by blank lines.
    pub fn export_history(&self) -> String {
        let transcript = lock(&self.transcript);
        if transcript.is_empty() {
            return NO_HISTORY.to_string();
        }
        transcript
            .messages()
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Start over: empty the transcript and post a fresh greeting.
    pub fn clear(&self) -> Message {
        let mut transcript = lock(&self.transcript);
        transcript.clear();
        info!("Conversation cleared");
        transcript.push(Role::Assistant, greeting(&self.profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Answer, ProfileCollector, QuestionSet};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Replays scripted outcomes and records every request.
    struct ScriptedAnswering {
        replies: Mutex<Vec<Result<AskResponse, TransportError>>>,
        requests: Mutex<Vec<AskRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedAnswering {
        fn new(replies: Vec<Result<AskResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
                gate: None,
            })
        }

        fn gated(
            replies: Vec<Result<AskResponse, TransportError>>,
            gate: Arc<Notify>,
        ) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
                gate: Some(gate),
            })
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnsweringService for ScriptedAnswering {
        async fn ask(&self, request: AskRequest) -> Result<AskResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies.lock().unwrap().remove(0)
        }
    }

    struct PanickingAnswering;

    #[async_trait]
    impl AnsweringService for PanickingAnswering {
        async fn ask(&self, _request: AskRequest) -> Result<AskResponse, TransportError> {
            panic!("backend client bug")
        }
    }

    struct HangingAnswering;

    #[async_trait]
    impl AnsweringService for HangingAnswering {
        async fn ask(&self, _request: AskRequest) -> Result<AskResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn answer(text: &str) -> Result<AskResponse, TransportError> {
        Ok(AskResponse::Answer {
            message: text.to_string(),
            usage: None,
        })
    }

    fn complete_profile() -> Profile {
        let mut c = ProfileCollector::new(Arc::new(QuestionSet::fitness()));
        c.set_name("Riley");
        c.record_answer("goals", Answer::multi(["Build muscle", "Improve endurance"]))
            .unwrap();
        c.record_answer("level", Answer::single("Beginner")).unwrap();
        c.record_answer("equipment", Answer::multi(["Dumbbells"])).unwrap();
        c.record_answer("time", Answer::single("15-30 minutes")).unwrap();
        c.profile().clone()
    }

    fn manager(answering: Arc<dyn AnsweringService>) -> ConversationManager {
        let m = ConversationManager::new(answering, complete_profile(), MessageIds::new());
        m.seed_greeting();
        m
    }

    #[test]
    fn greeting_is_personalized_for_complete_profile() {
        let text = greeting(&complete_profile());
        assert!(text.starts_with("Hi Riley!"));
        assert!(text.contains("build muscle, improve endurance"));
    }

    #[test]
    fn greeting_notes_incomplete_profile() {
        let text = greeting(&Profile::default());
        assert!(text.contains("profile is incomplete"));
    }

    #[tokio::test]
    async fn successful_submit_appends_user_and_assistant() {
        let answering = ScriptedAnswering::new(vec![answer("Try goblet squats.")]);
        let m = manager(answering.clone());

        let reply = m.submit("  What should I do today?  ").await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Try goblet squats.");
        let messages = m.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "What should I do today?");
        assert!(!m.is_busy());

        let requests = answering.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "What should I do today?");
        assert_eq!(requests[0].profile.name.as_deref(), Some("Riley"));
        // Only the greeting precedes the new message.
        assert_eq!(requests[0].history.len(), 1);
        assert_eq!(requests[0].history[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn empty_submission_is_rejected_without_side_effects() {
        let answering = ScriptedAnswering::new(vec![]);
        let m = manager(answering.clone());

        assert!(matches!(m.submit("   ").await, Err(SubmitError::EmptyMessage)));
        assert_eq!(m.messages().len(), 1);
        assert!(answering.requests().is_empty());
        assert!(!m.is_busy());
    }

    #[tokio::test]
    async fn concurrent_submit_is_rejected() {
        let gate = Arc::new(Notify::new());
        let answering = ScriptedAnswering::gated(vec![answer("Done.")], Arc::clone(&gate));
        let m = Arc::new(manager(answering.clone()));

        let first = {
            let m = Arc::clone(&m);
            tokio::spawn(async move { m.submit("first").await })
        };
        while !m.is_busy() {
            tokio::task::yield_now().await;
        }
        let before = m.messages().len();

        assert!(matches!(m.submit("second").await, Err(SubmitError::Busy)));
        assert_eq!(m.messages().len(), before);

        gate.notify_one();
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.content, "Done.");
        assert_eq!(answering.requests().len(), 1);
        assert!(!m.is_busy());
    }

    #[tokio::test]
    async fn reported_failure_becomes_system_message() {
        let answering = ScriptedAnswering::new(vec![Ok(AskResponse::Failure {
            error: "Rate limit exceeded".to_string(),
            details: None,
        })]);
        let m = manager(answering);
        let context_before = m.context_len();

        let err = m.submit("Plan my week").await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Rejected { ref error, .. } if error == "Rate limit exceeded"
        ));
        let messages = m.messages();
        let system: Vec<&Message> = messages.iter().filter(|x| x.role == Role::System).collect();
        assert_eq!(system.len(), 1);
        assert!(system[0].content.contains("Rate limit exceeded"));
        // The user message joins the context view; the system notice does not.
        assert_eq!(m.context_len(), context_before + 1);
        assert!(!m.is_busy());
    }

    #[tokio::test]
    async fn system_messages_are_not_sent_as_context() {
        let answering = ScriptedAnswering::new(vec![
            Ok(AskResponse::Failure {
                error: "Missing API key".to_string(),
                details: Some("set ANTHROPIC_API_KEY".to_string()),
            }),
            answer("Here you go."),
        ]);
        let m = manager(answering.clone());

        let _ = m.submit("first try").await;
        m.submit("second try").await.unwrap();

        let requests = answering.requests();
        let history = &requests[1].history;
        assert!(history.iter().all(|c| c.role != Role::System));
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "first try");
        assert!(m.export_history().contains("(set ANTHROPIC_API_KEY)"));
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_notice() {
        let answering = ScriptedAnswering::new(vec![
            Err(TransportError::Request("connection refused".to_string())),
            answer("Back online."),
        ]);
        let m = manager(answering);

        let err = m.submit("hello?").await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(TransportError::Request(_))));
        let last = m.messages().pop().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, TRANSPORT_FAILURE_MESSAGE);

        // Still usable.
        assert_eq!(m.submit("hello again").await.unwrap().content, "Back online.");
    }

    #[tokio::test]
    async fn empty_answer_is_a_transport_failure() {
        let answering = ScriptedAnswering::new(vec![answer("   ")]);
        let m = manager(answering);
        let err = m.submit("hi").await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Transport(TransportError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn panicking_service_is_contained() {
        let m = manager(Arc::new(PanickingAnswering));
        let err = m.submit("hi").await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Transport(TransportError::Crashed(ref reason))
                if reason.contains("backend client bug")
        ));
        assert!(!m.is_busy());
        assert_eq!(m.messages().last().unwrap().role, Role::System);
    }

    #[tokio::test]
    async fn hanging_service_times_out() {
        let m = ConversationManager::new(
            Arc::new(HangingAnswering),
            Profile::default(),
            MessageIds::new(),
        )
        .with_timeout(Duration::from_millis(50));

        let err = m.submit("anyone there?").await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(TransportError::Timeout(_))));
        assert!(!m.is_busy());
    }

    #[tokio::test]
    async fn export_counts_every_message() {
        let answering = ScriptedAnswering::new(vec![
            answer("Reply one."),
            Ok(AskResponse::Failure {
                error: "Upstream error".to_string(),
                details: None,
            }),
        ]);
        let m = manager(answering);
        m.submit("one").await.unwrap();
        let _ = m.submit("two").await;

        let export = m.export_history();
        let blocks = export.split("\n\n").count();
        let prefixed = ["USER:", "ASSISTANT:", "SYSTEM:"]
            .iter()
            .map(|p| export.lines().filter(|l| l.starts_with(p)).count())
            .sum::<usize>();
        assert_eq!(m.messages().len(), 5);
        assert_eq!(blocks, 5);
        assert_eq!(prefixed, 5);
        assert!(export.starts_with("ASSISTANT: Hi Riley!"));
        assert!(export.contains("SYSTEM: Error: Upstream error"));
    }

    #[test]
    fn export_of_empty_transcript_is_sentinel() {
        let m = ConversationManager::new(
            ScriptedAnswering::new(vec![]),
            Profile::default(),
            MessageIds::new(),
        );
        assert_eq!(m.export_history(), NO_HISTORY);
    }

    #[tokio::test]
    async fn clear_reseeds_greeting_with_fresh_id() {
        let answering = ScriptedAnswering::new(vec![answer("Sure.")]);
        let m = manager(answering);
        m.submit("hi").await.unwrap();
        let last_id = m.messages().last().unwrap().id;

        let greeting = m.clear();

        let messages = m.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], greeting);
        assert_eq!(greeting.role, Role::Assistant);
        assert!(greeting.id > last_id);
    }
}
