//! AppController: applies user actions and keeps the profile collector and
//! the conversation in step with the current stage.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{Instrument, Span, debug, info, info_span};
use uuid::Uuid;

use super::action::{ActionOutcome, UserAction};
use super::view::{MessageView, Screen, ViewState};
use crate::chat::{AnsweringService, ConversationManager, MessageIds};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::profile::{Answer, ProfileCollector, QuestionSet};
use crate::stage::{Stage, StageChange, StageMachine, Subscription};

/// One user session.
///
/// Stage transitions are delivered through a channel and applied after each
/// action, so every component is (re)activated from a single place no matter
/// which action caused the transition.
pub struct AppController {
    stages: StageMachine,
    collector: ProfileCollector,
    conversation: Option<Arc<ConversationManager>>,
    answering: Arc<dyn AnsweringService>,
    message_ids: MessageIds,
    request_timeout: Duration,
    transitions: mpsc::UnboundedReceiver<StageChange>,
    _subscription: Subscription,
    span: Span,
}

impl AppController {
    pub fn new(questions: Arc<QuestionSet>, answering: Arc<dyn AnsweringService>) -> Self {
        Self::build(
            StageMachine::new(),
            questions,
            answering,
            AppConfig::default().request_timeout,
        )
    }

    pub fn from_config(
        config: &AppConfig,
        questions: Arc<QuestionSet>,
        answering: Arc<dyn AnsweringService>,
    ) -> Self {
        Self::build(
            StageMachine::with_history_limit(config.stage_history_limit),
            questions,
            answering,
            config.request_timeout,
        )
    }

    fn build(
        stages: StageMachine,
        questions: Arc<QuestionSet>,
        answering: Arc<dyn AnsweringService>,
        request_timeout: Duration,
    ) -> Self {
        let (tx, transitions) = mpsc::unbounded_channel();
        let subscription = stages.subscribe(move |change: StageChange| -> anyhow::Result<()> {
            tx.send(change)
                .map_err(|_| anyhow::anyhow!("controller dropped"))
        });

        let session_id = Uuid::new_v4();
        let span = info_span!("session", %session_id);
        span.in_scope(|| info!("Session started"));

        Self {
            stages,
            collector: ProfileCollector::new(questions),
            conversation: None,
            answering,
            message_ids: MessageIds::new(),
            request_timeout,
            transitions,
            _subscription: subscription,
            span,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stages.current()
    }

    pub fn stages(&self) -> &StageMachine {
        &self.stages
    }

    pub fn collector(&self) -> &ProfileCollector {
        &self.collector
    }

    /// The active conversation, present exactly while chatting.
    pub fn conversation(&self) -> Option<&Arc<ConversationManager>> {
        self.conversation.as_ref()
    }

    /// Apply a user action, then activate whatever stage it led to.
    pub async fn handle(&mut self, action: UserAction) -> Result<ActionOutcome, AppError> {
        let span = self.span.clone();
        let result = self.dispatch(action).instrument(span.clone()).await;
        span.in_scope(|| self.sync());
        result
    }

    async fn dispatch(&mut self, action: UserAction) -> Result<ActionOutcome, AppError> {
        let stage = self.stages.current();
        debug!(action = action.name(), stage = %stage, "Handling action");

        match action {
            UserAction::Start => {
                self.require(stage, Stage::Welcome, "start")?;
                self.stages.advance()?;
            }
            UserAction::SetName(name) => {
                if !matches!(stage, Stage::Welcome | Stage::Onboarding) {
                    return Err(AppError::WrongStage {
                        action: "set_name",
                        stage,
                    });
                }
                self.collector.set_name(&name);
            }
            UserAction::SelectAnswer {
                question_id,
                answer,
            } => {
                self.require(stage, Stage::Onboarding, "select_answer")?;
                self.collector.record_answer(&question_id, answer)?;
            }
            UserAction::Next => {
                self.require(stage, Stage::Onboarding, "next")?;
                if !self.collector.progress().can_go_next {
                    return Err(AppError::Incomplete(
                        "answer the current question first".to_string(),
                    ));
                }
                if self.collector.advance().is_none() {
                    self.stages.advance()?;
                }
            }
            UserAction::Back => {
                if stage == Stage::Onboarding && self.collector.cursor() > 0 {
                    self.collector.retreat();
                } else {
                    self.stages.go_back()?;
                }
            }
            UserAction::ConfirmProfile => {
                self.require(stage, Stage::Summary, "confirm_profile")?;
                self.stages.advance()?;
            }
            UserAction::SendMessage(text) => {
                self.require(stage, Stage::Chatting, "send_message")?;
                let conversation = self.active_conversation(stage)?;
                return Ok(match conversation.submit(&text).await {
                    Ok(reply) => ActionOutcome::Reply(reply),
                    Err(e) => ActionOutcome::ChatFailed(e),
                });
            }
            UserAction::NewConversation => {
                self.require(stage, Stage::Chatting, "new_conversation")?;
                self.active_conversation(stage)?.clear();
            }
            UserAction::EditProfile => {
                if self.conversation.take().is_some() {
                    info!("Conversation discarded for profile edit");
                }
                self.collector.reset();
                self.stages.restart_at(Stage::Onboarding)?;
            }
            UserAction::ExportHistory => {
                self.require(stage, Stage::Chatting, "export_history")?;
                let export = self.active_conversation(stage)?.export_history();
                return Ok(ActionOutcome::Exported(export));
            }
            UserAction::GoTo(target) => {
                if !self.stages.can_navigate_to(target) {
                    return Err(AppError::Unreachable(target));
                }
                self.stages.transition_to(target)?;
            }
            UserAction::Restart => {
                self.conversation = None;
                self.collector.reset();
                self.stages.reset()?;
            }
        }

        Ok(ActionOutcome::Updated)
    }

    fn require(&self, stage: Stage, expected: Stage, action: &'static str) -> Result<(), AppError> {
        if stage == expected {
            Ok(())
        } else {
            Err(AppError::WrongStage { action, stage })
        }
    }

    fn active_conversation(&self, stage: Stage) -> Result<Arc<ConversationManager>, AppError> {
        self.conversation.clone().ok_or(AppError::WrongStage {
            action: "chat",
            stage,
        })
    }

    /// Drain queued transitions and activate the components they call for.
    fn sync(&mut self) {
        while let Ok(change) = self.transitions.try_recv() {
            self.activate(change);
        }
    }

    fn activate(&mut self, change: StageChange) {
        if change.from == Stage::Chatting && self.conversation.take().is_some() {
            debug!("Conversation closed");
        }

        match change.to {
            Stage::Welcome | Stage::Summary => {}
            Stage::Onboarding => {
                // Coming back from the summary: reopen the last question.
                if self.collector.current_question().is_none() {
                    self.collector.retreat();
                }
            }
            Stage::Chatting => {
                let manager = ConversationManager::new(
                    Arc::clone(&self.answering),
                    self.collector.profile().clone(),
                    self.message_ids.clone(),
                )
                .with_timeout(self.request_timeout);
                manager.seed_greeting();
                info!(
                    profile_complete = self.collector.is_complete(),
                    "Conversation started"
                );
                self.conversation = Some(Arc::new(manager));
            }
        }
    }

    /// Rebuild the UI state from the components.
    pub fn view(&self) -> ViewState {
        let stage = self.stages.current();
        let navigable = Stage::ALL
            .into_iter()
            .filter(|s| *s != stage && self.stages.can_navigate_to(*s))
            .collect();

        let screen = match stage {
            Stage::Welcome => Screen::Welcome {
                name: self.collector.profile().name.clone(),
            },
            Stage::Onboarding => {
                let question = self.collector.current_question().cloned();
                let selected: Vec<String> = question
                    .as_ref()
                    .and_then(|q| self.collector.profile().answer(&q.id))
                    .map(|a| a.values().into_iter().map(String::from).collect())
                    .unwrap_or_default();
                Screen::Onboarding {
                    question,
                    selected,
                    progress: self.collector.progress(),
                }
            }
            Stage::Summary => Screen::Summary {
                summary: self.collector.summary_text(),
                complete: self.collector.is_complete(),
            },
            Stage::Chatting => match &self.conversation {
                Some(c) => Screen::Chatting {
                    messages: c.messages().iter().map(MessageView::from).collect(),
                    busy: c.is_busy(),
                },
                None => Screen::Chatting {
                    messages: Vec::new(),
                    busy: false,
                },
            },
        };

        ViewState {
            stage,
            navigable,
            screen,
        }
    }

    /// Convenience for front ends: answer the current question.
    pub async fn answer_current(&mut self, answer: Answer) -> Result<ActionOutcome, AppError> {
        let question_id = self
            .collector
            .current_question()
            .map(|q| q.id.clone())
            .ok_or_else(|| AppError::Incomplete("no question to answer".to_string()))?;
        self.handle(UserAction::SelectAnswer {
            question_id,
            answer,
        })
        .await
    }
}
