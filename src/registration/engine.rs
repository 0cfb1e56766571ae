//! ConversationEngine: runs one inbound message through commands, the
//! state machine and the collaborators.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::command::Command;
use super::prompts;
use super::session::{SessionGuard, SessionStore};
use super::state::{ConversationState, StateTag};
use super::transition::{self, Effect, Transition};
use crate::error::{DatabaseError, EngineError};
use crate::plan::PlanGenerator;
use crate::store::ProfileStore;

/// What to send back for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// One-tap answers to offer alongside the text.
    pub buttons: Vec<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<String>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Orchestrates a single conversational turn per call.
pub struct ConversationEngine {
    sessions: Arc<SessionStore>,
    store: Arc<dyn ProfileStore>,
    generator: Arc<dyn PlanGenerator>,
}

impl ConversationEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn ProfileStore>,
        generator: Arc<dyn PlanGenerator>,
    ) -> Self {
        Self {
            sessions,
            store,
            generator,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one message and always produce a reply.
    ///
    /// Collaborator failures become a generic apology; the session is left
    /// as it was before the message.
    pub async fn handle(&self, user_id: i64, content: &str) -> Reply {
        match self.try_handle(user_id, content).await {
            Ok(reply) => reply,
            Err(EngineError::NotRegistered { .. }) => Reply::text(prompts::NOT_REGISTERED),
            Err(e) => {
                error!(user_id, error = %e, "Conversation turn failed");
                Reply::text(prompts::COLLABORATOR_FAILURE)
            }
        }
    }

    /// Handle one message, surfacing collaborator failures to the caller.
    pub async fn try_handle(&self, user_id: i64, content: &str) -> Result<Reply, EngineError> {
        let mut guard = self.sessions.lock(user_id).await;

        if let Some(command) = Command::parse(content) {
            debug!(user_id, %command, "Command received");
            return self.run_command(user_id, command, &mut guard).await;
        }

        let current = match (*guard).clone() {
            Some(session) => session,
            None => match self.store.get(user_id).await? {
                Some(_) => {
                    debug!(user_id, "Resuming registered user at the menu");
                    ConversationState::registered(user_id)
                }
                None => {
                    info!(user_id, "New user, starting registration");
                    *guard = Some(ConversationState::new(user_id));
                    return Ok(Reply::text(prompts::greeting(user_id)));
                }
            },
        };

        let step = transition::transition(current.state, &current.partial, content);
        debug!(
            user_id,
            from = %current.state,
            to = %step.state,
            outcome = ?step.outcome,
            effect = ?step.effect,
            "Transition computed"
        );

        // Nothing is committed until the effect has succeeded.
        let reply = self.apply_effect(user_id, &step).await?;

        if step.effect == Effect::DeleteProfile {
            *guard = None;
        } else {
            let mut next = current;
            next.state = step.state;
            next.partial = step.partial;
            next.touch();
            *guard = Some(next);
        }

        Ok(reply)
    }

    async fn apply_effect(&self, user_id: i64, step: &Transition) -> Result<Reply, EngineError> {
        let reply = Reply::text(step.reply.clone()).with_buttons(step.buttons.clone());

        match step.effect {
            Effect::None => Ok(reply),
            Effect::PersistProfile => {
                let profile = step.partial.complete(user_id).ok_or_else(|| {
                    DatabaseError::Serialization(format!(
                        "registration for user {user_id} is incomplete"
                    ))
                })?;
                self.store.save(&profile).await?;
                info!(user_id, "Registration complete");
                Ok(Reply::text(prompts::registration_complete(&profile)))
            }
            Effect::DeleteProfile => {
                let removed = self.store.delete(user_id).await?;
                info!(user_id, removed, "Account deleted");
                Ok(reply)
            }
            Effect::GeneratePlan => self.plan_for(user_id).await.map(Reply::text),
        }
    }

    async fn run_command(
        &self,
        user_id: i64,
        command: Command,
        guard: &mut SessionGuard,
    ) -> Result<Reply, EngineError> {
        match command {
            Command::Start => {
                guard
                    .get_or_insert_with(|| ConversationState::new(user_id))
                    .reset();
                Ok(Reply::text(prompts::greeting(user_id)))
            }
            Command::MyData => {
                let profile = self
                    .store
                    .get(user_id)
                    .await?
                    .ok_or(EngineError::NotRegistered { user_id })?;
                Ok(Reply::text(prompts::stored_profile(&profile)))
            }
            Command::Regenerate => self.plan_for(user_id).await.map(Reply::text),
            Command::Delete => {
                let session = guard.get_or_insert_with(|| ConversationState::new(user_id));
                session.state = StateTag::AwaitingDeleteConfirmation;
                session.touch();
                Ok(Reply::text(prompts::ASK_DELETE_CONFIRMATION).with_buttons(vec![
                    prompts::CONFIRM_DELETE.to_string(),
                    prompts::CANCEL_DELETE.to_string(),
                ]))
            }
        }
    }

    /// Generate a plan from the stored profile.
    async fn plan_for(&self, user_id: i64) -> Result<String, EngineError> {
        let profile = self
            .store
            .get(user_id)
            .await?
            .ok_or(EngineError::NotRegistered { user_id })?;
        info!(user_id, generator = self.generator.name(), "Generating plan");
        Ok(self.generator.generate(&profile).await?)
    }
}
