use std::sync::Arc;

use super::input::Inbound;
use crate::backend::{BackendSession, OtpClient, SessionCookies};
use crate::core::{AppResult, FlowSettings};
use crate::flow::fsm::ConversationState;
use crate::state::{Entity, Ledgered, SessionScope, StatefulEntity};
use crate::storage::SessionStore;
use crate::telegram::transport::{Keyboard, Transport};

/// Long-lived collaborators shared by every update
#[derive(Clone)]
pub struct FlowDeps {
    pub store: Arc<dyn SessionStore>,
    pub transport: Arc<dyn Transport>,
    pub client: OtpClient,
    pub settings: Arc<FlowSettings>,
}

/// Everything one update needs while it runs
pub struct FlowContext {
    pub deps: FlowDeps,
    pub inbound: Inbound,
    pub scope: SessionScope,
    pub state: Entity<ConversationState>,
    pub backend: BackendSession,
    answered: bool,
}

impl FlowContext {
    /// Loads the conversation position and the backend cookie jar
    pub async fn open(deps: &FlowDeps, inbound: Inbound) -> AppResult<Self> {
        let scope = SessionScope::new(
            Arc::clone(&deps.store),
            inbound.conversation_id(),
            deps.settings.save_debounce,
        );
        let state = scope.load_or_default::<ConversationState>().await?;
        let cookies = scope.load_or_default::<SessionCookies>().await?;
        let backend = deps.client.session(inbound.user_id, cookies);
        Ok(Self {
            deps: deps.clone(),
            inbound,
            scope,
            state,
            backend,
            answered: false,
        })
    }

    pub fn chat_id(&self) -> i64 {
        self.inbound.chat_id
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.deps.settings
    }

    pub fn transport(&self) -> &dyn Transport {
        self.deps.transport.as_ref()
    }

    pub fn current_state(&self) -> ConversationState {
        *self.state.get()
    }

    pub fn set_state(&mut self, next: ConversationState) {
        if *self.state.get() != next {
            log::debug!("{}: {:?} -> {:?}", self.scope.id(), self.state.get(), next);
            self.state.update(|s| *s = next);
        }
    }

    pub async fn send(&self, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32> {
        Ok(self.transport().send(self.chat_id(), text, keyboard).await?)
    }

    /// Edits `message_id` in place, or sends a new message when there is
    /// none or it is gone. Returns the id now showing the text.
    pub async fn show(&self, message_id: Option<i32>, text: &str, keyboard: Option<Keyboard>) -> AppResult<i32> {
        if let Some(id) = message_id {
            match self.transport().edit(self.chat_id(), id, text, keyboard.clone()).await {
                Ok(()) => return Ok(id),
                Err(e) if e.is_message_gone() => {
                    log::debug!("Message {} vanished, sending a new one", id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.send(text, keyboard).await
    }

    /// Deletes messages outside any ledger; failures are only logged
    pub async fn delete_quietly(&self, ids: &[i32]) {
        for &id in ids {
            if let Err(e) = self.transport().delete(self.chat_id(), id).await {
                if e.is_message_gone() {
                    log::debug!("Message {} already gone", id);
                } else {
                    log::warn!("Failed to delete message {} in chat {}: {}", id, self.chat_id(), e);
                }
            }
        }
    }

    /// Answers the pressed button once; later calls are no-ops
    pub async fn answer(&mut self, toast: Option<&str>) {
        if self.answered {
            return;
        }
        let Some(callback_id) = self.inbound.callback_id().map(str::to_string) else {
            return;
        };
        self.answered = true;
        if let Err(e) = self.transport().answer_callback(&callback_id, toast).await {
            log::warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }

    /// Short notice: a toast on a pressed button, otherwise a plain message
    pub async fn notify(&mut self, text: &str) -> AppResult<Option<i32>> {
        if self.inbound.callback_id().is_some() && !self.answered {
            self.answer(Some(text)).await;
            return Ok(None);
        }
        Ok(Some(self.send(text, None).await?))
    }

    /// Deletes a finished flow's messages, then its snapshot
    pub async fn retire<T: StatefulEntity + Ledgered>(&self, entity: Entity<T>) -> AppResult<()> {
        let mut ledger = entity.ledger().clone();
        let report = ledger.flush(self.transport(), self.chat_id()).await;
        log::debug!("Retired '{}' for {}: {:?}", T::STATE_KEY, self.scope.id(), report);
        entity.clear().await?;
        Ok(())
    }

    /// Persists the position and cookies, and releases the button spinner
    pub async fn close(mut self) -> AppResult<()> {
        self.answer(None).await;
        self.state.flush().await?;
        self.backend.finish().await?;
        Ok(())
    }
}
