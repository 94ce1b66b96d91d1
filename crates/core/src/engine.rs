mod builder;
mod state;

use std::sync::Arc;

use tracing::Instrument;
use turnloop_model::{Message, ModelRequest, ToolCall};

use crate::checkpoint::CheckpointStore;
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::session::{Session, SessionId};
use crate::tool::Executor as ToolExecutor;
pub use builder::{DEFAULT_MAX_ITERATIONS, EngineBuilder};
pub use state::{TurnOutcome, TurnState};

/// The conversation engine, which drives model/tool turns over sessions.
///
/// The engine itself holds no session state. Sessions are passed in by the
/// caller and checkpointed to the configured store after every appended
/// message, so a turn that is aborted halfway leaves a valid, resumable
/// session behind.
///
/// There is no locking per session. Callers that share a session between
/// tasks must serialize [`Engine::run_turn`] calls for it.
#[derive(Clone)]
pub struct Engine {
    model_client: ModelClient,
    tool_executor: Arc<ToolExecutor>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    system_prompt: Option<String>,
    max_iterations: usize,
    on_message: Option<Arc<dyn Fn(&Message) + Send + Sync>>,
}

impl Engine {
    /// Returns the store sessions are checkpointed to.
    #[inline]
    pub fn checkpoint_store(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoint_store
    }

    /// Returns the maximum number of model invocations in one turn.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Restores a session from the store, or creates a fresh one.
    ///
    /// A fresh session is created (and saved) when `id` is `None` or the
    /// store doesn't know it.
    pub async fn open_session(
        &self,
        id: Option<SessionId>,
    ) -> Result<Session, Error> {
        let id = match id {
            Some(id) => {
                if let Some(session) = self.checkpoint_store.load(&id).await? {
                    debug!(
                        "restored session {id} with {} messages",
                        session.messages().len()
                    );
                    return Ok(session);
                }
                id
            }
            None => SessionId::generate(),
        };

        debug!("created session {id}");
        let session = Session::new(id);
        self.checkpoint_store.save(&session).await?;
        Ok(session)
    }

    /// Runs one turn: appends the user input, then alternates between the
    /// model and the requested tools until the model replies without tool
    /// calls.
    ///
    /// On error, `session` keeps every message appended before the failure.
    pub async fn run_turn<S: Into<String>>(
        &self,
        session: &mut Session,
        input: S,
    ) -> Result<TurnOutcome, Error> {
        let span = debug_span!("turn", session = %session.id());
        self.run_turn_inner(session, input.into())
            .instrument(span)
            .await
    }

    async fn run_turn_inner(
        &self,
        session: &mut Session,
        input: String,
    ) -> Result<TurnOutcome, Error> {
        let start = session.messages().len();

        // Never ask the model to continue with unanswered tool calls left by
        // an interrupted turn.
        let unanswered = session.unanswered_tool_calls();
        if !unanswered.is_empty() {
            warn!(
                "resuming {} unanswered tool call(s) from an interrupted turn",
                unanswered.len()
            );
            self.dispatch_tools(session, &unanswered).await?;
        }

        self.append(session, Message::user(input)).await?;

        let mut state = TurnState::AwaitingModel;
        let mut model_invocations = 0;
        let mut pending_calls = vec![];
        loop {
            let next_state = match state {
                TurnState::AwaitingModel => {
                    if model_invocations >= self.max_iterations {
                        error!(
                            "model still requests tools after {} invocations",
                            model_invocations
                        );
                        return Err(Error::RecursionLimitExceeded {
                            limit: self.max_iterations,
                        });
                    }
                    model_invocations += 1;

                    let request = self.build_model_request(session);
                    let mut reply = self
                        .model_client
                        .invoke(request)
                        .await
                        .map_err(Error::ModelInvocation)?;
                    session.assign_call_ids(&mut reply);
                    let next_state = TurnState::after_reply(&reply);
                    pending_calls = reply.tool_calls.clone();
                    self.append(session, reply).await?;
                    next_state
                }
                TurnState::DispatchingTools => {
                    let calls = std::mem::take(&mut pending_calls);
                    self.dispatch_tools(session, &calls).await?;
                    TurnState::AwaitingModel
                }
                TurnState::TurnComplete => break,
            };
            debug!("{state:?} -> {next_state:?}");
            state = next_state;
        }

        Ok(TurnOutcome {
            state,
            appended: session.messages().len() - start,
            model_invocations,
        })
    }

    /// Runs the tool calls strictly in order, appending one tool message per
    /// call.
    async fn dispatch_tools(
        &self,
        session: &mut Session,
        calls: &[ToolCall],
    ) -> Result<(), Error> {
        let span = debug_span!("tool executor", calls = calls.len());
        async {
            for call in calls {
                debug!("dispatching tool `{}` ({})", call.name, call.id);
                let msg = self.tool_executor.dispatch(call).await;
                self.append(session, msg).await?;
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn build_model_request(&self, session: &Session) -> ModelRequest {
        ModelRequest {
            system_prompt: self.system_prompt.clone(),
            messages: session.messages().to_vec(),
            tools: self.tool_executor.definitions(),
        }
    }

    /// Appends a message and checkpoints the session right away.
    async fn append(
        &self,
        session: &mut Session,
        msg: Message,
    ) -> Result<(), Error> {
        trace!("appending {:?} message", msg.role);
        session.push(msg);
        self.checkpoint_store.save(session).await?;
        if let (Some(on_message), Some(msg)) =
            (&self.on_message, session.messages().last())
        {
            on_message(msg);
        }
        Ok(())
    }
}
