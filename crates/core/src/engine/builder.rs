use std::sync::Arc;

use turnloop_model::{Message, ModelProvider};

use super::Engine;
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use crate::model_client::ModelClient;
use crate::tool::{Executor as ToolExecutor, Tool, ToolObject, ToolObjectImpl};

/// The default bound on model invocations per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

/// [`Engine`] builder.
pub struct EngineBuilder {
    model_client: ModelClient,
    tools: Vec<Box<dyn ToolObject>>,
    system_prompt: Option<String>,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    max_iterations: usize,
    on_message: Option<Arc<dyn Fn(&Message) + Send + Sync>>,
}

impl EngineBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: vec![],
            system_prompt: None,
            checkpoint_store: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_message: None,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(ToolObjectImpl(tool)));
        self
    }

    /// Sets the system prompt placed in front of every model request.
    ///
    /// The prompt is never stored in the session history.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the store sessions are checkpointed to.
    ///
    /// Without this, the engine uses its own [`MemoryCheckpointStore`].
    #[inline]
    pub fn with_checkpoint_store(
        mut self,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Sets the maximum number of model invocations in one turn.
    ///
    /// Values below 1 are raised to 1.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Attaches a callback to be invoked after each message is appended and
    /// checkpointed.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Arc::new(on_message));
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Engine {
        let EngineBuilder {
            model_client,
            tools,
            system_prompt,
            checkpoint_store,
            max_iterations,
            on_message,
        } = self;

        let checkpoint_store = checkpoint_store
            .unwrap_or_else(|| Arc::new(MemoryCheckpointStore::new()));
        Engine {
            model_client,
            tool_executor: Arc::new(ToolExecutor::with_tools(tools)),
            checkpoint_store,
            system_prompt,
            max_iterations,
            on_message,
        }
    }
}
