use async_trait::async_trait;
use loomcore::FlowState;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// External snapshot store for flow state, enabling run continuation
///
/// Consulted by `execute` (optional restore) and `continue_execution`
/// (required: an absent session is an error, never a silent fresh start).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_state(&self, session_id: &str) -> Option<FlowState>;
    async fn save_state(&self, state: &FlowState);
    async fn remove(&self, session_id: &str);
}

/// Default in-process checkpoint store
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    sessions: RwLock<HashMap<String, FlowState>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get_state(&self, session_id: &str) -> Option<FlowState> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn save_state(&self, state: &FlowState) {
        tracing::debug!(session_id = %state.session_id, "checkpointing flow state");
        self.sessions
            .write()
            .await
            .insert(state.session_id.clone(), state.clone());
    }

    async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}
