use std::sync::Arc;

use tracing::error;

use gatehouse_lifecycle::{ApprovalCheck, Lifecycle, LifecycleError};
use gatehouse_types::models::{
    ActiveDevice, DisabledDevice, HistoryEntry, RejectedDevice, SweepOutcome,
};

use crate::error::ApiError;

/// Async entry point to the lifecycle engine. SQLite calls block, so every
/// operation is shipped to the blocking pool; nothing else happens here.
#[derive(Clone)]
pub struct DeviceFacade {
    lifecycle: Arc<Lifecycle>,
}

impl DeviceFacade {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    async fn run<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Lifecycle) -> Result<T, LifecycleError> + Send + 'static,
        T: Send + 'static,
    {
        let lifecycle = self.lifecycle.clone();
        tokio::task::spawn_blocking(move || f(&lifecycle))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })?
            .map_err(ApiError::from)
    }

    pub async fn register(
        &self,
        email: String,
        android_id: String,
        notes: Option<String>,
    ) -> Result<ActiveDevice, ApiError> {
        self.run(move |l| l.register(&email, &android_id, notes.as_deref()))
            .await
    }

    pub async fn approve(
        &self,
        android_id: String,
        action_by: String,
        notes: Option<String>,
    ) -> Result<ActiveDevice, ApiError> {
        self.run(move |l| l.approve(&android_id, &action_by, notes.as_deref()))
            .await
    }

    pub async fn extend(
        &self,
        android_id: String,
        additional_days: u32,
        action_by: String,
        notes: Option<String>,
    ) -> Result<ActiveDevice, ApiError> {
        self.run(move |l| l.extend(&android_id, additional_days, &action_by, notes.as_deref()))
            .await
    }

    pub async fn disable(
        &self,
        android_id: String,
        action_by: String,
        notes: Option<String>,
    ) -> Result<DisabledDevice, ApiError> {
        self.run(move |l| l.disable(&android_id, &action_by, notes.as_deref()))
            .await
    }

    pub async fn reject(
        &self,
        android_id: String,
        action_by: String,
        notes: Option<String>,
    ) -> Result<RejectedDevice, ApiError> {
        self.run(move |l| l.reject(&android_id, &action_by, notes.as_deref()))
            .await
    }

    pub async fn reapprove_from_disabled(
        &self,
        android_id: String,
        action_by: String,
        notes: Option<String>,
    ) -> Result<ActiveDevice, ApiError> {
        self.run(move |l| l.reapprove_from_disabled(&android_id, &action_by, notes.as_deref()))
            .await
    }

    pub async fn is_approved(&self, android_id: String) -> Result<bool, ApiError> {
        self.run(move |l| l.is_approved(&android_id)).await
    }

    pub async fn check_approval(
        &self,
        android_id: String,
    ) -> Result<Option<ApprovalCheck>, ApiError> {
        self.run(move |l| l.check_approval(&android_id)).await
    }

    pub async fn process_expired_devices(&self) -> Result<Vec<SweepOutcome>, ApiError> {
        self.run(|l| l.process_expired_devices()).await
    }

    // -- Pass-through queries --

    pub async fn device(&self, android_id: String) -> Result<Option<ActiveDevice>, ApiError> {
        self.run(move |l| l.device(&android_id)).await
    }

    pub async fn devices(&self) -> Result<Vec<ActiveDevice>, ApiError> {
        self.run(|l| l.devices()).await
    }

    pub async fn disabled_devices(&self) -> Result<Vec<DisabledDevice>, ApiError> {
        self.run(|l| l.disabled_devices()).await
    }

    pub async fn rejected_devices(&self) -> Result<Vec<RejectedDevice>, ApiError> {
        self.run(|l| l.rejected_devices()).await
    }

    pub async fn history(&self, android_id: String) -> Result<Vec<HistoryEntry>, ApiError> {
        self.run(move |l| l.history(&android_id)).await
    }
}
