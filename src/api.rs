use std::future::Future;

use serde_json::Value;

use crate::Result;
use crate::event::SubjectId;
use crate::snapshot::Snapshot;
use crate::types::ValDesc;

/// Capabilities the entity adapters and the hub need from the controller.
///
/// [`crate::NjsPcClient`] is the HTTP implementation; tests substitute a
/// recording fake.
pub trait PoolApi: Send + Sync {
    /// Full state fetched at connect time.
    fn config(&self) -> Result<Snapshot>;

    fn heat_modes(&self, body_id: SubjectId)
    -> impl Future<Output = Result<Vec<ValDesc>>> + Send;

    fn light_themes(
        &self,
        circuit_id: SubjectId,
    ) -> impl Future<Output = Result<Vec<ValDesc>>> + Send;

    /// Send one command. Errors are transport failures and are not retried.
    fn command(&self, url: &str, data: Value) -> impl Future<Output = Result<()>> + Send;

    /// `"{controller_id}_{suffix}"`.
    fn unique_id(&self, suffix: &str) -> String;

    fn controller_id(&self) -> String;
}
