mod api;
pub mod binary_sensor;
pub mod climate;
mod client;
mod diff;
pub mod entity;
mod error;
mod event;
mod hub;
pub mod light;
mod logger;
pub mod protocol;
pub mod sensor;
mod snapshot;
#[cfg(test)]
mod testing;
mod types;

pub use api::PoolApi;
pub use client::{NjsPcClient, NjsPcClientBuilder};
pub use entity::{Binding, Entity, Renderable, Subscriber};
pub use error::{Error, Result};
pub use event::{Event, EventKind, SubjectId};
pub use hub::{Hub, HubBuilder, SubscriptionId};
pub use logger::MessageLogMode;
pub use snapshot::*;
pub use types::*;
