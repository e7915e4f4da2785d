use serde_json::Value;
use tracing::{debug, trace};

use crate::api::PoolApi;
use crate::climate::BodyHeater;
use crate::entity::{Entity, Renderable, Subscriber};
use crate::event::Event;
use crate::light::CircuitLight;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::snapshot::Snapshot;
use crate::{binary_sensor, climate, light, sensor};
use crate::Result;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type RefreshCallback = Box<dyn Fn(&Entity) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct HubBuilder {
    event_callbacks: Vec<EventCallback>,
    refresh_callbacks: Vec<RefreshCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HubBuilder {
    pub fn new() -> Self {
        Self {
            event_callbacks: Vec::new(),
            refresh_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Called once per dispatched event, after every subscriber saw it.
    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    /// Called for each entity that requested a display refresh.
    pub fn on_refresh(mut self, f: impl Fn(&Entity) + Send + Sync + 'static) -> Self {
        self.refresh_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// Build a hub around an existing snapshot with no subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the message log file cannot be opened.
    pub fn build(self, snapshot: Snapshot) -> Hub {
        self.try_build(snapshot).expect("failed to open log file")
    }

    fn try_build(self, snapshot: Snapshot) -> std::io::Result<Hub> {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(Hub {
            snapshot,
            subscribers: Vec::new(),
            next_id: 0,
            last_event: None,
            event_callbacks: self.event_callbacks,
            refresh_callbacks: self.refresh_callbacks,
            logger,
        })
    }

    /// Fetch the snapshot from `api` and subscribe every entity the
    /// controller configuration calls for. Fails with [`crate::Error::Io`]
    /// if the message log cannot be opened.
    pub async fn setup<A: PoolApi>(self, api: &A) -> Result<Hub> {
        let snapshot = api.config()?;

        let mut entities = climate::entities(api, &snapshot).await?;
        entities.extend(light::entities(api, &snapshot).await?);
        entities.extend(sensor::entities(api, &snapshot).await?);
        entities.extend(binary_sensor::entities(api, &snapshot).await?);

        let mut hub = self.try_build(snapshot)?;
        for entity in entities {
            hub.subscribe(entity);
        }
        debug!(count = hub.subscribers.len(), "entities subscribed");
        Ok(hub)
    }
}

/// Owns the controller snapshot and fans events out to entity adapters.
pub struct Hub {
    snapshot: Snapshot,
    subscribers: Vec<(SubscriptionId, Entity)>,
    next_id: u64,
    last_event: Option<Event>,
    event_callbacks: Vec<EventCallback>,
    refresh_callbacks: Vec<RefreshCallback>,
    logger: Option<MessageLogger>,
}

impl Hub {
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.last_event.as_ref()
    }

    pub fn subscribe(&mut self, entity: Entity) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        trace!(unique_id = entity.unique_id(), ?id, "subscribing entity");
        self.subscribers.push((id, entity));
        id
    }

    /// Detach a subscriber, handing the entity back.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Entity> {
        let idx = self.subscribers.iter().position(|(sid, _)| *sid == id)?;
        let (_, entity) = self.subscribers.remove(idx);
        trace!(unique_id = entity.unique_id(), ?id, "unsubscribed entity");
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.subscribers.iter().map(|(_, e)| e)
    }

    /// First entity with `unique_id`.
    pub fn entity(&self, unique_id: &str) -> Option<&Entity> {
        self.entities().find(|e| e.unique_id() == unique_id)
    }

    pub fn light(&self, unique_id: &str) -> Option<&CircuitLight> {
        self.entity(unique_id).and_then(Entity::as_light)
    }

    pub fn climate(&self, unique_id: &str) -> Option<&BodyHeater> {
        self.entity(unique_id).and_then(Entity::as_climate)
    }

    /// Parse one NDJSON line from the transport and dispatch it.
    pub fn dispatch_line(&mut self, line: &str) -> Result<usize> {
        let raw: Value = serde_json::from_str(line)?;
        self.dispatch_value(raw)
    }

    /// Parse a raw transport payload and dispatch it.
    pub fn dispatch_value(&mut self, raw: Value) -> Result<usize> {
        let event = Event::from_value(raw)?;
        Ok(self.dispatch(event))
    }

    /// Apply `event` to the snapshot, offer it to every subscriber and fire
    /// refresh callbacks for those that claimed it. Returns the number of
    /// refreshed entities.
    pub fn dispatch(&mut self, event: Event) -> usize {
        if let Some(ref mut logger) = self.logger {
            logger.log_event(&event.to_value());
        }

        if self.snapshot.apply(&event)
            && let Some(ref mut logger) = self.logger
        {
            logger.log_state(self.snapshot.raw());
        }

        let mut refreshed = 0;
        for (_, entity) in self.subscribers.iter_mut() {
            if entity.handle_event(&event) {
                refreshed += 1;
                for cb in &self.refresh_callbacks {
                    cb(&*entity);
                }
            }
        }

        for cb in &self.event_callbacks {
            cb(&event);
        }

        trace!(
            kind = event.kind.as_njspc_str(),
            id = ?event.id,
            refreshed,
            "dispatched event"
        );
        self.last_event = Some(event);
        refreshed
    }

    /// Drop every subscriber and hand back the snapshot.
    pub fn teardown(self) -> Snapshot {
        debug!(count = self.subscribers.len(), "tearing down hub");
        self.snapshot
    }
}
