//! Message queue for asynchronous consumption recording
//!
//! Delivery is at-least-once: a message stays owned by the queue until it is
//! acknowledged, and a negative acknowledgement with requeue makes it
//! available again with its retry counter incremented. Messages left in
//! flight by a worker that stopped before settling them are handed back with
//! `recover`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod consumer;
pub mod redis_queue;

pub use consumer::{ConsumptionConsumer, ConsumptionEvent, OrderConsumptionRecorder, Outcome};
pub use redis_queue::RedisMessageQueue;

/// Message queue errors
#[derive(Error, Debug)]
pub enum MessageQueueError {
    #[error("Queue is full")]
    QueueFull,
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl From<redis::RedisError> for MessageQueueError {
    fn from(err: redis::RedisError) -> Self {
        MessageQueueError::ConnectionError(err.to_string())
    }
}

/// Message envelope for queue items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            timestamp: chrono::Utc::now(),
            retry_count: 0,
        }
    }

    /// The same message, marked as redelivered
    pub fn redelivered(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Message queue trait for different implementations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError>;

    /// Take the next message of `topic`, if any. The message is in flight
    /// until `ack` or `nack` is called for it.
    async fn receive(&self, topic: &str) -> Result<Option<Message>, MessageQueueError>;

    async fn ack(&self, message: &Message) -> Result<(), MessageQueueError>;

    async fn nack(&self, message: &Message, requeue: bool) -> Result<(), MessageQueueError>;

    /// Move every in-flight message of `topic` back to the ready list and
    /// return how many were moved. Retry counters are left untouched.
    async fn recover(&self, topic: &str) -> Result<usize, MessageQueueError>;
}

#[derive(Debug, Default)]
struct Queues {
    ready: HashMap<String, VecDeque<Message>>,
    in_flight: HashMap<Uuid, Message>,
}

/// In-memory message queue implementation
#[derive(Debug, Clone)]
pub struct InMemoryMessageQueue {
    queues: Arc<Mutex<Queues>>,
    max_size: usize,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_max_size(1000)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            queues: Arc::new(Mutex::new(Queues::default())),
            max_size,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Queues>, MessageQueueError> {
        self.queues
            .lock()
            .map_err(|_| MessageQueueError::ConnectionError("queue lock poisoned".to_string()))
    }

    /// Messages waiting in `topic`
    pub fn pending(&self, topic: &str) -> usize {
        self.lock()
            .map(|q| q.ready.get(topic).map(VecDeque::len).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Messages received but not yet settled
    pub fn in_flight(&self) -> usize {
        self.lock().map(|q| q.in_flight.len()).unwrap_or(0)
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut queues = self.lock()?;
        let queue = queues.ready.entry(message.topic.clone()).or_default();

        if queue.len() >= self.max_size {
            return Err(MessageQueueError::QueueFull);
        }

        queue.push_back(message);
        Ok(())
    }

    async fn receive(&self, topic: &str) -> Result<Option<Message>, MessageQueueError> {
        let mut queues = self.lock()?;
        let message = queues.ready.get_mut(topic).and_then(VecDeque::pop_front);
        if let Some(message) = &message {
            queues.in_flight.insert(message.id, message.clone());
        }
        Ok(message)
    }

    async fn ack(&self, message: &Message) -> Result<(), MessageQueueError> {
        self.lock()?.in_flight.remove(&message.id);
        Ok(())
    }

    async fn nack(&self, message: &Message, requeue: bool) -> Result<(), MessageQueueError> {
        let mut queues = self.lock()?;
        queues.in_flight.remove(&message.id);
        if requeue {
            queues
                .ready
                .entry(message.topic.clone())
                .or_default()
                .push_back(message.redelivered());
        }
        Ok(())
    }

    async fn recover(&self, topic: &str) -> Result<usize, MessageQueueError> {
        let mut queues = self.lock()?;
        let ids: Vec<Uuid> = queues
            .in_flight
            .values()
            .filter(|m| m.topic == topic)
            .map(|m| m.id)
            .collect();

        let mut stranded: Vec<Message> = ids
            .iter()
            .filter_map(|id| queues.in_flight.remove(id))
            .collect();
        stranded.sort_by_key(|m| m.timestamp);

        let count = stranded.len();
        queues
            .ready
            .entry(topic.to_string())
            .or_default()
            .extend(stranded);
        Ok(count)
    }
}
