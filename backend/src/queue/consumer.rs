//! Consumer for `calculate_material_consumption` events

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Message, MessageQueue, MessageQueueError};
use crate::error::{AppError, AppResult};

/// Payload of a consumption event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionEvent {
    pub order_id: i32,
}

/// Side effect driven by the consumer. Must be safe to run more than once
/// for the same order.
#[async_trait]
pub trait OrderConsumptionRecorder: Send + Sync {
    async fn record_order_consumption(&self, order_id: i32) -> AppResult<()>;
}

/// How a message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acked,
    Requeued,
    Dropped,
}

pub struct ConsumptionConsumer {
    queue: Arc<dyn MessageQueue>,
    recorder: Arc<dyn OrderConsumptionRecorder>,
    topic: String,
    max_retries: u32,
}

impl ConsumptionConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        recorder: Arc<dyn OrderConsumptionRecorder>,
        topic: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            queue,
            recorder,
            topic: topic.into(),
            max_retries,
        }
    }

    /// Publish a consumption event for `order_id`
    pub async fn publish(
        queue: &dyn MessageQueue,
        topic: &str,
        order_id: i32,
    ) -> Result<Message, MessageQueueError> {
        let payload = serde_json::to_value(ConsumptionEvent { order_id })?;
        let message = Message::new(topic, payload);
        queue.publish(message.clone()).await?;
        Ok(message)
    }

    /// Run the side effect for one message and settle it with the queue.
    ///
    /// Success acks. Missing orders and unreadable payloads are acked and
    /// dropped since redelivery cannot fix them. Any other failure is nacked
    /// with requeue until `max_retries` redeliveries have been spent.
    pub async fn handle(&self, message: &Message) -> Result<Outcome, MessageQueueError> {
        let event = match serde_json::from_value::<ConsumptionEvent>(message.payload.clone()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping message {} with invalid payload: {}", message.id, e);
                self.queue.ack(message).await?;
                return Ok(Outcome::Dropped);
            }
        };

        if message.retry_count > 0 {
            tracing::info!(
                "Processing redelivered consumption event for order {} (attempt {})",
                event.order_id,
                message.retry_count + 1
            );
        }

        match self.recorder.record_order_consumption(event.order_id).await {
            Ok(()) => {
                self.queue.ack(message).await?;
                Ok(Outcome::Acked)
            }
            Err(AppError::NotFound(resource)) => {
                tracing::warn!(
                    "Dropping consumption event for order {}: {} not found",
                    event.order_id,
                    resource
                );
                self.queue.ack(message).await?;
                Ok(Outcome::Dropped)
            }
            Err(e) if message.retry_count >= self.max_retries => {
                tracing::error!(
                    "Giving up on consumption event for order {} after {} retries: {}",
                    event.order_id,
                    message.retry_count,
                    e
                );
                self.queue.ack(message).await?;
                Ok(Outcome::Dropped)
            }
            Err(e) => {
                tracing::warn!(
                    "Consumption for order {} failed, requeueing: {}",
                    event.order_id,
                    e
                );
                self.queue.nack(message, true).await?;
                Ok(Outcome::Requeued)
            }
        }
    }

    /// Receive and handle at most one message
    pub async fn poll_once(&self) -> Result<Option<Outcome>, MessageQueueError> {
        match self.queue.receive(&self.topic).await? {
            Some(message) => self.handle(&message).await.map(Some),
            None => Ok(None),
        }
    }

    /// Hand messages left in flight back to the topic
    pub async fn recover(&self) -> Result<usize, MessageQueueError> {
        let moved = self.queue.recover(&self.topic).await?;
        if moved > 0 {
            tracing::warn!("Returned {} unsettled message(s) to {}", moved, self.topic);
        }
        Ok(moved)
    }

    /// Drain the topic forever, sleeping `poll_interval` whenever it is empty.
    ///
    /// Unsettled messages are recovered on start and after every queue
    /// error, so a message whose ack or nack failed is delivered again.
    pub async fn run(self, poll_interval: Duration) {
        tracing::info!("Consumption consumer listening on {}", self.topic);
        if let Err(e) = self.recover().await {
            tracing::error!("Could not recover unsettled messages: {}", e);
        }

        loop {
            match self.poll_once().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Consumption consumer queue error: {}", e);
                    if let Err(e) = self.recover().await {
                        tracing::error!("Could not recover unsettled messages: {}", e);
                    }
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Start the consumer on the runtime
    pub fn spawn(self, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(poll_interval))
    }
}
