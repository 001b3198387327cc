//! Reliable list-based queue on Redis
//!
//! `receive` moves a message atomically from `queue:<topic>` to
//! `queue:<topic>:processing`; `ack` removes it from the processing list and
//! `nack` with requeue pushes a redelivered copy back to the ready list.
//! `recover` drains the processing list back into the ready list.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::{Message, MessageQueue, MessageQueueError};

#[derive(Clone)]
pub struct RedisMessageQueue {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisMessageQueue {
    pub async fn connect(redis_url: &str) -> Result<Self, MessageQueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            prefix: "queue".to_string(),
        })
    }

    fn ready_key(&self, topic: &str) -> String {
        format!("{}:{}", self.prefix, topic)
    }

    fn processing_key(&self, topic: &str) -> String {
        format!("{}:{}:processing", self.prefix, topic)
    }
}

#[async_trait]
impl MessageQueue for RedisMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let raw = serde_json::to_string(&message)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(self.ready_key(&message.topic), raw).await?;
        Ok(())
    }

    async fn receive(&self, topic: &str) -> Result<Option<Message>, MessageQueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .rpoplpush(self.ready_key(topic), self.processing_key(topic))
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<Message>(&raw) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                // Unreadable envelopes can never succeed; drop them.
                tracing::error!("Dropping malformed message on {}: {}", topic, e);
                let _: () = conn.lrem(self.processing_key(topic), 1, raw).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, message: &Message) -> Result<(), MessageQueueError> {
        let raw = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .lrem(self.processing_key(&message.topic), 1, raw)
            .await?;
        Ok(())
    }

    async fn nack(&self, message: &Message, requeue: bool) -> Result<(), MessageQueueError> {
        let raw = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        if requeue {
            let retry = serde_json::to_string(&message.redelivered())?;
            let _: () = redis::pipe()
                .atomic()
                .lrem(self.processing_key(&message.topic), 1, raw)
                .ignore()
                .lpush(self.ready_key(&message.topic), retry)
                .ignore()
                .query_async(&mut conn)
                .await?;
        } else {
            let _: () = conn
                .lrem(self.processing_key(&message.topic), 1, raw)
                .await?;
        }
        Ok(())
    }

    async fn recover(&self, topic: &str) -> Result<usize, MessageQueueError> {
        let mut conn = self.conn.clone();
        let mut moved = 0;
        loop {
            let raw: Option<String> = conn
                .rpoplpush(self.processing_key(topic), self.ready_key(topic))
                .await?;
            if raw.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }
}
