//! Actor system utilities
//!
//! Each backing service runs as a long-lived async task that owns its
//! connection and processes messages via channels.

use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Trait for actor messages - all commands sent to actors must implement this
pub trait ActorMessage: Send + 'static {}

/// Generic actor handle that can send commands to an actor
pub struct ActorHandle<C: ActorMessage> {
    sender: mpsc::Sender<C>,
}

// Manual Clone implementation that doesn't require C: Clone
impl<C: ActorMessage> Clone for ActorHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C: ActorMessage> ActorHandle<C> {
    pub fn new(sender: mpsc::Sender<C>) -> Self {
        Self { sender }
    }

    /// Send a command to the actor
    pub async fn send(&self, cmd: C) -> Result<(), ActorError> {
        self.sender.send(cmd).await?;
        Ok(())
    }

    /// Check if the actor is still alive (channel not closed)
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl<C: ActorMessage> fmt::Debug for ActorHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("is_alive", &self.is_alive())
            .finish()
    }
}

/// Spawn an actor task and return its handle
pub fn spawn_actor<C, F, Fut>(buffer_size: usize, actor_fn: F) -> ActorHandle<C>
where
    C: ActorMessage,
    F: FnOnce(mpsc::Receiver<C>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer_size);
    tokio::spawn(actor_fn(rx));
    ActorHandle::new(tx)
}

/// Errors that can occur in actor operations
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Actor channel closed")]
    ChannelClosed,

    #[error("Actor dropped the reply")]
    NoReply,
}

impl From<oneshot::error::RecvError> for ActorError {
    fn from(_: oneshot::error::RecvError) -> Self {
        ActorError::NoReply
    }
}

impl<T> From<mpsc::error::SendError<T>> for ActorError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        ActorError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct PingCommand {
        reply: oneshot::Sender<String>,
    }

    impl ActorMessage for PingCommand {}

    #[tokio::test]
    async fn test_actor_spawn_and_send() {
        let handle = spawn_actor(10, |mut rx: mpsc::Receiver<PingCommand>| async move {
            while let Some(cmd) = rx.recv().await {
                let _ = cmd.reply.send("pong".to_string());
            }
        });

        assert!(handle.is_alive());

        let (tx, rx) = oneshot::channel();
        handle.send(PingCommand { reply: tx }).await.unwrap();

        let response = rx.await.unwrap();
        assert_eq!(response, "pong");
    }

    #[tokio::test]
    async fn test_send_after_actor_exit_fails() {
        let handle = spawn_actor(1, |rx: mpsc::Receiver<PingCommand>| async move {
            drop(rx);
        });
        while handle.is_alive() {
            tokio::task::yield_now().await;
        }

        let (tx, _rx) = oneshot::channel();
        let err = handle.send(PingCommand { reply: tx }).await.unwrap_err();
        assert!(matches!(err, ActorError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_dropped_reply_is_no_reply() {
        let handle = spawn_actor(1, |mut rx: mpsc::Receiver<PingCommand>| async move {
            while let Some(cmd) = rx.recv().await {
                drop(cmd.reply);
            }
        });

        let (tx, rx) = oneshot::channel();
        handle.send(PingCommand { reply: tx }).await.unwrap();

        let err = rx.await.map_err(ActorError::from).unwrap_err();
        assert!(matches!(err, ActorError::NoReply));

        let service_err = crate::runtime::services::ServiceError::from(err);
        assert!(service_err.to_string().contains("dropped the reply"));
    }
}
