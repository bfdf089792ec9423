//! Delivery of checkout verification codes
//!
//! Email delivery is outside this service; the default sender writes the
//! code to the log so operators (and local development) can relay it.

use async_trait::async_trait;
use uuid::Uuid;

/// Code delivery failure
#[derive(Debug, thiserror::Error)]
#[error("failed to deliver verification code: {0}")]
pub struct SendError(pub String);

/// Delivers a verification code to a buyer
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send(&self, email: &str, purchase_id: Uuid, code: &str) -> Result<(), SendError>;
}

/// Logs codes at INFO
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCodeSender;

#[async_trait]
impl CodeSender for LoggingCodeSender {
    async fn send(&self, email: &str, purchase_id: Uuid, code: &str) -> Result<(), SendError> {
        tracing::info!(%purchase_id, email, code, "verification code issued");
        Ok(())
    }
}

/// Keeps sent codes in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingCodeSender {
    pub sent: std::sync::Mutex<Vec<(String, Uuid, String)>>,
}

#[cfg(test)]
#[async_trait]
impl CodeSender for RecordingCodeSender {
    async fn send(&self, email: &str, purchase_id: Uuid, code: &str) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_owned(), purchase_id, code.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_sender_never_fails() {
        LoggingCodeSender
            .send("a@example.com", Uuid::new_v4(), "123456")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recording_sender_keeps_codes() {
        let sender = RecordingCodeSender::default();
        let id = Uuid::new_v4();
        sender.send("a@example.com", id, "654321").await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("a@example.com".to_string(), id, "654321".to_string())]);
    }
}
