use crate::protocol::{NoticeKind, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;

/// How long a notice stays up
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Pushes transient notices to one client and dismisses them after a delay
#[derive(Clone)]
pub struct Notifier {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>, ttl: Duration) -> Self {
        Self { outbound, ttl }
    }

    /// Show a notice; returns its id
    pub fn notify(&self, kind: NoticeKind, text: impl Into<String>) -> String {
        let id = ulid::Ulid::new().to_string();
        let _ = self.outbound.send(ServerMessage::Notice {
            id: id.clone(),
            kind,
            text: text.into(),
        });

        let outbound = self.outbound.clone();
        let ttl = self.ttl;
        let dismiss = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // Client may be gone by now
            let _ = outbound.send(ServerMessage::NoticeDismissed { id: dismiss });
        });

        id
    }

    pub fn success(&self, text: impl Into<String>) -> String {
        self.notify(NoticeKind::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> String {
        self.notify(NoticeKind::Error, text)
    }

    pub fn info(&self, text: impl Into<String>) -> String {
        self.notify(NoticeKind::Info, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notice_is_dismissed_after_ttl() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(tx, Duration::from_millis(50));

        let id = notifier.error("boom");
        match rx.recv().await {
            Some(ServerMessage::Notice { id: got, kind, text }) => {
                assert_eq!(got, id);
                assert_eq!(kind, NoticeKind::Error);
                assert_eq!(text, "boom");
            }
            other => panic!("Expected Notice, got {:?}", other),
        }

        // Still showing right after
        assert!(rx.try_recv().is_err());

        let dismissed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("notice was never dismissed");
        match dismissed {
            Some(ServerMessage::NoticeDismissed { id: got }) => assert_eq!(got, id),
            other => panic!("Expected NoticeDismissed, got {:?}", other),
        }
    }
}
