use tokio::sync::mpsc;

use crate::models::notification::Notification;

/// Interaction events flowing from the surfaces (API, CLI) to the worker.
#[derive(Debug)]
pub enum UiEvent {
    ViewDetailsRequested { notification: Notification },
    MarkReadRequested { notification_id: String },
}

#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<UiEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event).await;
    }
}
