use futures_channel::mpsc;
use safekit_core::types::Address;
use std::sync::Mutex;

/// Notification emitted whenever the session's current account or chain
/// changes, including the clears performed on disconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The current account changed; empty when the session has none.
    AccountsChanged(Vec<Address>),
    /// The current chain changed.
    ChainChanged(u64),
}

/// Fan-out of [`BridgeEvent`]s to any number of subscribers. Subscribers that
/// dropped their receiver are pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<BridgeEvent>>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<BridgeEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: BridgeEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|subscriber| subscriber.unbounded_send(event.clone()).is_ok());
    }
}
