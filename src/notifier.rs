use std::{
    sync::{
        Arc, RwLock,
        mpsc::{Receiver, Sender, channel},
    },
    thread,
};

/// Fan-out of events to any number of observers. Clones share the same
/// observer list. Observers whose receiver was dropped are pruned on the
/// next notify.
#[derive(Clone)]
pub struct Notifier<Event: Send + Sync + Clone + 'static> {
    senders: Arc<RwLock<Vec<Sender<Event>>>>,
}

impl<Event: Send + Sync + Clone + 'static> Notifier<Event> {
    pub fn new() -> Self {
        Self {
            senders: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn notify(&self, event: Event) {
        if let Ok(mut senders) = self.senders.write() {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn observer(&self) -> Receiver<Event> {
        let (tx, rx) = channel();
        if let Ok(mut senders) = self.senders.write() {
            senders.push(tx);
        }
        rx
    }

    /// Runs `callback` on a background thread for every event until the
    /// notifier and all its clones are dropped.
    pub fn observe(&self, mut callback: impl FnMut(Event) + Send + 'static) {
        let rx = self.observer();
        thread::spawn(move || {
            rx.iter().for_each(|e| callback(e));
        });
    }

    pub fn observer_count(&self) -> usize {
        self.senders.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl<Event: Send + Sync + Clone + 'static> Default for Notifier<Event> {
    fn default() -> Self {
        Self::new()
    }
}
