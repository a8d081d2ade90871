use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Observable value. The current value lives in a `watch` channel so reads
/// never block; a separate `broadcast` channel carries change signals for
/// subscribers that only care that something changed.
///
/// Clones share the same underlying channels, so a clone handed to another
/// component observes (and can make) the same updates.
pub struct Property<T: Clone + Send + Sync> {
    value_sender: Arc<watch::Sender<T>>,
    value_receiver: watch::Receiver<T>,
    change_sender: broadcast::Sender<()>,
    name: String,
}

impl<T: Clone + Send + Sync> Property<T> {
    pub fn new(initial_value: T, name: impl Into<String>) -> Self {
        let (value_sender, value_receiver) = watch::channel(initial_value);
        let (change_sender, _) = broadcast::channel(64);
        Self {
            value_sender: Arc::new(value_sender),
            value_receiver,
            change_sender,
            name: name.into(),
        }
    }

    pub async fn get(&self) -> T {
        self.value_receiver.borrow().clone()
    }

    /// Synchronous read; the value is already in memory.
    pub fn get_sync(&self) -> T {
        self.value_receiver.borrow().clone()
    }

    pub async fn set(&self, new_value: T) {
        let _ = self.value_sender.send(new_value);
        let _ = self.change_sender.send(());
    }

    pub async fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut T),
    {
        let mut new_value = self.value_receiver.borrow().clone();
        updater(&mut new_value);
        let _ = self.value_sender.send(new_value);
        let _ = self.change_sender.send(());
    }

    pub fn subscribe(&self) -> PropertySubscriber {
        PropertySubscriber {
            receiver: self.change_sender.subscribe(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscriber_count(&self) -> usize {
        self.change_sender.receiver_count()
    }
}

impl<T: Clone + Send + Sync> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            value_sender: self.value_sender.clone(),
            value_receiver: self.value_receiver.clone(),
            change_sender: self.change_sender.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + Debug> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Property({}: {:?})", self.name, self.get_sync())
    }
}

/// Change-signal handle for one subscriber. Not cloneable; call
/// [`Property::subscribe`] again for additional subscribers.
pub struct PropertySubscriber {
    receiver: broadcast::Receiver<()>,
}

impl PropertySubscriber {
    /// Wait for the next change. Returns `false` once the property side has
    /// been dropped.
    pub async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.receiver.recv().await {
                Ok(_) => return true,
                // Lagged behind: skip to the latest signal
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }

    pub fn try_recv(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(_) => true,
            Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(broadcast::error::TryRecvError::Empty) => false,
            Err(broadcast::error::TryRecvError::Closed) => false,
        }
    }
}
