// Observable playback state read by the UI layer
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::models::Playback;

/// What a view needs to embed the active player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    /// Load generation the handle belongs to.
    pub generation: u64,
    pub locator: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Title(Option<String>),
    Player(Option<PlayerHandle>),
    Playbacks(Vec<Playback>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Pass-through state container: every write notifies every subscriber.
#[derive(Default)]
pub struct PlaybackStore {
    title: RwLock<Option<String>>,
    player: RwLock<Option<PlayerHandle>>,
    playbacks: RwLock<Vec<Playback>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<String> {
        self.title.read().clone()
    }

    pub fn player(&self) -> Option<PlayerHandle> {
        self.player.read().clone()
    }

    pub fn playbacks(&self) -> Vec<Playback> {
        self.playbacks.read().clone()
    }

    pub fn set_title(&self, title: Option<String>) {
        *self.title.write() = title.clone();
        self.notify(StoreChange::Title(title));
    }

    pub fn set_player(&self, player: Option<PlayerHandle>) {
        *self.player.write() = player.clone();
        self.notify(StoreChange::Player(player));
    }

    pub fn set_playbacks(&self, playbacks: Vec<Playback>) {
        *self.playbacks.write() = playbacks.clone();
        self.notify(StoreChange::Playbacks(playbacks));
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn notify(&self, change: StoreChange) {
        // Snapshot the list so subscribers may read the store or unsubscribe
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        for subscriber in subscribers {
            subscriber(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(store: &PlaybackStore) -> (SubscriptionId, Arc<Mutex<Vec<StoreChange>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = store.subscribe(move |change| sink.lock().push(change.clone()));
        (id, seen)
    }

    #[test]
    fn starts_empty() {
        let store = PlaybackStore::new();
        assert_eq!(store.title(), None);
        assert_eq!(store.player(), None);
        assert!(store.playbacks().is_empty());
    }

    #[test]
    fn every_write_notifies() {
        let store = PlaybackStore::new();
        let (_, seen) = recorder(&store);

        store.set_title(Some("a.mp3".into()));
        store.set_title(Some("a.mp3".into()));
        store.set_playbacks(vec![Playback::new("a.mp3", 1.0, 2.0)]);

        assert_eq!(
            *seen.lock(),
            vec![
                StoreChange::Title(Some("a.mp3".into())),
                StoreChange::Title(Some("a.mp3".into())),
                StoreChange::Playbacks(vec![Playback::new("a.mp3", 1.0, 2.0)]),
            ]
        );
    }

    #[test]
    fn unsubscribed_observers_stop_receiving() {
        let store = PlaybackStore::new();
        let (id, seen) = recorder(&store);
        let (_, other) = recorder(&store);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_title(None);

        assert!(seen.lock().is_empty());
        assert_eq!(other.lock().len(), 1);
    }

    #[test]
    fn subscriber_can_read_store_during_notification() {
        let store = Arc::new(PlaybackStore::new());
        let observed = Arc::new(Mutex::new(None));

        let reader = Arc::downgrade(&store);
        let sink = observed.clone();
        store.subscribe(move |_| {
            if let Some(store) = reader.upgrade() {
                *sink.lock() = store.title();
            }
        });

        store.set_title(Some("clip.mov".into()));
        assert_eq!(observed.lock().as_deref(), Some("clip.mov"));
    }
}
