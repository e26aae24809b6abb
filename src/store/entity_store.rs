use std::{collections::HashMap, fmt::Display, sync::mpsc::Receiver};

use crate::notifier::Notifier;
use crate::store::types::{Entity, StoreEvent};

/// In-memory cache of one entity type, keeping an ordered list and an
/// id index in sync. New records are appended; replacing a record keeps
/// its position.
///
/// Every store is independent. Create one per entity type:
///
/// ```
/// use entity_forms::store::{EntityStore, Record};
/// use serde_json::json;
///
/// let mut products = EntityStore::<Record>::new();
/// products.upsert_item(Record::try_from(json!({"id": 1, "name": "Tent"})).unwrap());
/// assert_eq!(products.len(), 1);
/// ```
pub struct EntityStore<E: Entity> {
    items: Vec<E>,
    positions: HashMap<String, usize>,
    notifier: Notifier<StoreEvent>,
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
            notifier: Notifier::new(),
        }
    }

    /// Replaces the whole store. Duplicate ids in `items` keep the first
    /// position and the last record.
    pub fn set_items(&mut self, items: impl IntoIterator<Item = E>) {
        self.items.clear();
        self.positions.clear();
        for item in items {
            self.put(item);
        }
        log::debug!("STORE SET: {} items", self.items.len());
        self.notifier.notify(StoreEvent::Replaced {
            len: self.items.len(),
        });
    }

    /// Inserts `item` at the end, or replaces the record with the same id
    /// in place. Returns true if the item was new.
    pub fn upsert_item(&mut self, item: E) -> bool {
        let key = item.store_key();
        let inserted = self.put(item);
        log::debug!("STORE UPSERT: key='{}' inserted={}", key, inserted);
        self.notifier.notify(if inserted {
            StoreEvent::Inserted(key)
        } else {
            StoreEvent::Updated(key)
        });
        inserted
    }

    /// Applies [`upsert_item`](Self::upsert_item) to each item in order.
    /// An empty batch leaves the store and its observers untouched.
    pub fn upsert_items(&mut self, items: impl IntoIterator<Item = E>) {
        for item in items {
            self.upsert_item(item);
        }
    }

    /// Removes the record with this id. Unknown ids are ignored.
    pub fn remove_item(&mut self, id: impl Display) -> Option<E> {
        let key = id.to_string();
        let position = self.positions.remove(&key)?;
        let removed = self.items.remove(position);
        for pos in self.positions.values_mut() {
            if *pos > position {
                *pos -= 1;
            }
        }
        log::debug!("STORE REMOVE: key='{}'", key);
        self.notifier.notify(StoreEvent::Removed(key));
        Some(removed)
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.positions.clear();
        log::debug!("STORE CLEAR");
        self.notifier.notify(StoreEvent::Cleared);
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: impl Display) -> Option<&E> {
        self.positions
            .get(&id.to_string())
            .map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: impl Display) -> bool {
        self.positions.contains_key(&id.to_string())
    }

    /// Store keys in list order.
    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|item| item.store_key()).collect()
    }

    /// Key to record view of the store.
    pub fn by_id(&self) -> HashMap<&str, &E> {
        self.positions
            .iter()
            .map(|(key, &pos)| (key.as_str(), &self.items[pos]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Receives a [`StoreEvent`] for every mutation that changed the
    /// store. No-op calls send nothing.
    pub fn observer(&self) -> Receiver<StoreEvent> {
        self.notifier.observer()
    }

    pub fn observe(&self, callback: impl FnMut(StoreEvent) + Send + 'static) {
        self.notifier.observe(callback)
    }

    fn put(&mut self, item: E) -> bool {
        let key = item.store_key();
        match self.positions.get(&key) {
            Some(&pos) => {
                self.items[pos] = item;
                false
            }
            None => {
                self.positions.insert(key, self.items.len());
                self.items.push(item);
                true
            }
        }
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}
