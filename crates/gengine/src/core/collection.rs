//! Ordered instance storage with depth sorting and change notifications.
//!
//! Observers subscribe to a channel and receive [`CollectionEvent`]s for every
//! add and remove; the collection never knows who is listening. Dropping the
//! returned [`Subscription`] (or calling `unsubscribe`) ends delivery.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::api::types::InstanceId;
use crate::components::instance::Instance;
use crate::components::object::GameObject;

/// Structural change to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvent {
    Added(InstanceId),
    Removed(InstanceId),
    /// An instance was looked up for mutation.
    Accessed(InstanceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Receiving end of a collection subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<CollectionEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Take every event delivered so far.
    pub fn drain(&self) -> Vec<CollectionEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Instances of one scene instance, in update/draw order.
///
/// Not synchronized; share across threads only behind a lock.
#[derive(Debug)]
pub struct InstanceCollection {
    items: Vec<Instance>,
    sorted: bool,
    emitting: bool,
    subscribers: Vec<(SubscriberId, Sender<CollectionEvent>)>,
    next_subscriber: u64,
    rebuilds: u64,
}

impl Default for InstanceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceCollection {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(64),
            sorted: true,
            emitting: true,
            subscribers: Vec::new(),
            next_subscriber: 0,
            rebuilds: 0,
        }
    }

    // -- observers --

    pub fn subscribe(&mut self) -> Subscription {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn emit(&mut self, event: CollectionEvent) {
        if !self.emitting {
            return;
        }
        // receivers dropped without unsubscribing are pruned here
        self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
    }

    // -- container operations --

    pub fn add(&mut self, instance: Instance) {
        let id = instance.id();
        self.items.push(instance);
        self.sorted = false;
        self.emit(CollectionEvent::Added(id));
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        let idx = self.items.iter().position(|i| i.id() == id)?;
        // order must be kept, so no swap_remove
        let removed = self.items.remove(idx);
        self.emit(CollectionEvent::Removed(id));
        Some(removed)
    }

    /// Remove everything, emitting a remove event per instance.
    pub fn clear(&mut self) -> Vec<Instance> {
        let drained = std::mem::take(&mut self.items);
        for inst in &drained {
            self.emit(CollectionEvent::Removed(inst.id()));
        }
        self.sorted = true;
        drained
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.iter()
    }

    /// Mutable iteration. Depths may change, so the collection counts as unsorted afterwards.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Instance> {
        self.sorted = false;
        self.items.iter_mut()
    }

    /// Mutable iteration for callers that never touch `depth`.
    pub(crate) fn iter_mut_keep_order(&mut self) -> impl Iterator<Item = &mut Instance> {
        self.items.iter_mut()
    }

    /// Forget the current order; the next unforced sort rebuilds.
    pub(crate) fn invalidate_order(&mut self) {
        self.sorted = false;
    }

    // -- lookups --

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        let idx = self.items.iter().position(|i| i.id() == id)?;
        self.emit(CollectionEvent::Accessed(id));
        self.sorted = false;
        Some(&mut self.items[idx])
    }

    /// First instance whose template has this name.
    pub fn find_by_name(&self, name: &str) -> Option<&Instance> {
        self.items.iter().find(|i| i.name() == name)
    }

    /// All instances created from `object`.
    pub fn find_by_object<'a>(
        &'a self,
        object: &'a Arc<GameObject>,
    ) -> impl Iterator<Item = &'a Instance> + 'a {
        self.items
            .iter()
            .filter(move |i| Arc::ptr_eq(i.object(), object))
    }

    // -- ordering --

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// How many times the depth order has been rebuilt.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Stable ascending sort by depth.
    ///
    /// No-op when already sorted unless `force` is set. The collection is
    /// rebuilt by clearing and re-adding in sorted order, with events
    /// suspended for the duration. Returns whether a rebuild happened.
    pub fn sort_by_depth(&mut self, force: bool) -> bool {
        if self.sorted && !force {
            return false;
        }
        let was_emitting = std::mem::replace(&mut self.emitting, false);
        let items = std::mem::take(&mut self.items);
        for instance in merge_sort_by_key(items, &|i: &Instance| i.depth) {
            self.add(instance);
        }
        self.emitting = was_emitting;
        self.sorted = true;
        self.rebuilds += 1;
        true
    }
}

/// Top-down merge sort. The left half takes `floor(n / 2)` elements; ties keep
/// their input order.
pub(crate) fn merge_sort_by_key<T, K, F>(mut items: Vec<T>, key: &F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by_key(items, key);
    let right = merge_sort_by_key(right, key);
    merge(left, right, key)
}

fn merge<T, K, F>(left: Vec<T>, right: Vec<T>, key: &F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            // `<=` keeps equal keys in input order
            (Some(l), Some(r)) => key(l) <= key(r),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
    out
}
