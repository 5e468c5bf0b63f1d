// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification plumbing.
//!
//! Two kinds of listeners hear about value changes:
//!
//! - **Store-wide listeners** ([`AttributeStore::on_change`](crate::AttributeStore::on_change))
//!   hear about every attribute. They run first.
//! - **Attribute observers** ([`AttributeStore::register_observer`](crate::AttributeStore::register_observer))
//!   hear about one attribute, in registration order.
//!
//! Modifiers that read another attribute also subscribe to it, internally,
//! so that a change to the source invalidates the modifier's target.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use understory_depgraph::NodeId;

/// A resolved value change.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttributeChange<'a> {
    /// The attribute whose value changed.
    pub name: &'a str,
    /// The cached value before the recompute.
    pub old_value: f64,
    /// The freshly computed value.
    pub new_value: f64,
}

/// Receives change notifications for one attribute.
///
/// Observers are registered by `Arc`; two registrations are the same
/// observer when they point at the same allocation. Any
/// `Fn(&AttributeChange<'_>) + Send + Sync` closure is an observer.
///
/// Observers run synchronously inside the read that caused the recompute
/// and cannot reach back into the store.
pub trait AttributeObserver: Send + Sync {
    /// Called after `change.name` took a new value.
    fn on_attribute_changed(&self, change: &AttributeChange<'_>);
}

impl<F> AttributeObserver for F
where
    F: Fn(&AttributeChange<'_>) + Send + Sync,
{
    fn on_attribute_changed(&self, change: &AttributeChange<'_>) {
        self(change);
    }
}

/// Callback type for store-wide change listeners.
pub type ChangeListener = Box<dyn Fn(&AttributeChange<'_>) + Send + Sync>;

/// Handle to a store-wide listener, returned by
/// [`AttributeStore::on_change`](crate::AttributeStore::on_change).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle to an internal invalidation subscription held by a modifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

/// One entry in an attribute's subscriber list.
#[derive(Clone)]
pub(crate) enum Subscriber {
    /// Marks `target` dirty when the watched attribute changes.
    Invalidate {
        subscription: SubscriptionId,
        target: NodeId,
    },
    /// An external observer.
    Observer(Arc<dyn AttributeObserver>),
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalidate {
                subscription,
                target,
            } => f
                .debug_struct("Invalidate")
                .field("subscription", subscription)
                .field("target", target)
                .finish(),
            Self::Observer(observer) => f
                .debug_tuple("Observer")
                .field(&Arc::as_ptr(observer).cast::<()>())
                .finish(),
        }
    }
}

fn same_observer(a: &Arc<dyn AttributeObserver>, b: &Arc<dyn AttributeObserver>) -> bool {
    core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Per-attribute subscriber lists plus the store-wide listener list.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    subscribers: HashMap<NodeId, Vec<Subscriber>>,
    listeners: Vec<(ListenerId, ChangeListener)>,
    next_id: u64,
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("subscribers", &self.subscribers)
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Appends `observer` to `attr`'s list unless it is already there.
    pub(crate) fn register(&mut self, attr: NodeId, observer: Arc<dyn AttributeObserver>) -> bool {
        let list = self.subscribers.entry(attr).or_default();
        let present = list.iter().any(|s| match s {
            Subscriber::Observer(existing) => same_observer(existing, &observer),
            Subscriber::Invalidate { .. } => false,
        });
        if present {
            return false;
        }
        list.push(Subscriber::Observer(observer));
        true
    }

    pub(crate) fn unregister(&mut self, attr: NodeId, observer: &Arc<dyn AttributeObserver>) -> bool {
        self.remove_where(attr, |s| match s {
            Subscriber::Observer(existing) => same_observer(existing, observer),
            Subscriber::Invalidate { .. } => false,
        })
    }

    pub(crate) fn subscribe_invalidation(&mut self, attr: NodeId, target: NodeId) -> SubscriptionId {
        let subscription = SubscriptionId(self.next_id());
        self.subscribers
            .entry(attr)
            .or_default()
            .push(Subscriber::Invalidate {
                subscription,
                target,
            });
        subscription
    }

    pub(crate) fn unsubscribe(&mut self, attr: NodeId, subscription: SubscriptionId) -> bool {
        self.remove_where(attr, |s| {
            matches!(s, Subscriber::Invalidate { subscription: id, .. } if *id == subscription)
        })
    }

    fn remove_where(&mut self, attr: NodeId, pred: impl Fn(&Subscriber) -> bool) -> bool {
        let Some(list) = self.subscribers.get_mut(&attr) else {
            return false;
        };
        let Some(pos) = list.iter().position(pred) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.subscribers.remove(&attr);
        }
        true
    }

    /// Returns `attr`'s subscribers in registration order.
    pub(crate) fn subscribers(&self, attr: NodeId) -> &[Subscriber] {
        self.subscribers
            .get(&attr)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn add_listener(&mut self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(pos) = self.listeners.iter().position(|(l, _)| *l == id) else {
            return false;
        };
        self.listeners.remove(pos);
        true
    }

    /// Calls every store-wide listener in registration order.
    pub(crate) fn broadcast(&self, change: &AttributeChange<'_>) {
        for (_, listener) in &self.listeners {
            listener(change);
        }
    }
}
