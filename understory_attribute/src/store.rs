// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The attribute store.
//!
//! [`AttributeStore`] ties together the attribute table, the dependency
//! graph, and the observer registry. Writes mark attributes dirty and cascade
//! the mark to everything downstream; reads recompute lazily and notify
//! listeners of values that actually moved.
//!
//! # Implementation
//!
//! Attribute names are interned to [`NodeId`]s, and every table is keyed by
//! id. Both the dirty cascade and the recompute walk use explicit worklists,
//! so the call stack does not grow with the length of a dependency chain.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use smallvec::SmallVec;

use hashbrown::{HashMap, HashSet};
use understory_depgraph::{CycleError, DependencyGraph, Interner, NodeId, TraversalScratch};

use crate::error::AttributeError;
use crate::modifier::{Modifier, ModifierId, ModifierKind, Transform};
use crate::observer::{
    AttributeChange, AttributeObserver, ListenerId, ObserverRegistry, Subscriber,
};
use crate::options::StoreOptions;
use crate::record::{AttachedModifier, AttributeRecord};

/// A set of named numeric attributes with modifiers and change notification.
///
/// # Lifecycle
///
/// - Attributes are created on first reference and live as long as the store.
/// - Modifiers are attached with [`add_modifier`](Self::add_modifier) and
///   detached with [`remove_modifier`](Self::remove_modifier).
/// - Dependency edges come from modifiers that read another attribute, or
///   from [`add_dependency`](Self::add_dependency).
///
/// # Evaluation
///
/// Values are computed lazily. [`get_value`](Self::get_value) on a dirty
/// attribute first recomputes everything it transitively reads, inputs
/// first, then folds the base value through the modifiers in priority order.
/// Each attribute whose value moved is announced to the store-wide listeners
/// and then to its own observers.
///
/// # Threading
///
/// The store is `Send + Sync` but performs no internal locking. Wrap the
/// whole store in one lock to share it; a single operation touches the
/// attribute table, graph, and observers together.
///
/// # Example
///
/// ```rust
/// use understory_attribute::{AttributeStore, Modifier};
///
/// let mut store = AttributeStore::new();
/// store.add_attribute("HP", 100.0).unwrap();
/// store.add_attribute("Attack", 10.0).unwrap();
///
/// // Attack gains 10% of HP.
/// store.add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.1)).unwrap();
/// assert_eq!(store.get_value("Attack").unwrap(), 20.0);
///
/// // Changing HP invalidates Attack without reading it.
/// store.set_base_value("HP", 200.0).unwrap();
/// assert!(store.is_dirty("Attack"));
/// assert_eq!(store.get_value("Attack").unwrap(), 30.0);
/// ```
#[derive(Debug)]
pub struct AttributeStore {
    names: Interner,
    records: HashMap<NodeId, AttributeRecord>,
    graph: DependencyGraph<NodeId>,
    /// Edges added through [`add_dependency`](Self::add_dependency); each
    /// holds one reference in `graph`.
    explicit_edges: HashSet<(NodeId, NodeId)>,
    observers: ObserverRegistry,
    /// Which attribute owns each attached modifier.
    owners: HashMap<ModifierId, NodeId>,
    next_modifier: u64,
    options: StoreOptions,
    scratch: TraversalScratch<NodeId>,
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeStore {
    /// Creates an empty store with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Creates an empty store with the given options.
    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            names: Interner::new(),
            records: HashMap::new(),
            graph: DependencyGraph::new(),
            explicit_edges: HashSet::new(),
            observers: ObserverRegistry::new(),
            owners: HashMap::new(),
            next_modifier: 0,
            options,
            scratch: TraversalScratch::new(),
        }
    }

    /// Returns the options the store was created with.
    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Creates `name` with the given base value.
    ///
    /// Does nothing if the attribute already exists; neither its base value
    /// nor its modifiers change.
    ///
    /// # Errors
    ///
    /// [`AttributeError::InvalidArgument`] if `name` is empty.
    pub fn add_attribute(&mut self, name: &str, base_value: f64) -> Result<(), AttributeError> {
        self.ensure(name, base_value).map(drop)
    }

    /// Sets the base value of `name`, creating the attribute if needed.
    ///
    /// If the base value actually changes, `name` and everything downstream
    /// of it are marked dirty before this returns.
    ///
    /// # Errors
    ///
    /// [`AttributeError::InvalidArgument`] if `name` is empty.
    pub fn set_base_value(&mut self, name: &str, value: f64) -> Result<(), AttributeError> {
        let Some(id) = self.existing(name) else {
            return self.add_attribute(name, value);
        };
        let Some(record) = self.records.get_mut(&id) else {
            return Ok(());
        };
        if record.base_value != value {
            tracing::trace!(attribute = name, old = record.base_value, new = value, "base value set");
            record.base_value = value;
            self.mark_dirty_id(id);
        }
        Ok(())
    }

    /// Returns the resolved value of `name`, recomputing it if it is dirty.
    ///
    /// # Errors
    ///
    /// [`AttributeError::NotFound`] if the attribute does not exist.
    pub fn get_value(&mut self, name: &str) -> Result<f64, AttributeError> {
        let id = self.existing(name).ok_or_else(|| AttributeError::NotFound {
            name: String::from(name),
        })?;
        Ok(self.value_of(id))
    }

    /// Returns the base value of `name`, if it exists.
    #[must_use]
    pub fn base_value(&self, name: &str) -> Option<f64> {
        self.record(name).map(AttributeRecord::base_value)
    }

    /// Returns the storage record of `name`, if it exists.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&AttributeRecord> {
        self.existing(name).and_then(|id| self.records.get(&id))
    }

    /// Returns `true` if `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.existing(name).is_some()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the attribute names in creation order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names
            .iter()
            .filter(|(id, _)| self.records.contains_key(id))
            .map(|(_, name)| name)
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    /// Marks `name` and everything that transitively reads it dirty.
    ///
    /// Unknown names are ignored. If `name` is already dirty nothing happens.
    pub fn mark_dirty(&mut self, name: &str) {
        if let Some(id) = self.existing(name) {
            self.mark_dirty_id(id);
        }
    }

    /// Returns `true` if `name` exists and its cached value is stale.
    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        self.record(name).is_some_and(AttributeRecord::is_dirty)
    }

    // =========================================================================
    // Modifiers
    // =========================================================================

    /// Attaches `modifier` to its target attribute.
    ///
    /// The target, and the source for modifiers that read one, are created
    /// if needed. A reading modifier adds a `target -> source` dependency and
    /// subscribes to `source` so that changes there invalidate the target.
    /// The target is marked dirty.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::InvalidArgument`] if the target or source name is
    ///   empty.
    /// - [`AttributeError::CycleDetected`] if reading the source would close
    ///   a cycle. The modifier is not attached.
    pub fn add_modifier(&mut self, modifier: Modifier) -> Result<ModifierId, AttributeError> {
        modifier.validate()?;
        let target = self.ensure(modifier.target(), 0.0)?;
        let transform = match modifier.kind() {
            ModifierKind::Additive { delta } => Transform::Add(*delta),
            ModifierKind::DependencyScaled {
                source,
                coefficient,
            } => Transform::Scaled {
                source: self.ensure(source, 0.0)?,
                coefficient: *coefficient,
            },
            ModifierKind::Multiplicative { factor } => Transform::Multiply(*factor),
            ModifierKind::ExtraMultiplicative { extra } => Transform::ExtraMultiply(*extra),
            ModifierKind::SyncFrom { source } => Transform::Sync(self.ensure(source, 0.0)?),
        };

        let subscription = match transform.source() {
            Some(source) => {
                self.graph
                    .add_dependency(target, source)
                    .map_err(|err| self.cycle_error(err))?;
                Some(self.observers.subscribe_invalidation(source, target))
            }
            None => None,
        };

        let id = ModifierId::new(self.next_modifier);
        self.next_modifier += 1;
        tracing::debug!(
            modifier = ?id,
            target = modifier.target(),
            priority = modifier.priority(),
            "attached modifier"
        );
        if let Some(record) = self.records.get_mut(&target) {
            record.modifiers.push(AttachedModifier {
                id,
                modifier,
                transform,
                subscription,
            });
        }
        self.owners.insert(id, target);
        self.mark_dirty_id(target);
        Ok(id)
    }

    /// Detaches a modifier.
    ///
    /// Releases exactly the dependency and subscription the modifier took on
    /// attach, then marks its target dirty. Returns `false` if the handle is
    /// unknown or was already removed.
    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        let Some(target) = self.owners.remove(&id) else {
            return false;
        };
        let Some(record) = self.records.get_mut(&target) else {
            return false;
        };
        let Some(pos) = record.modifiers.iter().position(|m| m.id == id) else {
            return false;
        };
        let attached = record.modifiers.remove(pos);

        if let Some(source) = attached.transform.source() {
            self.graph.remove_dependency(target, source);
            if let Some(subscription) = attached.subscription {
                self.observers.unsubscribe(source, subscription);
            }
        }
        tracing::debug!(modifier = ?id, target = attached.modifier.target(), "detached modifier");
        self.mark_dirty_id(target);
        true
    }

    /// Returns the modifier behind `id`, if it is still attached.
    #[must_use]
    pub fn modifier(&self, id: ModifierId) -> Option<&Modifier> {
        let target = self.owners.get(&id)?;
        self.records
            .get(target)?
            .modifiers
            .iter()
            .find(|m| m.id == id)
            .map(|m| &m.modifier)
    }

    /// Returns the modifiers attached to `name` in attach order.
    pub fn modifiers(&self, name: &str) -> impl Iterator<Item = (ModifierId, &Modifier)> + '_ {
        self.record(name).into_iter().flat_map(|r| r.modifiers())
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Subscribes `observer` to changes of `name`.
    ///
    /// The attribute does not have to exist yet. Registering the same `Arc`
    /// twice is a no-op. Returns `true` if the observer was added.
    pub fn register_observer(&mut self, name: &str, observer: Arc<dyn AttributeObserver>) -> bool {
        if name.is_empty() {
            return false;
        }
        let id = self.names.intern(name);
        self.observers.register(id, observer)
    }

    /// Unsubscribes `observer` from `name`.
    ///
    /// Returns `true` if it was registered.
    pub fn unregister_observer(&mut self, name: &str, observer: &Arc<dyn AttributeObserver>) -> bool {
        match self.names.get(name) {
            Some(id) => self.observers.unregister(id, observer),
            None => false,
        }
    }

    /// Returns how many subscribers `name` has, including the internal ones
    /// held by modifiers that read it.
    #[must_use]
    pub fn observer_count(&self, name: &str) -> usize {
        self.names
            .get(name)
            .map_or(0, |id| self.observers.subscribers(id).len())
    }

    /// Adds a listener that hears about every attribute change.
    ///
    /// Listeners run before attribute observers, in the order they were added.
    ///
    /// ```rust
    /// use std::sync::{Arc, Mutex};
    /// use understory_attribute::{AttributeChange, AttributeStore};
    ///
    /// let log = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&log);
    ///
    /// let mut store = AttributeStore::new();
    /// store.on_change(move |c: &AttributeChange<'_>| {
    ///     sink.lock().unwrap().push((c.name.to_owned(), c.old_value, c.new_value));
    /// });
    ///
    /// store.add_attribute("Speed", 1.0).unwrap();
    /// store.set_base_value("Speed", 4.0).unwrap();
    /// store.get_value("Speed").unwrap();
    ///
    /// assert_eq!(*log.lock().unwrap(), [("Speed".to_owned(), 1.0, 4.0)]);
    /// ```
    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&AttributeChange<'_>) + Send + Sync + 'static,
    {
        self.observers.add_listener(Box::new(listener))
    }

    /// Removes a store-wide listener. Returns `true` if it was present.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.observers.remove_listener(id)
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    /// Declares that `dependent` reads `dependency`.
    ///
    /// Both attributes are created if needed, and `dependent` is marked dirty.
    /// Declaring the same edge again is a no-op.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::InvalidArgument`] if either name is empty.
    /// - [`AttributeError::CycleDetected`] if `dependent == dependency` or
    ///   `dependency` already reads `dependent`, directly or transitively. The
    ///   graph is left unchanged.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<(), AttributeError> {
        if dependent.is_empty() || dependency.is_empty() {
            return Err(AttributeError::EMPTY_NAME);
        }
        let from = self.ensure(dependent, 0.0)?;
        let to = self.ensure(dependency, 0.0)?;
        if self.explicit_edges.contains(&(from, to)) {
            return Ok(());
        }

        self.graph
            .add_dependency(from, to)
            .map_err(|err| self.cycle_error(err))?;
        self.explicit_edges.insert((from, to));
        tracing::debug!(dependent, dependency, "added dependency");
        self.mark_dirty_id(from);
        Ok(())
    }

    /// Withdraws a dependency declared with [`add_dependency`](Self::add_dependency).
    ///
    /// Edges held by modifiers are not affected. Returns `true` if a declared
    /// edge was removed.
    pub fn remove_dependency(&mut self, dependent: &str, dependency: &str) -> bool {
        let (Some(from), Some(to)) = (self.names.get(dependent), self.names.get(dependency)) else {
            return false;
        };
        if !self.explicit_edges.remove(&(from, to)) {
            return false;
        }
        self.graph.remove_dependency(from, to);
        tracing::debug!(dependent, dependency, "removed dependency");
        true
    }

    /// Returns `true` if `dependent` currently reads `dependency`, through a
    /// declared edge or a modifier.
    #[must_use]
    pub fn has_dependency(&self, dependent: &str, dependency: &str) -> bool {
        match (self.names.get(dependent), self.names.get(dependency)) {
            (Some(from), Some(to)) => self.graph.contains(from, to),
            _ => false,
        }
    }

    /// Returns the attributes `name` reads directly.
    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        self.names
            .get(name)
            .into_iter()
            .flat_map(|id| self.graph.dependencies(id))
            .filter_map(|id| self.names.resolve(id))
    }

    /// Returns the attributes that read `name` directly.
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        self.names
            .get(name)
            .into_iter()
            .flat_map(|id| self.graph.dependents(id))
            .filter_map(|id| self.names.resolve(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn existing(&self, name: &str) -> Option<NodeId> {
        self.names
            .get(name)
            .filter(|id| self.records.contains_key(id))
    }

    /// Returns the id of `name`, creating a dirty record if it is new.
    fn ensure(&mut self, name: &str, base_value: f64) -> Result<NodeId, AttributeError> {
        if name.is_empty() {
            return Err(AttributeError::EMPTY_NAME);
        }
        let id = self.names.intern(name);
        if !self.records.contains_key(&id) {
            tracing::debug!(attribute = name, base_value, "created attribute");
            self.records.insert(id, AttributeRecord::new(base_value));
            self.mark_dirty_id(id);
        }
        Ok(id)
    }

    fn cycle_error(&self, err: CycleError<NodeId>) -> AttributeError {
        let name = |id| String::from(self.names.resolve(id).unwrap_or_default());
        AttributeError::CycleDetected {
            dependent: name(err.dependent),
            dependency: name(err.dependency),
        }
    }

    /// Marks `root` and its transitive dependents dirty.
    ///
    /// Stops at attributes that are already dirty; their dependents were
    /// marked when they were.
    fn mark_dirty_id(&mut self, root: NodeId) {
        let mut stack: SmallVec<[NodeId; 8]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            if record.dirty {
                continue;
            }
            record.dirty = true;
            tracing::trace!(attribute = ?id, "marked dirty");
            stack.extend(self.graph.dependents(id));
        }
    }

    /// Returns the value of `id`, recomputing it first if it is dirty.
    pub(crate) fn value_of(&mut self, id: NodeId) -> f64 {
        if self.records.get(&id).is_some_and(|r| r.dirty) {
            self.update(id);
        }
        self.records.get(&id).map_or(0.0, |r| r.cached_value)
    }

    /// Recomputes `root` and everything it transitively reads.
    ///
    /// Every attribute in the dependency closure is recomputed exactly once,
    /// inputs before readers, whether or not it was dirty.
    fn update(&mut self, root: NodeId) {
        let mut order = Vec::new();
        self.graph
            .post_order_dependencies(root, &mut self.scratch, &mut order);
        for id in order {
            self.recompute(id);
        }
    }

    fn recompute(&mut self, id: NodeId) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let mut value = record.base_value;
        for transform in record.application_order() {
            value = transform.apply(value, self);
        }

        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        let old_value = record.cached_value;
        record.dirty = false;
        tracing::trace!(attribute = ?id, value, "recomputed");
        if self.options.differs(old_value, value) {
            record.cached_value = value;
            self.notify(id, old_value, value);
        }
    }

    /// Announces a change: store-wide listeners, then `id`'s subscribers in
    /// registration order.
    fn notify(&mut self, id: NodeId, old_value: f64, new_value: f64) {
        let mut invalidated: SmallVec<[NodeId; 4]> = SmallVec::new();
        {
            let name = self.names.resolve(id).unwrap_or_default();
            tracing::trace!(attribute = name, old_value, new_value, "value changed");
            let change = AttributeChange {
                name,
                old_value,
                new_value,
            };
            self.observers.broadcast(&change);
            for subscriber in self.observers.subscribers(id) {
                match subscriber {
                    Subscriber::Observer(observer) => observer.on_attribute_changed(&change),
                    Subscriber::Invalidate { target, .. } => invalidated.push(*target),
                }
            }
        }
        for target in invalidated {
            self.mark_dirty_id(target);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::borrow::ToOwned;
    use alloc::vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(String, f64, f64)>>>;

    #[track_caller]
    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn record_changes(store: &mut AttributeStore) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        store.on_change(move |c: &AttributeChange<'_>| {
            sink.lock()
                .unwrap()
                .push((c.name.to_owned(), c.old_value, c.new_value));
        });
        log
    }

    fn changes_for(log: &Log, name: &str) -> usize {
        log.lock().unwrap().iter().filter(|(n, _, _)| n == name).count()
    }

    fn sorted_edges(store: &AttributeStore) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<_> = store.graph.edges().collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn end_to_end_scenario() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 100.0).unwrap();
        store.add_attribute("Attack", 10.0).unwrap();
        store.add_attribute("Defense", 5.0).unwrap();

        assert_close(store.get_value("Attack").unwrap(), 10.0);

        store.add_modifier(Modifier::additive("Attack", 5.0)).unwrap();
        assert_close(store.get_value("Attack").unwrap(), 15.0);

        store
            .add_modifier(Modifier::multiplicative("Attack", 1.5))
            .unwrap();
        assert_close(store.get_value("Attack").unwrap(), 22.5);

        store
            .add_modifier(Modifier::extra_multiplicative("Attack", 0.1))
            .unwrap();
        assert_close(store.get_value("Attack").unwrap(), 24.75);

        let sync = store
            .add_modifier(Modifier::sync_from("Attack", "Defense"))
            .unwrap();
        assert_close(store.get_value("Attack").unwrap(), 5.0);

        store
            .add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.1))
            .unwrap();
        assert_close(store.get_value("Attack").unwrap(), 5.0);

        store.set_base_value("Defense", 20.0).unwrap();
        assert_close(store.get_value("Defense").unwrap(), 20.0);
        assert_close(store.get_value("Attack").unwrap(), 20.0);

        store.set_base_value("HP", 200.0).unwrap();
        assert_close(store.get_value("Attack").unwrap(), 20.0);

        assert!(store.remove_modifier(sync));
        assert_close(store.get_value("Attack").unwrap(), 57.75);
    }

    #[test]
    fn add_attribute_is_idempotent() {
        let mut store = AttributeStore::new();
        store.add_attribute("Attack", 10.0).unwrap();
        store.add_modifier(Modifier::additive("Attack", 1.0)).unwrap();

        store.add_attribute("Attack", 99.0).unwrap();
        assert_eq!(store.base_value("Attack"), Some(10.0));
        assert_eq!(store.modifiers("Attack").count(), 1);
        assert_close(store.get_value("Attack").unwrap(), 11.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut store = AttributeStore::new();
        assert_eq!(
            store.add_attribute("", 1.0),
            Err(AttributeError::EMPTY_NAME)
        );
        assert!(matches!(
            store.set_base_value("", 1.0),
            Err(AttributeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            store.add_modifier(Modifier::sync_from("Attack", "")),
            Err(AttributeError::InvalidArgument { .. })
        ));
        assert!(matches!(
            store.add_dependency("Attack", ""),
            Err(AttributeError::InvalidArgument { .. })
        ));
        assert!(!store.register_observer("", Arc::new(|_: &AttributeChange<'_>| {})));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_attribute_is_not_found() {
        let mut store = AttributeStore::new();
        assert_eq!(
            store.get_value("Mana"),
            Err(AttributeError::NotFound {
                name: "Mana".to_owned()
            })
        );

        // Registering an observer does not create the attribute.
        store.register_observer("Mana", Arc::new(|_: &AttributeChange<'_>| {}));
        assert!(store.get_value("Mana").is_err());
        assert!(!store.contains("Mana"));
    }

    #[test]
    fn set_base_value_creates_missing_attribute() {
        let mut store = AttributeStore::new();
        store.set_base_value("Speed", 3.0).unwrap();
        assert_eq!(store.base_value("Speed"), Some(3.0));
        assert_close(store.get_value("Speed").unwrap(), 3.0);
    }

    #[test]
    fn creation_does_not_notify() {
        let mut store = AttributeStore::new();
        let log = record_changes(&mut store);

        store.add_attribute("Speed", 3.0).unwrap();
        assert!(store.is_dirty("Speed"));
        store.get_value("Speed").unwrap();
        assert!(!store.is_dirty("Speed"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unchanged_base_value_does_not_dirty() {
        let mut store = AttributeStore::new();
        store.add_attribute("Speed", 3.0).unwrap();
        store.get_value("Speed").unwrap();

        store.set_base_value("Speed", 3.0).unwrap();
        assert!(!store.is_dirty("Speed"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut store = AttributeStore::new();
        let err = store.add_dependency("A", "A").unwrap_err();
        assert_eq!(
            err,
            AttributeError::CycleDetected {
                dependent: "A".to_owned(),
                dependency: "A".to_owned(),
            }
        );
        assert!(store.graph.is_empty());
    }

    #[test]
    fn cycle_rejection_leaves_edges_unchanged() {
        let mut store = AttributeStore::new();
        store.add_dependency("B", "A").unwrap();
        store.add_dependency("C", "B").unwrap();
        store.add_modifier(Modifier::sync_from("D", "C")).unwrap();
        let before = sorted_edges(&store);

        assert!(matches!(
            store.add_dependency("A", "D"),
            Err(AttributeError::CycleDetected { .. })
        ));
        assert!(matches!(
            store.add_modifier(Modifier::dependency_scaled("A", "C", 1.0)),
            Err(AttributeError::CycleDetected { .. })
        ));
        assert_eq!(sorted_edges(&store), before);
        assert_eq!(store.modifiers("A").count(), 0);
        assert_eq!(store.observer_count("C"), 1);
    }

    #[test]
    fn remove_modifier_releases_edge_and_subscription() {
        let mut store = AttributeStore::new();
        store.add_attribute("Defense", 5.0).unwrap();
        let sync = store
            .add_modifier(Modifier::sync_from("Attack", "Defense"))
            .unwrap();
        assert!(store.has_dependency("Attack", "Defense"));
        assert_eq!(store.observer_count("Defense"), 1);

        assert!(store.remove_modifier(sync));
        assert!(!store.has_dependency("Attack", "Defense"));
        assert_eq!(store.observer_count("Defense"), 0);
        assert!(store.modifier(sync).is_none());

        assert!(!store.remove_modifier(sync));
    }

    #[test]
    fn shared_edges_survive_partial_detach() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 100.0).unwrap();
        let a = store
            .add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.1))
            .unwrap();
        let b = store
            .add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.2))
            .unwrap();
        store.add_dependency("Attack", "HP").unwrap();
        assert_close(store.get_value("Attack").unwrap(), 30.0);

        assert!(store.remove_modifier(a));
        assert!(store.has_dependency("Attack", "HP"));
        assert!(store.remove_dependency("Attack", "HP"));
        assert!(store.has_dependency("Attack", "HP"));

        store.set_base_value("HP", 50.0).unwrap();
        assert!(store.is_dirty("Attack"));
        assert_close(store.get_value("Attack").unwrap(), 10.0);

        assert!(store.remove_modifier(b));
        assert!(!store.has_dependency("Attack", "HP"));
        assert!(!store.remove_dependency("Attack", "HP"));
    }

    #[test]
    fn dirty_cascade_reaches_chain() {
        let mut store = AttributeStore::new();
        store.add_attribute("A", 1.0).unwrap();
        store.add_modifier(Modifier::sync_from("B", "A")).unwrap();
        store.add_modifier(Modifier::sync_from("C", "B")).unwrap();
        store.get_value("C").unwrap();
        assert!(!store.is_dirty("A"));
        assert!(!store.is_dirty("B"));
        assert!(!store.is_dirty("C"));

        store.mark_dirty("A");
        assert!(store.is_dirty("A"));
        assert!(store.is_dirty("B"));
        assert!(store.is_dirty("C"));

        // Unknown names are ignored.
        store.mark_dirty("Nope");
        assert!(!store.contains("Nope"));
    }

    #[test]
    fn diamond_recomputes_each_node_once() {
        let mut store = AttributeStore::new();
        let log = record_changes(&mut store);

        // D reads B and C, both read A.
        store.add_attribute("A", 1.0).unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("B", "A", 1.0))
            .unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("C", "A", 2.0))
            .unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("D", "B", 1.0))
            .unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("D", "C", 1.0))
            .unwrap();
        assert_close(store.get_value("D").unwrap(), 3.0);
        log.lock().unwrap().clear();

        store.set_base_value("A", 2.0).unwrap();
        for name in ["A", "B", "C", "D"] {
            assert!(store.is_dirty(name));
        }
        assert_close(store.get_value("D").unwrap(), 6.0);
        for name in ["A", "B", "C", "D"] {
            assert_eq!(changes_for(&log, name), 1, "{name}");
            assert!(!store.is_dirty(name));
        }
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let mut store = AttributeStore::new();
        store.add_attribute("n0", 1.0).unwrap();
        let names: Vec<String> = (0..2_000).map(|i| alloc::format!("n{i}")).collect();
        for pair in names.windows(2) {
            store
                .add_modifier(Modifier::dependency_scaled(&*pair[1], &*pair[0], 1.0))
                .unwrap();
        }
        assert_close(store.get_value("n1999").unwrap(), 1.0);

        store.set_base_value("n0", 2.0).unwrap();
        assert!(store.is_dirty("n1999"));
        assert_close(store.get_value("n1999").unwrap(), 2.0);
    }

    #[test]
    fn equal_priority_applies_in_attach_order() {
        let mut store = AttributeStore::new();
        store.add_attribute("X", 1.0).unwrap();
        store.add_attribute("Y", 2.0).unwrap();
        store.add_attribute("Z", 3.0).unwrap();

        store.add_modifier(Modifier::sync_from("Target", "X")).unwrap();
        store.add_modifier(Modifier::sync_from("Target", "Y")).unwrap();
        assert_close(store.get_value("Target").unwrap(), 2.0);

        // A same-priority additive and multiplicative: attach order decides.
        store
            .add_modifier(Modifier::additive("Z", 1.0).with_priority(5))
            .unwrap();
        store
            .add_modifier(Modifier::multiplicative("Z", 10.0).with_priority(5))
            .unwrap();
        assert_close(store.get_value("Z").unwrap(), 40.0);
    }

    #[test]
    fn notifications_follow_registration_order() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 10.0).unwrap();
        store.get_value("HP").unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        store.on_change(move |_: &AttributeChange<'_>| sink.lock().unwrap().push("listener"));
        for tag in ["first", "second"] {
            let sink = Arc::clone(&order);
            store.register_observer(
                "HP",
                Arc::new(move |c: &AttributeChange<'_>| {
                    assert_eq!(c.name, "HP");
                    assert_eq!((c.old_value, c.new_value), (10.0, 12.0));
                    sink.lock().unwrap().push(tag);
                }),
            );
        }

        store.set_base_value("HP", 12.0).unwrap();
        assert!(order.lock().unwrap().is_empty());
        store.get_value("HP").unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["listener", "first", "second"]);

        // Reading again without changes is silent.
        store.get_value("HP").unwrap();
        assert_eq!(order.lock().unwrap().len(), 3);
    }

    #[test]
    fn observers_register_once_and_unregister() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 1.0).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let observer: Arc<dyn AttributeObserver> = Arc::new(move |_: &AttributeChange<'_>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        assert!(store.register_observer("HP", Arc::clone(&observer)));
        assert!(!store.register_observer("HP", Arc::clone(&observer)));
        store.set_base_value("HP", 2.0).unwrap();
        store.get_value("HP").unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        assert!(store.unregister_observer("HP", &observer));
        assert!(!store.unregister_observer("HP", &observer));
        store.set_base_value("HP", 3.0).unwrap();
        store.get_value("HP").unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn removed_listener_stops_hearing() {
        let mut store = AttributeStore::new();
        let log = record_changes(&mut store);
        let extra = store.on_change(|_: &AttributeChange<'_>| panic!("removed listener ran"));
        assert!(store.remove_listener(extra));
        assert!(!store.remove_listener(extra));

        store.add_attribute("HP", 1.0).unwrap();
        store.set_base_value("HP", 2.0).unwrap();
        store.get_value("HP").unwrap();
        assert_eq!(changes_for(&log, "HP"), 1);
    }

    #[test]
    fn source_change_invalidates_reader_through_subscription() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 100.0).unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.5))
            .unwrap();
        assert_close(store.get_value("Attack").unwrap(), 50.0);

        // Reading HP alone leaves Attack stale.
        store.set_base_value("HP", 120.0).unwrap();
        assert_close(store.get_value("HP").unwrap(), 120.0);
        assert!(store.is_dirty("Attack"));
        assert_close(store.get_value("Attack").unwrap(), 60.0);
    }

    #[test]
    fn tolerance_suppresses_small_drift() {
        let mut store = AttributeStore::with_options(StoreOptions::new().with_change_tolerance(0.5));
        let log = record_changes(&mut store);
        store.add_attribute("HP", 10.0).unwrap();
        store.get_value("HP").unwrap();

        store.set_base_value("HP", 10.25).unwrap();
        assert_close(store.get_value("HP").unwrap(), 10.0);
        assert_eq!(changes_for(&log, "HP"), 0);

        store.set_base_value("HP", 11.0).unwrap();
        assert_close(store.get_value("HP").unwrap(), 11.0);
        assert_eq!(changes_for(&log, "HP"), 1);
    }

    #[test]
    fn introspection_reports_names_and_edges() {
        let mut store = AttributeStore::new();
        store.add_attribute("HP", 1.0).unwrap();
        store
            .add_modifier(Modifier::dependency_scaled("Attack", "HP", 1.0))
            .unwrap();
        store.add_dependency("Attack", "Level").unwrap();

        let names: Vec<_> = store.attribute_names().collect();
        assert_eq!(names, ["HP", "Attack", "Level"]);
        let deps: Vec<_> = store.dependencies("Attack").collect();
        assert_eq!(deps, ["HP", "Level"]);
        let readers: Vec<_> = store.dependents("HP").collect();
        assert_eq!(readers, ["Attack"]);
        assert_eq!(store.dependencies("Unknown").count(), 0);
    }
}
