//! Descriptor registry and event dispatch shared by every instance of a model
//!
//! A `Dispatcher` is created once per model schema. It hands out field
//! indices during initialization, owns the public event emitter and the
//! internal snapshot-request channel, and keeps the revision counter.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::EmitterConfig;
use crate::descriptor::{FieldDescriptor, RelationshipDescriptor};
use crate::emitter::{EventEmitter, ListenerId};
use crate::event::{EventKind, InstanceId, ModelEvent};
use crate::value::Value;

/// First revision reported by `commit`
pub const INITIAL_REVISION: u64 = 1;

/// Key of the internal snapshot-request channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SnapshotRequest;

pub struct Dispatcher {
    events: EventEmitter<EventKind, ModelEvent>,
    /// Fields answer a request by emitting `SnapshotValue`. Kept apart from
    /// `events` so `off` on public listeners never detaches a field.
    snapshot_requests: EventEmitter<SnapshotRequest, Dispatcher>,
    descriptors: RefCell<Vec<Rc<FieldDescriptor>>>,
    next_index: Cell<usize>,
    next_instance: Cell<u64>,
    revision: Cell<u64>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_config(&EmitterConfig::default())
    }

    pub fn with_config(config: &EmitterConfig) -> Self {
        Self {
            events: EventEmitter::with_max_listeners(config.max_listeners),
            snapshot_requests: EventEmitter::with_max_listeners(0),
            descriptors: RefCell::new(Vec::new()),
            next_index: Cell::new(0),
            next_instance: Cell::new(0),
            revision: Cell::new(INITIAL_REVISION),
        }
    }

    /// Allocate the next field index. The descriptor stays mutable until it
    /// is passed to [`register_field_descriptor`](Self::register_field_descriptor).
    pub fn create_field_descriptor(
        &self,
        name: &str,
        parent: Option<Rc<RelationshipDescriptor>>,
        value_type: &'static str,
    ) -> FieldDescriptor {
        let index = self.next_index.get();
        self.next_index.set(index + 1);
        FieldDescriptor::new(index, name, parent, value_type)
    }

    /// Freeze a descriptor and record it in index order
    pub fn register_field_descriptor(&self, descriptor: FieldDescriptor) -> Rc<FieldDescriptor> {
        let descriptor = Rc::new(descriptor);
        tracing::trace!(index = descriptor.index(), path = %descriptor.path(), "field descriptor registered");
        self.descriptors.borrow_mut().push(Rc::clone(&descriptor));
        descriptor
    }

    pub fn field_count(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// All registered descriptors, in index order
    pub fn descriptors(&self) -> Vec<Rc<FieldDescriptor>> {
        self.descriptors.borrow().clone()
    }

    pub fn descriptor(&self, index: usize) -> Option<Rc<FieldDescriptor>> {
        self.descriptors
            .borrow()
            .iter()
            .find(|d| d.index() == index)
            .cloned()
    }

    pub(crate) fn next_instance_id(&self) -> InstanceId {
        let id = self.next_instance.get();
        self.next_instance.set(id + 1);
        InstanceId(id)
    }

    /// Revision the next `commit` will report
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.events.on(kind, handler)
    }

    pub fn once(&self, kind: EventKind, handler: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.events.once(kind, handler)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.events.listener_count(kind)
    }

    pub fn emit_value(&self, instance: InstanceId, field: &Rc<FieldDescriptor>, value: Value) {
        self.emit(ModelEvent::Value {
            instance,
            field: Rc::clone(field),
            value,
        });
    }

    pub(crate) fn emit_snapshot_value(
        &self,
        instance: InstanceId,
        field: &Rc<FieldDescriptor>,
        value: Value,
    ) {
        self.emit(ModelEvent::SnapshotValue {
            instance,
            field: Rc::clone(field),
            value,
        });
    }

    /// Emit `Commit` with the current revision, then advance the counter.
    ///
    /// Commit listeners still observe the revision that is ending.
    pub fn commit(&self, instance: InstanceId) {
        let revision = self.revision.get();
        tracing::trace!(instance = %instance, revision, "commit");
        self.emit(ModelEvent::Commit { instance, revision });
        self.revision.set(revision + 1);
    }

    /// Ask every live field to report its value, then emit `SnapshotCommit`
    /// with the current, unchanged revision.
    pub fn snapshot(&self, instance: InstanceId) {
        self.snapshot_requests.emit(SnapshotRequest, self);
        self.emit(ModelEvent::SnapshotCommit {
            instance,
            revision: self.revision.get(),
        });
    }

    pub(crate) fn subscribe_snapshot(&self, responder: impl Fn(&Dispatcher) + 'static) -> ListenerId {
        self.snapshot_requests.on(SnapshotRequest, responder)
    }

    pub(crate) fn unsubscribe_snapshot(&self, id: ListenerId) -> bool {
        self.snapshot_requests.off(SnapshotRequest, id)
    }

    #[cfg(test)]
    pub(crate) fn snapshot_subscribers(&self) -> usize {
        self.snapshot_requests.listener_count(SnapshotRequest)
    }

    fn emit(&self, event: ModelEvent) {
        tracing::trace!(event = %event, "emit");
        self.events.emit(event.kind(), &event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fields", &self.field_count())
            .field("revision", &self.revision.get())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(dispatcher: &Dispatcher) -> Rc<RefCell<Vec<ModelEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in EventKind::ALL {
            let log = Rc::clone(&log);
            dispatcher.on(kind, move |event| log.borrow_mut().push(event.clone()));
        }
        log
    }

    #[test]
    fn test_indices_are_sequential() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.create_field_descriptor("a", None, "i64");
        let b = dispatcher.create_field_descriptor("b", None, "i64");
        assert_eq!((a.index(), b.index()), (0, 1));

        dispatcher.register_field_descriptor(a);
        dispatcher.register_field_descriptor(b);
        assert_eq!(dispatcher.field_count(), 2);
        assert_eq!(dispatcher.descriptor(1).map(|d| d.name().to_string()), Some("b".into()));
    }

    #[test]
    fn test_commit_reports_then_advances() {
        let dispatcher = Dispatcher::new();
        let log = collect(&dispatcher);
        let instance = dispatcher.next_instance_id();

        dispatcher.commit(instance);
        dispatcher.snapshot(instance);
        dispatcher.commit(instance);

        let revisions: Vec<_> = log.borrow().iter().map(|e| (e.kind(), e.revision())).collect();
        assert_eq!(
            revisions,
            vec![
                (EventKind::Commit, Some(1)),
                (EventKind::SnapshotCommit, Some(2)),
                (EventKind::Commit, Some(2)),
            ]
        );
        assert_eq!(dispatcher.revision(), 3);
    }

    #[test]
    fn test_commit_listener_sees_ending_revision() {
        let dispatcher = Rc::new(Dispatcher::new());
        let instance = dispatcher.next_instance_id();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = Rc::clone(&dispatcher);
        let seen_clone = Rc::clone(&seen);
        dispatcher.once(EventKind::Commit, move |event| {
            seen_clone.borrow_mut().push((event.revision(), inner.revision()));
        });

        dispatcher.commit(instance);
        assert_eq!(*seen.borrow(), vec![(Some(1), 1)]);
        assert_eq!(dispatcher.revision(), 2);
    }

    #[test]
    fn test_instance_ids_are_distinct() {
        let dispatcher = Dispatcher::new();
        assert_ne!(dispatcher.next_instance_id(), dispatcher.next_instance_id());
    }
}
