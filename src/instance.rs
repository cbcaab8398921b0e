//! Materialized model instances
//!
//! An [`ObjectInstance`] mirrors the shape of its schema. Leaves are
//! [`FieldCell`]s: reading returns the stored value, writing stores the value
//! and then emits a `Value` event through the shared dispatcher.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::descriptor::FieldDescriptor;
use crate::dispatcher::Dispatcher;
use crate::emitter::ListenerId;
use crate::error::{ModelError, Result};
use crate::event::InstanceId;
use crate::value::{FieldValue, Value};

struct CellInner {
    value: RefCell<Value>,
    descriptor: Rc<FieldDescriptor>,
    dispatcher: Rc<Dispatcher>,
    instance: InstanceId,
    snapshot_listener: ListenerId,
}

impl Drop for CellInner {
    fn drop(&mut self) {
        self.dispatcher.unsubscribe_snapshot(self.snapshot_listener);
    }
}

/// Reactive storage of one field in one instance.
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct FieldCell {
    inner: Rc<CellInner>,
}

impl FieldCell {
    /// Create the cell and subscribe it to snapshot requests. The
    /// subscription holds only a weak reference and is removed when the last
    /// handle is dropped.
    pub(crate) fn new(
        descriptor: Rc<FieldDescriptor>,
        initial_value: Value,
        dispatcher: &Rc<Dispatcher>,
        instance: InstanceId,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &std::rc::Weak<CellInner>| {
            let weak = weak.clone();
            let snapshot_listener = dispatcher.subscribe_snapshot(move |dispatcher| {
                if let Some(cell) = weak.upgrade() {
                    let current = cell.value.borrow().clone();
                    dispatcher.emit_snapshot_value(cell.instance, &cell.descriptor, current);
                }
            });
            CellInner {
                value: RefCell::new(initial_value),
                descriptor,
                dispatcher: Rc::clone(dispatcher),
                instance,
                snapshot_listener,
            }
        });
        Self { inner }
    }

    pub fn descriptor(&self) -> &Rc<FieldDescriptor> {
        &self.inner.descriptor
    }

    pub fn index(&self) -> usize {
        self.inner.descriptor.index()
    }

    pub fn path(&self) -> String {
        self.inner.descriptor.path()
    }

    pub fn instance(&self) -> InstanceId {
        self.inner.instance
    }

    pub fn get(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Borrow the stored value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store the value, then emit `Value`. Listeners reading back through
    /// the instance observe the new value.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        *self.inner.value.borrow_mut() = value.clone();
        self.inner
            .dispatcher
            .emit_value(self.inner.instance, &self.inner.descriptor, value);
    }
}

impl std::fmt::Debug for FieldCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCell")
            .field("path", &self.path())
            .field("index", &self.index())
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

/// Typed handle to a field cell
pub struct Field<T> {
    cell: FieldCell,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            _type: PhantomData,
        }
    }
}

impl<T: FieldValue> Field<T> {
    pub fn new(cell: FieldCell) -> Self {
        Self {
            cell,
            _type: PhantomData,
        }
    }

    /// Read the value as `T`. Fails if an untyped write stored another shape.
    pub fn get(&self) -> Result<T> {
        self.cell.with(|value| {
            T::from_value(value).ok_or_else(|| ModelError::TypeMismatch {
                path: self.cell.path(),
                expected: std::any::type_name::<T>(),
                found: value.kind(),
            })
        })
    }

    pub fn set(&self, value: T) {
        self.cell.set(value.into_value());
    }

    /// Read, transform and write back (one `Value` event)
    pub fn update(&self, f: impl FnOnce(T) -> T) -> Result<()> {
        let current = self.get()?;
        self.set(f(current));
        Ok(())
    }

    pub fn cell(&self) -> &FieldCell {
        &self.cell
    }
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Field").field(&self.cell).finish()
    }
}

/// A member of an object instance
#[derive(Debug)]
pub enum InstanceNode {
    Object(ObjectInstance),
    Field(FieldCell),
}

/// Live object graph materialized from an object schema
#[derive(Debug)]
pub struct ObjectInstance {
    path: String,
    entries: Vec<(String, InstanceNode)>,
}

impl ObjectInstance {
    pub(crate) fn new(path: String, entries: Vec<(String, InstanceNode)>) -> Self {
        Self { path, entries }
    }

    /// Dotted path of this object; empty for the root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Member names in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InstanceNode> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Nested object. Objects are read-only members: only `&` access exists.
    pub fn object(&self, name: &str) -> Result<&ObjectInstance> {
        match self.get(name) {
            Some(InstanceNode::Object(object)) => Ok(object),
            Some(InstanceNode::Field(_)) => Err(ModelError::NotAnObject {
                path: self.child_path(name),
            }),
            None => Err(ModelError::UnknownMember {
                path: self.child_path(name),
            }),
        }
    }

    pub fn field(&self, name: &str) -> Result<&FieldCell> {
        match self.get(name) {
            Some(InstanceNode::Field(cell)) => Ok(cell),
            Some(InstanceNode::Object(_)) => Err(ModelError::NotAField {
                path: self.child_path(name),
            }),
            None => Err(ModelError::UnknownMember {
                path: self.child_path(name),
            }),
        }
    }

    /// Resolve a dotted path relative to this object (e.g. `player1.score`)
    pub fn lookup(&self, path: &str) -> Result<&FieldCell> {
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = segments.pop().unwrap_or_default();
        let mut current = self;
        for segment in segments {
            current = current.object(segment)?;
        }
        current.field(leaf)
    }

    pub fn typed<T: FieldValue>(&self, path: &str) -> Result<Field<T>> {
        self.lookup(path).map(|cell| Field::new(cell.clone()))
    }

    /// Every field cell below this object, depth-first in declaration order
    pub fn fields(&self) -> Vec<&FieldCell> {
        let mut cells = Vec::new();
        self.collect_fields(&mut cells);
        cells
    }

    fn collect_fields<'a>(&'a self, cells: &mut Vec<&'a FieldCell>) {
        for (_, node) in &self.entries {
            match node {
                InstanceNode::Object(object) => object.collect_fields(cells),
                InstanceNode::Field(cell) => cells.push(cell),
            }
        }
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }
}

/// Collects the cells of one instance while its object graph is built
pub struct Materializer {
    instance: InstanceId,
    accessors: Vec<Option<FieldCell>>,
}

impl Materializer {
    /// Start a new instance, allocating its id from the dispatcher.
    ///
    /// The id is spent even if materialization fails afterwards; run
    /// `ObjectSchema::ensure_initialized` first to keep ids contiguous.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        Self {
            instance: dispatcher.next_instance_id(),
            accessors: Vec::new(),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub(crate) fn materialize_field(
        &mut self,
        dispatcher: &Rc<Dispatcher>,
        descriptor: &Rc<FieldDescriptor>,
        initial_value: Value,
    ) -> FieldCell {
        let cell = FieldCell::new(Rc::clone(descriptor), initial_value, dispatcher, self.instance);
        let index = descriptor.index();
        if self.accessors.len() <= index {
            self.accessors.resize(index + 1, None);
        }
        self.accessors[index] = Some(cell.clone());
        cell
    }

    /// Cells keyed by descriptor index
    pub fn into_accessors(self) -> Vec<Option<FieldCell>> {
        self.accessors
    }
}
