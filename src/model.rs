//! Model schemas and live model instances
//!
//! A [`ModelSchema`] owns the root object schema and the [`Dispatcher`] it was
//! initialized against. Every [`Model`] created from it shares that
//! dispatcher: listeners, the revision counter and the snapshot channel are
//! schema-wide, while field values are per instance. Events carry the
//! originating [`InstanceId`].

use std::fmt;
use std::rc::Rc;

use crate::config::EmitterConfig;
use crate::descriptor::FieldDescriptor;
use crate::dispatcher::Dispatcher;
use crate::emitter::ListenerId;
use crate::error::{ModelError, Result};
use crate::event::{EventKind, InstanceId, ModelEvent};
use crate::instance::{Field, FieldCell, Materializer, ObjectInstance};
use crate::object::ObjectSchema;
use crate::value::{FieldValue, Value};

/// Names of the model API that top-level keys may not use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedName {
    On,
    Once,
    Off,
    Snapshot,
    Commit,
    Set,
}

impl ReservedName {
    pub const ALL: [ReservedName; 6] = [
        ReservedName::On,
        ReservedName::Once,
        ReservedName::Off,
        ReservedName::Snapshot,
        ReservedName::Commit,
        ReservedName::Set,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservedName::On => "on",
            ReservedName::Once => "once",
            ReservedName::Off => "off",
            ReservedName::Snapshot => "snapshot",
            ReservedName::Commit => "commit",
            ReservedName::Set => "set",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == key)
    }
}

impl fmt::Display for ReservedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root schema from which model instances are created
pub struct ModelSchema {
    root: ObjectSchema,
    dispatcher: Rc<Dispatcher>,
}

/// Validate and initialize a model schema with default emitter settings
pub fn define_model(root: ObjectSchema) -> Result<ModelSchema> {
    define_model_with_config(root, &EmitterConfig::default())
}

/// Validate and initialize a model schema.
///
/// Fails if a top-level key is a [`ReservedName`] or if any part of `root`
/// was already initialized.
pub fn define_model_with_config(mut root: ObjectSchema, config: &EmitterConfig) -> Result<ModelSchema> {
    if let Some(key) = root.keys().find(|key| ReservedName::parse(key).is_some()) {
        return Err(ModelError::ReservedName {
            key: key.to_string(),
        });
    }

    let dispatcher = Rc::new(Dispatcher::with_config(config));
    root.initialize(&dispatcher, None)?;
    tracing::debug!(fields = dispatcher.field_count(), "model schema initialized");

    Ok(ModelSchema { root, dispatcher })
}

impl ModelSchema {
    /// Materialize a new instance. Callable any number of times.
    pub fn create(&self) -> Result<Model> {
        self.root.ensure_initialized()?;
        let mut materializer = Materializer::new(&self.dispatcher);
        let root = self.root.create_instance(&mut materializer)?;
        let id = materializer.instance();
        tracing::debug!(instance = %id, fields = self.dispatcher.field_count(), "model instance materialized");

        Ok(Model {
            id,
            root,
            accessors: materializer.into_accessors(),
            dispatcher: Rc::clone(&self.dispatcher),
        })
    }

    pub fn field_count(&self) -> usize {
        self.dispatcher.field_count()
    }

    /// Field descriptors in index order
    pub fn descriptors(&self) -> Vec<Rc<FieldDescriptor>> {
        self.dispatcher.descriptors()
    }

    pub fn descriptor(&self, index: usize) -> Option<Rc<FieldDescriptor>> {
        self.dispatcher.descriptor(index)
    }

    pub fn revision(&self) -> u64 {
        self.dispatcher.revision()
    }

    pub fn root(&self) -> &ObjectSchema {
        &self.root
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("keys", &self.root.keys().collect::<Vec<_>>())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// A live model instance
pub struct Model {
    id: InstanceId,
    root: ObjectInstance,
    accessors: Vec<Option<FieldCell>>,
    dispatcher: Rc<Dispatcher>,
}

impl Model {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn root(&self) -> &ObjectInstance {
        &self.root
    }

    pub fn object(&self, name: &str) -> Result<&ObjectInstance> {
        self.root.object(name)
    }

    pub fn field(&self, name: &str) -> Result<&FieldCell> {
        self.root.field(name)
    }

    pub fn lookup(&self, path: &str) -> Result<&FieldCell> {
        self.root.lookup(path)
    }

    pub fn typed<T: FieldValue>(&self, path: &str) -> Result<Field<T>> {
        self.root.typed(path)
    }

    /// Every field cell of this instance, in index order
    pub fn fields(&self) -> impl Iterator<Item = &FieldCell> {
        self.accessors.iter().flatten()
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.dispatcher.on(kind, handler)
    }

    pub fn once(&self, kind: EventKind, handler: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.dispatcher.once(kind, handler)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.dispatcher.off(kind, id)
    }

    /// End the current batch: emits `Commit` with the current revision, then
    /// the revision advances.
    pub fn commit(&self) {
        self.dispatcher.commit(self.id);
    }

    /// Emit `SnapshotValue` for every field, then `SnapshotCommit` with the
    /// current revision. The revision is not changed.
    pub fn snapshot(&self) {
        self.dispatcher.snapshot(self.id);
    }

    /// Revision the next `commit` will report
    pub fn revision(&self) -> u64 {
        self.dispatcher.revision()
    }

    /// Write a field by index, bypassing its declared type.
    ///
    /// Intended for generic loaders that address fields by index. Nothing
    /// checks that `value` matches the field's type; typed reads of that
    /// field fail afterwards if it does not.
    ///
    /// The index table belongs to this instance: `set(i, ..)` on two
    /// instances of one schema writes two different cells. Listeners and the
    /// revision counter stay shared across instances.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.accessor(index)?.set(value);
        Ok(())
    }

    /// Read a field by index
    pub fn get(&self, index: usize) -> Result<Value> {
        Ok(self.accessor(index)?.get())
    }

    pub fn field_count(&self) -> usize {
        self.accessors.iter().flatten().count()
    }

    fn accessor(&self, index: usize) -> Result<&FieldCell> {
        self.accessors
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(ModelError::IndexOutOfRange {
                index,
                len: self.accessors.len(),
            })
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::define_field;
    use crate::object::define_object;

    #[test]
    fn test_reserved_names() {
        for name in ReservedName::ALL {
            let root = define_object().field(name.as_str(), define_field(0));
            let err = define_model(root).unwrap_err();
            assert!(matches!(err, ModelError::ReservedName { ref key } if key == name.as_str()));
        }
        assert_eq!(ReservedName::parse("commit"), Some(ReservedName::Commit));
        assert_eq!(ReservedName::parse("score"), None);
    }

    #[test]
    fn test_reserved_names_only_apply_at_top_level() {
        let root = define_object().object("inner", define_object().field("set", define_field(0)));
        assert!(define_model(root).is_ok());
    }

    #[test]
    fn test_set_and_get_by_index() {
        let schema = define_model(
            define_object()
                .field("a", define_field(1))
                .field("b", define_field(String::from("x"))),
        )
        .unwrap();
        let model = schema.create().unwrap();

        model.set(1, 42).unwrap();
        assert_eq!(model.get(1).unwrap(), Value::Int(42));
        assert_eq!(model.field("b").unwrap().get(), Value::Int(42));

        let err = model.set(2, 0).unwrap_err();
        assert!(matches!(err, ModelError::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_empty_model() {
        let schema = define_model(define_object()).unwrap();
        let model = schema.create().unwrap();
        assert_eq!(model.field_count(), 0);
        assert!(model.root().is_empty());
        assert!(model.get(0).is_err());
    }
}
