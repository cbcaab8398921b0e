//! Object schemas: ordered shapes of fields and nested objects
//!
//! Children are visited depth-first in declaration order, nested objects and
//! fields interleaved exactly as declared. That order assigns field indices
//! and is therefore visible through positional `set`.

use std::rc::Rc;

use crate::descriptor::RelationshipDescriptor;
use crate::dispatcher::Dispatcher;
use crate::error::{display_path, ModelError, Result};
use crate::field::{FieldNode, FieldSchema};
use crate::instance::{InstanceNode, Materializer, ObjectInstance};
use crate::value::FieldValue;

/// A child of an object schema
pub enum SchemaNode {
    Object(ObjectSchema),
    Field(Box<dyn FieldNode>),
}

impl From<ObjectSchema> for SchemaNode {
    fn from(schema: ObjectSchema) -> Self {
        SchemaNode::Object(schema)
    }
}

impl<T: FieldValue> From<FieldSchema<T>> for SchemaNode {
    fn from(schema: FieldSchema<T>) -> Self {
        SchemaNode::Field(Box::new(schema))
    }
}

/// Declaration of an object: an ordered set of named children.
///
/// A schema describes one position in one model. It can be initialized only
/// once; every usage site needs its own schema value.
#[derive(Default)]
pub struct ObjectSchema {
    entries: Vec<(String, SchemaNode)>,
    dispatcher: Option<Rc<Dispatcher>>,
    relationship: Option<Rc<RelationshipDescriptor>>,
}

/// Declare an empty object; add children with `field` and `object`
pub fn define_object() -> ObjectSchema {
    ObjectSchema::new()
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered shape
    pub fn from_shape<K: Into<String>>(shape: impl IntoIterator<Item = (K, SchemaNode)>) -> Self {
        shape
            .into_iter()
            .fold(Self::new(), |schema, (key, node)| schema.node(key, node))
    }

    /// Build from separate subordinate and field shapes. All subordinates are
    /// declared first, then all fields.
    pub fn from_parts<K1, K2>(
        subordinates: impl IntoIterator<Item = (K1, ObjectSchema)>,
        fields: impl IntoIterator<Item = (K2, SchemaNode)>,
    ) -> Self
    where
        K1: Into<String>,
        K2: Into<String>,
    {
        let schema = subordinates
            .into_iter()
            .fold(Self::new(), |schema, (key, object)| schema.object(key, object));
        fields
            .into_iter()
            .fold(schema, |schema, (key, node)| schema.node(key, node))
    }

    pub fn field<T: FieldValue>(self, name: impl Into<String>, schema: FieldSchema<T>) -> Self {
        self.node(name, schema.into())
    }

    pub fn object(self, name: impl Into<String>, schema: ObjectSchema) -> Self {
        self.node(name, schema.into())
    }

    /// Add a child. Re-declaring a key replaces the child in its original
    /// position.
    pub fn node(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((name, node)),
        }
        self
    }

    /// Child names in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fields in this subtree
    pub fn field_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, node)| match node {
                SchemaNode::Object(object) => object.field_count(),
                SchemaNode::Field(_) => 1,
            })
            .sum()
    }

    pub fn is_initialized(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Dotted path of this object once initialized; empty for the root
    pub fn path(&self) -> String {
        self.relationship
            .as_ref()
            .map(|r| r.path())
            .unwrap_or_default()
    }

    /// Assign descriptors to every field below this object.
    ///
    /// `parent` is this object's own relationship node (`None` for a root).
    /// Fails without assigning anything if any node of the subtree was
    /// already initialized.
    pub fn initialize(
        &mut self,
        dispatcher: &Rc<Dispatcher>,
        parent: Option<Rc<RelationshipDescriptor>>,
    ) -> Result<()> {
        self.ensure_uninitialized()?;
        self.initialize_tree(dispatcher, parent)
    }

    /// Build one live object graph. Fails before creating any cell if some
    /// node of the subtree was never initialized.
    pub fn create_instance(&self, materializer: &mut Materializer) -> Result<ObjectInstance> {
        self.ensure_initialized()?;
        self.materialize(materializer)
    }

    /// Check that every node of the subtree has been initialized
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(ModelError::NotInitialized {
                path: display_path(&self.path()),
            });
        }
        for (key, node) in &self.entries {
            match node {
                SchemaNode::Object(object) => object.ensure_initialized()?,
                SchemaNode::Field(field) => {
                    if field.descriptor().is_none() {
                        return Err(ModelError::NotInitialized {
                            path: display_path(&self.child_path(key)),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn materialize(&self, materializer: &mut Materializer) -> Result<ObjectInstance> {
        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| ModelError::NotInitialized {
            path: display_path(&self.path()),
        })?;

        let mut entries = Vec::with_capacity(self.entries.len());
        for (key, node) in &self.entries {
            let member = match node {
                SchemaNode::Object(object) => {
                    InstanceNode::Object(object.materialize(materializer)?)
                }
                SchemaNode::Field(field) => {
                    let descriptor = field.descriptor().ok_or_else(|| ModelError::NotInitialized {
                        path: display_path(&self.child_path(key)),
                    })?;
                    InstanceNode::Field(materializer.materialize_field(
                        dispatcher,
                        descriptor,
                        field.initial_value(),
                    ))
                }
            };
            entries.push((key.clone(), member));
        }
        Ok(ObjectInstance::new(self.path(), entries))
    }

    fn ensure_uninitialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Err(ModelError::AlreadyInitialized {
                path: display_path(&self.path()),
            });
        }
        for (_, node) in &self.entries {
            match node {
                SchemaNode::Object(object) => object.ensure_uninitialized()?,
                SchemaNode::Field(field) => {
                    if let Some(descriptor) = field.descriptor() {
                        return Err(ModelError::AlreadyInitialized {
                            path: descriptor.path(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn initialize_tree(
        &mut self,
        dispatcher: &Rc<Dispatcher>,
        parent: Option<Rc<RelationshipDescriptor>>,
    ) -> Result<()> {
        self.dispatcher = Some(Rc::clone(dispatcher));
        self.relationship = parent.clone();

        for (key, node) in &mut self.entries {
            match node {
                SchemaNode::Object(object) => {
                    let relationship = Rc::new(RelationshipDescriptor::new(key.clone(), parent.clone()));
                    object.initialize_tree(dispatcher, Some(relationship))?;
                }
                SchemaNode::Field(field) => field.initialize(dispatcher, key, parent.clone())?,
            }
        }
        Ok(())
    }

    fn child_path(&self, name: &str) -> String {
        let path = self.path();
        if path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", path, name)
        }
    }
}
