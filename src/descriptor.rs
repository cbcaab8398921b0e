//! Field identity: descriptors, parent links and extension configs

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Link to an enclosing object, used only to rebuild dotted paths
#[derive(Debug)]
pub struct RelationshipDescriptor {
    name: String,
    parent: Option<Rc<RelationshipDescriptor>>,
}

impl RelationshipDescriptor {
    pub fn new(name: impl Into<String>, parent: Option<Rc<RelationshipDescriptor>>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<RelationshipDescriptor>> {
        self.parent.as_ref()
    }

    /// Dotted path of this object, root first
    pub fn path(&self) -> String {
        join_path(&self.name, self.parent.as_deref())
    }
}

/// Key type for a [`FieldConfigs`] entry.
///
/// The key is the type itself, so two extensions never collide unless they
/// share a key type.
pub trait ConfigKey: 'static {
    type Value: 'static;
}

/// Typed extension store attached to a field descriptor
#[derive(Default)]
pub struct FieldConfigs {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl FieldConfigs {
    /// Insert an entry, returning the previous one for the same key
    pub fn insert<K: ConfigKey>(&mut self, value: K::Value) -> Option<K::Value> {
        self.entries
            .insert(TypeId::of::<K>(), Box::new(value))
            .and_then(|old| old.downcast::<K::Value>().ok())
            .map(|old| *old)
    }

    pub fn get<K: ConfigKey>(&self) -> Option<&K::Value> {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.downcast_ref::<K::Value>())
    }

    pub fn get_mut<K: ConfigKey>(&mut self) -> Option<&mut K::Value> {
        self.entries
            .get_mut(&TypeId::of::<K>())
            .and_then(|entry| entry.downcast_mut::<K::Value>())
    }

    pub fn contains<K: ConfigKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FieldConfigs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfigs")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Identity of a single field, assigned once during schema initialization.
///
/// Index, name and parent are fixed at creation. Configs are writable only
/// while the descriptor is still owned by the initialization pass; once it
/// is registered it is shared behind an `Rc` and read-only.
#[derive(Debug)]
pub struct FieldDescriptor {
    index: usize,
    name: String,
    parent: Option<Rc<RelationshipDescriptor>>,
    configs: FieldConfigs,
    value_type: &'static str,
}

impl FieldDescriptor {
    pub(crate) fn new(
        index: usize,
        name: impl Into<String>,
        parent: Option<Rc<RelationshipDescriptor>>,
        value_type: &'static str,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            parent,
            configs: FieldConfigs::default(),
            value_type,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<RelationshipDescriptor>> {
        self.parent.as_ref()
    }

    pub fn configs(&self) -> &FieldConfigs {
        &self.configs
    }

    pub(crate) fn configs_mut(&mut self) -> &mut FieldConfigs {
        &mut self.configs
    }

    /// Declared Rust type of the field
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub fn path(&self) -> String {
        field_path(self)
    }
}

/// Dotted path of a field, root first (e.g. `player1.score`)
pub fn field_path(field: &FieldDescriptor) -> String {
    join_path(&field.name, field.parent.as_deref())
}

fn join_path(name: &str, mut parent: Option<&RelationshipDescriptor>) -> String {
    let mut names = vec![name];
    while let Some(current) = parent {
        names.push(current.name.as_str());
        parent = current.parent.as_deref();
    }
    names.reverse();
    names.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unit;
    impl ConfigKey for Unit {
        type Value = &'static str;
    }

    struct Scale;
    impl ConfigKey for Scale {
        type Value = f64;
    }

    #[test]
    fn test_nested_path() {
        let game = Rc::new(RelationshipDescriptor::new("game", None));
        let player = Rc::new(RelationshipDescriptor::new("player1", Some(game)));
        let field = FieldDescriptor::new(3, "score", Some(player.clone()), "i64");
        assert_eq!(field_path(&field), "game.player1.score");
        assert_eq!(player.path(), "game.player1");
    }

    #[test]
    fn test_root_path() {
        let field = FieldDescriptor::new(0, "name", None, "String");
        assert_eq!(field.path(), "name");
    }

    #[test]
    fn test_configs_are_keyed_by_type() {
        let mut configs = FieldConfigs::default();
        assert!(configs.insert::<Unit>("pts").is_none());
        configs.insert::<Scale>(0.5);

        assert_eq!(configs.get::<Unit>(), Some(&"pts"));
        assert_eq!(configs.get::<Scale>(), Some(&0.5));
        assert_eq!(configs.insert::<Unit>("points"), Some("pts"));
        assert_eq!(configs.len(), 2);
    }
}
