//! Field schemas and build-time configurators

use std::rc::Rc;

use crate::descriptor::{FieldConfigs, FieldDescriptor, RelationshipDescriptor};
use crate::dispatcher::Dispatcher;
use crate::error::{ModelError, Result};
use crate::value::{FieldValue, Value};

type Configurator<T> = Box<dyn FnOnce(&mut FieldSetup<'_, T>)>;

/// View of a field handed to configurators, after its descriptor is assigned
pub struct FieldSetup<'a, T> {
    descriptor: &'a mut FieldDescriptor,
    initial_value: &'a T,
}

impl<T> FieldSetup<'_, T> {
    pub fn descriptor(&self) -> &FieldDescriptor {
        self.descriptor
    }

    pub fn configs_mut(&mut self) -> &mut FieldConfigs {
        self.descriptor.configs_mut()
    }

    pub fn initial_value(&self) -> &T {
        self.initial_value
    }
}

/// Declaration of a single field: its initial value plus queued configurators
pub struct FieldSchema<T: FieldValue> {
    initial_value: T,
    configurators: Vec<Configurator<T>>,
    descriptor: Option<Rc<FieldDescriptor>>,
}

/// Declare a field with its initial value
pub fn define_field<T: FieldValue>(initial_value: T) -> FieldSchema<T> {
    FieldSchema {
        initial_value,
        configurators: Vec::new(),
        descriptor: None,
    }
}

impl<T: FieldValue> FieldSchema<T> {
    /// Queue a configurator. Configurators run once, in the order queued,
    /// right after the field's descriptor is assigned.
    pub fn with(mut self, configure: impl FnOnce(&mut FieldSetup<'_, T>) + 'static) -> Self {
        self.configurators.push(Box::new(configure));
        self
    }

    pub fn initial_value(&self) -> &T {
        &self.initial_value
    }

    pub fn descriptor(&self) -> Option<&Rc<FieldDescriptor>> {
        self.descriptor.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.descriptor.is_some()
    }
}

/// Type-erased field schema, as stored inside an object schema
pub trait FieldNode {
    /// Assign the descriptor and run the configurators
    fn initialize(
        &mut self,
        dispatcher: &Dispatcher,
        name: &str,
        parent: Option<Rc<RelationshipDescriptor>>,
    ) -> Result<()>;

    fn descriptor(&self) -> Option<&Rc<FieldDescriptor>>;

    fn initial_value(&self) -> Value;
}

impl<T: FieldValue> FieldNode for FieldSchema<T> {
    fn initialize(
        &mut self,
        dispatcher: &Dispatcher,
        name: &str,
        parent: Option<Rc<RelationshipDescriptor>>,
    ) -> Result<()> {
        if let Some(descriptor) = &self.descriptor {
            return Err(ModelError::AlreadyInitialized {
                path: descriptor.path(),
            });
        }

        let mut descriptor =
            dispatcher.create_field_descriptor(name, parent, std::any::type_name::<T>());
        let mut setup = FieldSetup {
            descriptor: &mut descriptor,
            initial_value: &self.initial_value,
        };
        for configure in std::mem::take(&mut self.configurators) {
            configure(&mut setup);
        }

        self.descriptor = Some(dispatcher.register_field_descriptor(descriptor));
        Ok(())
    }

    fn descriptor(&self) -> Option<&Rc<FieldDescriptor>> {
        self.descriptor.as_ref()
    }

    fn initial_value(&self) -> Value {
        self.initial_value.clone().into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ConfigKey;
    use std::cell::RefCell;

    struct Label;
    impl ConfigKey for Label {
        type Value = String;
    }

    #[test]
    fn test_configurators_run_in_order_after_descriptor() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);

        let mut field = define_field(5i64)
            .with(move |setup| {
                first.borrow_mut().push(format!("first:{}", setup.descriptor().index()));
                setup.configs_mut().insert::<Label>("points".to_string());
            })
            .with(move |setup| {
                second.borrow_mut().push(format!("second:{}", setup.initial_value()));
            });
        assert!(order.borrow().is_empty());

        let dispatcher = Dispatcher::new();
        field.initialize(&dispatcher, "score", None).unwrap();

        assert_eq!(*order.borrow(), vec!["first:0", "second:5"]);
        let descriptor = field.descriptor().unwrap();
        assert_eq!(descriptor.configs().get::<Label>().map(String::as_str), Some("points"));
        assert_eq!(descriptor.value_type(), "i64");
    }

    #[test]
    fn test_field_initializes_once() {
        let dispatcher = Dispatcher::new();
        let mut field = define_field(String::from("Round 1"));
        field.initialize(&dispatcher, "name", None).unwrap();

        let err = field.initialize(&dispatcher, "name", None).unwrap_err();
        assert!(matches!(err, ModelError::AlreadyInitialized { ref path } if path == "name"));
        assert_eq!(dispatcher.field_count(), 1);
    }
}
