//! Familiar Models
//!
//! Declare a typed tree of fields and nested objects once, then create any
//! number of live model instances from it. Every field write raises a
//! `Value` event; `commit` closes a batch with a revision number and
//! `snapshot` replays the current value of every field.
//!
//! ## Features
//!
//! - **Stable Field Identity**: Every field gets an index and a dotted path at initialization
//! - **Synchronous Events**: Listeners run on the writing call stack, in registration order
//! - **Revisions**: `commit` reports 1, 2, 3, ...; snapshots never advance the counter
//! - **Extension Configs**: Typed per-field metadata attached at build time with `.with(...)`
//! - **Positional Writes**: `set(index, value)` for generic loaders
//!
//! ## Architecture
//!
//! ```text
//! define_field / define_object ──► ObjectSchema (static shape)
//!                                       │ initialize (once)
//!                                       ▼
//! define_model ──► ModelSchema ──► Dispatcher (indices, listeners, revision)
//!                      │ create (many)        ▲
//!                      ▼                      │ Value / Commit / Snapshot*
//!                    Model ──► ObjectInstance ── FieldCell
//! ```
//!
//! ## Example
//!
//! ```
//! use familiar_models::{define_field, define_model, define_object, EventKind};
//!
//! let schema = define_model(
//!     define_object()
//!         .object("player1", define_object().field("score", define_field(0i64)))
//!         .field("name", define_field(String::from("Round 1"))),
//! )
//! .unwrap();
//!
//! let model = schema.create().unwrap();
//! model.on(EventKind::Commit, |event| println!("{}", event));
//!
//! let score = model.typed::<i64>("player1.score").unwrap();
//! score.update(|s| s + 3).unwrap();
//! model.commit();
//! assert_eq!(model.revision(), 2);
//! ```
//!
//! Models are single-threaded: shared state lives behind `Rc`, and listeners
//! that write fields re-enter the dispatcher directly. Avoid listener cycles.

pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod event;
pub mod field;
pub mod instance;
pub mod model;
pub mod object;
pub mod value;

pub use config::{EmitterConfig, ModelConfig, OutputFormat, TraceConfig};
pub use descriptor::{field_path, ConfigKey, FieldConfigs, FieldDescriptor, RelationshipDescriptor};
pub use dispatcher::{Dispatcher, INITIAL_REVISION};
pub use emitter::{EventEmitter, ListenerId};
pub use error::{ModelError, Result};
pub use event::{EventKind, EventRecord, InstanceId, ModelEvent};
pub use field::{define_field, FieldNode, FieldSchema, FieldSetup};
pub use instance::{Field, FieldCell, InstanceNode, Materializer, ObjectInstance};
pub use model::{define_model, define_model_with_config, Model, ModelSchema, ReservedName};
pub use object::{define_object, ObjectSchema, SchemaNode};
pub use value::{FieldValue, Value};
