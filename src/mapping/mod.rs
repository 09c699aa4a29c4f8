//! Declarative parameter-to-request mapping engine
//!
//! Commands describe requests as data: a [`StructShape`] for the provider
//! request, and either a [`MappingTable`] (parameter name → field paths + tag)
//! or an explicit list of [`Setter`]s when the request depends on runtime
//! branching. The [`CallExecutor`] applies those setters to a fresh
//! [`Request`], deserializes it into the provider's typed input and performs
//! the remote call.
//!
//! ```text
//! params ──► MappingTable::setters ──► CallExecutor ──► coerce ──► Request::assign
//!                                           │
//!                                           └──► Request::build::<Input>() ──► remote call
//! ```

pub mod coerce;
pub mod content;
pub mod error;
pub mod executor;
pub mod inject;
pub mod path;
pub mod setter;
pub mod shape;
pub mod tag;

use serde_json::Value;
use std::collections::HashMap;

/// Validated, defaulted user parameters keyed by parameter name
pub type Params = HashMap<String, Value>;

pub use coerce::coerce;
pub use content::CoercionContext;
pub use error::{MappingError, MappingResult};
pub use executor::{CallExecutor, extract_id};
pub use inject::{FromParams, MappingTable, populate};
pub use path::FieldPath;
pub use setter::Setter;
pub use shape::{Request, StructShape};
pub use tag::TypeTag;
