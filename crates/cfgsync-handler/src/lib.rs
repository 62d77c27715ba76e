//! cfgsync Handler
//!
//! The per-kind capability the pipeline drives: parse file content into a
//! domain object, look up the entity at a path, apply or delete it.
//!
//! # Core Concepts
//!
//! - [`Handler`]: async parse/get/apply/delete contract for one [`EntityKind`]
//! - [`ChangeContext`]: a validated change bound to its kind and handler
//! - [`HandlerRegistry`]: explicit kind → handler mapping built by the caller
//! - [`RuleSet`]: declarative checks run on parsed documents
//! - [`YamlHandler`] / [`MemoryStore`]: in-memory reference implementation
//!
//! [`EntityKind`]: cfgsync_model::EntityKind

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod error;
mod handler;
mod memory;
mod registry;
mod rules;

pub use document::{parse_document, ParsedObject};
pub use error::HandlerError;
pub use handler::{ChangeContext, EntityRef, Handler};
pub use memory::{MemoryStore, StoredEntity, YamlHandler};
pub use registry::HandlerRegistry;
pub use rules::{Constraint, RuleSet, ValidationRule};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
