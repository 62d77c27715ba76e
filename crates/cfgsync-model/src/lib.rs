//! cfgsync Model
//!
//! The vocabulary shared by every stage of the change-set pipeline.
//!
//! # Core Concepts
//!
//! - [`Change`]: one file-level mutation request with its content and metadata
//! - [`EntityKind`]: the domain object a file represents, in dependency order
//! - [`OrderTable`]: the process-wide ordinal table and path classifier
//! - [`InvalidationScope`]: which permission caches a batch must refresh
//! - [`FileOperationStatus`]: the externally reported outcome per file
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgsync_model::{Classification, EntityKind, ORDER_TABLE};
//!
//! let class = ORDER_TABLE.classify("Cloud Providers/aws.yaml");
//! assert_eq!(class, Classification::Kind(EntityKind::CloudProvider));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod error;
mod invalidation;
mod kind;
mod order;
mod status;

pub use change::{Change, ChangeType};
pub use error::ClassifyError;
pub use invalidation::{invalidation_scope, InvalidationScope};
pub use kind::{EntityKind, PathRule};
pub use order::{Classification, OrderTable, ORDER_TABLE};
pub use status::{FileOperationStatus, FileStatus};

/// Extension carried by every structured configuration document
pub const YAML_EXTENSION: &str = ".yaml";

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
