//! arbor-host: host platform adapters for the arbor command engine
//!
//! The engine only needs three things from a platform: a way to turn its
//! native sender into the engine's sender type, a way back, and an answer to
//! "does this sender hold this permission". This crate packages those as
//! [`SenderMapper`] and [`NativeSender`], binds them to a manager with
//! [`PlatformManager`], and ships [`PermissionTable`] for platforms without a
//! permission system of their own.

pub mod adapter;
pub mod permission;
pub mod platform;

pub use adapter::{NativePermissions, NativeSender, SenderMapper};
pub use permission::{PermissionTable, TableError};
pub use platform::{PlatformManager, PlatformManagerBuilder};
