//! Demo file naming and the storage it is checked against.

pub mod naming;
pub mod storage;

pub use naming::{DemoIdentity, DemoNameResolver, IdentityBase, mode_name, render_name};
pub use storage::{DemosFolder, StorageProbe};
