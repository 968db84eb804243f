//! The classification and filtering rules applied per record.
//!
//! Pure table-driven logic: no I/O, no engine calls. Stages fetch
//! records through the spatial engine, run these rules, and write the
//! results back.

pub mod buffers;
pub mod classifier;
pub mod exclusions;

pub use buffers::*;
pub use classifier::*;
pub use exclusions::*;
