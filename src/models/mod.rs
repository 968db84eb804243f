pub mod enums;
pub mod forest;
pub mod layer;
pub mod lookup;
pub mod record;

pub use enums::*;
pub use layer::*;
pub use record::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
