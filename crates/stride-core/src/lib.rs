pub mod error;
pub mod transform;

pub use error::{Result, StrideError};
pub use transform::Transform;

pub use glam;
