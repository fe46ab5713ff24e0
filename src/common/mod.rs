pub mod config;
pub mod constants;
pub mod error;

pub use config::VmConfig;
pub use error::{RayError, RayResult};
