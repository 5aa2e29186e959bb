pub mod camera;
pub mod config;
pub mod multiplier;
pub mod permissions;

pub use camera::*;
pub use config::*;
pub use multiplier::*;
pub use permissions::*;
