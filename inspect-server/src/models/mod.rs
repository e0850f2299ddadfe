//! Data models

pub mod window;
pub mod row;
pub mod prediction;
pub mod dataset;
pub mod training;

pub use window::*;
pub use row::*;
pub use prediction::*;
pub use dataset::*;
pub use training::*;
