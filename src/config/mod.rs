//! Configuration module for dredge
//!
//! - Data-root resolution with an environment override
//! - Persisted user settings

pub mod paths;
pub mod settings;

pub use paths::DredgePaths;
pub use settings::Settings;
