pub mod classifier;
pub mod config;
pub mod controller;
pub mod fuzzy;
pub mod local;
pub mod processing;
pub mod record;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings {
    pub mod python;
}
