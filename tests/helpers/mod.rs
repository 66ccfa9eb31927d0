//! Shared test helpers.

pub mod csdl_fixtures;
pub mod model_helpers;
