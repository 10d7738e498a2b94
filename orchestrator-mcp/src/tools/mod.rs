pub mod helpers;
pub mod params;

pub use helpers::{error_json, value_to_json};
pub use params::*;
