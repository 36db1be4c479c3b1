pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{element_tree::ElementTree, storage::LocalStorage};
pub use config::PlannerConfig;
pub use crate::core::{PlanOutcome, PlanRequest, PlanSource, PlanningEngine};
pub use utils::error::{PlannerError, Result};
