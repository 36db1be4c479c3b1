pub mod equivalence;
pub mod filter;
pub mod normalizer;
pub mod parser;
pub mod planner;
pub mod report;
pub mod selector;

pub use crate::domain::model::{RequirementModel, TermPlan};
pub use crate::domain::ports::{DocumentTree, ScheduleGenerator, Storage};
pub use crate::utils::error::Result;
pub use planner::{PlanOutcome, PlanRequest, PlanSource, PlanningEngine};
