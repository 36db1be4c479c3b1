//! JSON shape of a single-term schedule as exchanged with the chat model and
//! printed by `transfer-planner --json`.
//!
//! ```json
//! { "quarter": { "quarter_name": "Fall 2025",
//!                "courses": [ { "course_code": "PHYS 4A", "course_name": "Physics I",
//!                               "units": 4, "category": "...", "reason": "..." } ],
//!                "total_units": 4, "notes": "...", "warnings": [] },
//!   "recommendations": [] }
//! ```

use crate::domain::model::{Course, SelectedCourse, TermPlan};
use crate::utils::error::{PlannerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub quarter: QuarterDocument,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterDocument {
    pub quarter_name: String,
    pub courses: Vec<CourseEntry>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_units: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub course_code: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub units: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub reason: String,
}

impl ScheduleDocument {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Converts to a [`TermPlan`], rejecting documents that break the
    /// plan's structural guarantees.
    pub fn into_term_plan(self) -> Result<TermPlan> {
        let quarter = self.quarter;
        if quarter.courses.is_empty() {
            return Err(PlannerError::generator("schedule has no courses"));
        }

        let mut courses = Vec::with_capacity(quarter.courses.len());
        for entry in quarter.courses {
            let code = entry.course_code.trim().to_string();
            if code.is_empty() {
                return Err(PlannerError::generator("course entry without course_code"));
            }
            if entry.units <= Decimal::ZERO {
                return Err(PlannerError::generator(format!(
                    "{} has non-positive units",
                    code
                )));
            }
            courses.push(SelectedCourse {
                course: Course::new(code, entry.course_name.trim(), entry.units.normalize()),
                category: entry.category,
                reason: entry.reason,
            });
        }

        let sum: Decimal = courses.iter().map(|c| c.course.units).sum();
        if sum != quarter.total_units {
            return Err(PlannerError::generator(format!(
                "total_units {} does not match course sum {}",
                quarter.total_units, sum
            )));
        }

        Ok(TermPlan {
            term_label: quarter.quarter_name,
            courses,
            total_units: sum,
            warnings: quarter.warnings,
            notes: quarter.notes,
            recommendations: self.recommendations,
            diversity_relaxed: false,
        })
    }
}

impl From<&TermPlan> for ScheduleDocument {
    fn from(plan: &TermPlan) -> Self {
        Self {
            quarter: QuarterDocument {
                quarter_name: plan.term_label.clone(),
                courses: plan
                    .courses
                    .iter()
                    .map(|s| CourseEntry {
                        course_code: s.course.code.clone(),
                        course_name: s.course.title.clone(),
                        units: s.course.units,
                        category: s.category.clone(),
                        reason: s.reason.clone(),
                    })
                    .collect(),
                total_units: plan.total_units,
                notes: plan.notes.clone(),
                warnings: plan.warnings.clone(),
            },
            recommendations: plan.recommendations.clone(),
        }
    }
}
