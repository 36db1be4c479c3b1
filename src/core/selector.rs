//! Deterministic single-term course selection.
//!
//! Three tiers run in order:
//!
//! 1. a diversity pass over `available` in source order,
//! 2. a fill pass that only adds unseen subjects when the plan is short,
//! 3. a general-education placeholder for whatever gap is left.
//!
//! The selector never fails; an empty `available` list is the caller's
//! concern (see [`crate::core::planner`]).

use crate::core::equivalence::subject_of;
use crate::core::filter::FilterOutcome;
use crate::domain::model::{Course, PlanningContext, SelectedCourse, TermPlan};
use rust_decimal::Decimal;
use std::collections::HashSet;

pub const TRANSFER_CATEGORY: &str = "Transfer Requirement";
pub const GE_CATEGORY: &str = "General Education";
pub const GE_CODE: &str = "GE";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    /// Above this many courses the fill pass no longer runs.
    pub max_courses_hint: usize,
    /// Repeated subjects are skipped until this many courses are selected.
    pub repeat_unlock_after: usize,
    /// How far below the target the plan may end before filling.
    pub fallback_gap: Decimal,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_courses_hint: 5,
            repeat_unlock_after: 4,
            fallback_gap: Decimal::from(2),
        }
    }
}

pub fn select_term(
    filtered: &FilterOutcome,
    context: &PlanningContext,
    policy: &SelectionPolicy,
) -> TermPlan {
    let available = &filtered.available;
    let target = context.target_units;

    let mut selected: Vec<SelectedCourse> = Vec::new();
    let mut used_subjects: HashSet<String> = HashSet::new();
    let mut current = Decimal::ZERO;
    let mut diversity_relaxed = false;

    for course in available {
        if current >= target {
            break;
        }

        let subject = subject_of(&course.code);
        if used_subjects.contains(&subject) {
            if selected.len() < policy.repeat_unlock_after {
                tracing::debug!(
                    "⏭️ Skipping {} - already have a {} course",
                    course.code,
                    subject
                );
                continue;
            }
            diversity_relaxed = true;
        }

        tracing::debug!("✅ Selected {} ({}) - {} units", course.code, subject, course.units);
        current += course.units;
        used_subjects.insert(subject);
        selected.push(transfer_course(course, context));
    }

    if current < target - policy.fallback_gap && selected.len() < policy.max_courses_hint {
        tracing::debug!("Need more units ({}/{}), filling with new subjects", current, target);

        let mut added = false;
        for course in available {
            if current >= target {
                break;
            }
            if selected.iter().any(|s| s.course.code == course.code) {
                continue;
            }
            let subject = subject_of(&course.code);
            if used_subjects.contains(&subject) {
                continue;
            }

            tracing::debug!("➕ Added {} ({}) - {} units", course.code, subject, course.units);
            current += course.units;
            used_subjects.insert(subject);
            selected.push(transfer_course(course, context));
            added = true;
        }

        if current < target - policy.fallback_gap && !added {
            let gap = target - current;
            tracing::debug!("🎓 Adding general education placeholder for {} units", gap);
            selected.push(general_education(gap, context));
        }
    }

    let total_units: Decimal = selected.iter().map(|s| s.course.units).sum();
    let recommendations = recommendations_for(filtered, context, selected.len(), total_units);

    tracing::info!(
        "✅ Selected {} courses totaling {} units for {}",
        selected.len(),
        total_units,
        context.term_label
    );

    TermPlan {
        term_label: context.term_label.clone(),
        courses: selected,
        total_units,
        warnings: filtered.warnings(),
        notes: format!(
            "Schedule for {} at {} toward {} transfer to {}",
            context.term_label, context.source_institution, context.major, context.target_institution
        ),
        recommendations,
        diversity_relaxed,
    }
}

fn transfer_course(course: &Course, context: &PlanningContext) -> SelectedCourse {
    let mut reason = format!(
        "Required for {} transfer to {}",
        context.major, context.target_institution
    );
    if course.units_defaulted {
        reason.push_str(&format!(
            " (units not listed on the agreement, assumed {})",
            course.units
        ));
    }
    SelectedCourse {
        course: course.clone(),
        category: TRANSFER_CATEGORY.to_string(),
        reason,
    }
}

fn general_education(gap: Decimal, context: &PlanningContext) -> SelectedCourse {
    SelectedCourse {
        course: Course::new(
            GE_CODE,
            format!("General Education Course ({} units)", gap.normalize()),
            gap,
        ),
        category: GE_CATEGORY.to_string(),
        reason: format!(
            "Recommended to maintain subject diversity instead of taking multiple courses \
             from the same major. Choose any transferable GE course from the {} catalog.",
            context.source_institution
        ),
    }
}

fn recommendations_for(
    filtered: &FilterOutcome,
    context: &PlanningContext,
    course_count: usize,
    total_units: Decimal,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Courses selected from {} available {} transfer requirements at {}",
            filtered.available.len(),
            context.major,
            context.source_institution
        ),
        format!(
            "Schedule includes {} courses totaling {} units",
            course_count,
            total_units.normalize()
        ),
        format!(
            "Verify course availability and prerequisites at {} before enrolling",
            context.source_institution
        ),
    ];
    if !filtered.defaulted_units.is_empty() {
        lines.push(format!(
            "Confirm units for {} with the {} catalog",
            filtered.defaulted_units.join(", "),
            context.source_institution
        ));
    }
    if !filtered.exceptions.is_empty() {
        lines.push(format!(
            "{} requirement(s) must be completed at {} after transfer",
            filtered.exceptions.len(),
            context.target_institution
        ));
    }
    lines
}
