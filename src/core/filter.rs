//! Reduces a source pool to the courses a student still needs.

use crate::core::equivalence::{equivalence_key, CompletedSet};
use crate::domain::model::{
    Articulation, CompletedCourse, Course, Exception, ExceptionKind, SourcePool,
};
use std::collections::HashSet;

/// Result of filtering a pool against completed work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Still-needed courses in pool order, one per equivalence class.
    pub available: Vec<Course>,
    /// Slots that cannot be satisfied before transfer.
    pub exceptions: Vec<Exception>,
    /// Pool courses removed because they (or their honors partner) were completed.
    pub completed_skipped: Vec<String>,
    /// Available courses whose units fell back to the default.
    pub defaulted_units: Vec<String>,
    /// Courses dropped because an equivalent course was already available.
    pub duplicates_collapsed: usize,
}

impl FilterOutcome {
    pub fn warnings(&self) -> Vec<String> {
        self.exceptions.iter().map(|e| e.message.clone()).collect()
    }
}

pub fn filter_pool(
    pool: &SourcePool,
    completed: &[CompletedCourse],
    source_institution: &str,
    target_institution: &str,
) -> FilterOutcome {
    let completed_set = CompletedSet::from_completed(completed);
    let mut outcome = FilterOutcome::default();
    let mut seen_keys: HashSet<String> = HashSet::new();

    for entry in pool.entries() {
        match &entry.articulation {
            Articulation::NoArticulation => {
                outcome.exceptions.push(Exception {
                    kind: ExceptionKind::NoArticulation,
                    slot_key: entry.slot_key.clone(),
                    message: format!(
                        "No course articulated at {} for {} - must be taken at {} after transfer",
                        source_institution, entry.slot_key, target_institution
                    ),
                });
            }
            Articulation::PostTransferOnly { code, .. } => {
                let code = code.as_deref().unwrap_or(&entry.slot_key);
                outcome.exceptions.push(Exception {
                    kind: ExceptionKind::PostTransferOnly,
                    slot_key: entry.slot_key.clone(),
                    message: format!(
                        "{}: This course must be taken at {} after transfer",
                        code, target_institution
                    ),
                });
            }
            Articulation::Options { options } => {
                for option in options {
                    let (done, remaining): (Vec<&Course>, Vec<&Course>) = option
                        .courses
                        .iter()
                        .filter(|c| !c.code.trim().is_empty())
                        .partition(|c| completed_set.covers(&c.code));

                    for course in &done {
                        tracing::debug!(
                            "⏭️ Skipping {} for {} - already completed",
                            course.code,
                            entry.slot_key
                        );
                        outcome.completed_skipped.push(course.code.clone());
                    }

                    if remaining.is_empty() {
                        continue;
                    }

                    for course in remaining {
                        if !seen_keys.insert(equivalence_key(&course.code)) {
                            outcome.duplicates_collapsed += 1;
                            continue;
                        }
                        if course.units_defaulted {
                            outcome.defaulted_units.push(course.code.clone());
                        }
                        outcome.available.push(course.clone());
                    }
                }
            }
        }
    }

    tracing::info!(
        "📚 {} courses available after filtering ({} completed skipped, {} exceptions)",
        outcome.available.len(),
        outcome.completed_skipped.len(),
        outcome.exceptions.len()
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CourseOption;
    use rust_decimal::Decimal;

    fn course(code: &str, units: i64) -> Course {
        Course::new(code, "", Decimal::from(units))
    }

    fn single(code: &str, units: i64) -> Articulation {
        Articulation::options(vec![CourseOption::new(vec![course(code, units)])])
    }

    #[test]
    fn test_completed_honors_partner_is_removed() {
        let mut pool = SourcePool::new();
        pool.insert("MATH 1A", single("MATH 1AH", 5));
        pool.insert("PHYS 7A", single("PHYS 4A", 6));

        let outcome = filter_pool(
            &pool,
            &[CompletedCourse::new("math 1a")],
            "De Anza College",
            "UC Berkeley",
        );
        let codes: Vec<&str> = outcome.available.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["PHYS 4A"]);
        assert_eq!(outcome.completed_skipped, vec!["MATH 1AH"]);
    }

    #[test]
    fn test_markers_become_exceptions() {
        let mut pool = SourcePool::new();
        pool.insert("ASTRON 7A", Articulation::NoArticulation);
        pool.insert(
            "COMPSCI 70",
            Articulation::PostTransferOnly {
                code: Some("COMPSCI 70".to_string()),
                title: None,
            },
        );

        let outcome = filter_pool(&pool, &[], "De Anza College", "UC Berkeley");
        assert!(outcome.available.is_empty());
        assert_eq!(outcome.exceptions.len(), 2);
        assert_eq!(outcome.exceptions[0].kind, ExceptionKind::NoArticulation);
        assert!(outcome.exceptions[0].message.contains("No course articulated"));
        assert!(outcome.exceptions[0].message.contains("De Anza College"));
        assert_eq!(
            outcome.exceptions[1].message,
            "COMPSCI 70: This course must be taken at UC Berkeley after transfer"
        );
    }

    #[test]
    fn test_partially_completed_option_keeps_the_rest() {
        let mut pool = SourcePool::new();
        pool.insert(
            "MATH 54",
            Articulation::options(vec![CourseOption::new(vec![
                course("MATH 2A", 5),
                course("MATH 2B", 5),
            ])]),
        );
        let outcome = filter_pool(
            &pool,
            &[CompletedCourse::new("MATH 2A")],
            "Foothill College",
            "UCLA",
        );
        assert_eq!(outcome.available.len(), 1);
        assert_eq!(outcome.available[0].code, "MATH 2B");
    }

    #[test]
    fn test_equivalent_courses_collapse_to_first() {
        let mut pool = SourcePool::new();
        pool.insert(
            "MATH 1A",
            Articulation::options(vec![
                CourseOption::new(vec![course("MATH 1A", 5)]),
                CourseOption::new(vec![course("MATH 1AH", 5)]),
            ]),
        );
        pool.insert("MATH 10A", single("MATH 1A", 5));

        let outcome = filter_pool(&pool, &[], "De Anza College", "UC Davis");
        assert_eq!(outcome.available.len(), 1);
        assert_eq!(outcome.available[0].code, "MATH 1A");
        assert_eq!(outcome.duplicates_collapsed, 2);
    }

    #[test]
    fn test_defaulted_units_are_reported() {
        let mut pool = SourcePool::new();
        pool.insert(
            "HIST 7A",
            Articulation::options(vec![CourseOption::new(vec![Course::with_default_units(
                "HIST 17A",
                "US History",
                Decimal::from(3),
            )])]),
        );
        let outcome = filter_pool(&pool, &[], "De Anza College", "UCLA");
        assert_eq!(outcome.defaulted_units, vec!["HIST 17A"]);
        assert_eq!(outcome.available[0].units, Decimal::from(3));
    }
}
