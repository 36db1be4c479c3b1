use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A course as listed on an articulation agreement.
///
/// `code` is the identity key; compare codes through
/// [`crate::core::equivalence`] rather than directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub title: String,
    pub units: Decimal,
    /// Set when the unit text could not be read and the default was applied.
    #[serde(default)]
    pub units_defaulted: bool,
}

impl Course {
    pub fn new(code: impl Into<String>, title: impl Into<String>, units: Decimal) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            units,
            units_defaulted: false,
        }
    }

    pub fn with_default_units(
        code: impl Into<String>,
        title: impl Into<String>,
        default_units: Decimal,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            units: default_units,
            units_defaulted: true,
        }
    }
}

/// Courses that together satisfy one slot (AND).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOption {
    pub courses: Vec<Course>,
}

impl CourseOption {
    pub fn new(courses: Vec<Course>) -> Self {
        Self { courses }
    }

    pub fn codes(&self) -> Vec<&str> {
        self.courses.iter().map(|c| c.code.as_str()).collect()
    }
}

/// What the sending institution offers for one receiving-side slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Articulation {
    /// Alternative options (OR); each option is an AND-group.
    Options { options: Vec<CourseOption> },
    /// No source-side course satisfies the slot.
    NoArticulation,
    /// The slot must be fulfilled at the target institution.
    PostTransferOnly {
        code: Option<String>,
        title: Option<String>,
    },
}

impl Articulation {
    pub fn options(options: Vec<CourseOption>) -> Self {
        Articulation::Options { options }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSlot {
    /// Receiving-side courses; the first one keys the slot.
    pub targets: Vec<Course>,
    pub articulation: Articulation,
}

impl RequirementSlot {
    pub fn key(&self) -> &str {
        self.targets
            .first()
            .map(|c| c.code.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceBranch {
    pub letter: char,
    pub slots: Vec<RequirementSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "structure", rename_all = "snake_case")]
pub enum SectionStructure {
    /// Every slot is required.
    Sequence { slots: Vec<RequirementSlot> },
    /// Complete one lettered branch.
    Choice { branches: Vec<ChoiceBranch> },
    /// Advisory only; holds nested choice subsections.
    Recommended { subsections: Vec<RequirementSection> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSection {
    pub number: String,
    pub title: String,
    #[serde(flatten)]
    pub structure: SectionStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub slot_key: String,
    pub articulation: Articulation,
}

/// Source-side courses keyed by slot, kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePool {
    entries: Vec<PoolEntry>,
}

impl SourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot's articulation. A key seen before is not populated twice:
    /// new options are merged into an existing option list, and markers never
    /// replace what is already there.
    pub fn insert(&mut self, slot_key: impl Into<String>, articulation: Articulation) {
        let slot_key = slot_key.into();
        if slot_key.trim().is_empty() {
            return;
        }

        match self.entries.iter_mut().find(|e| e.slot_key == slot_key) {
            None => self.entries.push(PoolEntry {
                slot_key,
                articulation,
            }),
            Some(existing) => {
                if let (
                    Articulation::Options { options: current },
                    Articulation::Options { options: incoming },
                ) = (&mut existing.articulation, articulation)
                {
                    for option in incoming {
                        if !current.contains(&option) {
                            current.push(option);
                        }
                    }
                }
            }
        }
    }

    pub fn get(&self, slot_key: &str) -> Option<&Articulation> {
        self.entries
            .iter()
            .find(|e| e.slot_key == slot_key)
            .map(|e| &e.articulation)
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every course of every option, in pool order.
    pub fn flattened_courses(&self) -> Vec<&Course> {
        self.entries
            .iter()
            .filter_map(|e| match &e.articulation {
                Articulation::Options { options } => Some(options),
                _ => None,
            })
            .flat_map(|options| options.iter().flat_map(|o| o.courses.iter()))
            .collect()
    }
}

/// Recoverable observations made while parsing an agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    UnrecognizedSection { heading: String },
    EmptySection { title: String },
    UnitDefaulted { code: String, units: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementModel {
    pub academic_year: String,
    pub source_institution: String,
    pub target_institution: String,
    pub major: String,
    pub sections: Vec<RequirementSection>,
    pub source_pool: SourcePool,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl RequirementModel {
    /// True when no section shape could be recognized in the document.
    pub fn is_incomplete(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub code: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub grade: Option<String>,
}

impl CompletedCourse {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            term: String::new(),
            year: None,
            grade: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    NoArticulation,
    PostTransferOnly,
}

/// A slot that cannot be satisfied before transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub slot_key: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCourse {
    #[serde(flatten)]
    pub course: Course,
    pub category: String,
    pub reason: String,
}

/// Who, where and how much a single term plan is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    pub term_label: String,
    pub source_institution: String,
    pub target_institution: String,
    pub major: String,
    pub target_units: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermPlan {
    pub term_label: String,
    pub courses: Vec<SelectedCourse>,
    pub total_units: Decimal,
    pub warnings: Vec<String>,
    pub notes: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// A subject was repeated after the repeat threshold was reached.
    #[serde(default)]
    pub diversity_relaxed: bool,
}

impl TermPlan {
    pub fn units_sum(&self) -> Decimal {
        self.courses.iter().map(|c| c.course.units).sum()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.courses.iter().map(|c| c.course.code.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, units: i64) -> Course {
        Course::new(code, format!("{} title", code), Decimal::from(units))
    }

    #[test]
    fn test_source_pool_keeps_first_marker_and_merges_options() {
        let mut pool = SourcePool::new();
        pool.insert(
            "MATH 53",
            Articulation::options(vec![CourseOption::new(vec![course("MATH 1C", 5)])]),
        );
        pool.insert(
            "MATH 53",
            Articulation::options(vec![
                CourseOption::new(vec![course("MATH 1C", 5)]),
                CourseOption::new(vec![course("MATH 1CH", 5)]),
            ]),
        );
        pool.insert("MATH 53", Articulation::NoArticulation);

        assert_eq!(pool.len(), 1);
        match pool.get("MATH 53").unwrap() {
            Articulation::Options { options } => assert_eq!(options.len(), 2),
            other => panic!("unexpected articulation: {:?}", other),
        }
    }

    #[test]
    fn test_source_pool_ignores_empty_keys() {
        let mut pool = SourcePool::new();
        pool.insert("  ", Articulation::NoArticulation);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_term_plan_units_sum() {
        let plan = TermPlan {
            term_label: "Fall 2025".to_string(),
            courses: vec![
                SelectedCourse {
                    course: course("MATH 1A", 5),
                    category: "Transfer Requirement".to_string(),
                    reason: String::new(),
                },
                SelectedCourse {
                    course: Course::new("PHYS 4A", "Physics", "4.5".parse().unwrap()),
                    category: "Transfer Requirement".to_string(),
                    reason: String::new(),
                },
            ],
            total_units: "9.5".parse().unwrap(),
            warnings: vec![],
            notes: String::new(),
            recommendations: vec![],
            diversity_relaxed: false,
        };
        assert_eq!(plan.units_sum(), plan.total_units);
        assert_eq!(plan.codes(), vec!["MATH 1A", "PHYS 4A"]);
    }
}
