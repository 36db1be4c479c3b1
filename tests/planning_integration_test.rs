use anyhow::Result;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;
use transfer_planner::adapters::completed::read_completed_file;
use transfer_planner::adapters::element_tree::{ElementNode, ElementTree};
use transfer_planner::core::equivalence::{equivalence_partner, subject_of};
use transfer_planner::core::filter::FilterOutcome;
use transfer_planner::core::parser::parse;
use transfer_planner::core::report::format_requirements;
use transfer_planner::core::selector::{select_term, SelectionPolicy};
use transfer_planner::domain::model::{
    Articulation, CompletedCourse, Course, Diagnostic, PlanningContext, SectionStructure,
};
use transfer_planner::{PlanRequest, PlanSource, PlannerError, PlanningEngine};

const AGREEMENT: &str = include_str!("fixtures/agreement.json");

fn tree() -> ElementTree {
    ElementTree::from_json_str(AGREEMENT).expect("fixture should parse")
}

fn request(completed: &[&str]) -> PlanRequest {
    PlanRequest {
        academic_year: "2024-2025".to_string(),
        source_institution: "de anza".to_string(),
        target_institution: "ucb".to_string(),
        major: "cs".to_string(),
        completed: completed.iter().map(|c| CompletedCourse::new(*c)).collect(),
        target_units: Decimal::from(15),
        term_label: "Fall 2025".to_string(),
    }
}

#[test]
fn test_fixture_parses_every_section_shape() {
    let model = parse(
        &tree(),
        "2024-2025",
        "De Anza College",
        "University of California, Berkeley",
        "Computer Science",
    );

    let shapes: Vec<&str> = model
        .sections
        .iter()
        .map(|s| match &s.structure {
            SectionStructure::Sequence { .. } => "sequence",
            SectionStructure::Choice { .. } => "choice",
            SectionStructure::Recommended { .. } => "recommended",
        })
        .collect();
    assert_eq!(shapes, vec!["sequence", "choice", "sequence", "recommended"]);

    assert_eq!(
        model.source_pool.get("COMPSCI 70"),
        Some(&Articulation::NoArticulation)
    );
    assert!(matches!(
        model.source_pool.get("COMPSCI 61B"),
        Some(Articulation::PostTransferOnly { .. })
    ));
    assert!(model
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnrecognizedSection { .. })));
    assert!(model
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnitDefaulted { code, .. } if code == "MATH 10")));
    assert!(model
        .source_pool
        .entries()
        .iter()
        .all(|e| !e.slot_key.trim().is_empty()));

    let report = format_requirements(&model);
    assert!(report.contains("Option A:"));
    assert!(report.contains("MATH 1AH - Honors Calculus I (5 units)"));
}

#[test]
fn test_sequence_round_trip_keeps_codes_and_units() {
    let line = |code: &str, rest: &str| {
        ElementNode::div().with_class("courseLine").with_children([
            ElementNode::div().with_class("prefixCourseNumber").with_text(code),
            ElementNode::div().with_text(rest),
        ])
    };
    let row = |target: &str, source: &str, units: &str| {
        ElementNode::div().with_class("articRow").with_children([
            ElementNode::div()
                .with_class("rowReceiving")
                .with_child(line(target, "Target 4 units")),
            ElementNode::div()
                .with_class("rowSending")
                .with_child(line(source, &format!("Source {} units", units))),
        ])
    };
    let doc = ElementNode::div().with_child(
        ElementNode::div().with_class("groupContainer").with_children([
            ElementNode::div().with_text("1 Complete the following"),
            row("CHEM 1A", "CHEM 1A", "5"),
            row("CHEM 1B", "CHEM 1B", "4.5"),
        ]),
    );

    let model = parse(&ElementTree::new(doc), "2024-2025", "A", "B", "Chemistry");
    let flattened: Vec<(String, Decimal)> = model
        .source_pool
        .flattened_courses()
        .into_iter()
        .map(|c| (c.code.clone(), c.units))
        .collect();
    assert_eq!(
        flattened,
        vec![
            ("CHEM 1A".to_string(), Decimal::from(5)),
            ("CHEM 1B".to_string(), "4.5".parse::<Decimal>().unwrap()),
        ]
    );
}

#[tokio::test]
async fn test_end_to_end_plan_from_fixture() -> Result<()> {
    let engine = PlanningEngine::default();
    let outcome = engine.plan(&request(&[]), &tree()).await?;

    assert_eq!(outcome.source, PlanSource::Deterministic);
    assert!(outcome.generator_failure.is_none());
    assert_eq!(outcome.model.source_institution, "De Anza College");
    assert_eq!(
        outcome.model.target_institution,
        "University of California, Berkeley"
    );
    assert_eq!(outcome.model.major, "Computer Science");

    let plan = &outcome.plan;
    assert_eq!(plan.codes(), vec!["MATH 1A", "PHYS 4A", "ENGL 1A"]);
    assert_eq!(plan.total_units, plan.units_sum());
    assert_eq!(plan.total_units, Decimal::from(16));
    assert_eq!(plan.warnings.len(), 3);
    assert!(plan
        .warnings
        .iter()
        .any(|w| w.contains("No course articulated") && w.contains("De Anza College")));
    Ok(())
}

#[tokio::test]
async fn test_completed_honors_course_excludes_both_variants() -> Result<()> {
    let engine = PlanningEngine::default();
    let outcome = engine.plan(&request(&["math 1ah"]), &tree()).await?;

    let codes = outcome.plan.codes();
    assert!(!codes.contains(&"MATH 1A"));
    assert!(!codes.contains(&"MATH 1AH"));
    for code in codes {
        assert_ne!(equivalence_partner(code), "MATH 1AH");
    }
    Ok(())
}

#[tokio::test]
async fn test_everything_completed_is_no_available_courses() -> Result<()> {
    let engine = PlanningEngine::default();
    let result = engine
        .plan(
            &request(&["MATH 1A", "MATH 1B", "PHYS 4A", "ENGL 1A", "CIS 22A", "MATH 10"]),
            &tree(),
        )
        .await;

    match result {
        Err(PlannerError::NoAvailableCourses {
            major,
            source_institution,
            ..
        }) => {
            assert_eq!(major, "Computer Science");
            assert_eq!(source_institution, "De Anza College");
        }
        other => panic!("expected NoAvailableCourses, got {:?}", other.map(|o| o.plan)),
    }
    Ok(())
}

#[test]
fn test_scenario_a_selection_order() {
    let filtered = FilterOutcome {
        available: [("MATH 1A", 5), ("MATH 1B", 5), ("PHYS 4A", 4), ("ENGL 1A", 4)]
            .iter()
            .map(|(code, units)| Course::new(*code, "", Decimal::from(*units)))
            .collect(),
        ..FilterOutcome::default()
    };
    let context = PlanningContext {
        term_label: "Fall 2025".to_string(),
        source_institution: "De Anza College".to_string(),
        target_institution: "University of California, Berkeley".to_string(),
        major: "Mathematics".to_string(),
        target_units: Decimal::from(15),
    };

    let plan = select_term(&filtered, &context, &SelectionPolicy::default());
    assert_eq!(plan.codes(), vec!["MATH 1A", "PHYS 4A", "ENGL 1A"]);
    assert!(plan.total_units >= Decimal::from(13));

    let mut subjects: Vec<String> = plan.codes().iter().map(|c| subject_of(c)).collect();
    subjects.sort();
    subjects.dedup();
    assert_eq!(subjects.len(), plan.courses.len());
}

#[tokio::test]
async fn test_completed_courses_from_csv() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "code,term,year,grade")?;
    writeln!(file, "MATH 1A,Fall,2024,A")?;
    writeln!(file, "PHYS 4A,Winter,2025,B+")?;

    let completed = read_completed_file(file.path())?;
    let mut req = request(&[]);
    req.completed = completed;

    let outcome = PlanningEngine::default().plan(&req, &tree()).await?;
    let codes = outcome.plan.codes();
    assert!(!codes.contains(&"MATH 1A"));
    assert!(!codes.contains(&"PHYS 4A"));
    assert_eq!(codes[0], "MATH 1B");
    Ok(())
}
