//! Plain-text rendering of a parsed agreement.

use crate::domain::model::{
    Articulation, Course, Diagnostic, RequirementModel, RequirementSection, RequirementSlot,
    SectionStructure,
};
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

pub fn format_requirements(model: &RequirementModel) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{} COURSE REQUIREMENTS", model.source_institution.to_uppercase());
    let _ = writeln!(out, "For {}", model.major);
    let _ = writeln!(out, "Transfer to: {}", model.target_institution);
    let _ = writeln!(out, "Academic Year: {}", model.academic_year);
    let _ = writeln!(out, "{}", rule);

    if model.sections.is_empty() {
        let _ = writeln!(out, "No course requirements found in the articulation agreement.");
    }

    for section in &model.sections {
        write_section(&mut out, section, "");
    }

    if !model.diagnostics.is_empty() {
        let _ = writeln!(out, "\nNotes:");
        for diagnostic in &model.diagnostics {
            let _ = writeln!(out, "   ! {}", describe(diagnostic));
        }
    }

    let _ = writeln!(out, "{}", rule);
    out
}

fn write_section(out: &mut String, section: &RequirementSection, indent: &str) {
    let _ = writeln!(out, "\n{}{}. {}", indent, section.number, section.title);
    let _ = writeln!(out, "{}{}", indent, "-".repeat(RULE_WIDTH - 10));

    match &section.structure {
        SectionStructure::Sequence { slots } => {
            let _ = writeln!(out, "{}Required courses:", indent);
            for slot in slots {
                write_slot(out, slot, &format!("{}   ", indent));
            }
        }
        SectionStructure::Choice { branches } => {
            let _ = writeln!(out, "{}Choose one of the following options:", indent);
            for branch in branches {
                let _ = writeln!(out, "\n{}   Option {}:", indent, branch.letter);
                for slot in &branch.slots {
                    write_slot(out, slot, &format!("{}      ", indent));
                }
                if branch.slots.len() > 1 {
                    let _ = writeln!(out, "{}        (Take ALL courses in this option)", indent);
                }
            }
        }
        SectionStructure::Recommended { subsections } => {
            let _ = writeln!(out, "{}Recommended, not required:", indent);
            for subsection in subsections {
                write_section(out, subsection, &format!("{}   ", indent));
            }
        }
    }
}

fn write_slot(out: &mut String, slot: &RequirementSlot, indent: &str) {
    let targets: Vec<String> = slot.targets.iter().map(course_label).collect();
    let _ = writeln!(out, "{}• {}", indent, targets.join(" + "));

    match &slot.articulation {
        Articulation::Options { options } if options.is_empty() => {}
        Articulation::Options { options } => {
            let alternatives: Vec<String> = options
                .iter()
                .map(|o| {
                    o.courses
                        .iter()
                        .map(course_label)
                        .collect::<Vec<_>>()
                        .join(" and ")
                })
                .collect();
            let _ = writeln!(out, "{}    ← {}", indent, alternatives.join("  or  "));
        }
        Articulation::NoArticulation => {
            let _ = writeln!(out, "{}    ← No Course Articulated", indent);
        }
        Articulation::PostTransferOnly { .. } => {
            let _ = writeln!(out, "{}    ← Must be taken after transfer", indent);
        }
    }
}

fn course_label(course: &Course) -> String {
    let mut label = course.code.clone();
    if !course.title.is_empty() {
        label.push_str(" - ");
        label.push_str(&course.title);
    }
    if course.units_defaulted {
        let _ = write!(label, " ({} units, assumed)", course.units.normalize());
    } else {
        let _ = write!(label, " ({} units)", course.units.normalize());
    }
    label
}

fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::UnrecognizedSection { heading } => {
            format!("skipped unrecognized section \"{}\"", heading)
        }
        Diagnostic::EmptySection { title } => format!("dropped empty section \"{}\"", title),
        Diagnostic::UnitDefaulted { code, units } => {
            format!("{} has no unit value, assumed {}", code, units.normalize())
        }
    }
}
