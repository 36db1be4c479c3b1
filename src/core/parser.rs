//! Turns a rendered articulation report into a [`RequirementModel`].
//!
//! The report is a tree of group containers. Each top-level group is
//! classified by its heading text:
//!
//! - `"<n> Complete the following"` is a sequence of required slots,
//! - `"<n> Complete A or B"` with lettered branch containers is a choice,
//! - a group headed `"HIGHLY RECOMMENDED"` holds nested choices.
//!
//! Inside a group every articulation row pairs a receiving-side course line
//! (the target requirement) with the sending-side course lines that satisfy it.
//! Groups matching no shape are skipped and recorded as diagnostics.

use crate::domain::model::{
    Articulation, ChoiceBranch, Course, CourseOption, Diagnostic, RequirementModel,
    RequirementSection, RequirementSlot, SectionStructure, SourcePool,
};
use crate::domain::ports::{DocumentTree, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_UNITS: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

const GROUP: &str = "groupContainer";
const SUBSECTION: &str = "sectionContainer";
const BRANCH: &str = "sectionMain";
const ROW: &str = "articRow";
const RECEIVING: &str = "rowReceiving";
const SENDING: &str = "rowSending";
const BRACKET: &str = "bracketWrapper";
const COURSE_LINE: &str = "courseLine";
const CODE: &str = "prefixCourseNumber";
const CODE_FALLBACK: &str = "courseCode";

static SEQUENCE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*complete the following").unwrap());
static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*complete\b").unwrap());
static BRANCH_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)complete\s+([A-Z](?:\s*(?:,|or)\s*[A-Z])+)\b").unwrap());
static ADVISORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*HIGHLY\s+RECOMMENDED\b").unwrap());
static UNITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*units?").unwrap());
static NO_ARTICULATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no\s+course\s+articulated").unwrap());
static POST_TRANSFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)must\s+be\s+(?:taken|completed)\s+at\s+(?:the\s+)?university").unwrap()
});

/// Code, title and raw units read from one course line.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseLineFields {
    pub code: String,
    pub title: String,
    pub units: Option<Decimal>,
}

/// Reads `(code, title, units)` from a course-line element.
///
/// Returns `None` when the line has no code element; such a line cannot be
/// part of an option.
pub fn extract_course_line<T: DocumentTree + ?Sized>(
    tree: &T,
    line: NodeId,
) -> Option<CourseLineFields> {
    let code_node = first_descendant(tree, line, &|n| tree.has_class(n, CODE)).or_else(|| {
        first_descendant(tree, line, &|n| {
            tree.attr_of(n, "class")
                .map(|c| c.contains(CODE_FALLBACK))
                .unwrap_or(false)
        })
    })?;

    let code = tree.text_of(code_node).trim().to_string();
    if code.is_empty() {
        return None;
    }

    let full_text = tree.text_of(line);
    let remaining = if full_text.contains(&code) {
        full_text.replacen(&code, "", 1).trim().to_string()
    } else {
        String::new()
    };

    let (title, units) = match UNITS.captures(&remaining) {
        Some(caps) => {
            let span = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let title = remaining[..span]
                .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—'))
                .trim()
                .to_string();
            let units = caps
                .get(1)
                .and_then(|m| Decimal::from_str(m.as_str()).ok())
                .map(|d| d.normalize());
            (title, units)
        }
        None => (remaining, None),
    };

    Some(CourseLineFields { code, title, units })
}

/// Agreement parser. Holds only configuration; every call starts from scratch.
#[derive(Debug, Clone)]
pub struct AgreementParser {
    default_units: Decimal,
}

impl Default for AgreementParser {
    fn default() -> Self {
        Self {
            default_units: DEFAULT_UNITS,
        }
    }
}

impl AgreementParser {
    pub fn new(default_units: Decimal) -> Self {
        Self { default_units }
    }

    pub fn default_units(&self) -> Decimal {
        self.default_units
    }

    pub fn parse<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        academic_year: &str,
        source_institution: &str,
        target_institution: &str,
        major: &str,
    ) -> RequirementModel {
        let mut run = ParseRun {
            tree,
            default_units: self.default_units,
            diagnostics: Vec::new(),
            rows: HashMap::new(),
        };

        let root = tree.root();
        let mut sections = Vec::new();
        for group in top_level(tree, root, GROUP) {
            if let Some(section) = run.classify_group(group) {
                sections.push(section);
            }
        }

        let source_pool = run.build_source_pool(root);

        tracing::info!(
            "📑 Parsed {} sections and {} source-pool slots for {} ({} → {})",
            sections.len(),
            source_pool.len(),
            major,
            source_institution,
            target_institution
        );
        if sections.is_empty() {
            tracing::warn!("⚠️ No recognizable requirement sections in agreement for {}", major);
        }

        RequirementModel {
            academic_year: academic_year.to_string(),
            source_institution: source_institution.to_string(),
            target_institution: target_institution.to_string(),
            major: major.to_string(),
            sections,
            source_pool,
            diagnostics: run.diagnostics,
        }
    }
}

/// Convenience wrapper using the default unit fallback.
pub fn parse<T: DocumentTree + ?Sized>(
    tree: &T,
    academic_year: &str,
    source_institution: &str,
    target_institution: &str,
    major: &str,
) -> RequirementModel {
    AgreementParser::default().parse(
        tree,
        academic_year,
        source_institution,
        target_institution,
        major,
    )
}

struct ParseRun<'t, T: DocumentTree + ?Sized> {
    tree: &'t T,
    default_units: Decimal,
    diagnostics: Vec<Diagnostic>,
    // 每列只解析一次，避免重複記錄單位預設
    rows: HashMap<NodeId, Option<RequirementSlot>>,
}

impl<'t, T: DocumentTree + ?Sized> ParseRun<'t, T> {
    fn classify_group(&mut self, group: NodeId) -> Option<RequirementSection> {
        let text = self.tree.text_of(group);

        if ADVISORY.is_match(&text) {
            return self.parse_recommended(group);
        }

        if let Some(caps) = SEQUENCE_HEADING.captures(&text) {
            let number = caps[1].to_string();
            let slots = self.slots_in(group);
            if slots.is_empty() {
                self.diagnostics.push(Diagnostic::EmptySection {
                    title: format!("{} Complete the following", number),
                });
                return None;
            }
            return Some(RequirementSection {
                number,
                title: "Complete the following".to_string(),
                structure: SectionStructure::Sequence { slots },
            });
        }

        if let Some(caps) = NUMBERED_HEADING.captures(&text) {
            let number = caps[1].to_string();
            let lettered = BRANCH_MARKERS.is_match(&text);
            let branch_count = top_level(self.tree, group, BRANCH).len();
            if lettered || branch_count >= 2 {
                return self.parse_choice(group, number, &text);
            }
        }

        tracing::debug!("Skipping unrecognized group: {}", heading_of(&text));
        self.diagnostics.push(Diagnostic::UnrecognizedSection {
            heading: heading_of(&text),
        });
        None
    }

    fn parse_choice(
        &mut self,
        container: NodeId,
        number: String,
        text: &str,
    ) -> Option<RequirementSection> {
        let title = BRANCH_MARKERS
            .captures(text)
            .map(|caps| format!("Complete {}", &caps[1]))
            .unwrap_or_else(|| "Complete one of the following".to_string());

        let branches = self.branches_in(container);
        if branches.is_empty() {
            self.diagnostics.push(Diagnostic::EmptySection {
                title: format!("{} {}", number, title),
            });
            return None;
        }

        Some(RequirementSection {
            number,
            title,
            structure: SectionStructure::Choice { branches },
        })
    }

    fn branches_in(&mut self, container: NodeId) -> Vec<ChoiceBranch> {
        let mut candidates = top_level(self.tree, container, BRANCH);
        if candidates.is_empty() {
            // 沒有分支容器時，改用含有課程列的直接子節點
            candidates = self
                .tree
                .children_of(container)
                .into_iter()
                .filter(|child| !descendants(self.tree, *child, COURSE_LINE).is_empty())
                .collect();
        }

        let mut branches = Vec::new();
        let mut letter = b'A';
        for candidate in candidates {
            let slots = self.slots_in(candidate);
            if slots.is_empty() || letter > b'Z' {
                continue;
            }
            branches.push(ChoiceBranch {
                letter: letter as char,
                slots,
            });
            letter += 1;
        }
        branches
    }

    fn parse_recommended(&mut self, group: NodeId) -> Option<RequirementSection> {
        let mut containers = top_level(self.tree, group, SUBSECTION);
        if containers.is_empty() {
            containers = top_level(self.tree, group, GROUP);
        }

        let mut subsections = Vec::new();
        for container in containers {
            let text = self.tree.text_of(container);
            let Some(caps) = NUMBERED_HEADING.captures(&text) else {
                continue;
            };
            let number = caps[1].to_string();
            if let Some(subsection) = self.parse_choice(container, number, &text) {
                subsections.push(subsection);
            }
        }

        if subsections.is_empty() {
            self.diagnostics.push(Diagnostic::EmptySection {
                title: "Highly Recommended".to_string(),
            });
            return None;
        }

        Some(RequirementSection {
            number: "HIGHLY_RECOMMENDED".to_string(),
            title: "Highly Recommended".to_string(),
            structure: SectionStructure::Recommended { subsections },
        })
    }

    /// Slots of every articulation row under `container`; bare receiving
    /// course lines become slots without options.
    fn slots_in(&mut self, container: NodeId) -> Vec<RequirementSlot> {
        let rows = descendants(self.tree, container, ROW);
        if !rows.is_empty() {
            return rows.into_iter().filter_map(|row| self.slot_for_row(row)).collect();
        }

        receiving_lines(self.tree, container)
            .into_iter()
            .filter_map(|line| self.course_at(line))
            .map(|course| RequirementSlot {
                targets: vec![course],
                articulation: Articulation::options(Vec::new()),
            })
            .collect()
    }

    fn slot_for_row(&mut self, row: NodeId) -> Option<RequirementSlot> {
        if let Some(cached) = self.rows.get(&row) {
            return cached.clone();
        }

        let slot = self.read_row(row);
        self.rows.insert(row, slot.clone());
        slot
    }

    fn read_row(&mut self, row: NodeId) -> Option<RequirementSlot> {
        let receiving = first_descendant(self.tree, row, &|n| self.tree.has_class(n, RECEIVING))?;
        let targets: Vec<Course> = descendants(self.tree, receiving, COURSE_LINE)
            .into_iter()
            .filter_map(|line| self.course_at(line))
            .collect();
        if targets.is_empty() {
            return None;
        }

        let articulation = self.sending_articulation(row, &targets[0]);
        Some(RequirementSlot {
            targets,
            articulation,
        })
    }

    fn sending_articulation(&mut self, row: NodeId, target: &Course) -> Articulation {
        let Some(sending) = first_descendant(self.tree, row, &|n| self.tree.has_class(n, SENDING))
        else {
            return Articulation::options(Vec::new());
        };

        let brackets = top_level(self.tree, sending, BRACKET);
        let groups = if brackets.is_empty() {
            vec![sending]
        } else {
            brackets
        };

        let mut options = Vec::new();
        for group in groups {
            let courses: Vec<Course> = descendants(self.tree, group, COURSE_LINE)
                .into_iter()
                .filter_map(|line| self.course_at(line))
                .collect();
            if !courses.is_empty() {
                options.push(CourseOption::new(courses));
            }
        }

        if options.is_empty() {
            // 只有在沒有可修課程時才看「轉學後修」的註記
            let text = self.tree.text_of(sending);
            if POST_TRANSFER.is_match(&text) {
                return Articulation::PostTransferOnly {
                    code: Some(target.code.clone()),
                    title: Some(target.title.clone()).filter(|t| !t.is_empty()),
                };
            }
            if !NO_ARTICULATION.is_match(&text) {
                tracing::debug!(
                    "No sending-side course for {}; treating as not articulated",
                    target.code
                );
            }
            return Articulation::NoArticulation;
        }

        Articulation::options(options)
    }

    fn course_at(&mut self, line: NodeId) -> Option<Course> {
        let fields = extract_course_line(self.tree, line)?;
        match fields.units.filter(|u| *u > Decimal::ZERO) {
            Some(units) => Some(Course::new(fields.code, fields.title, units)),
            None => {
                tracing::warn!(
                    "⚠️ No units found for {}, defaulting to {} units",
                    fields.code,
                    self.default_units
                );
                self.diagnostics.push(Diagnostic::UnitDefaulted {
                    code: fields.code.clone(),
                    units: self.default_units,
                });
                Some(Course::with_default_units(
                    fields.code,
                    fields.title,
                    self.default_units,
                ))
            }
        }
    }

    /// Every row in the document, keyed by its first receiving course.
    fn build_source_pool(&mut self, root: NodeId) -> SourcePool {
        let mut pool = SourcePool::new();
        for row in descendants(self.tree, root, ROW) {
            if let Some(slot) = self.slot_for_row(row) {
                let key = slot.key().to_string();
                pool.insert(key, slot.articulation);
            }
        }
        pool
    }
}

fn heading_of(text: &str) -> String {
    text.chars().take(60).collect()
}

/// Preorder search below `node` (excluding it).
fn first_descendant<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    matches: &dyn Fn(NodeId) -> bool,
) -> Option<NodeId> {
    for child in tree.children_of(node) {
        if matches(child) {
            return Some(child);
        }
        if let Some(found) = first_descendant(tree, child, matches) {
            return Some(found);
        }
    }
    None
}

/// All descendants carrying `class`, in document order.
fn descendants<T: DocumentTree + ?Sized>(tree: &T, node: NodeId, class: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    collect(tree, node, class, false, &mut found);
    found
}

/// Descendants carrying `class` that are not nested inside another match.
fn top_level<T: DocumentTree + ?Sized>(tree: &T, node: NodeId, class: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    collect(tree, node, class, true, &mut found);
    found
}

fn collect<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    class: &str,
    stop_at_match: bool,
    found: &mut Vec<NodeId>,
) {
    for child in tree.children_of(node) {
        let matched = tree.has_class(child, class);
        if matched {
            found.push(child);
        }
        if !(matched && stop_at_match) {
            collect(tree, child, class, stop_at_match, found);
        }
    }
}

/// Course lines under `node` that sit inside a receiving-side row.
fn receiving_lines<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    collect_receiving(tree, node, false, &mut found);
    found
}

fn collect_receiving<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    inside_receiving: bool,
    found: &mut Vec<NodeId>,
) {
    for child in tree.children_of(node) {
        let inside = inside_receiving || tree.has_class(child, RECEIVING);
        if inside && tree.has_class(child, COURSE_LINE) {
            found.push(child);
        }
        collect_receiving(tree, child, inside, found);
    }
}
