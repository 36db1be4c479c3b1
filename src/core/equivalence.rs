//! Course-code identity: normalization, honors equivalence and subjects.
//!
//! A code ending in `H` is the honors variant of the code without it. Both
//! variants share one equivalence key, so completing either removes both.

use crate::domain::model::CompletedCourse;
use std::collections::HashSet;

/// Upper-cases, trims and collapses inner whitespace.
pub fn normalize_code(code: &str) -> String {
    code.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

pub fn is_honors(code: &str) -> bool {
    let normalized = normalize_code(code);
    normalized.len() > 1 && normalized.ends_with('H') && !normalized.ends_with(" H")
}

/// The non-honors form of a code.
pub fn equivalence_key(code: &str) -> String {
    let normalized = normalize_code(code);
    if is_honors(&normalized) {
        normalized[..normalized.len() - 1].to_string()
    } else {
        normalized
    }
}

/// The other member of a code's honors pair.
pub fn equivalence_partner(code: &str) -> String {
    let normalized = normalize_code(code);
    if is_honors(&normalized) {
        normalized[..normalized.len() - 1].to_string()
    } else {
        format!("{}H", normalized)
    }
}

/// Subject prefix of a code: everything before the first digit ("MATH" from "MATH 1A").
pub fn subject_of(code: &str) -> String {
    let normalized = normalize_code(code);
    let prefix: String = normalized
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .collect();
    let prefix = prefix.trim();
    if prefix.is_empty() {
        "UNKNOWN".to_string()
    } else {
        prefix.to_string()
    }
}

/// Completed courses indexed by equivalence key.
#[derive(Debug, Clone, Default)]
pub struct CompletedSet {
    keys: HashSet<String>,
}

impl CompletedSet {
    pub fn from_completed(completed: &[CompletedCourse]) -> Self {
        let keys = completed
            .iter()
            .map(|c| c.code.trim())
            .filter(|code| !code.is_empty())
            .map(equivalence_key)
            .collect();
        Self { keys }
    }

    pub fn covers(&self, code: &str) -> bool {
        self.keys.contains(&equivalence_key(code))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
