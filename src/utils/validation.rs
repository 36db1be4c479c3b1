use crate::utils::error::{PlannerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use url::Url;

static ACADEMIC_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{4})$").unwrap());

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PlannerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

fn invalid(field_name: &str, path: &Path, reason: impl Into<String>) -> PlannerError {
    PlannerError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: path.display().to_string(),
        reason: reason.into(),
    }
}

/// An input file (agreement snapshot, completed-course CSV) whose extension
/// is one of `allowed`, compared case-insensitively.
pub fn validate_input_file(field_name: &str, path: &Path, allowed: &[&str]) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| invalid(field_name, path, "File has no extension or invalid filename"))?;

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(invalid(
            field_name,
            path,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Where a schedule is written: a `.json` file, not a directory.
pub fn validate_schedule_output(field_name: &str, path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    if raw.is_empty() || raw.ends_with('/') || raw.ends_with('\\') {
        return Err(invalid(field_name, path, "Output must name a file"));
    }
    if raw.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    validate_input_file(field_name, path, &["json"])
}

/// `"YYYY-YYYY"` with consecutive years, as agreements are published.
pub fn validate_academic_year(field_name: &str, value: &str) -> Result<()> {
    let consecutive = ACADEMIC_YEAR
        .captures(value.trim())
        .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, caps[2].parse::<u32>().ok()?)))
        .map(|(start, end)| end == start + 1)
        .unwrap_or(false);

    if !consecutive {
        return Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Expected consecutive years like 2024-2025".to_string(),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| PlannerError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PlannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
