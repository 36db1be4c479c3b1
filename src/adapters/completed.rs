//! Completed-course records from CSV (`code,term,year,grade`).

use crate::domain::model::CompletedCourse;
use crate::utils::error::Result;
use std::io::Read;
use std::path::Path;

pub fn read_completed_courses<R: Read>(reader: R) -> Result<Vec<CompletedCourse>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut courses = Vec::new();
    for row in csv_reader.deserialize::<CompletedCourse>() {
        let course = row?;
        if course.code.is_empty() {
            continue;
        }
        courses.push(course);
    }

    tracing::debug!("Loaded {} completed courses", courses.len());
    Ok(courses)
}

pub fn read_completed_file<P: AsRef<Path>>(path: P) -> Result<Vec<CompletedCourse>> {
    let file = std::fs::File::open(path)?;
    read_completed_courses(file)
}

pub fn read_completed_bytes(data: &[u8]) -> Result<Vec<CompletedCourse>> {
    read_completed_courses(data)
}
