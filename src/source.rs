use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::error::FundingError;
use crate::models::{CreditsAttempted, EnrollmentRecord};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "studentId", alias = "Student ID", default)]
    student_id: Option<String>,
    #[serde(rename = "courseCode", alias = "Course Code", default)]
    course_code: Option<String>,
    #[serde(rename = "courseDescription", alias = "Course Description", default)]
    course_description: Option<String>,
    #[serde(rename = "creditsAttempted", alias = "Credits Attempted", default)]
    credits_attempted: Option<String>,
    #[serde(rename = "status", alias = "Status", default)]
    status: Option<String>,
    #[serde(rename = "statusValue", alias = "Status Value", default)]
    status_value: Option<String>,
    #[serde(rename = "studentType", alias = "Student Type", default)]
    student_type: Option<String>,
}

impl From<CsvRow> for EnrollmentRecord {
    fn from(row: CsvRow) -> Self {
        EnrollmentRecord {
            student_id: row.student_id.filter(|id| !id.trim().is_empty()),
            course_code: row.course_code.unwrap_or_default(),
            course_description: row.course_description.unwrap_or_default(),
            credits_attempted: row
                .credits_attempted
                .filter(|credits| !credits.trim().is_empty())
                .map(CreditsAttempted::Text),
            status: row.status.unwrap_or_default(),
            status_value: row.status_value.unwrap_or_default(),
            student_type: row.student_type.unwrap_or_default(),
        }
    }
}

pub fn read_csv<R: io::Read>(reader: R) -> Result<Vec<EnrollmentRecord>, FundingError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        records.push(EnrollmentRecord::from(result?));
    }

    Ok(records)
}

pub fn load_csv(path: &Path) -> Result<Vec<EnrollmentRecord>, FundingError> {
    let file = std::fs::File::open(path).map_err(|err| FundingError::io(path, err))?;
    let records = read_csv(file)?;
    tracing::info!(path = %path.display(), count = records.len(), "loaded enrollment records from CSV");
    Ok(records)
}

pub fn read_json<R: io::Read>(reader: R) -> Result<Vec<EnrollmentRecord>, FundingError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_json(path: &Path) -> Result<Vec<EnrollmentRecord>, FundingError> {
    let file = std::fs::File::open(path).map_err(|err| FundingError::io(path, err))?;
    let records = read_json(io::BufReader::new(file))?;
    tracing::info!(path = %path.display(), count = records.len(), "loaded enrollment records from JSON");
    Ok(records)
}
