use std::io;

use serde::Serialize;

use crate::error::FundingError;
use crate::models::EnrollmentRecord;

/// One flat export row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Student ID")]
    pub student_id: String,
    #[serde(rename = "Course Code")]
    pub course_code: String,
    #[serde(rename = "Course Description")]
    pub course_description: String,
    #[serde(rename = "Credits Attempted")]
    pub credits_attempted: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Status Value")]
    pub status_value: String,
    #[serde(rename = "Student Type")]
    pub student_type: String,
}

impl From<&EnrollmentRecord> for ExportRow {
    fn from(record: &EnrollmentRecord) -> Self {
        ExportRow {
            student_id: record.student_id.clone().unwrap_or_default(),
            course_code: record.course_code.clone(),
            course_description: record.course_description.clone(),
            credits_attempted: record
                .credits_attempted
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            status: record.status.clone(),
            status_value: record.status_value.clone(),
            student_type: record.student_type.clone(),
        }
    }
}

pub fn export_rows(records: &[EnrollmentRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

/// Write `records` as CSV with a header row. Returns the number of data rows.
pub fn write_csv<W: io::Write>(writer: W, records: &[EnrollmentRecord]) -> Result<usize, FundingError> {
    let mut writer = csv::Writer::from_writer(writer);
    let rows = export_rows(records);
    if rows.is_empty() {
        writer.write_record([
            "Student ID",
            "Course Code",
            "Course Description",
            "Credits Attempted",
            "Status",
            "Status Value",
            "Student Type",
        ])?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(FundingError::Write)?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreditsAttempted;

    fn sample() -> EnrollmentRecord {
        EnrollmentRecord {
            student_id: Some("S-1001".to_string()),
            course_code: "ENG101".to_string(),
            course_description: "Composition, Part I".to_string(),
            credits_attempted: Some(CreditsAttempted::Number(3.0)),
            status: "Active".to_string(),
            status_value: "In Progress".to_string(),
            student_type: "Part Time".to_string(),
        }
    }

    #[test]
    fn row_projects_every_field() {
        let row = ExportRow::from(&sample());
        assert_eq!(row.student_id, "S-1001");
        assert_eq!(row.credits_attempted, "3");
        assert_eq!(row.student_type, "Part Time");
    }

    #[test]
    fn missing_values_become_empty_cells() {
        let record = EnrollmentRecord {
            student_id: None,
            credits_attempted: None,
            ..sample()
        };
        let row = ExportRow::from(&record);
        assert_eq!(row.student_id, "");
        assert_eq!(row.credits_attempted, "");
    }

    #[test]
    fn raw_credit_text_is_preserved() {
        let record = EnrollmentRecord {
            credits_attempted: Some(CreditsAttempted::Text("three".to_string())),
            ..sample()
        };
        assert_eq!(ExportRow::from(&record).credits_attempted, "three");
    }

    #[test]
    fn csv_has_header_in_field_order() {
        let mut buffer = Vec::new();
        let written = write_csv(&mut buffer, &[sample()]).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Student ID,Course Code,Course Description,Credits Attempted,Status,Status Value,Student Type")
        );
        assert_eq!(
            lines.next(),
            Some("S-1001,ENG101,\"Composition, Part I\",3,Active,In Progress,Part Time")
        );
        assert_eq!(lines.next(), None);
    }

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn failed_flush_is_a_write_error() {
        let err = write_csv(BrokenPipe, &[sample()]).unwrap_err();
        assert!(matches!(err, FundingError::Write(ref source) if source.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(err.to_string(), "failed to write output");
    }

    #[test]
    fn empty_bucket_still_writes_header() {
        let mut buffer = Vec::new();
        assert_eq!(write_csv(&mut buffer, &[]).unwrap(), 0);
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Student ID,Course Code"));
    }
}
