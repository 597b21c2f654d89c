use std::io::Write;

use enrollment_funding::settings::Settings;
use enrollment_funding::source::{load_csv, load_json};
use enrollment_funding::{build_term_report, write_csv, Bucket};

const ENROLLMENTS: &str = "\
studentId,courseCode,courseDescription,creditsAttempted,status,statusValue,studentType
P1,ENG101,Composition,1,Active,In Progress,Part Time
P2,MTH201,Algebra,2,Active,In Progress,Part Time
P3,SCI110,Biology,3,Active,In Progress,Part Time
F1,ENG101,Composition,3,Completed,Passed,Full Time
F1,MTH201,Algebra,3,Active,In Progress,Full Time
F2,SCI110,Biology,4,Active,In Progress,Full Time
F3,ART100,Drawing,3,Withdrawn,has-not-started,Full Time
";

#[test]
fn csv_file_drives_a_term_report() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ENROLLMENTS.as_bytes()).unwrap();

    let records = load_csv(file.path()).unwrap();
    let report = build_term_report(&records, &Settings::default());
    assert_eq!(report.total_records, 7);
    assert_eq!(report.unmatched_records, 0);

    let part_time = report.student_type("Part Time").unwrap();
    assert!((part_time.completed.revenue - 107.0).abs() < 1e-9);
    assert!((part_time.active.revenue - 535.0).abs() < 1e-9);

    let full_time = report.student_type("Full Time").unwrap();
    assert_eq!(full_time.completed.total_records, 2);
    assert!((full_time.completed.revenue - 650.0).abs() < 1e-9);
    assert!((full_time.active.revenue - 650.0).abs() < 1e-9);
    assert!((full_time.combined.total_revenue - 1300.0).abs() < 1e-9);
    assert_eq!(full_time.combined.not_funded_unique_students, 1);
    assert!((full_time.combined.percent_funded - 200.0 / 3.0).abs() < 1e-9);
}

#[test]
fn exported_bucket_reimports_unchanged() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ENROLLMENTS.as_bytes()).unwrap();
    let records = load_csv(file.path()).unwrap();
    let report = build_term_report(&records, &Settings::default());
    let completed = &report.student_type("Full Time").unwrap().bucket(Bucket::Completed).records;

    let exported = tempfile::NamedTempFile::new().unwrap();
    let written = write_csv(exported.reopen().unwrap(), completed).unwrap();
    assert_eq!(written, 2);

    let reimported = load_csv(exported.path()).unwrap();
    assert_eq!(&reimported, completed);
}

#[test]
fn json_file_with_custom_settings() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"[
            {"studentId": "A1", "courseCode": "GED100", "creditsAttempted": "2", "status": "Enrolled", "statusValue": "Attending", "studentType": "Adult Ed"},
            {"studentId": "A2", "courseCode": "GED100", "creditsAttempted": 2, "status": "Enrolled", "statusValue": "No Show", "studentType": "Adult Ed"}
        ]"#,
    )
    .unwrap();

    let settings = Settings::from_toml_str(
        r#"
        [[funding]]
        student_type = "Adult Ed"
        model = "credit-based"
        rate = 50.0

        [rules]
        active_status = "Enrolled"
        unfunded_markers = ["No Show"]
        "#,
    )
    .unwrap();

    let records = load_json(file.path()).unwrap();
    let report = build_term_report(&records, &settings);
    let adult_ed = report.student_type("Adult Ed").unwrap();
    assert_eq!(adult_ed.active.total_records, 1);
    assert_eq!(adult_ed.not_funded.total_records, 1);
    assert!((adult_ed.active.revenue - 100.0).abs() < 1e-9);
    assert!((adult_ed.combined.percent_funded - 50.0).abs() < 1e-9);
}
