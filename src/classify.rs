use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Bucket, EnrollmentRecord, FundingModel};

pub const DEFAULT_COMPLETED_STATUS: &str = "Completed";
pub const DEFAULT_ACTIVE_STATUS: &str = "Active";
pub const REMOVED_NOT_FUNDED: &str = "removed-not-funded";
pub const HAS_NOT_STARTED: &str = "has-not-started";

/// Status labels the classifier matches against. Matching is exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub completed_status: String,
    pub active_status: String,
    pub unfunded_markers: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            completed_status: DEFAULT_COMPLETED_STATUS.to_string(),
            active_status: DEFAULT_ACTIVE_STATUS.to_string(),
            unfunded_markers: vec![REMOVED_NOT_FUNDED.to_string(), HAS_NOT_STARTED.to_string()],
        }
    }
}

impl ClassificationRules {
    /// A completed status, or exactly one attempted credit, counts as completion.
    pub fn is_completed(&self, record: &EnrollmentRecord) -> bool {
        record.status == self.completed_status || record.credits() == 1.0
    }

    pub fn is_active(&self, record: &EnrollmentRecord) -> bool {
        record.status == self.active_status
    }

    pub fn is_unfunded(&self, record: &EnrollmentRecord) -> bool {
        self.unfunded_markers
            .iter()
            .any(|marker| *marker == record.status_value)
    }

    /// Record-granular rule used by credit-based funding. `None` means no rule matched.
    pub fn record_bucket(&self, record: &EnrollmentRecord) -> Option<Bucket> {
        if self.is_completed(record) {
            Some(Bucket::Completed)
        } else if self.is_active(record) && !self.is_unfunded(record) {
            Some(Bucket::Active)
        } else if self.is_unfunded(record) {
            Some(Bucket::NotFunded)
        } else {
            None
        }
    }

    /// Student-granular rule used by per-student funding.
    pub fn student_bucket<'a, I>(&self, records: I) -> Bucket
    where
        I: IntoIterator<Item = &'a EnrollmentRecord>,
    {
        let mut any_active = false;
        for record in records {
            if self.is_completed(record) {
                return Bucket::Completed;
            }
            any_active |= self.is_active(record);
        }

        if any_active {
            Bucket::Active
        } else {
            Bucket::NotFunded
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationDiagnostics {
    pub total_input: usize,
    /// Credit-based records that matched no rule.
    pub unclassified: Vec<EnrollmentRecord>,
    /// Per-student records without a student id, routed to not funded.
    pub missing_student_id: usize,
}

impl ClassificationDiagnostics {
    pub fn unclassified_count(&self) -> usize {
        self.unclassified.len()
    }

    pub fn has_gaps(&self) -> bool {
        !self.unclassified.is_empty() || self.missing_student_id > 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub completed: Vec<EnrollmentRecord>,
    pub active: Vec<EnrollmentRecord>,
    pub not_funded: Vec<EnrollmentRecord>,
    pub diagnostics: ClassificationDiagnostics,
}

impl Classification {
    pub fn bucket(&self, bucket: Bucket) -> &[EnrollmentRecord] {
        match bucket {
            Bucket::Completed => &self.completed,
            Bucket::Active => &self.active,
            Bucket::NotFunded => &self.not_funded,
        }
    }

    pub fn classified_count(&self) -> usize {
        self.completed.len() + self.active.len() + self.not_funded.len()
    }

    /// `totalInput - (completed + active + notFunded)`.
    pub fn unclassified_count(&self) -> usize {
        self.diagnostics
            .total_input
            .saturating_sub(self.classified_count())
    }

    fn push(&mut self, bucket: Bucket, record: &EnrollmentRecord) {
        let target = match bucket {
            Bucket::Completed => &mut self.completed,
            Bucket::Active => &mut self.active,
            Bucket::NotFunded => &mut self.not_funded,
        };
        target.push(record.clone());
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: ClassificationRules,
}

impl Classifier {
    pub fn new(rules: ClassificationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Partition `records` into completed, active and not-funded buckets.
    /// Buckets keep input order.
    pub fn classify(&self, records: &[EnrollmentRecord], model: &FundingModel) -> Classification {
        let classification = match model {
            FundingModel::CreditBased { .. } => self.classify_by_record(records),
            FundingModel::PerStudent { .. } => self.classify_by_student(records),
        };

        tracing::debug!(
            model = model.label(),
            total = records.len(),
            completed = classification.completed.len(),
            active = classification.active.len(),
            not_funded = classification.not_funded.len(),
            "classified enrollment records"
        );

        let diagnostics = &classification.diagnostics;
        if !diagnostics.unclassified.is_empty() {
            tracing::warn!(
                model = model.label(),
                count = diagnostics.unclassified.len(),
                "records matched no funding bucket"
            );
        }
        if diagnostics.missing_student_id > 0 {
            tracing::warn!(
                model = model.label(),
                count = diagnostics.missing_student_id,
                "records without a student id routed to not funded"
            );
        }

        classification
    }

    fn classify_by_record(&self, records: &[EnrollmentRecord]) -> Classification {
        let mut classification = Classification {
            diagnostics: ClassificationDiagnostics {
                total_input: records.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        for record in records {
            match self.rules.record_bucket(record) {
                Some(bucket) => classification.push(bucket, record),
                None => classification.diagnostics.unclassified.push(record.clone()),
            }
        }

        classification
    }

    fn classify_by_student(&self, records: &[EnrollmentRecord]) -> Classification {
        let mut by_student: BTreeMap<&str, Vec<&EnrollmentRecord>> = BTreeMap::new();
        for record in records {
            if let Some(student) = record.student_key() {
                by_student.entry(student).or_default().push(record);
            }
        }

        let decisions: BTreeMap<&str, Bucket> = by_student
            .into_iter()
            .map(|(student, student_records)| {
                (student, self.rules.student_bucket(student_records))
            })
            .collect();

        let mut classification = Classification {
            diagnostics: ClassificationDiagnostics {
                total_input: records.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        for record in records {
            let bucket = match record.student_key() {
                Some(student) => decisions
                    .get(student)
                    .copied()
                    .unwrap_or(Bucket::NotFunded),
                None => {
                    classification.diagnostics.missing_student_id += 1;
                    Bucket::NotFunded
                }
            };
            classification.push(bucket, record);
        }

        classification
    }
}

/// Classify with the default status labels.
pub fn classify(records: &[EnrollmentRecord], model: &FundingModel) -> Classification {
    Classifier::default().classify(records, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreditsAttempted;

    const CREDIT_BASED: FundingModel = FundingModel::CreditBased {
        rate_per_credit: 107.0,
    };
    const PER_STUDENT: FundingModel = FundingModel::PerStudent {
        rate_per_student: 650.0,
    };

    fn record(student: &str, course: &str, credits: f64, status: &str, status_value: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            student_id: Some(student.to_string()),
            course_code: course.to_string(),
            course_description: format!("{course} description"),
            credits_attempted: Some(CreditsAttempted::Number(credits)),
            status: status.to_string(),
            status_value: status_value.to_string(),
            student_type: "Part Time".to_string(),
        }
    }

    #[test]
    fn single_credit_counts_as_completed() {
        let records = vec![
            record("s1", "ENG101", 1.0, "Active", "In Progress"),
            record("s2", "MTH201", 2.0, "Active", "In Progress"),
        ];

        let result = classify(&records, &CREDIT_BASED);
        assert_eq!(result.completed.len(), 1);
        assert_eq!(result.completed[0].course_code, "ENG101");
        assert_eq!(result.active.len(), 1);
        assert!(result.not_funded.is_empty());
    }

    #[test]
    fn text_credit_of_one_counts_as_completed() {
        let mut single = record("s1", "ENG101", 0.0, "Withdrawn", "Dropped");
        single.credits_attempted = Some(CreditsAttempted::Text(" 1 ".to_string()));

        let result = classify(&[single], &CREDIT_BASED);
        assert_eq!(result.completed.len(), 1);
    }

    #[test]
    fn unfunded_marker_overrides_active() {
        let records = vec![
            record("s1", "ENG101", 3.0, "Active", REMOVED_NOT_FUNDED),
            record("s2", "ENG101", 3.0, "Pending", HAS_NOT_STARTED),
        ];

        let result = classify(&records, &CREDIT_BASED);
        assert!(result.active.is_empty());
        assert_eq!(result.not_funded.len(), 2);
    }

    #[test]
    fn completed_takes_precedence_over_unfunded_marker() {
        let records = vec![record("s1", "ENG101", 3.0, "Completed", HAS_NOT_STARTED)];

        let result = classify(&records, &CREDIT_BASED);
        assert_eq!(result.completed.len(), 1);
        assert!(result.not_funded.is_empty());
    }

    #[test]
    fn unmatched_records_are_reported_not_dropped() {
        let records = vec![
            record("s1", "ENG101", 3.0, "Withdrawn", "Dropped"),
            record("s2", "ENG101", 3.0, "Active", "In Progress"),
        ];

        let result = classify(&records, &CREDIT_BASED);
        assert_eq!(result.classified_count(), 1);
        assert_eq!(result.unclassified_count(), 1);
        assert_eq!(result.diagnostics.unclassified_count(), 1);
        assert_eq!(result.diagnostics.unclassified[0].status, "Withdrawn");
    }

    #[test]
    fn completed_course_moves_whole_student() {
        let records = vec![
            record("s1", "ENG101", 3.0, "Active", "In Progress"),
            record("s1", "MTH201", 3.0, "Completed", "Passed"),
            record("s1", "SCI110", 4.0, "Active", "In Progress"),
            record("s2", "ENG101", 3.0, "Active", "In Progress"),
        ];

        let result = classify(&records, &PER_STUDENT);
        assert_eq!(result.completed.len(), 3);
        assert!(result.completed.iter().all(|r| r.student_id.as_deref() == Some("s1")));
        assert_eq!(result.active.len(), 1);
        assert!(result.not_funded.is_empty());
        assert_eq!(result.unclassified_count(), 0);
    }

    #[test]
    fn per_student_active_ignores_unfunded_marker() {
        let records = vec![
            record("s1", "ENG101", 3.0, "Active", REMOVED_NOT_FUNDED),
            record("s2", "ENG101", 3.0, "Withdrawn", "Dropped"),
        ];

        let result = classify(&records, &PER_STUDENT);
        assert_eq!(result.active.len(), 1);
        assert_eq!(result.not_funded.len(), 1);
        assert_eq!(result.not_funded[0].student_id.as_deref(), Some("s2"));
    }

    #[test]
    fn missing_student_id_is_flagged_for_per_student() {
        let mut orphan = record("", "ENG101", 1.0, "Completed", "Passed");
        orphan.student_id = None;
        let blank = record("   ", "ENG101", 3.0, "Active", "In Progress");

        let result = classify(&[orphan, blank], &PER_STUDENT);
        assert_eq!(result.not_funded.len(), 2);
        assert_eq!(result.diagnostics.missing_student_id, 2);
        assert!(result.diagnostics.has_gaps());
    }

    #[test]
    fn missing_student_id_still_classified_for_credit_based() {
        let mut orphan = record("", "ENG101", 3.0, "Active", "In Progress");
        orphan.student_id = None;

        let result = classify(&[orphan], &CREDIT_BASED);
        assert_eq!(result.active.len(), 1);
        assert_eq!(result.diagnostics.missing_student_id, 0);
    }

    #[test]
    fn custom_labels_are_respected() {
        let classifier = Classifier::new(ClassificationRules {
            completed_status: "Finished".to_string(),
            active_status: "Enrolled".to_string(),
            unfunded_markers: vec!["Dropped - Unfunded".to_string()],
        });
        let records = vec![
            record("s1", "ENG101", 3.0, "Finished", "Passed"),
            record("s2", "ENG101", 3.0, "Enrolled", "In Progress"),
            record("s3", "ENG101", 3.0, "Enrolled", "Dropped - Unfunded"),
            record("s4", "ENG101", 3.0, "Completed", "Passed"),
        ];

        let result = classifier.classify(&records, &CREDIT_BASED);
        assert_eq!(result.completed.len(), 1);
        assert_eq!(result.active.len(), 1);
        assert_eq!(result.not_funded.len(), 1);
        assert_eq!(result.unclassified_count(), 1);
    }
}
