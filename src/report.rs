use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{aggregate, percent};
use crate::classify::{ClassificationDiagnostics, Classifier};
use crate::models::{Bucket, CombinedReport, EnrollmentRecord, FundingModel, FundingTotals, RevenueSummary};
use crate::settings::Settings;

/// Everything the reporting layer needs for one funding model over one input set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
    pub model: FundingModel,
    pub completed: RevenueSummary,
    pub active: RevenueSummary,
    pub not_funded: RevenueSummary,
    pub combined: CombinedReport,
    pub unclassified_records: usize,
    pub diagnostics: ClassificationDiagnostics,
}

impl FundingSummary {
    pub fn bucket(&self, bucket: Bucket) -> &RevenueSummary {
        match bucket {
            Bucket::Completed => &self.completed,
            Bucket::Active => &self.active,
            Bucket::NotFunded => &self.not_funded,
        }
    }
}

/// Merge the three bucket summaries into funded and not-funded totals.
///
/// Funded students are deduplicated across completed and active, so a student
/// with one completed and one active course counts once.
pub fn assemble(
    completed: &RevenueSummary,
    active: &RevenueSummary,
    not_funded: &RevenueSummary,
) -> CombinedReport {
    let funded_students: BTreeSet<&str> = completed
        .student_ids
        .iter()
        .chain(active.student_ids.iter())
        .map(String::as_str)
        .collect();
    let all_students: BTreeSet<&str> = funded_students
        .iter()
        .copied()
        .chain(not_funded.student_ids.iter().map(String::as_str))
        .collect();

    let funded = FundingTotals {
        records: completed.total_records + active.total_records,
        unique_students: funded_students.len(),
        revenue: completed.revenue + active.revenue,
    };
    let not_funded_totals = FundingTotals {
        records: not_funded.total_records,
        unique_students: not_funded.unique_students,
        revenue: not_funded.revenue,
    };

    CombinedReport {
        funded,
        not_funded: not_funded_totals,
        total_revenue: funded.revenue,
        completed_revenue: completed.revenue,
        active_revenue: active.revenue,
        not_funded_revenue: not_funded.revenue,
        not_funded_unique_students: not_funded.unique_students,
        total_distinct_students: all_students.len(),
        percent_funded: percent(funded_students.len(), all_students.len()),
    }
}

pub fn summarize_with(
    classifier: &Classifier,
    records: &[EnrollmentRecord],
    model: &FundingModel,
) -> FundingSummary {
    let classification = classifier.classify(records, model);
    let completed = aggregate(Bucket::Completed, &classification.completed, model);
    let active = aggregate(Bucket::Active, &classification.active, model);
    let not_funded = aggregate(Bucket::NotFunded, &classification.not_funded, model);
    let combined = assemble(&completed, &active, &not_funded);

    FundingSummary {
        model: *model,
        unclassified_records: classification.unclassified_count(),
        completed,
        active,
        not_funded,
        combined,
        diagnostics: classification.diagnostics,
    }
}

/// Classify, aggregate and assemble with the default status labels.
pub fn summarize(records: &[EnrollmentRecord], model: &FundingModel) -> FundingSummary {
    summarize_with(&Classifier::default(), records, model)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTypeSummary {
    pub student_type: String,
    pub summary: FundingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermReport {
    pub total_records: usize,
    pub student_types: Vec<StudentTypeSummary>,
    /// Records whose student type has no funding entry.
    pub unmatched_records: usize,
}

impl TermReport {
    pub fn student_type(&self, student_type: &str) -> Option<&FundingSummary> {
        let student_type = student_type.trim();
        self.student_types
            .iter()
            .find(|entry| entry.student_type == student_type)
            .map(|entry| &entry.summary)
    }
}

/// Split a term's records by student type and summarize each configured type.
/// When a student type is configured twice, the first entry wins.
pub fn build_term_report(records: &[EnrollmentRecord], settings: &Settings) -> TermReport {
    let classifier = Classifier::new(settings.rules.clone());
    let mut seen = BTreeSet::new();
    let mut student_types = Vec::new();

    for entry in &settings.funding {
        let student_type = entry.student_type.trim();
        if !seen.insert(student_type) {
            tracing::warn!(student_type, "ignoring duplicate funding entry");
            continue;
        }

        let subset: Vec<EnrollmentRecord> = records
            .iter()
            .filter(|record| record.student_type.trim() == student_type)
            .cloned()
            .collect();
        if subset.is_empty() {
            continue;
        }

        student_types.push(StudentTypeSummary {
            student_type: student_type.to_string(),
            summary: summarize_with(&classifier, &subset, &entry.funding_model()),
        });
    }

    let unmatched_records = records
        .iter()
        .filter(|record| !seen.contains(record.student_type.trim()))
        .count();
    if unmatched_records > 0 {
        tracing::warn!(
            count = unmatched_records,
            "records have a student type with no funding entry"
        );
    }

    TermReport {
        total_records: records.len(),
        student_types,
        unmatched_records,
    }
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

fn status_label(status_value: &str) -> &str {
    if status_value.is_empty() {
        "(blank)"
    } else {
        status_value
    }
}

pub fn build_report(term: Option<&str>, generated_on: NaiveDate, report: &TermReport) -> String {
    let mut output = String::new();
    let term_label = term.unwrap_or("all terms");

    let _ = writeln!(output, "# Enrollment Funding Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} records)",
        term_label, generated_on, report.total_records
    );

    if report.student_types.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No enrollment records matched a funded student type.");
    }

    for entry in &report.student_types {
        write_student_type(&mut output, &entry.student_type, &entry.summary);
    }

    if report.unmatched_records > 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Unmatched Records");
        let _ = writeln!(
            output,
            "- {} records have a student type with no funding entry",
            report.unmatched_records
        );
    }

    output
}

fn write_student_type(output: &mut String, student_type: &str, summary: &FundingSummary) {
    let combined = &summary.combined;
    let credit_based = matches!(summary.model, FundingModel::CreditBased { .. });

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## {} ({}, {} rate)",
        student_type,
        summary.model.label(),
        money(summary.model.rate())
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- Funded revenue: {} (completed {}, active {})",
        money(combined.total_revenue),
        money(combined.completed_revenue),
        money(combined.active_revenue)
    );
    let _ = writeln!(
        output,
        "- Not funded: {} across {} students",
        money(combined.not_funded_revenue),
        combined.not_funded_unique_students
    );
    let _ = writeln!(
        output,
        "- Percent funded: {:.1}% of {} students",
        combined.percent_funded, combined.total_distinct_students
    );

    let _ = writeln!(output);
    if credit_based {
        let _ = writeln!(output, "| Bucket | Records | Students | Credits | Revenue |");
        let _ = writeln!(output, "|---|---|---|---|---|");
    } else {
        let _ = writeln!(output, "| Bucket | Records | Students | Revenue |");
        let _ = writeln!(output, "|---|---|---|---|");
    }
    for bucket in Bucket::ALL {
        let bucket_summary = summary.bucket(bucket);
        match bucket_summary.total_credits {
            Some(credits) => {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} | {} | {} |",
                    bucket,
                    bucket_summary.total_records,
                    bucket_summary.unique_students,
                    credits,
                    money(bucket_summary.revenue)
                );
            }
            None => {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} | {} |",
                    bucket,
                    bucket_summary.total_records,
                    bucket_summary.unique_students,
                    money(bucket_summary.revenue)
                );
            }
        }
    }

    for bucket in Bucket::ALL {
        let bucket_summary = summary.bucket(bucket);
        if bucket_summary.total_records == 0 {
            continue;
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### {} Courses", bucket);
        if !credit_based {
            let _ = writeln!(
                output,
                "Course revenue counts each enrolled student per course and does not sum to the bucket total."
            );
        }
        for course in &bucket_summary.course_breakdown {
            let _ = writeln!(
                output,
                "- {} {}: {} records, {} students, {}",
                course.course_code,
                course.course_description,
                course.records,
                course.unique_students,
                money(course.revenue)
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### {} Status Mix", bucket);
        for status in &bucket_summary.status_breakdown {
            let _ = writeln!(
                output,
                "- {}: {} records ({:.1}%)",
                status_label(&status.status_value),
                status.count,
                status.percent
            );
        }
    }

    if summary.unclassified_records > 0 || summary.diagnostics.missing_student_id > 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Diagnostics");
        if summary.unclassified_records > 0 {
            let _ = writeln!(
                output,
                "- {} records matched no funding bucket",
                summary.unclassified_records
            );
        }
        if summary.diagnostics.missing_student_id > 0 {
            let _ = writeln!(
                output,
                "- {} records without a student id were counted as not funded",
                summary.diagnostics.missing_student_id
            );
        }
    }
}
