use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Bucket, CourseRollup, EnrollmentRecord, FundingModel, RevenueSummary, StatusCount};

#[derive(Default)]
struct CourseAccumulator<'a> {
    description: &'a str,
    records: usize,
    students: BTreeSet<&'a str>,
    credits: f64,
}

/// Roll a bucket's records up by course and compute its revenue.
///
/// Credit-based buckets earn `credits * rate`. Per-student buckets earn
/// `unique students * rate` at the bucket level, while each course is credited
/// with its own enrolled students; a student in two courses shows up in both
/// course rows but is billed once for the bucket.
pub fn aggregate(bucket: Bucket, records: &[EnrollmentRecord], model: &FundingModel) -> RevenueSummary {
    let mut courses: BTreeMap<&str, CourseAccumulator> = BTreeMap::new();
    let mut student_ids: BTreeSet<String> = BTreeSet::new();

    for record in records {
        let course = courses.entry(record.course_code.as_str()).or_default();
        if course.description.is_empty() {
            course.description = record.course_description.as_str();
        }
        course.records += 1;
        course.credits += record.credits();

        if let Some(student) = record.student_key() {
            course.students.insert(student);
            if !student_ids.contains(student) {
                student_ids.insert(student.to_string());
            }
        }
    }

    let course_breakdown = courses
        .into_iter()
        .map(|(code, course)| {
            let (credits, revenue) = match model {
                FundingModel::CreditBased { rate_per_credit } => {
                    (Some(course.credits), course.credits * rate_per_credit)
                }
                FundingModel::PerStudent { rate_per_student } => {
                    (None, course.students.len() as f64 * rate_per_student)
                }
            };

            CourseRollup {
                course_code: code.to_string(),
                course_description: course.description.to_string(),
                records: course.records,
                unique_students: course.students.len(),
                credits,
                revenue,
            }
        })
        .collect::<Vec<_>>();

    let (total_credits, revenue) = match model {
        FundingModel::CreditBased { rate_per_credit } => {
            let credits: f64 = course_breakdown
                .iter()
                .filter_map(|course| course.credits)
                .sum();
            (Some(credits), credits * rate_per_credit)
        }
        FundingModel::PerStudent { rate_per_student } => {
            (None, student_ids.len() as f64 * rate_per_student)
        }
    };

    RevenueSummary {
        bucket,
        total_records: records.len(),
        unique_students: student_ids.len(),
        total_credits,
        revenue,
        course_breakdown,
        status_breakdown: status_breakdown(records),
        records: records.to_vec(),
        student_ids,
    }
}

/// Count records per `statusValue`; percentages are of the bucket's record count.
pub fn status_breakdown(records: &[EnrollmentRecord]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.status_value.as_str()).or_insert(0) += 1;
    }

    let total = records.len();
    let mut breakdown: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status_value, count)| StatusCount {
            status_value: status_value.to_string(),
            count,
            percent: percent(count, total),
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.status_value.cmp(&b.status_value))
    });
    breakdown
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
    }
}
