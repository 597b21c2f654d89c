use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw `creditsAttempted` value as it arrived from the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreditsAttempted {
    Number(f64),
    Text(String),
    /// Booleans, arrays or objects; kept for export, worth 0 credits.
    Other(serde_json::Value),
}

impl CreditsAttempted {
    /// Lenient numeric value: unparseable or non-finite input counts as 0.
    pub fn value(&self) -> f64 {
        let parsed = match self {
            CreditsAttempted::Number(value) => *value,
            CreditsAttempted::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
            CreditsAttempted::Other(_) => 0.0,
        };

        if parsed.is_finite() {
            parsed
        } else {
            0.0
        }
    }
}

impl fmt::Display for CreditsAttempted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditsAttempted::Number(value) => write!(f, "{value}"),
            CreditsAttempted::Text(text) => f.write_str(text),
            CreditsAttempted::Other(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollmentRecord {
    #[serde(deserialize_with = "opaque_id")]
    pub student_id: Option<String>,
    pub course_code: String,
    pub course_description: String,
    pub credits_attempted: Option<CreditsAttempted>,
    pub status: String,
    pub status_value: String,
    pub student_type: String,
}

/// Student ids are opaque: numeric ids in JSON sources are kept as their text,
/// and values that cannot name a student read as absent.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
        Other(serde::de::IgnoredAny),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.and_then(|raw| match raw {
        RawId::Text(text) => Some(text),
        RawId::Integer(value) => Some(value.to_string()),
        RawId::Float(value) => Some(value.to_string()),
        RawId::Other(_) => None,
    }))
}

impl EnrollmentRecord {
    pub fn credits(&self) -> f64 {
        self.credits_attempted
            .as_ref()
            .map(CreditsAttempted::value)
            .unwrap_or(0.0)
    }

    /// Student id with surrounding whitespace removed; blank ids read as absent.
    pub fn student_key(&self) -> Option<&str> {
        self.student_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Completed,
    Active,
    NotFunded,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Completed, Bucket::Active, Bucket::NotFunded];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Completed => "Completed",
            Bucket::Active => "Active",
            Bucket::NotFunded => "Not Funded",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a student type is funded, with the rate supplied by configuration.
///
/// `CreditBased` classifies record by record and pays per credit attempted.
/// `PerStudent` classifies whole students and pays a flat amount per unique
/// student for the term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FundingModel {
    #[serde(rename_all = "camelCase")]
    CreditBased { rate_per_credit: f64 },
    #[serde(rename_all = "camelCase")]
    PerStudent { rate_per_student: f64 },
}

impl FundingModel {
    pub fn rate(&self) -> f64 {
        match self {
            FundingModel::CreditBased { rate_per_credit } => *rate_per_credit,
            FundingModel::PerStudent { rate_per_student } => *rate_per_student,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FundingModel::CreditBased { .. } => "credit-based",
            FundingModel::PerStudent { .. } => "per-student",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRollup {
    pub course_code: String,
    pub course_description: String,
    pub records: usize,
    pub unique_students: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    /// Per-student courses bill each enrolled student here, so these figures
    /// do not add up to the bucket revenue.
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status_value: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub bucket: Bucket,
    pub total_records: usize,
    pub unique_students: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_credits: Option<f64>,
    pub revenue: f64,
    pub course_breakdown: Vec<CourseRollup>,
    pub status_breakdown: Vec<StatusCount>,
    pub records: Vec<EnrollmentRecord>,
    #[serde(skip)]
    pub student_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingTotals {
    pub records: usize,
    pub unique_students: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReport {
    pub funded: FundingTotals,
    pub not_funded: FundingTotals,
    pub total_revenue: f64,
    pub completed_revenue: f64,
    pub active_revenue: f64,
    pub not_funded_revenue: f64,
    pub not_funded_unique_students: usize,
    pub total_distinct_students: usize,
    pub percent_funded: f64,
}
