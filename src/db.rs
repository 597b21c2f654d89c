use sqlx::{PgPool, Row};

use crate::models::{CreditsAttempted, EnrollmentRecord};

/// Read a term's enrollment records. Credits are cast to text so that the
/// engine applies the same lenient parsing as for file sources.
pub async fn fetch_enrollments(
    pool: &PgPool,
    term: Option<&str>,
) -> anyhow::Result<Vec<EnrollmentRecord>> {
    let mut query = String::from(
        "SELECT e.student_id, e.course_code, e.course_description, \
         e.credits_attempted::text AS credits_attempted, e.status, e.status_value, \
         e.student_type \
         FROM funding.enrollments e",
    );

    if term.is_some() {
        query.push_str(" WHERE e.term = $1");
    }
    query.push_str(" ORDER BY e.student_id, e.course_code");

    let mut rows = sqlx::query(&query);
    if let Some(value) = term {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut enrollments = Vec::with_capacity(records.len());

    for row in records {
        let credits: Option<String> = row.try_get("credits_attempted")?;
        let text = |column: &str| -> anyhow::Result<String> {
            let value: Option<String> = row.try_get(column)?;
            Ok(value.unwrap_or_default())
        };

        enrollments.push(EnrollmentRecord {
            student_id: row.try_get("student_id")?,
            course_code: text("course_code")?,
            course_description: text("course_description")?,
            credits_attempted: credits.map(CreditsAttempted::Text),
            status: text("status")?,
            status_value: text("status_value")?,
            student_type: text("student_type")?,
        });
    }

    tracing::info!(
        term = term.unwrap_or("all"),
        count = enrollments.len(),
        "loaded enrollment records from Postgres"
    );

    Ok(enrollments)
}
