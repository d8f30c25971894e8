//! Hosted record store on PostgreSQL.
//!
//! Schema lives in `migrations/0001_jobflow.sql`: a `jobs` table keyed by
//! `(user_id, id)`, and a one-row-per-user `resumes` table whose lists are
//! `jsonb` arrays.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::models::{Job, JobPatch, Resume};
use crate::persistence::mapping::{
    job_from_record, job_to_record, patch_columns, resume_from_record, resume_to_record,
    ColumnValue, JobRecord, ResumeRecord, JOB_COLUMNS, RESUME_COLUMNS,
};
use crate::persistence::{Persistence, PersistenceError};

#[derive(Clone)]
pub struct PgPersistence {
    pool: PgPool,
}

impl PgPersistence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Persistence for PgPersistence {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_jobs(&self, user_id: &str) -> Result<Vec<Job>, PersistenceError> {
        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(job_from_record).collect())
    }

    async fn fetch_resume(&self, user_id: &str) -> Result<Option<Resume>, PersistenceError> {
        let record = sqlx::query_as::<_, ResumeRecord>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(resume_from_record))
    }

    async fn insert_job(&self, user_id: &str, job: &Job) -> Result<Option<Job>, PersistenceError> {
        let record = job_to_record(user_id, job);
        let canonical = sqlx::query_as::<_, JobRecord>(&format!(
            r#"
            INSERT INTO jobs ({JOB_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.company)
        .bind(record.role)
        .bind(record.status)
        .bind(record.salary)
        .bind(record.location)
        .bind(record.date_applied)
        .bind(record.description)
        .bind(record.cover_letter)
        .bind(record.origin)
        .bind(record.interview_guide)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(job_from_record(canonical)))
    }

    async fn update_job(
        &self,
        user_id: &str,
        job_id: &str,
        patch: &JobPatch,
    ) -> Result<(), PersistenceError> {
        let columns = patch_columns(patch);
        if columns.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE jobs SET ");
        let mut assignments = builder.separated(", ");
        for (column, value) in columns {
            assignments.push(format!("{column} = "));
            match value {
                ColumnValue::Text(text) => assignments.push_bind_unseparated(text),
                ColumnValue::Date(date) => assignments.push_bind_unseparated(date),
            };
        }
        builder
            .push(" WHERE id = ")
            .push_bind(job_id)
            .push(" AND user_id = ")
            .push_bind(user_id);

        let result = builder.build().execute(&self.pool).await?;
        debug!(
            "Updated job {job_id} for user {user_id} ({} row(s))",
            result.rows_affected()
        );
        Ok(())
    }

    async fn delete_job(&self, user_id: &str, job_id: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
            .bind(job_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_resume(&self, user_id: &str, resume: &Resume) -> Result<(), PersistenceError> {
        let record = resume_to_record(user_id, resume);
        sqlx::query(&format!(
            r#"
            INSERT INTO resumes ({RESUME_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                location = EXCLUDED.location,
                linkedin = EXCLUDED.linkedin,
                website = EXCLUDED.website,
                summary = EXCLUDED.summary,
                skills = EXCLUDED.skills,
                avatar = EXCLUDED.avatar,
                experience = EXCLUDED.experience,
                education = EXCLUDED.education,
                projects = EXCLUDED.projects,
                updated_at = NOW()
            "#
        ))
        .bind(record.user_id)
        .bind(record.full_name)
        .bind(record.email)
        .bind(record.phone)
        .bind(record.location)
        .bind(record.linkedin)
        .bind(record.website)
        .bind(record.summary)
        .bind(record.skills)
        .bind(record.avatar)
        .bind(record.experience)
        .bind(record.education)
        .bind(record.projects)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    const SCHEMA: &str = include_str!("../../migrations/0001_jobflow.sql");

    fn jobs_table() -> &'static str {
        let start = SCHEMA.find("CREATE TABLE IF NOT EXISTS jobs").unwrap();
        let end = start + SCHEMA[start..].find(");").unwrap();
        &SCHEMA[start..end]
    }

    #[test]
    fn test_job_ids_are_scoped_per_user() {
        let table = jobs_table();
        assert!(table.contains("PRIMARY KEY (user_id, id)"));
        assert!(!table.contains("id              TEXT PRIMARY KEY"));
    }
}
