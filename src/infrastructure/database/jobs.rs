use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::domain::{Job, JobResult};
use crate::infrastructure::error::AppResult;

/// Stockage des jobs d'exécution
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> AppResult<Job>;
    async fn find_job(&self, id: Uuid) -> AppResult<Option<Job>>;
    async fn list_jobs(&self, user_id: Uuid) -> AppResult<Vec<Job>>;
    async fn update_job(&self, job: &Job) -> AppResult<Job>;
    /// Enregistre le résultat et le nouvel état du job dans la même transaction
    async fn save_job_result(&self, job: &Job, result: &JobResult) -> AppResult<()>;
    async fn find_job_result(&self, job_id: Uuid) -> AppResult<Option<JobResult>>;
}

const JOB_COLUMNS: &str = "id, user_id, app_version_id, platform, device, name, job_type, status, \
     priority, input_data, error_message, submitted_at, started_at, completed_at, created_at, updated_at";

const RESULT_COLUMNS: &str =
    "id, job_id, result_data, execution_time_ms, shots, success_rate, fidelity, created_at";

const UPDATE_JOB_SQL: &str = "UPDATE jobs SET status = $2, error_message = $3, submitted_at = $4, \
     started_at = $5, completed_at = $6, updated_at = $7 WHERE id = $1";

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(&self, job: &Job) -> AppResult<Job> {
        let sql = format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(job.id)
            .bind(job.user_id)
            .bind(job.app_version_id)
            .bind(&job.platform)
            .bind(&job.device)
            .bind(&job.name)
            .bind(job.job_type)
            .bind(job.status)
            .bind(job.priority)
            .bind(&job.input_data)
            .bind(&job.error_message)
            .bind(job.submitted_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_job(&self, id: Uuid) -> AppResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_jobs(&self, user_id: Uuid) -> AppResult<Vec<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = $1 ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_job(&self, job: &Job) -> AppResult<Job> {
        let sql = format!("{UPDATE_JOB_SQL} RETURNING {JOB_COLUMNS}");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(job.id)
            .bind(job.status)
            .bind(&job.error_message)
            .bind(job.submitted_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_job_result(&self, job: &Job, result: &JobResult) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(UPDATE_JOB_SQL)
            .bind(job.id)
            .bind(job.status)
            .bind(&job.error_message)
            .bind(job.submitted_at)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(job.updated_at)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO job_results ({RESULT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(result.id)
            .bind(result.job_id)
            .bind(&result.result_data)
            .bind(result.execution_time_ms)
            .bind(result.shots)
            .bind(result.success_rate)
            .bind(result.fidelity)
            .bind(result.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_job_result(&self, job_id: Uuid) -> AppResult<Option<JobResult>> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM job_results WHERE job_id = $1");
        Ok(sqlx::query_as::<_, JobResult>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
