// core/job_service.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{AppVersion, AppVisibility, Job, JobPriority, JobResult, JobStatus, JobType};
use crate::infrastructure::database::{AppStore, Database, JobStore};
use crate::infrastructure::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    pub app_version_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "La plateforme est requise"))]
    pub platform: String,
    pub device: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub job_type: JobType,
    #[serde(default)]
    pub priority: JobPriority,
    pub input_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobStatusRequest {
    pub status: JobStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResultRequest {
    pub result_data: Value,
    #[validate(range(min = 1, message = "Le nombre de shots doit être positif"))]
    pub shots: Option<i32>,
    #[validate(range(min = 0.0, max = 1.0, message = "Le taux de succès doit être compris entre 0 et 1"))]
    pub success_rate: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0, message = "La fidélité doit être comprise entre 0 et 1"))]
    pub fidelity: Option<f64>,
}

/// Job accompagné de son résultat éventuel
#[derive(Debug, Serialize)]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: Job,
    pub result: Option<JobResult>,
}

/// Suivi des exécutions d'applications
pub struct JobService {
    db: Database,
}

impl JobService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: Uuid, request: CreateJobRequest) -> AppResult<Job> {
        request.validate()?;

        self.runnable_version(user_id, request.app_version_id).await?;

        let mut job = Job::new(user_id, request.app_version_id, request.platform);
        job.device = request.device;
        job.name = request.name;
        job.job_type = request.job_type;
        job.priority = request.priority;
        job.input_data = request.input_data;

        let job = self.db.create_job(&job).await?;
        info!("🧪 Job {} créé sur {}", job.id, job.platform);
        Ok(job)
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Job>> {
        self.db.list_jobs(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<JobDetails> {
        let job = self.owned(user_id, id).await?;
        let result = self.db.find_job_result(job.id).await?;
        Ok(JobDetails { job, result })
    }

    pub async fn cancel(&self, user_id: Uuid, id: Uuid) -> AppResult<Job> {
        let mut job = self.owned(user_id, id).await?;
        job.cancel()?;
        let job = self.db.update_job(&job).await?;
        info!("🚫 Job {} annulé", job.id);
        Ok(job)
    }

    /// Fait avancer le job dans son cycle de vie
    pub async fn update_status(&self, user_id: Uuid, id: Uuid, request: UpdateJobStatusRequest) -> AppResult<Job> {
        let mut job = self.owned(user_id, id).await?;

        match request.status {
            JobStatus::Queued => job.queue()?,
            JobStatus::Running => job.start()?,
            JobStatus::Completed => job.complete()?,
            JobStatus::Failed => {
                let message = request
                    .error_message
                    .unwrap_or_else(|| "Job failed".to_string());
                warn!("❌ Job {} en échec: {}", job.id, message);
                job.fail(message)?
            }
            JobStatus::Cancelled => job.cancel()?,
            JobStatus::Created => {
                return Err(AppError::BadRequest(format!(
                    "Cannot move job from {} to created",
                    job.status.as_str()
                )))
            }
        }

        let job = self.db.update_job(&job).await?;
        info!("🔄 Job {} passé en {}", job.id, job.status.as_str());
        Ok(job)
    }

    /// Termine un job en cours et enregistre son résultat
    pub async fn submit_result(&self, user_id: Uuid, id: Uuid, request: SubmitResultRequest) -> AppResult<JobDetails> {
        request.validate()?;
        let mut job = self.owned(user_id, id).await?;
        job.complete()?;

        let result = JobResult {
            id: Uuid::new_v4(),
            job_id: job.id,
            result_data: request.result_data,
            execution_time_ms: job.execution_time_ms(),
            shots: request.shots,
            success_rate: request.success_rate,
            fidelity: request.fidelity,
            created_at: Utc::now(),
        };
        self.db.save_job_result(&job, &result).await?;

        info!("✅ Résultat enregistré pour le job {}", job.id);
        Ok(JobDetails { job, result: Some(result) })
    }

    /// Version exécutable par l'appelant : application à lui ou publique
    async fn runnable_version(&self, user_id: Uuid, version_id: Uuid) -> AppResult<AppVersion> {
        let version = self
            .db
            .find_version(version_id)
            .await?
            .ok_or_else(|| AppError::NotFound("App version".to_string()))?;

        let visible = self
            .db
            .find_app(version.quantum_app_id)
            .await?
            .map(|app| app.developer_id == user_id || app.visibility == AppVisibility::Public)
            .unwrap_or(false);
        if !visible {
            return Err(AppError::NotFound("App version".to_string()));
        }
        Ok(version)
    }

    async fn owned(&self, user_id: Uuid, id: Uuid) -> AppResult<Job> {
        self.db
            .find_job(id)
            .await?
            .filter(|j| j.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Job".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppType, QuantumApp};
    use crate::infrastructure::database::ReleaseRecord;
    use serde_json::json;

    async fn version(db: &Database, developer: Uuid, visibility: AppVisibility) -> AppVersion {
        let mut app = QuantumApp::new(developer, format!("bell-{}", Uuid::new_v4()), AppType::Circuit);
        app.visibility = visibility;
        let version = AppVersion::new(app.id, "1.0.0".into(), "qiskit".into());
        db.save_release(&ReleaseRecord { app, app_is_new: true, version: version.clone(), project: None })
            .await
            .unwrap();
        version
    }

    fn job_request(app_version_id: Uuid) -> CreateJobRequest {
        CreateJobRequest {
            app_version_id,
            platform: "aer_simulator".into(),
            device: None,
            name: Some("bell run".into()),
            job_type: JobType::Simulation,
            priority: JobPriority::High,
            input_data: Some(json!({"shots": 1024})),
        }
    }

    fn status(status: JobStatus) -> UpdateJobStatusRequest {
        UpdateJobStatusRequest { status, error_message: None }
    }

    #[tokio::test]
    async fn test_job_lifecycle_with_result() {
        let db = Database::in_memory();
        let jobs = JobService::new(db.clone());
        let user = Uuid::new_v4();
        let version = version(&db, user, AppVisibility::Private).await;

        let job = jobs.create(user, job_request(version.id)).await.unwrap();
        assert_eq!(job.status, JobStatus::Created);

        jobs.update_status(user, job.id, status(JobStatus::Queued)).await.unwrap();
        jobs.update_status(user, job.id, status(JobStatus::Running)).await.unwrap();

        let done = jobs
            .submit_result(
                user,
                job.id,
                SubmitResultRequest {
                    result_data: json!({"counts": {"00": 512, "11": 512}}),
                    shots: Some(1024),
                    success_rate: Some(1.0),
                    fidelity: Some(0.98),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.job.status, JobStatus::Completed);

        let details = jobs.get(user, job.id).await.unwrap();
        assert_eq!(details.result.and_then(|r| r.shots), Some(1024));
    }

    #[tokio::test]
    async fn test_invalid_transitions_and_ownership() {
        let db = Database::in_memory();
        let jobs = JobService::new(db.clone());
        let user = Uuid::new_v4();
        let version = version(&db, user, AppVisibility::Private).await;
        let job = jobs.create(user, job_request(version.id)).await.unwrap();

        let err = jobs.update_status(user, job.id, status(JobStatus::Completed)).await.unwrap_err();
        assert_eq!(err.client_message(), "Cannot move job from created to completed");
        assert!(matches!(jobs.get(Uuid::new_v4(), job.id).await, Err(AppError::NotFound(_))));

        let cancelled = jobs.cancel(user, job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert!(jobs.cancel(user, job.id).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_records_message() {
        let db = Database::in_memory();
        let jobs = JobService::new(db.clone());
        let user = Uuid::new_v4();
        let version = version(&db, user, AppVisibility::Private).await;
        let job = jobs.create(user, job_request(version.id)).await.unwrap();
        jobs.update_status(user, job.id, status(JobStatus::Queued)).await.unwrap();

        let failed = jobs
            .update_status(
                user,
                job.id,
                UpdateJobStatusRequest { status: JobStatus::Failed, error_message: Some("device offline".into()) },
            )
            .await
            .unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("device offline"));
    }

    #[tokio::test]
    async fn test_private_version_of_another_developer_is_hidden() {
        let db = Database::in_memory();
        let jobs = JobService::new(db.clone());
        let developer = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let private = version(&db, developer, AppVisibility::Private).await;
        let err = jobs.create(stranger, job_request(private.id)).await.unwrap_err();
        assert_eq!(err.client_message(), "App version not found");
        assert!(jobs.list(stranger).await.unwrap().is_empty());

        let public = version(&db, developer, AppVisibility::Public).await;
        let job = jobs.create(stranger, job_request(public.id)).await.unwrap();
        assert_eq!(job.user_id, stranger);
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let jobs = JobService::new(Database::in_memory());
        let err = jobs.create(Uuid::new_v4(), job_request(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
