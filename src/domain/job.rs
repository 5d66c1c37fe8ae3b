use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::infrastructure::error::AppError;

/// Mode d'exécution d'un job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Simulation,
    Hardware,
    Hybrid,
}

/// État d'un job d'exécution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,    // Créé, pas encore soumis
    Queued,     // En attente sur la plateforme
    Running,    // En cours d'exécution
    Completed,  // Terminé avec succès
    Failed,     // Échec
    Cancelled,  // Annulé par l'utilisateur
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Priorité d'un job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Exécution d'une version d'application sur une plateforme
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub app_version_id: Uuid,

    /// Plateforme cible (simulateur, fournisseur cloud...)
    pub platform: String,
    pub device: Option<String>,
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub input_data: Option<Value>,
    pub error_message: Option<String>,

    pub submitted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(user_id: Uuid, app_version_id: Uuid, platform: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            app_version_id,
            platform,
            device: None,
            name: None,
            job_type: JobType::default(),
            status: JobStatus::Created,
            priority: JobPriority::default(),
            input_data: None,
            error_message: None,
            submitted_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn require(&self, allowed: &[JobStatus], next: JobStatus) -> Result<(), AppError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Cannot move job from {} to {}",
                self.status.as_str(),
                next.as_str()
            )))
        }
    }

    /// Soumet le job à la plateforme
    pub fn queue(&mut self) -> Result<(), AppError> {
        self.require(&[JobStatus::Created], JobStatus::Queued)?;
        let now = Utc::now();
        self.status = JobStatus::Queued;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Démarre l'exécution
    pub fn start(&mut self) -> Result<(), AppError> {
        self.require(&[JobStatus::Queued], JobStatus::Running)?;
        let now = Utc::now();
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Termine avec succès
    pub fn complete(&mut self) -> Result<(), AppError> {
        self.require(&[JobStatus::Running], JobStatus::Completed)?;
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Marque comme échoué
    pub fn fail(&mut self, error: String) -> Result<(), AppError> {
        self.require(&[JobStatus::Queued, JobStatus::Running], JobStatus::Failed)?;
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Annule le job
    pub fn cancel(&mut self) -> Result<(), AppError> {
        self.require(
            &[JobStatus::Created, JobStatus::Queued, JobStatus::Running],
            JobStatus::Cancelled,
        )?;
        let now = Utc::now();
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Durée d'exécution en millisecondes, si le job a démarré et s'est terminé
    pub fn execution_time_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some((completed - started).num_milliseconds()),
            _ => None,
        }
    }
}

/// Résultat d'un job terminé
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobResult {
    pub id: Uuid,
    pub job_id: Uuid,
    pub result_data: Value,
    pub execution_time_ms: Option<i64>,
    pub shots: Option<i32>,
    pub success_rate: Option<f64>,
    pub fidelity: Option<f64>,
    pub created_at: DateTime<Utc>,
}
