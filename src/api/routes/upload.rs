//! # Upload multipart
//!
//! Lecture des formulaires `multipart/form-data` utilisés pour les paquets
//! d'applications : un champ fichier (`file`) et des champs texte optionnels
//! (par exemple `release`, contenant du JSON).
//!
//! ## Limites
//! - La taille cumulée des fichiers est bornée par `MAX_UPLOAD_SIZE_MB` (413 au-delà)
//! - Les noms de fichiers sont réduits à leur dernier segment

use actix_multipart::{Field, Multipart};
use futures_util::TryStreamExt;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::infrastructure::error::{AppError, AppResult};

/// Taille maximale d'un champ texte
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Fichier reçu
#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Contenu d'un formulaire multipart
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Premier fichier reçu sous `name`, ou premier fichier tout court
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.field == name)
            .or_else(|| (!self.files.is_empty()).then_some(0))?;
        Some(self.files.remove(index))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Lit tout le formulaire en mémoire
pub async fn read_multipart(mut payload: Multipart, max_bytes: usize) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();
    let mut total = 0usize;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(sanitize_filename);

        match filename {
            Some(filename) => {
                let data = read_field(&mut field, max_bytes, &mut total, || {
                    AppError::PayloadTooLarge(format!(
                        "Package exceeds the maximum size of {} MB",
                        max_bytes / (1024 * 1024)
                    ))
                })
                .await?;
                debug!("📁 Fichier reçu: {} ({} octets)", filename, data.len());
                form.files.push(UploadedFile { field: name, filename, data });
            }
            None => {
                let mut used = 0usize;
                let data = read_field(&mut field, MAX_TEXT_FIELD_BYTES, &mut used, || {
                    AppError::PayloadTooLarge(format!("Field {} is too large", name))
                })
                .await?;
                let value = String::from_utf8(data).map_err(|_| {
                    AppError::BadRequest(format!("Field {} must be valid UTF-8", name))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

async fn read_field(
    field: &mut Field,
    limit: usize,
    used: &mut usize,
    too_large: impl Fn() -> AppError,
) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if *used + chunk.len() > limit {
            warn!("⚠️ Upload refusé: limite de {} octets dépassée", limit);
            return Err(too_large());
        }
        *used += chunk.len();
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const BOUNDARY: &str = "quantum-hub-boundary";

    /// Construit un corps multipart : fichiers `(champ, nom, octets)` puis champs texte
    pub fn multipart_body(files: &[(&str, &str, &[u8])], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (name, filename, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/zip\r\n\r\n",
                    BOUNDARY, name, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub fn content_type() -> (&'static str, String) {
        ("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY))
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/bell.zip"), "bell.zip");
        assert_eq!(sanitize_filename("C:\\tmp\\bell.zip"), "bell.zip");
        assert_eq!(sanitize_filename("bell.zip"), "bell.zip");
    }

    #[test]
    fn test_take_file_prefers_named_field() {
        let mut form = MultipartForm::default();
        form.files.push(UploadedFile { field: "other".into(), filename: "a.zip".into(), data: vec![1] });
        form.files.push(UploadedFile { field: "file".into(), filename: "b.zip".into(), data: vec![2] });

        assert_eq!(form.take_file("file").map(|f| f.filename), Some("b.zip".to_string()));
        assert_eq!(form.take_file("file").map(|f| f.filename), Some("a.zip".to_string()));
        assert!(form.take_file("file").is_none());
    }
}
