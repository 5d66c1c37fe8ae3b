// utils/validation.rs
use crate::infrastructure::error::{AppError, AppResult};
use std::borrow::Cow;
use validator::ValidationError;

/// Valider un nom d'utilisateur (alphanumérique uniquement)
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("username_alphanumeric");
        error.message = Some(Cow::from(
            "Le nom d'utilisateur ne doit contenir que des lettres et des chiffres",
        ));
        Err(error)
    }
}

/// Valider une note de marketplace (0 à 5)
pub fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if (0.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        let mut error = ValidationError::new("rating_range");
        error.message = Some(Cow::from("La note doit être comprise entre 0 et 5"));
        Err(error)
    }
}

/// Valider le nom d'un paquet téléversé et ne garder que son nom de base
pub fn validate_package_filename(filename: &str) -> AppResult<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() {
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    if base.len() > 255 {
        return Err(AppError::BadRequest(
            "Filename too long (max 255 characters)".to_string(),
        ));
    }

    if !base.to_lowercase().ends_with(".zip") {
        return Err(AppError::BadRequest("Only .zip files are allowed".to_string()));
    }

    Ok(base.to_string())
}

/// Valider une chaîne non vide
pub fn validate_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice42").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("bad-name").is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(5.5).is_err());
        assert!(validate_rating(-1.0).is_err());
    }

    #[test]
    fn test_package_filename() {
        assert_eq!(validate_package_filename("bell.zip").unwrap(), "bell.zip");
        assert_eq!(validate_package_filename("../../tmp/Grover.ZIP").unwrap(), "Grover.ZIP");
        assert!(validate_package_filename("circuit.qasm").is_err());
        assert!(validate_package_filename("dir/").is_err());
    }
}
