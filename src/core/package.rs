//! # Package Validation
//!
//! Un paquet d'application est une archive zip contenant :
//! - `quantum_manifest.json` à la racine, qui décrit l'application
//! - au moins un fichier `.qasm`, dont ceux référencés par le manifeste
//!
//! Le manifeste accepte deux vocabulaires : les noms historiques de la CLI
//! (`app_name`, `version`, `application_type`, `quantum_cli_sdk_version`,
//! `app_description`) et les noms canoniques du hub (`name`, `version_number`,
//! `type`, `sdk_used`, `description`). La validation accumule toutes les
//! erreurs pour que l'utilisateur puisse corriger son paquet en une fois.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::domain::{AppType, AppVersion, AppVisibility, LicenseType, QuantumApp};
use crate::infrastructure::error::AppResult;
use crate::utils::sha256_hash;

/// Nom du manifeste à la racine de l'archive
pub const MANIFEST_FILE: &str = "quantum_manifest.json";

const QASM_EXTENSION: &str = ".qasm";

/// (alias CLI, nom canonique)
const FIELD_ALIASES: [(&str, &str); 5] = [
    ("app_name", "name"),
    ("version", "version_number"),
    ("application_type", "type"),
    ("quantum_cli_sdk_version", "sdk_used"),
    ("app_description", "description"),
];

const REQUIRED_FIELDS: [&str; 4] = ["name", "type", "version_number", "sdk_used"];

/// Manifeste normalisé
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub version_number: String,
    pub sdk_used: String,
    pub description: Option<String>,
    pub qasm_files: Vec<String>,
    pub visibility: Option<String>,
    pub license: Option<String>,
    pub license_url: Option<String>,
    pub readme: Option<String>,
    pub api_url: Option<String>,
    pub documentation_url: Option<String>,
    pub repository_url: Option<String>,
    pub input: Option<Value>,
    pub expected_output: Option<Value>,
    pub preferred_hardware: Option<String>,
    pub preferred_device_id: Option<String>,
    pub number_of_qubits: Option<i32>,
    pub release_notes: Option<String>,
}

/// Paquet validé, prêt à être enregistré
#[derive(Debug, Clone)]
pub struct ValidatedPackage {
    pub manifest: Manifest,
    pub qasm_files: BTreeMap<String, String>,
    pub checksum: String,
}

/// Ouvre l'archive et lit `quantum_manifest.json`.
/// Renvoie `Ok(None)` si le manifeste est absent.
pub fn extract_manifest(package: &[u8]) -> Result<Option<Map<String, Value>>, String> {
    let mut archive = open_archive(package)?;

    let mut entry = match archive.by_name(MANIFEST_FILE) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(_) => return Err("Invalid zip file".to_string()),
    };

    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|_| "Invalid zip file".to_string())?;

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        _ => Err(format!("Invalid JSON in {}", MANIFEST_FILE)),
    }
}

/// Collecte le contenu UTF-8 de tous les fichiers `.qasm` de l'archive
pub fn extract_qasm_files(package: &[u8]) -> Result<BTreeMap<String, String>, String> {
    let mut archive = open_archive(package)?;
    let mut files = BTreeMap::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|_| "Invalid zip file".to_string())?;

        if entry.is_dir() || !entry.name().ends_with(QASM_EXTENSION) {
            continue;
        }

        let name = entry.name().to_string();
        let mut raw = Vec::new();
        entry
            .read_to_end(&mut raw)
            .map_err(|_| "Invalid zip file".to_string())?;

        let content = String::from_utf8(raw)
            .map_err(|_| format!("Unable to decode .qasm file as UTF-8: {}", name))?;
        files.insert(name, content);
    }

    Ok(files)
}

/// Normalise et vérifie un manifeste brut
pub fn validate_manifest(raw: &Map<String, Value>) -> Result<Manifest, Vec<String>> {
    let mut errors = Vec::new();
    let mut reader = ManifestReader { raw, errors: &mut errors };

    let mut required = BTreeMap::new();
    for field in REQUIRED_FIELDS {
        match reader.lookup(field) {
            None => reader.errors.push(format!(
                "Missing required field: {}",
                alias_of(field).unwrap_or(field)
            )),
            Some((key, Value::String(value))) => {
                if value.trim().is_empty() {
                    reader.errors.push(format!("Field '{}' cannot be empty", key));
                } else {
                    required.insert(field, value.trim().to_string());
                }
            }
            Some((key, _)) => reader.errors.push(format!("Field '{}' must be a string", key)),
        }
    }

    if let Some(app_type) = required.get("type") {
        if app_type.parse::<AppType>().is_err() {
            reader.errors.push(format!("Unsupported application type: {}", app_type));
        }
    }

    let (qasm_files, reference_errors) = qasm_references(raw);
    reader.errors.extend(reference_errors);
    let description = reader.optional_string("description");
    let visibility = reader.optional_string("visibility");
    let license = reader.optional_string("license");
    let license_url = reader.optional_string("license_url");
    let readme = reader.optional_string("readme");
    let api_url = reader.optional_string("api_url");
    let documentation_url = reader.optional_string("documentation_url");
    let repository_url = reader.optional_string("repository_url");
    let preferred_hardware = reader.optional_string("preferred_hardware");
    let preferred_device_id = reader.optional_string("preferred_device_id");
    let release_notes = reader.optional_string("release_notes");
    let number_of_qubits = reader.optional_integer("number_of_qubits");

    if let Some(value) = &visibility {
        if value.parse::<AppVisibility>().is_err() {
            reader.errors.push(format!("Unsupported visibility: {}", value));
        }
    }
    if let Some(value) = &license {
        if value.parse::<LicenseType>().is_err() {
            reader.errors.push(format!("Unsupported license type: {}", value));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Les champs requis sont tous présents si aucune erreur n'a été relevée
    let take = |field: &str| required.get(field).cloned().unwrap_or_default();

    Ok(Manifest {
        name: take("name"),
        app_type: take("type"),
        version_number: take("version_number"),
        sdk_used: take("sdk_used"),
        description,
        qasm_files,
        visibility,
        license,
        license_url,
        readme,
        api_url,
        documentation_url,
        repository_url,
        input: raw.get("input").filter(|v| !v.is_null()).cloned(),
        expected_output: raw.get("expected_output").filter(|v| !v.is_null()).cloned(),
        preferred_hardware,
        preferred_device_id,
        number_of_qubits,
        release_notes,
    })
}

/// Valide un paquet complet et renvoie toutes les erreurs rencontrées
pub fn validate_package(package: &[u8]) -> Result<ValidatedPackage, Vec<String>> {
    let raw = match extract_manifest(package) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Err(vec![format!("Missing {} in package", MANIFEST_FILE)]),
        Err(error) => return Err(vec![error]),
    };

    let mut errors = Vec::new();

    let manifest = match validate_manifest(&raw) {
        Ok(manifest) => Some(manifest),
        Err(manifest_errors) => {
            errors.extend(manifest_errors);
            None
        }
    };
    let references = match &manifest {
        Some(manifest) => manifest.qasm_files.clone(),
        None => qasm_references(&raw).0,
    };

    let qasm_files = match extract_qasm_files(package) {
        Ok(files) => files,
        Err(error) => {
            errors.push(error);
            return Err(errors);
        }
    };

    if qasm_files.is_empty() {
        errors.push("No .qasm files found in package".to_string());
    }

    for reference in &references {
        if !contains_qasm(&qasm_files, reference) {
            errors.push(format!("Specified QASM file not found in package: {}", reference));
        }
    }

    match manifest {
        Some(manifest) if errors.is_empty() => Ok(ValidatedPackage {
            manifest,
            qasm_files,
            checksum: sha256_hash(package),
        }),
        _ => Err(errors),
    }
}

impl Manifest {
    pub fn parsed_type(&self) -> AppResult<AppType> {
        self.app_type.parse()
    }

    /// Crée une nouvelle application à partir du manifeste
    pub fn to_app(&self, developer_id: Uuid) -> AppResult<QuantumApp> {
        let mut app = QuantumApp::new(developer_id, self.name.clone(), self.parsed_type()?);
        self.apply_to_app(&mut app)?;
        Ok(app)
    }

    /// Reporte les champs du manifeste sur une application existante
    pub fn apply_to_app(&self, app: &mut QuantumApp) -> AppResult<()> {
        app.app_type = self.parsed_type()?;
        if self.description.is_some() {
            app.description = self.description.clone();
        }
        if let Some(visibility) = &self.visibility {
            app.visibility = visibility.parse()?;
        }
        app.license_type = match &self.license {
            Some(license) => license.parse()?,
            None => LicenseType::Mit,
        };
        if self.license_url.is_some() {
            app.license_url = self.license_url.clone();
        }
        if self.readme.is_some() {
            app.readme_content = self.readme.clone();
        }
        if self.api_url.is_some() {
            app.api_url = self.api_url.clone();
        }
        if self.documentation_url.is_some() {
            app.documentation_url = self.documentation_url.clone();
        }
        if self.repository_url.is_some() {
            app.repository_url = self.repository_url.clone();
        }
        app.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Construit la version décrite par le manifeste
    pub fn to_version(&self, app: &QuantumApp, filename: &str, package: ValidatedPackageData) -> AppVersion {
        let mut version = AppVersion::new(
            app.id,
            self.version_number.clone(),
            self.sdk_used.to_lowercase(),
        );
        version.input_schema = self.input.clone();
        version.output_schema = self.expected_output.clone();
        version.preferred_platform = self.preferred_hardware.clone();
        version.preferred_device_id = self.preferred_device_id.clone();
        version.number_of_qubits = self.number_of_qubits;
        version.release_notes = self.release_notes.clone();
        version.source_repo = app.repository_url.clone();
        version.package_path = Some(filename.to_string());
        version.package_checksum = Some(package.checksum);
        version.package_data = Some(package.data);
        version
    }
}

/// Contenu binaire d'un paquet et son empreinte
#[derive(Debug, Clone)]
pub struct ValidatedPackageData {
    pub data: Vec<u8>,
    pub checksum: String,
}

fn open_archive(package: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, String> {
    ZipArchive::new(Cursor::new(package)).map_err(|_| "Invalid zip file".to_string())
}

fn alias_of(canonical: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(_, target)| *target == canonical)
        .map(|(alias, _)| *alias)
}

/// Un fichier référencé correspond à une entrée par chemin exact ou par nom de base
fn contains_qasm(files: &BTreeMap<String, String>, reference: &str) -> bool {
    let reference = reference.trim_start_matches("./");
    files.contains_key(reference)
        || files
            .keys()
            .any(|path| path.rsplit('/').next() == Some(reference))
}

struct ManifestReader<'a> {
    raw: &'a Map<String, Value>,
    errors: &'a mut Vec<String>,
}

impl<'a> ManifestReader<'a> {
    /// Cherche un champ sous son nom canonique puis sous son alias
    fn lookup(&self, canonical: &'a str) -> Option<(&'a str, &'a Value)> {
        if let Some(value) = self.raw.get(canonical) {
            return Some((canonical, value));
        }
        let alias = alias_of(canonical)?;
        self.raw.get(alias).map(|value| (alias, value))
    }

    fn optional_string(&mut self, canonical: &'a str) -> Option<String> {
        match self.lookup(canonical) {
            None | Some((_, Value::Null)) => None,
            Some((_, Value::String(value))) => Some(value.clone()),
            Some((key, _)) => {
                self.errors.push(format!("Field '{}' must be a string", key));
                None
            }
        }
    }

    fn optional_integer(&mut self, field: &'a str) -> Option<i32> {
        match self.raw.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) if n > 0 => Some(n),
                _ => {
                    self.errors.push(format!("Field '{}' must be a positive integer", field));
                    None
                }
            },
        }
    }
}

/// Fichiers `.qasm` référencés par le manifeste, via `qasm_files` (liste) ou
/// `application_source_file` (chaîne), et les erreurs de forme rencontrées.
/// Indépendant des autres champs : les références sont vérifiées même si le
/// reste du manifeste est invalide.
pub fn qasm_references(raw: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
    if let Some(value) = raw.get("qasm_files") {
        return match value.as_array() {
            Some(items) if !items.is_empty() => {
                let files: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                let errors = if files.len() != items.len() {
                    vec!["Field 'qasm_files' must be a list of strings".to_string()]
                } else {
                    Vec::new()
                };
                (files, errors)
            }
            _ => (
                Vec::new(),
                vec!["Field 'qasm_files' must be a non-empty list of strings".to_string()],
            ),
        };
    }

    match raw.get("application_source_file") {
        None => (
            Vec::new(),
            vec!["Missing required field: application_source_file".to_string()],
        ),
        Some(Value::String(file)) => (vec![file.clone()], Vec::new()),
        Some(_) => (
            Vec::new(),
            vec!["Field 'application_source_file' must be a string".to_string()],
        ),
    }
}
