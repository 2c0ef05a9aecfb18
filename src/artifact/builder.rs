//! Artifact construction
//!
//! Takes the loose JSON the model (or an HTTP client) sends, folds legacy
//! single-file shapes into `files`/`execution`, applies defaults, and
//! attaches identity, checksum and validation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::extension_for;
use super::validator::{validate, ValidationResult};
use crate::metrics::ARTIFACTS_CREATED;

/// Fields owned by the builder; client input for these is ignored
const DERIVED_FIELDS: &[&str] = &[
    "id",
    "status",
    "error",
    "checksum",
    "createdAt",
    "updatedAt",
    "validation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Complete,
    Invalid,
}

impl ArtifactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Complete => "complete",
            ArtifactStatus::Invalid => "invalid",
        }
    }
}

/// A built artifact
///
/// Schema fields (type, title, files, execution, ...) stay as JSON in
/// `fields` so unknown keys round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub status: ArtifactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checksum: String,
    pub created_at: String,
    pub updated_at: String,
    pub validation: ValidationResult,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One file of an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub entrypoint: bool,
}

/// Listing row for `GET /api/artifacts`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    pub title: Option<String>,
    pub status: ArtifactStatus,
    pub score: u32,
    pub file_count: usize,
    pub created_at: String,
}

impl Artifact {
    fn str_field(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn artifact_type(&self) -> Option<String> {
        self.str_field("type")
    }

    pub fn title(&self) -> Option<String> {
        self.str_field("title")
    }

    /// Well-formed files; malformed entries are skipped
    pub fn files(&self) -> Vec<ArtifactFile> {
        self.fields
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| serde_json::from_value(f.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id.clone(),
            artifact_type: self.artifact_type(),
            title: self.title(),
            status: self.status,
            score: self.validation.score,
            file_count: self
                .fields
                .get("files")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
            created_at: self.created_at.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// `art_` + base-36 millisecond timestamp (9 chars) + 7 random base-36 chars
pub fn generate_artifact_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| base36_digit(rng.gen_range(0..36)))
        .collect();
    format!("art_{:0>9}{}", to_base36(millis), suffix)
}

fn base36_digit(n: u32) -> char {
    std::char::from_digit(n, 36).unwrap_or('0')
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(base36_digit((n % 36) as u32));
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// File stem derived from a title: lower-cased, non-alphanumeric runs to `_`
pub fn legacy_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    if out.is_empty() {
        "artifact".to_string()
    } else {
        out
    }
}

/// Fold legacy shapes into the structured form and apply defaults
fn normalize(fields: &mut Map<String, Value>) {
    for key in DERIVED_FIELDS {
        fields.remove(*key);
    }

    let has_files = fields.get("files").map(|f| !f.is_null()).unwrap_or(false);
    if !has_files {
        if let Some(Value::String(content)) = fields.get("content").cloned() {
            let language = fields
                .get("lang")
                .or_else(|| fields.get("language"))
                .and_then(Value::as_str)
                .unwrap_or("text")
                .to_string();
            let title = fields.get("title").and_then(Value::as_str).unwrap_or("");
            let path = format!("{}.{}", legacy_filename(title), extension_for(&language));

            fields.insert(
                "files".to_string(),
                serde_json::json!([{
                    "path": path,
                    "language": language,
                    "content": content,
                    "role": "main",
                    "entrypoint": true,
                }]),
            );
            fields.remove("content");
            fields.remove("lang");
        }
    }

    let has_execution = fields.get("execution").map(|e| !e.is_null()).unwrap_or(false);
    let legacy_runtime = fields.get("runtime").cloned().filter(|v| !v.is_null());
    let legacy_run = fields.get("run").cloned().filter(|v| !v.is_null());
    if !has_execution && (legacy_runtime.is_some() || legacy_run.is_some()) {
        let entrypoint = fields
            .get("files")
            .and_then(|f| f.get(0))
            .and_then(|f| f.get("path"))
            .cloned()
            .unwrap_or(Value::Null);

        let mut execution = Map::new();
        if let Some(runtime) = legacy_runtime {
            execution.insert("runtime".to_string(), runtime);
        }
        if let Some(run) = legacy_run {
            execution.insert("command".to_string(), run);
        }
        execution.insert("entrypoint".to_string(), entrypoint);
        fields.insert("execution".to_string(), Value::Object(execution));
        fields.remove("runtime");
        fields.remove("run");
    }

    if fields.get("version").map(Value::is_null).unwrap_or(true) {
        fields.insert("version".to_string(), serde_json::json!({"number": "1.0.0"}));
    }
    if fields.get("render").map(Value::is_null).unwrap_or(true) {
        fields.insert(
            "render".to_string(),
            serde_json::json!({"display": "inline", "theme": "auto"}),
        );
    }
}

/// BLAKE3 over the serialized file list
pub fn checksum_files(files: Option<&Value>) -> String {
    let serialized = files
        .map(|f| f.to_string())
        .unwrap_or_else(|| "[]".to_string());
    blake3::hash(serialized.as_bytes()).to_hex().to_string()
}

/// Normalize, validate and stamp derived fields onto `fields`
fn finish(id: String, created_at: String, mut fields: Map<String, Value>) -> Artifact {
    normalize(&mut fields);

    let validation = validate(&Value::Object(fields.clone()));
    let status = if validation.valid {
        ArtifactStatus::Complete
    } else {
        ArtifactStatus::Invalid
    };

    Artifact {
        id,
        status,
        error: validation.errors.first().cloned(),
        checksum: checksum_files(fields.get("files")),
        created_at,
        updated_at: chrono::Utc::now().to_rfc3339(),
        validation,
        fields,
    }
}

/// Build a new artifact from client or model input
pub fn build_artifact(input: Value) -> Artifact {
    let fields = match input {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let artifact = finish(generate_artifact_id(), chrono::Utc::now().to_rfc3339(), fields);
    ARTIFACTS_CREATED
        .with_label_values(&[artifact.status.as_str()])
        .inc();
    artifact
}

/// Shallow-merge `patch` into an existing artifact and rebuild it
///
/// Identity and creation time are preserved; everything derived is
/// recomputed from the merged fields.
pub fn apply_patch(existing: &Artifact, patch: &Value) -> Artifact {
    let mut fields = existing.fields.clone();
    if let Some(patch) = patch.as_object() {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    }
    finish(existing.id.clone(), existing.created_at.clone(), fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_shape() {
        let id = generate_artifact_id();
        assert!(id.starts_with("art_"));
        assert_eq!(id.len(), 4 + 9 + 7);
        assert!(id[4..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_legacy_filename() {
        assert_eq!(legacy_filename("Hello, World!"), "hello_world_");
        assert_eq!(legacy_filename("snake   game"), "snake_game");
        assert_eq!(legacy_filename(""), "artifact");
    }

    #[test]
    fn test_legacy_content_becomes_entrypoint_file() {
        let artifact = build_artifact(json!({
            "type": "code",
            "title": "Fizz Buzz",
            "content": "print(1)",
            "lang": "python",
            "runtime": "python",
            "run": "python fizz_buzz.py"
        }));

        let files = artifact.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "fizz_buzz.py");
        assert!(files[0].entrypoint);
        assert!(artifact.fields.get("content").is_none());
        assert!(artifact.fields.get("lang").is_none());
        assert!(artifact.fields.get("runtime").is_none());
        assert_eq!(artifact.fields["execution"]["entrypoint"], "fizz_buzz.py");
        assert_eq!(artifact.fields["execution"]["command"], "python fizz_buzz.py");
        assert_eq!(artifact.status, ArtifactStatus::Complete);
        assert_eq!(artifact.validation.score, 100);
    }

    #[test]
    fn test_defaults_applied() {
        let artifact = build_artifact(json!({"type": "document", "title": "notes"}));
        assert_eq!(artifact.fields["version"]["number"], "1.0.0");
        assert_eq!(artifact.fields["render"]["display"], "inline");
        assert_eq!(artifact.validation.score, 95);
    }

    #[test]
    fn test_invalid_artifact_status_and_error() {
        let artifact = build_artifact(json!({"title": "no type", "content": "x"}));
        assert_eq!(artifact.status, ArtifactStatus::Invalid);
        assert_eq!(artifact.error.as_deref(), Some("Missing required field: type"));
    }

    #[test]
    fn test_checksum_tracks_files() {
        let a = build_artifact(json!({"type": "code", "title": "a", "content": "one"}));
        let b = build_artifact(json!({"type": "code", "title": "a", "content": "one"}));
        let c = build_artifact(json!({"type": "code", "title": "a", "content": "two"}));
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 64);
    }

    #[test]
    fn test_patch_revalidates() {
        let original = build_artifact(json!({"type": "code", "title": "ok", "content": "x"}));
        assert_eq!(original.status, ArtifactStatus::Complete);

        let patched = apply_patch(&original, &json!({"type": "not-a-type", "id": "hijack"}));
        assert_eq!(patched.id, original.id);
        assert_eq!(patched.created_at, original.created_at);
        assert_eq!(patched.status, ArtifactStatus::Invalid);
        assert!(patched.error.as_deref().unwrap_or("").starts_with("Invalid artifact type"));
    }

    #[test]
    fn test_serialized_shape() {
        let artifact = build_artifact(json!({"type": "html", "title": "page", "content": "<p/>"}));
        let value = artifact.to_value();
        assert_eq!(value["type"], "html");
        assert_eq!(value["status"], "complete");
        assert!(value["createdAt"].is_string());
        assert!(value["validation"]["valid"].as_bool().unwrap());
    }
}
