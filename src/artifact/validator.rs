//! Artifact validation
//!
//! `validate` is pure: it never fails, it only reports. Each rule is
//! independent so a single pass collects every problem.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{is_artifact_type, is_language, DISPLAY_MODES, FILE_ROLES, RUNTIMES, THEMES};

pub const MAX_TITLE_CHARS: usize = 200;

lazy_static! {
    static ref SEMVER: Regex =
        Regex::new(r"^\d+\.\d+\.\d+(-[\w.]+)?$").expect("semver pattern is valid");
}

/// Outcome of validating one artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub score: u32,
}

impl ValidationResult {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        let penalty = 20 * errors.len() as i64 + 5 * warnings.len() as i64;
        Self {
            valid: errors.is_empty(),
            score: (100 - penalty).max(0) as u32,
            errors,
            warnings,
        }
    }
}

#[derive(Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Present and not null
fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn is_non_negative_number(value: &Value) -> bool {
    value.as_f64().map(|n| n >= 0.0).unwrap_or(false)
}

/// Validate an artifact (or candidate artifact) value
pub fn validate(value: &Value) -> ValidationResult {
    let Some(obj) = value.as_object() else {
        return ValidationResult::from_findings(
            vec!["Artifact must be an object".to_string()],
            Vec::new(),
        );
    };

    let mut f = Findings::default();

    check_type(obj, &mut f);
    check_title(obj, &mut f);
    let has_files = check_files(obj, &mut f);
    check_execution(obj, &mut f);
    check_dependencies(obj, &mut f);
    check_env(obj, &mut f);
    check_render(obj, &mut f);
    check_version(obj, &mut f);
    check_tags(obj, &mut f);

    let has_legacy_content = field(obj, "content").is_some();
    if !has_files && !has_legacy_content {
        f.warn("No content provided: artifact has no files or content");
    }

    ValidationResult::from_findings(f.errors, f.warnings)
}

fn check_type(obj: &Map<String, Value>, f: &mut Findings) {
    match field(obj, "type") {
        None => f.error("Missing required field: type"),
        Some(Value::String(t)) if is_artifact_type(t) => {}
        Some(Value::String(t)) => f.error(format!("Invalid artifact type: '{}'", t)),
        Some(other) => f.error(format!("Invalid artifact type: '{}'", other)),
    }
}

fn check_title(obj: &Map<String, Value>, f: &mut Findings) {
    match field(obj, "title") {
        None => f.error("Missing required field: title"),
        Some(Value::String(title)) if !title.trim().is_empty() => {
            if title.chars().count() > MAX_TITLE_CHARS {
                f.warn(format!("Title exceeds {} characters", MAX_TITLE_CHARS));
            }
        }
        Some(_) => f.error("Title must be a non-empty string"),
    }
}

/// Returns whether the artifact carries at least one file
fn check_files(obj: &Map<String, Value>, f: &mut Findings) -> bool {
    let Some(files) = field(obj, "files") else {
        return false;
    };
    let Some(files) = files.as_array() else {
        f.error("files must be an array");
        return false;
    };

    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    let mut entrypoints: Vec<String> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        let Some(file) = file.as_object() else {
            f.error(format!("files[{}] must be an object", i));
            continue;
        };

        match field(file, "path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => {
                if !seen.insert(path.to_string()) && !duplicates.iter().any(|d| d == path) {
                    duplicates.push(path.to_string());
                }
                if file.get("entrypoint").and_then(Value::as_bool) == Some(true) {
                    entrypoints.push(path.to_string());
                }
            }
            _ => f.error(format!("files[{}]: missing required field 'path'", i)),
        }

        // Empty content is a legitimate empty file
        if field(file, "content").and_then(Value::as_str).is_none() {
            f.error(format!("files[{}]: missing required field 'content'", i));
        }

        match field(file, "language") {
            None => f.warn(format!("files[{}]: missing language", i)),
            Some(lang) => match lang.as_str() {
                Some(l) if is_language(&l.to_ascii_lowercase()) => {}
                _ => f.warn(format!("files[{}]: unrecognized language {}", i, lang)),
            },
        }

        if let Some(role) = field(file, "role") {
            let known = role.as_str().map(|r| FILE_ROLES.contains(&r)).unwrap_or(false);
            if !known {
                f.warn(format!("files[{}]: unrecognized role {}", i, role));
            }
        }
    }

    if !duplicates.is_empty() {
        f.error(format!("Duplicate file paths: {}", duplicates.join(", ")));
    }
    if entrypoints.len() > 1 {
        f.warn(format!(
            "Multiple files marked as entrypoint: {}",
            entrypoints.join(", ")
        ));
    }

    !files.is_empty()
}

fn check_execution(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(execution) = field(obj, "execution") else {
        return;
    };
    let Some(execution) = execution.as_object() else {
        f.error("execution must be an object");
        return;
    };

    if let Some(runtime) = field(execution, "runtime") {
        let known = runtime.as_str().map(|r| RUNTIMES.contains(&r)).unwrap_or(false);
        if !known {
            f.warn(format!("Unrecognized runtime {}", runtime));
        }
    }
    if let Some(timeout) = field(execution, "timeout") {
        if !is_non_negative_number(timeout) {
            f.error("execution.timeout must be a non-negative number");
        }
    }
    for key in ["args", "setup"] {
        if let Some(value) = field(execution, key) {
            if !value.is_array() {
                f.error(format!("execution.{} must be an array", key));
            }
        }
    }
}

fn check_dependencies(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(deps) = field(obj, "dependencies") else {
        return;
    };
    let Some(deps) = deps.as_object() else {
        f.error("dependencies must be an object");
        return;
    };
    for key in ["packages", "dev"] {
        if let Some(value) = field(deps, key) {
            if !value.is_object() {
                f.error(format!("dependencies.{} must be an object", key));
            }
        }
    }
}

fn check_env(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(env) = field(obj, "env") else {
        return;
    };
    let Some(env) = env.as_array() else {
        f.error("env must be an array");
        return;
    };

    for (i, var) in env.iter().enumerate() {
        let Some(var) = var.as_object() else {
            f.error(format!("env[{}] must be an object", i));
            continue;
        };
        match field(var, "name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => {}
            _ => f.error(format!("env[{}]: missing required field 'name'", i)),
        }
        if field(var, "description").is_none() {
            f.warn(format!("env[{}]: missing description", i));
        }
    }
}

fn check_render(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(render) = field(obj, "render") else {
        return;
    };
    let Some(render) = render.as_object() else {
        f.error("render must be an object");
        return;
    };

    if let Some(display) = field(render, "display") {
        let known = display.as_str().map(|d| DISPLAY_MODES.contains(&d)).unwrap_or(false);
        if !known {
            f.warn(format!("Unrecognized display mode {}", display));
        }
    }
    if let Some(theme) = field(render, "theme") {
        let known = theme.as_str().map(|t| THEMES.contains(&t)).unwrap_or(false);
        if !known {
            f.warn(format!("Unrecognized theme {}", theme));
        }
    }
    if let Some(dimensions) = field(render, "dimensions") {
        match dimensions.as_object() {
            Some(dims) => {
                for key in ["width", "height"] {
                    if let Some(value) = field(dims, key) {
                        if !is_non_negative_number(value) {
                            f.error(format!(
                                "render.dimensions.{} must be a non-negative number",
                                key
                            ));
                        }
                    }
                }
            }
            None => f.error("render.dimensions must be an object"),
        }
    }
}

fn check_version(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(version) = field(obj, "version") else {
        return;
    };
    let Some(version) = version.as_object() else {
        f.error("version must be an object");
        return;
    };
    if let Some(number) = field(version, "number") {
        let semantic = number.as_str().map(|n| SEMVER.is_match(n)).unwrap_or(false);
        if !semantic {
            f.warn(format!(
                "version.number {} does not follow semantic versioning (x.y.z)",
                number
            ));
        }
    }
}

fn check_tags(obj: &Map<String, Value>, f: &mut Findings) {
    let Some(tags) = field(obj, "tags") else {
        return;
    };
    match tags.as_array() {
        Some(tags) => {
            if tags.iter().any(|t| !t.is_string()) {
                f.error("tags must contain only strings");
            }
        }
        None => f.error("tags must be an array"),
    }
}
