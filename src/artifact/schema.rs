//! Closed vocabularies for artifacts

/// Every accepted artifact type, base types followed by their subtypes
pub const ARTIFACT_TYPES: &[&str] = &[
    "code",
    "code:snippet",
    "code:module",
    "code:script",
    "code:library",
    "app",
    "app:web",
    "app:cli",
    "app:api",
    "app:desktop",
    "app:mobile",
    "game",
    "game:2d",
    "game:3d",
    "game:text",
    "document",
    "document:markdown",
    "document:report",
    "document:spec",
    "document:readme",
    "data",
    "data:json",
    "data:csv",
    "data:yaml",
    "data:sql",
    "diagram",
    "diagram:mermaid",
    "diagram:flowchart",
    "diagram:architecture",
    "visualization",
    "visualization:chart",
    "visualization:dashboard",
    "config",
    "config:docker",
    "config:ci",
    "config:infra",
    "test",
    "test:unit",
    "test:integration",
    "component",
    "component:react",
    "component:vue",
    "html",
    "svg",
    "notebook",
];

/// Language name and the file extension used when synthesizing file names
pub const LANGUAGES: &[(&str, &str)] = &[
    ("javascript", "js"),
    ("typescript", "ts"),
    ("jsx", "jsx"),
    ("tsx", "tsx"),
    ("python", "py"),
    ("rust", "rs"),
    ("go", "go"),
    ("java", "java"),
    ("kotlin", "kt"),
    ("swift", "swift"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("csharp", "cs"),
    ("ruby", "rb"),
    ("php", "php"),
    ("scala", "scala"),
    ("lua", "lua"),
    ("r", "r"),
    ("dart", "dart"),
    ("elixir", "ex"),
    ("haskell", "hs"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("less", "less"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("csv", "csv"),
    ("sql", "sql"),
    ("graphql", "graphql"),
    ("markdown", "md"),
    ("mermaid", "mmd"),
    ("svg", "svg"),
    ("shell", "sh"),
    ("bash", "sh"),
    ("powershell", "ps1"),
    ("dockerfile", "dockerfile"),
    ("makefile", "mk"),
    ("text", "txt"),
];

pub const FILE_ROLES: &[&str] = &[
    "main",
    "source",
    "module",
    "component",
    "style",
    "config",
    "test",
    "asset",
    "data",
    "documentation",
    "script",
    "build",
];

pub const RUNTIMES: &[&str] = &[
    "node", "deno", "bun", "python", "python3", "browser", "shell", "bash", "rust", "go", "java",
    "docker", "static", "none",
];

pub const PACKAGE_MANAGERS: &[&str] = &[
    "npm", "yarn", "pnpm", "bun", "pip", "poetry", "cargo", "go", "maven", "gradle", "composer",
    "gem",
];

pub const DISPLAY_MODES: &[&str] = &[
    "inline",
    "panel",
    "fullscreen",
    "modal",
    "split",
    "preview",
    "code",
    "hidden",
];

pub const THEMES: &[&str] = &["light", "dark", "auto", "system"];

pub fn is_artifact_type(value: &str) -> bool {
    ARTIFACT_TYPES.contains(&value)
}

pub fn is_language(value: &str) -> bool {
    LANGUAGES.iter().any(|(name, _)| *name == value)
}

/// File extension for a language, `txt` when unknown
pub fn extension_for(language: &str) -> &'static str {
    let lower = language.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, ext)| *ext)
        .unwrap_or("txt")
}

/// The vocabularies as JSON, served at `GET /api/artifacts/schema/types`
pub fn schema_types() -> serde_json::Value {
    let base_types: Vec<&str> = ARTIFACT_TYPES
        .iter()
        .copied()
        .filter(|t| !t.contains(':'))
        .collect();

    serde_json::json!({
        "types": ARTIFACT_TYPES,
        "baseTypes": base_types,
        "languages": LANGUAGES.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "fileRoles": FILE_ROLES,
        "runtimes": RUNTIMES,
        "packageManagers": PACKAGE_MANAGERS,
        "displayModes": DISPLAY_MODES,
        "themes": THEMES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtypes_have_known_base() {
        for t in ARTIFACT_TYPES {
            if let Some((base, _)) = t.split_once(':') {
                assert!(is_artifact_type(base), "{t} has unknown base");
            }
        }
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for("Python"), "py");
        assert_eq!(extension_for("brainfuck"), "txt");
    }
}
