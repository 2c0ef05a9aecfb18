//! Process-scoped artifact registry

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::builder::{apply_patch, Artifact, ArtifactSummary};

/// In-memory artifact store shared by the HTTP handlers and the dispatcher
#[derive(Default)]
pub struct ArtifactRegistry {
    artifacts: RwLock<HashMap<String, Artifact>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, artifact: Artifact) {
        let mut map = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        map.insert(artifact.id.clone(), artifact);
    }

    pub fn get(&self, id: &str) -> Option<Artifact> {
        let map = self.artifacts.read().unwrap_or_else(|e| e.into_inner());
        map.get(id).cloned()
    }

    /// Summaries, newest first
    pub fn list(&self) -> Vec<ArtifactSummary> {
        let map = self.artifacts.read().unwrap_or_else(|e| e.into_inner());
        let mut artifacts: Vec<&Artifact> = map.values().collect();
        // Ids embed the creation timestamp, so they break ties in the same instant
        artifacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        artifacts.into_iter().map(Artifact::summary).collect()
    }

    pub fn remove(&self, id: &str) -> Option<Artifact> {
        let mut map = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        map.remove(id)
    }

    /// Merge, re-validate and replace; `None` when the id is unknown
    pub fn patch(&self, id: &str, patch: &Value) -> Option<Artifact> {
        let mut map = self.artifacts.write().unwrap_or_else(|e| e.into_inner());
        let existing = map.get(id)?;
        let updated = apply_patch(existing, patch);
        map.insert(id.to_string(), updated.clone());
        Some(updated)
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::builder::{build_artifact, ArtifactStatus};
    use serde_json::json;

    #[test]
    fn test_insert_get_remove() {
        let registry = ArtifactRegistry::new();
        let artifact = build_artifact(json!({"type": "code", "title": "a", "content": "x"}));
        let id = artifact.id.clone();
        registry.insert(artifact);

        assert!(registry.get(&id).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_patch_unknown_id() {
        let registry = ArtifactRegistry::new();
        assert!(registry.patch("art_missing", &json!({"title": "x"})).is_none());
    }

    #[test]
    fn test_patch_replaces_stored_copy() {
        let registry = ArtifactRegistry::new();
        let artifact = build_artifact(json!({"type": "code", "title": "a", "content": "x"}));
        let id = artifact.id.clone();
        registry.insert(artifact);

        registry.patch(&id, &json!({"title": ""}));
        let stored = registry.get(&id).unwrap();
        assert_eq!(stored.status, ArtifactStatus::Invalid);
    }

    #[test]
    fn test_list_newest_first() {
        let registry = ArtifactRegistry::new();
        let mut older = build_artifact(json!({"type": "code", "title": "old", "content": "x"}));
        older.created_at = "2020-01-01T00:00:00+00:00".to_string();
        let newer = build_artifact(json!({"type": "code", "title": "new", "content": "x"}));
        registry.insert(older);
        registry.insert(newer);

        let titles: Vec<_> = registry.list().into_iter().filter_map(|s| s.title).collect();
        assert_eq!(titles, vec!["new".to_string(), "old".to_string()]);
    }
}
