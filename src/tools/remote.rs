//! HTTP/JSON proxies to the collaborator services (terminal, editor, missions)

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ServiceEndpoints;
use crate::error::DispatchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Terminal,
    Editor,
    Mission,
}

impl Service {
    fn display_name(self) -> &'static str {
        match self {
            Service::Terminal => "Terminal service",
            Service::Editor => "Editor service",
            Service::Mission => "Mission service",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Service::Terminal => "terminal",
            Service::Editor => "editor",
            Service::Mission => "mission",
        }
    }
}

fn unavailable(service: Service, detail: impl std::fmt::Display) -> DispatchError {
    DispatchError::Failed(format!("{} unavailable: {}", service.display_name(), detail))
}

/// `{success: true, ...body}` for object bodies, `{success: true, data}` otherwise
fn wrap_success(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            map.entry("success").or_insert(Value::Bool(true));
            Value::Object(map)
        }
        other => json!({"success": true, "data": other}),
    }
}

#[derive(Clone)]
pub struct CollaboratorClient {
    endpoints: ServiceEndpoints,
    client: reqwest::Client,
}

impl CollaboratorClient {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self {
            endpoints,
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self, service: Service) -> &str {
        let url = match service {
            Service::Terminal => &self.endpoints.terminal_url,
            Service::Editor => &self.endpoints.editor_url,
            Service::Mission => &self.endpoints.mission_url,
        };
        url.trim_end_matches('/')
    }

    async fn call(
        &self,
        service: Service,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DispatchError> {
        let url = format!("{}{}", self.base_url(service), path);
        debug!(service = service.key(), %method, url = %url, "Calling collaborator");

        let mut request = self.client.request(method, &url).timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| unavailable(service, e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| unavailable(service, e))?;

        if !status.is_success() {
            return Err(unavailable(service, format!("HTTP {}: {}", status.as_u16(), text)));
        }

        if text.trim().is_empty() {
            return Ok(json!({"success": true}));
        }
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(wrap_success(body))
    }

    pub async fn editor_open(&self, absolute_path: &str) -> Result<Value, DispatchError> {
        self.call(
            Service::Editor,
            Method::POST,
            "/api/editor/open",
            Some(json!({"path": absolute_path})),
        )
        .await
    }

    /// Optionally replace the buffer content, then persist it
    pub async fn editor_save(&self, buffer_id: &str, content: Option<&str>) -> Result<Value, DispatchError> {
        if let Some(content) = content {
            self.call(
                Service::Editor,
                Method::PUT,
                &format!("/api/editor/buffers/{}", buffer_id),
                Some(json!({"content": content})),
            )
            .await?;
        }
        self.call(
            Service::Editor,
            Method::POST,
            "/api/editor/save",
            Some(json!({"id": buffer_id})),
        )
        .await
    }

    pub async fn terminal_create(
        &self,
        name: &str,
        cwd: Option<&str>,
        shell: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let mut body = json!({"name": name});
        if let Some(cwd) = cwd {
            body["cwd"] = json!(cwd);
        }
        if let Some(shell) = shell {
            body["shell"] = json!(shell);
        }
        self.call(Service::Terminal, Method::POST, "/api/terminals", Some(body))
            .await
    }

    pub async fn terminal_exec(
        &self,
        terminal_id: &str,
        command: &str,
        wait: bool,
        timeout_ms: Option<u64>,
    ) -> Result<Value, DispatchError> {
        if wait {
            let mut body = json!({"command": command});
            if let Some(timeout_ms) = timeout_ms {
                body["timeout_ms"] = json!(timeout_ms);
            }
            self.call(
                Service::Terminal,
                Method::POST,
                &format!("/api/terminals/{}/exec/wait", terminal_id),
                Some(body),
            )
            .await
        } else {
            self.call(
                Service::Terminal,
                Method::POST,
                &format!("/api/terminals/{}/exec", terminal_id),
                Some(json!({"command": command})),
            )
            .await
        }
    }

    pub async fn terminal_buffer(&self, terminal_id: &str, lines: Option<usize>) -> Result<Value, DispatchError> {
        let mut path = format!("/api/terminals/{}/buffer", terminal_id);
        if let Some(lines) = lines {
            path.push_str(&format!("?lines={}", lines));
        }
        self.call(Service::Terminal, Method::GET, &path, None).await
    }

    pub async fn terminal_list(&self) -> Result<Value, DispatchError> {
        self.call(Service::Terminal, Method::GET, "/api/terminals", None)
            .await
    }

    pub async fn mission_create(&self, goal: &str, context: Option<Value>) -> Result<Value, DispatchError> {
        self.call(
            Service::Mission,
            Method::POST,
            "/api/missions",
            Some(json!({"goal": goal, "context": context.unwrap_or(Value::Null)})),
        )
        .await
    }

    pub async fn mission_list(&self) -> Result<Value, DispatchError> {
        self.call(Service::Mission, Method::GET, "/api/missions", None)
            .await
    }

    /// Probe every collaborator's `/health`; never fails
    pub async fn service_status(&self) -> Value {
        let mut services = serde_json::Map::new();
        for service in [Service::Terminal, Service::Editor, Service::Mission] {
            let url = format!("{}/health", self.base_url(service));
            let status = match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
                Ok(resp) if resp.status().is_success() => json!({"url": url, "status": "online"}),
                Ok(resp) => json!({
                    "url": url,
                    "status": "degraded",
                    "error": format!("HTTP {}", resp.status().as_u16()),
                }),
                Err(e) => json!({"url": url, "status": "offline", "error": e.to_string()}),
            };
            services.insert(service.key().to_string(), status);
        }
        json!({"success": true, "services": services})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_success() {
        assert_eq!(wrap_success(json!({"id": 1})), json!({"id": 1, "success": true}));
        assert_eq!(wrap_success(json!([1, 2])), json!({"success": true, "data": [1, 2]}));
        assert_eq!(
            wrap_success(json!({"success": false})),
            json!({"success": false})
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_message() {
        let client = CollaboratorClient::new(ServiceEndpoints {
            terminal_url: "http://127.0.0.1:1".to_string(),
            editor_url: "http://127.0.0.1:1".to_string(),
            mission_url: "http://127.0.0.1:1".to_string(),
        });
        let err = client.terminal_list().await.unwrap_err();
        assert!(err.to_string().starts_with("Terminal service unavailable: "));

        let status = client.service_status().await;
        assert_eq!(status["services"]["mission"]["status"], "offline");
    }
}
