//! HTTP 实现：reqwest 客户端，统一 Bearer 头与超时
//!
//! 每次请求输出结构化审计日志（JSON，不含 token）；401/403 映射为 Auth，其它非 2xx 映射为 HttpStatus，
//! 超时映射为 Timeout。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::catalog::{
    ApiEnvelope, CreatedTask, Module, Phase, Project, TaskApi, TaskCreationPayload, User,
};
use crate::config::ApiSection;
use crate::core::TaskError;

/// 任务管理后端的 HTTP 客户端
#[derive(Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
    users_page_size: u32,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, timeout_secs: u64, users_page_size: u32) -> Result<Self, TaskError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TaskError::ConfigError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            users_page_size,
        })
    }

    pub fn from_config(api: &ApiSection) -> Result<Self, TaskError> {
        Self::new(&api.base_url, api.timeout_secs, api.users_page_size)
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, TaskError> {
        let start = Instant::now();
        let result = builder.send().await;

        let status = result.as_ref().ok().map(|r| r.status().as_u16());
        let audit = serde_json::json!({
            "event": "api_audit",
            "method": method.as_str(),
            "path": path,
            "status": status,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "api");

        let response = result.map_err(|e| {
            if e.is_timeout() {
                TaskError::Timeout(format!("{} {}", method, path))
            } else {
                TaskError::Network(e.to_string())
            }
        })?;

        let response = check_status(response).await?;
        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TaskError::Timeout(format!("{} {}", method, path))
            } else {
                TaskError::Network(format!("invalid response body: {}", e))
            }
        })?;
        Ok(envelope.data)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T, TaskError> {
        let builder = self.request(Method::GET, path, token).query(query);
        self.send(Method::GET, path, builder).await
    }
}

/// 非 2xx 转为错误；401/403 视为认证失败
async fn check_status(response: Response) -> Result<Response, TaskError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TaskError::Auth(format!("{} {}", status.as_u16(), message)));
    }
    Err(TaskError::HttpStatus {
        status: status.as_u16(),
        message,
    })
}

/// 从错误响应体中取 message（字符串或字符串数组）
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_projects(&self, token: &str, name_filter: &str) -> Result<Vec<Project>, TaskError> {
        self.get(
            "/projects",
            token,
            &[("filters[name]", name_filter.to_string())],
        )
        .await
    }

    async fn list_modules(&self, token: &str, project_id: i64) -> Result<Vec<Module>, TaskError> {
        let path = format!("/projects/project/{}/module", project_id);
        self.get(&path, token, &[]).await
    }

    async fn list_phases(&self, token: &str, project_id: i64) -> Result<Vec<Phase>, TaskError> {
        let path = format!("/projects/project/{}/phase", project_id);
        self.get(&path, token, &[]).await
    }

    async fn list_users(&self, token: &str, project_id: i64) -> Result<Vec<User>, TaskError> {
        self.get(
            "/admin/users/find",
            token,
            &[
                ("pagination[page]", "1".to_string()),
                ("pagination[pageSize]", self.users_page_size.to_string()),
                ("filters[projectIds][]", project_id.to_string()),
            ],
        )
        .await
    }

    async fn create_activity(
        &self,
        token: &str,
        payload: &TaskCreationPayload,
    ) -> Result<CreatedTask, TaskError> {
        let path = "/activities/activity";
        let builder = self.request(Method::POST, path, token).json(payload);
        self.send(Method::POST, path, builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// 读取一个完整请求（请求头 + Content-Length 指定的请求体）
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// 本地单次 HTTP 服务：返回固定响应，JoinHandle 产出收到的原始请求
    async fn serve_once(status: &'static str, body: &'static str) -> (HttpTaskApi, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });
        let api = HttpTaskApi::new(&format!("http://{}", addr), 5, 15).unwrap();
        (api, handle)
    }

    #[tokio::test]
    async fn test_list_projects_sends_bearer_and_filter() {
        let (api, server) = serve_once(
            "200 OK",
            r#"{"statusCode": 200, "data": [{"id": 1, "name": "Kronos"}], "message": null}"#,
        )
        .await;

        let projects = api.list_projects("tok-9", "Kronos").await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, 1);

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("GET /projects?"));
        assert!(request.contains("Kronos"));
        assert!(lower.contains("authorization: bearer tok-9"));
        assert!(lower.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_auth() {
        let (api, server) = serve_once("403 Forbidden", r#"{"statusCode": 403, "message": "no"}"#).await;

        let err = api.list_modules("tok", 1).await.unwrap_err();
        assert!(matches!(err, TaskError::Auth(ref m) if m.contains("403") && m.contains("no")));
        assert!(server.await.unwrap().starts_with("GET /projects/project/1/module"));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let (api, _server) = serve_once("401 Unauthorized", "").await;
        let err = api.list_phases("expired", 7).await.unwrap_err();
        assert!(matches!(err, TaskError::Auth(ref m) if m.contains("401")));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_message() {
        let (api, server) = serve_once(
            "500 Internal Server Error",
            r#"{"statusCode": 500, "message": ["name should not be empty", "typeId must be an integer"]}"#,
        )
        .await;

        let payload = TaskCreationPayload {
            project_id: 1,
            status_id: 1,
            is_incidence: false,
            is_delayed: false,
            name: "Revisar login".into(),
            type_id: 5,
            phase_id: 20,
            module_id: 10,
            planned_start_date: "2026-10-18T09:30:00.000Z".into(),
            planned_end_date: "2026-10-18T09:30:00.000Z".into(),
            priority_id: 1,
            estimated_hours: "2".into(),
            estimated_minutes: "0".into(),
            responsible_id: 30,
        };
        let err = api.create_activity("tok", &payload).await.unwrap_err();
        match err {
            TaskError::HttpStatus { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "name should not be empty, typeId must be an integer");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /activities/activity"));
        assert!(request.contains("\"responsibleId\":30"));
        assert!(request.to_lowercase().contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_uses_reason() {
        let (api, _server) = serve_once("502 Bad Gateway", "<html>bad gateway</html>").await;
        let err = api.list_users("tok", 1).await.unwrap_err();
        assert!(matches!(err, TaskError::HttpStatus { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let api = HttpTaskApi::new(&format!("http://{}", addr), 1, 15).unwrap();
        let err = api.list_projects("tok", "Kronos").await.unwrap_err();
        assert!(matches!(err, TaskError::Timeout(ref m) if m.contains("/projects")));
    }

    #[test]
    fn test_error_message_string() {
        let body = r#"{"statusCode": 400, "message": "projectId must be a number"}"#;
        assert_eq!(error_message(body).as_deref(), Some("projectId must be a number"));
    }

    #[test]
    fn test_error_message_array() {
        let body = r#"{"message": ["name should not be empty", "typeId must be an integer"]}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("name should not be empty, typeId must be an integer")
        );
    }

    #[test]
    fn test_error_message_missing() {
        assert!(error_message("<html>bad gateway</html>").is_none());
        assert!(error_message(r#"{"message": null}"#).is_none());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = HttpTaskApi::new("https://pm.example.com/api/", 8, 15).unwrap();
        assert_eq!(api.base_url, "https://pm.example.com/api");
    }
}
