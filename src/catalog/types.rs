//! 任务管理后端的数据结构
//!
//! 响应统一包在 `{statusCode, data, message}` 中；只反序列化解析所需字段，其余字段忽略。

use serde::{Deserialize, Serialize};

use crate::resolver::Candidate;

/// 响应信封
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status_code: Option<u16>,
    pub data: T,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub client: Option<Client>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub full_name: String,
}

/// 创建成功后返回的任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: i64,
    pub name: String,
}

/// POST /activities/activity 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreationPayload {
    pub project_id: i64,
    pub status_id: i64,
    pub is_incidence: bool,
    pub is_delayed: bool,
    pub name: String,
    pub type_id: i64,
    pub phase_id: i64,
    pub module_id: i64,
    pub planned_start_date: String,
    pub planned_end_date: String,
    pub priority_id: i64,
    pub estimated_hours: String,
    pub estimated_minutes: String,
    pub responsible_id: i64,
}

impl Candidate for Project {
    fn id(&self) -> i64 {
        self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Candidate for Module {
    fn id(&self) -> i64 {
        self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Candidate for Phase {
    fn id(&self) -> i64 {
        self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Candidate for User {
    fn id(&self) -> i64 {
        self.id
    }
    fn display_name(&self) -> &str {
        &self.full_name
    }
}
