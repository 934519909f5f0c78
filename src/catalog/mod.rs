//! 任务管理后端：TaskApi 抽象与 HTTP 实现
//!
//! 编排器只依赖 TaskApi；生产环境用 HttpTaskApi（reqwest + Bearer），测试注入内存假实现。

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::core::TaskError;

pub use http::HttpTaskApi;
pub use types::{
    ApiEnvelope, Client, CreatedTask, Module, Phase, Project, TaskCreationPayload, User,
};

/// 项目 / 模块 / 阶段 / 用户查询与任务创建
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// 列出项目；name_filter 作为服务端过滤条件透传，最终匹配由解析器完成
    async fn list_projects(&self, token: &str, name_filter: &str) -> Result<Vec<Project>, TaskError>;

    async fn list_modules(&self, token: &str, project_id: i64) -> Result<Vec<Module>, TaskError>;

    async fn list_phases(&self, token: &str, project_id: i64) -> Result<Vec<Phase>, TaskError>;

    async fn list_users(&self, token: &str, project_id: i64) -> Result<Vec<User>, TaskError>;

    async fn create_activity(
        &self,
        token: &str,
        payload: &TaskCreationPayload,
    ) -> Result<CreatedTask, TaskError>;
}
