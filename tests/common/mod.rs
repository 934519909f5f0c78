//! 测试用内存 TaskApi：记录调用顺序，可注入错误或在项目查询处阻塞

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use voicetask::catalog::{CreatedTask, Module, Phase, Project, TaskApi, TaskCreationPayload, User};
use voicetask::core::TaskError;

#[derive(Default)]
pub struct FakeTaskApi {
    pub projects: Vec<Project>,
    pub modules: Vec<Module>,
    pub phases: Vec<Phase>,
    pub users: Vec<User>,
    /// list_projects 返回该错误
    pub projects_error: Mutex<Option<TaskError>>,
    /// create_activity 返回该错误
    pub submit_error: Mutex<Option<TaskError>>,
    /// 为 true 时 list_projects 先通知 entered，再等待 release
    pub gated: bool,
    pub entered: Notify,
    pub release: Notify,
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Option<TaskCreationPayload>>,
    pub tokens: Mutex<Vec<String>>,
}

pub fn project(id: i64, name: &str) -> Project {
    Project {
        id,
        name: name.to_string(),
        status: Some("active".to_string()),
        client: None,
    }
}

pub fn module(id: i64, name: &str) -> Module {
    Module {
        id,
        name: name.to_string(),
    }
}

pub fn phase(id: i64, name: &str) -> Phase {
    Phase {
        id,
        name: name.to_string(),
    }
}

pub fn user(id: i64, full_name: &str) -> User {
    User {
        id,
        full_name: full_name.to_string(),
    }
}

impl FakeTaskApi {
    /// 场景 A 的目录：Kronos / Frontend / Desarrollo / Usuario Default
    pub fn kronos() -> Self {
        Self {
            projects: vec![project(1, "Kronos")],
            modules: vec![module(10, "Frontend")],
            phases: vec![phase(20, "Desarrollo")],
            users: vec![user(30, "Usuario Default")],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Option<TaskCreationPayload> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, call: &str, token: &str) {
        self.calls.lock().unwrap().push(call.to_string());
        self.tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn list_projects(&self, token: &str, _name_filter: &str) -> Result<Vec<Project>, TaskError> {
        self.record("projects", token);
        if self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if let Some(e) = self.projects_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.projects.clone())
    }

    async fn list_modules(&self, token: &str, _project_id: i64) -> Result<Vec<Module>, TaskError> {
        self.record("modules", token);
        Ok(self.modules.clone())
    }

    async fn list_phases(&self, token: &str, _project_id: i64) -> Result<Vec<Phase>, TaskError> {
        self.record("phases", token);
        Ok(self.phases.clone())
    }

    async fn list_users(&self, token: &str, _project_id: i64) -> Result<Vec<User>, TaskError> {
        self.record("users", token);
        Ok(self.users.clone())
    }

    async fn create_activity(
        &self,
        token: &str,
        payload: &TaskCreationPayload,
    ) -> Result<CreatedTask, TaskError> {
        self.record("create", token);
        if let Some(e) = self.submit_error.lock().unwrap().take() {
            return Err(e);
        }
        *self.submitted.lock().unwrap() = Some(payload.clone());
        Ok(CreatedTask {
            id: 501,
            name: payload.name.clone(),
        })
    }
}
