//! 进度上报：流水线各阶段的事件（可序列化为 JSON 供前端展示）
//!
//! 每个事件携带 PipelineStage，进度百分比由阶段计算，而不是匹配消息文本。
//! ProgressReporter 同步追加历史，并可把事件推送给调用方（mpsc）实时渲染。

use serde::Serialize;
use tokio::sync::mpsc;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// 调用 LLM 分析指令
    Analyzing,
    /// 已识别字段（汇总）
    Identified,
    ProjectSearch,
    ProjectFound,
    ModuleSearch,
    ModuleSelected,
    PhaseSearch,
    PhaseSelected,
    UserSearch,
    UserFound,
    /// 组装任务数据
    Preparing,
    /// 提交创建请求
    Submitting,
    Completed,
}

impl PipelineStage {
    /// 该阶段对应的进度百分比
    pub fn percent(&self) -> u8 {
        match self {
            PipelineStage::Analyzing => 10,
            PipelineStage::Identified => 20,
            PipelineStage::ProjectSearch => 30,
            PipelineStage::ProjectFound => 40,
            PipelineStage::ModuleSearch => 50,
            PipelineStage::ModuleSelected => 60,
            PipelineStage::PhaseSearch => 65,
            PipelineStage::PhaseSelected => 70,
            PipelineStage::UserSearch => 80,
            PipelineStage::UserFound => 85,
            PipelineStage::Preparing => 90,
            PipelineStage::Submitting => 95,
            PipelineStage::Completed => 100,
        }
    }
}

/// 单条进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub message: String,
    pub is_error: bool,
}

impl ProgressEvent {
    /// 错误事件进度归零
    pub fn percent(&self) -> u8 {
        if self.is_error {
            0
        } else {
            self.stage.percent()
        }
    }
}

/// 一次运行的进度记录器：追加历史，可选推送到 sink
#[derive(Debug, Default)]
pub struct ProgressReporter {
    history: Vec<ProgressEvent>,
    sink: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            history: Vec::new(),
            sink: Some(sink),
        }
    }

    pub fn emit(&mut self, stage: PipelineStage, message: impl Into<String>) {
        self.push(stage, message.into(), false);
    }

    pub fn emit_error(&mut self, stage: PipelineStage, message: impl Into<String>) {
        self.push(stage, message.into(), true);
    }

    fn push(&mut self, stage: PipelineStage, message: String, is_error: bool) {
        if is_error {
            tracing::warn!(stage = ?stage, "{}", message);
        } else {
            tracing::info!(stage = ?stage, "{}", message);
        }
        let event = ProgressEvent {
            stage,
            message,
            is_error,
        };
        if let Some(tx) = &self.sink {
            // 接收端已关闭时只保留历史
            let _ = tx.send(event.clone());
        }
        self.history.push(event);
    }

    pub fn history(&self) -> &[ProgressEvent] {
        &self.history
    }

    pub fn last(&self) -> Option<&ProgressEvent> {
        self.history.last()
    }

    /// 最近一个非错误事件的进度
    pub fn percent(&self) -> u8 {
        self.history
            .iter()
            .rev()
            .find(|e| !e.is_error)
            .map(|e| e.percent())
            .unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn into_history(self) -> Vec<ProgressEvent> {
        self.history
    }
}
