//! Voicetask - 语音指令创建任务
//!
//! 模块划分：
//! - **agent**: 无头运行时（意图抽取 + 任务创建，单会话互斥）
//! - **catalog**: 任务管理后端抽象与 HTTP 实现
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话互斥与中断
//! - **intent**: 意图 schema 与抽取适配器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **orchestrator**: 项目 → 模块 → 阶段 → 用户 → 提交 的编排
//! - **progress**: 阶段化进度事件
//! - **resolver**: 名称解析（子串匹配 + 回退策略）

pub mod agent;
pub mod catalog;
pub mod config;
pub mod core;
pub mod intent;
pub mod llm;
pub mod observability;
pub mod orchestrator;
pub mod progress;
pub mod resolver;

pub use agent::VoiceAgent;
pub use orchestrator::{ActivityOutcome, TaskOrchestrator};
pub use progress::{PipelineStage, ProgressEvent, ProgressReporter};
