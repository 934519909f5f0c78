//! Headless 语音指令运行时
//!
//! 供 CLI / HTTP 等前端调用：process_command 对一条转写文本做意图抽取 + 任务创建，
//! 进度实时写入调用方提供的 ProgressReporter。同一 VoiceAgent 同时只处理一条命令，
//! 执行中再提交的命令直接返回 Busy，不影响正在运行的那一条。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::catalog::{HttpTaskApi, TaskApi};
use crate::config::AppConfig;
use crate::core::{SessionGuard, TaskError};
use crate::intent::{Intent, IntentExtractor};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::orchestrator::{ActivityOutcome, TaskOrchestrator};
use crate::progress::{PipelineStage, ProgressReporter};

/// 语音指令 Agent：意图抽取器 + 编排器 + 会话互斥
pub struct VoiceAgent {
    extractor: IntentExtractor,
    orchestrator: TaskOrchestrator,
    guard: SessionGuard,
    streaming: bool,
}

impl VoiceAgent {
    pub fn new(llm: Arc<dyn LlmClient>, api: Arc<dyn TaskApi>, llm_timeout_secs: u64) -> Self {
        Self {
            extractor: IntentExtractor::new(llm, llm_timeout_secs),
            orchestrator: TaskOrchestrator::new(api),
            guard: SessionGuard::new(),
            streaming: false,
        }
    }

    /// 从配置构建：LLM 后端按 provider 选择（缺 API Key 时报错，不回落到 Mock），任务后端走 HTTP
    pub fn from_config(cfg: &AppConfig) -> Result<Self, TaskError> {
        let llm = create_llm_from_config(&cfg.llm)?;
        let api = Arc::new(HttpTaskApi::from_config(&cfg.api)?);
        let mut agent = Self::new(llm, api, cfg.llm.timeout_secs).with_streaming(cfg.llm.streaming);

        let rules = ["config/prompts/intent.txt", "../config/prompts/intent.txt"]
            .into_iter()
            .find_map(|p| std::fs::read_to_string(p).ok());
        if let Some(rules) = rules {
            agent.extractor = agent.extractor.with_rules(&rules);
        }
        Ok(agent)
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// 用户中断：取消当前命令（提交前生效）
    pub fn abort(&self) {
        self.guard.abort();
    }

    /// 处理一条语音指令；失败时 reporter 中已有一条终止错误事件
    pub async fn process_command(
        &self,
        transcript: &str,
        token: &str,
        reporter: &mut ProgressReporter,
    ) -> Result<ActivityOutcome, TaskError> {
        let permit = match self.guard.try_begin() {
            Ok(p) => p,
            Err(e) => {
                reporter.emit_error(
                    PipelineStage::Analyzing,
                    "⏳ Ya hay un comando en proceso; espera a que termine.",
                );
                return Err(e);
            }
        };
        reporter.reset();
        let span = tracing::info_span!("command", run_id = %uuid::Uuid::new_v4());
        self.run(transcript, token, reporter, permit.cancel_token())
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        transcript: &str,
        token: &str,
        reporter: &mut ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<ActivityOutcome, TaskError> {
        if token.trim().is_empty() {
            reporter.emit_error(PipelineStage::Analyzing, "❌ Por favor, inicia sesión primero.");
            return Err(TaskError::Auth("missing bearer token".to_string()));
        }
        let transcript = transcript.trim();
        if transcript.is_empty() {
            reporter.emit_error(PipelineStage::Analyzing, "❌ No se detectó ningún comando de voz.");
            return Err(TaskError::Validation("empty transcript".to_string()));
        }

        reporter.emit(PipelineStage::Analyzing, "🤖 Analizando comando con IA...");
        let intent = match self.extract(transcript, reporter).await {
            Ok(intent) => intent,
            Err(e) => {
                reporter.emit_error(
                    PipelineStage::Analyzing,
                    format!("❌ Error al analizar el comando: {}", e),
                );
                return Err(e);
            }
        };
        reporter.emit(
            PipelineStage::Analyzing,
            format!("🎯 Comando procesado. Creando actividad: \"{}\"", intent.args.title),
        );

        self.orchestrator
            .create_activity(&intent.args, token, reporter, &cancel)
            .await
    }

    /// 流式模式下先走流式抽取；后端失败或超时时回退一次非流式
    async fn extract(
        &self,
        transcript: &str,
        reporter: &mut ProgressReporter,
    ) -> Result<Intent, TaskError> {
        if !self.streaming {
            return self.extractor.extract(transcript).await;
        }

        let streamed = self
            .extractor
            .extract_streaming(transcript, &mut |partial: &str| {
                reporter.emit(
                    PipelineStage::Analyzing,
                    format!("🤖 Procesando: {}...", tail(partial, 60)),
                );
            })
            .await;

        match streamed {
            Err(e @ (TaskError::Provider(_) | TaskError::ProviderTimeout(_))) => {
                tracing::warn!("streaming extraction failed ({}), falling back", e);
                reporter.emit(PipelineStage::Analyzing, "🔄 Usando método alternativo...");
                self.extractor.extract(transcript).await
            }
            other => other,
        }
    }
}

/// 取末尾最多 n 个字符
fn tail(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    s.char_indices().nth(skip).map(|(i, _)| &s[i..]).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "llama".to_string();
        assert!(matches!(
            VoiceAgent::from_config(&cfg),
            Err(TaskError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_config_without_key_never_uses_mock() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        // 默认 provider 为 openai：没有 key 时直接失败，不会用 Mock 去创建任务
        assert!(matches!(
            VoiceAgent::from_config(&AppConfig::default()),
            Err(TaskError::ConfigError(ref m)) if m.contains("OPENAI_API_KEY")
        ));

        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        assert!(VoiceAgent::from_config(&cfg).is_ok());
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("abc", 5), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("módulo", 4), "dulo");
    }
}
