//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::TaskError;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, DEEPSEEK_BASE_URL};
pub use traits::{LlmClient, TokenStream};

/// 根据配置与环境变量选择 LLM 后端
///
/// Mock 只在 provider = "mock" 时使用；openai / deepseek 缺少对应 API Key 时返回 ConfigError。
pub fn create_llm_from_config(llm: &LlmSection) -> Result<Arc<dyn LlmClient>, TaskError> {
    select_llm(
        llm,
        std::env::var("DEEPSEEK_API_KEY").ok(),
        std::env::var("OPENAI_API_KEY").ok(),
    )
}

fn select_llm(
    llm: &LlmSection,
    deepseek_key: Option<String>,
    openai_key: Option<String>,
) -> Result<Arc<dyn LlmClient>, TaskError> {
    let non_empty = |key: Option<String>| key.filter(|k| !k.trim().is_empty());

    match llm.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            Ok(Arc::new(MockLlmClient::new()))
        }
        "deepseek" => {
            let key = non_empty(deepseek_key).ok_or_else(|| {
                TaskError::ConfigError("provider deepseek requires DEEPSEEK_API_KEY".to_string())
            })?;
            let base = llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            tracing::info!("Using DeepSeek LLM ({})", llm.model);
            Ok(Arc::new(
                OpenAiClient::new(Some(base), &llm.model, Some(key.as_str()))
                    .with_sampling(llm.temperature, llm.max_tokens),
            ))
        }
        "openai" => {
            let key = non_empty(openai_key).ok_or_else(|| {
                TaskError::ConfigError("provider openai requires OPENAI_API_KEY".to_string())
            })?;
            tracing::info!("Using OpenAI LLM ({})", llm.model);
            Ok(Arc::new(
                OpenAiClient::new(llm.base_url.as_deref(), &llm.model, Some(key.as_str()))
                    .with_sampling(llm.temperature, llm.max_tokens),
            ))
        }
        other => Err(TaskError::ConfigError(format!(
            "unknown llm provider: {}",
            other
        ))),
    }
}
