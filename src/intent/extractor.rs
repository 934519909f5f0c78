//! 意图抽取适配器
//!
//! 把转写文本交给 LLM，从回复中提取 JSON（```json 代码块或首个 `{` 到最后一个 `}`），再按 schema 校验。
//! 单次调用有超时上限；超时、调用失败或输出不是 JSON 时返回 Provider 类错误，不在内部重试。

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout;

use crate::core::TaskError;
use crate::intent::{intent_schema_json, Intent};
use crate::llm::{LlmClient, Message};

const DEFAULT_RULES: &str = r#"You are an AI assistant that processes voice commands to create tasks.

You will receive the transcribed text of a voice command, and you need to extract the information to create a task.

RULES:
- projectName, title, and userName are REQUIRED
- moduleName and phaseName are OPTIONAL (only if explicitly mentioned)
- estimatedHours and estimatedMinutes are OPTIONAL strings (only if explicitly mentioned)
- If no user is mentioned, use "Usuario"

The tool is always "createActivity". Respond ONLY with valid JSON.

Example:
{"tool": "createActivity","args": {"projectName":"Kronos","title":"Revisar login","userName":"Usuario"}}"#;

/// 从 LLM 输出中截取 JSON 文本
fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 解析并校验 LLM 原始输出：非 JSON 为 Provider，JSON 不符合 schema 为 Validation
pub fn parse_intent(output: &str) -> Result<Intent, TaskError> {
    let json_str = extract_json(output)
        .ok_or_else(|| TaskError::Provider(format!("no JSON object in response: {}", preview(output))))?;
    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| TaskError::Provider(format!("malformed JSON ({}): {}", e, preview(json_str))))?;
    Intent::from_value(&value)
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

/// 意图抽取器：持有 LLM 与超时，extract / extract_streaming 返回校验后的 Intent
pub struct IntentExtractor {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    system_prompt: String,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        let system_prompt = format!(
            "{}\n\nThe output must match this JSON Schema:\n{}",
            DEFAULT_RULES,
            intent_schema_json()
        );
        Self {
            llm,
            timeout: Duration::from_secs(timeout_secs),
            system_prompt,
        }
    }

    /// 替换默认规则（如从 config/prompts 读取）；schema 仍会追加在末尾
    pub fn with_rules(mut self, rules: &str) -> Self {
        self.system_prompt = format!(
            "{}\n\nThe output must match this JSON Schema:\n{}",
            rules,
            intent_schema_json()
        );
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn messages(&self, transcript: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!(
                "Voice Command: {}\n\nRespond with valid JSON only:",
                transcript
            )),
        ]
    }

    /// 非流式抽取
    pub async fn extract(&self, transcript: &str) -> Result<Intent, TaskError> {
        let messages = self.messages(transcript);
        let output = match timeout(self.timeout, self.llm.complete(&messages)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(TaskError::Provider(e)),
            Err(_) => return Err(TaskError::ProviderTimeout(self.timeout.as_secs())),
        };
        tracing::debug!(output = %preview(&output), "intent raw output");
        parse_intent(&output)
    }

    /// 流式抽取：每收到一段调用 on_chunk（传入已累计的文本），结束后解析完整输出
    pub async fn extract_streaming(
        &self,
        transcript: &str,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Intent, TaskError> {
        let messages = self.messages(transcript);
        let collect = async {
            let mut stream = self.llm.complete_stream(&messages).await?;
            let mut full = String::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if chunk.is_empty() {
                    continue;
                }
                full.push_str(&chunk);
                on_chunk(&full);
            }
            Ok::<String, String>(full)
        };

        let output = match timeout(self.timeout, collect).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(TaskError::Provider(e)),
            Err(_) => return Err(TaskError::ProviderTimeout(self.timeout.as_secs())),
        };
        parse_intent(&output)
    }
}
