//! Mock LLM 客户端（用于测试与无 API Key 时的本地运行）
//!
//! 默认取最后一条 User 消息中的指令文本，回显为 createActivity 意图；也可指定固定回复、延迟或让流式调用失败。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{LlmClient, Message, Role, TokenStream};

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    response: Option<String>,
    delay: Option<Duration>,
    fail_stream: bool,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 固定回复
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..Self::default()
        }
    }

    /// 每次调用前等待（用于超时测试）
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// complete_stream 直接返回错误（用于回退测试）
    pub fn failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    /// complete + complete_stream 的累计调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply(&self, messages: &[Message]) -> String {
        if let Some(r) = &self.response {
            return r.clone();
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        let text = last_user
            .strip_prefix("Voice Command:")
            .unwrap_or(last_user);
        let text = text.split("\n\n").next().unwrap_or(text).trim();
        serde_json::json!({
            "tool": "createActivity",
            "args": {
                "projectName": "Kronos",
                "title": text,
                "userName": "Usuario"
            }
        })
        .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        Ok(self.reply(messages))
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<TokenStream, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stream {
            return Err("stream unavailable".to_string());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let content = self.reply(messages);
        let mid = content
            .char_indices()
            .nth(content.chars().count() / 2)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let (a, b) = content.split_at(mid);
        Ok(Box::pin(stream::iter(vec![Ok(a.to_string()), Ok(b.to_string())])))
    }
}
