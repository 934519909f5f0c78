//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `VOICETASK__*` 覆盖（双下划线表示嵌套，如 `VOICETASK__API__BASE_URL=...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub auth: AuthSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：意图抽取所用的模型与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；openai / deepseek 需要对应的 API Key
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 单次抽取超时（秒）
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// 先走流式抽取，失败时回退一次非流式
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
            streaming: false,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    8
}

fn default_max_tokens() -> u32 {
    300
}

/// [api] 段：任务管理后端
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// 每个 HTTP 请求的超时（秒）
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    /// 用户查询的分页大小
    #[serde(default = "default_users_page_size")]
    pub users_page_size: u32,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
            users_page_size: default_users_page_size(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_timeout_secs() -> u64 {
    8
}

fn default_users_page_size() -> u32 {
    15
}

/// [auth] 段：Bearer token（登录流程不在本 crate 内，token 由外部提供）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSection {
    pub token: Option<String>,
}

/// 从 config 目录加载配置，环境变量 VOICETASK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 VOICETASK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("VOICETASK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
