//! 意图 schema：`{"tool": "createActivity", "args": {...}}`
//!
//! LLM 输出是不可信文本，先解析为 JSON，再逐字段校验为 Intent；
//! schemars 生成的 JSON Schema 拼入 prompt，减少格式错误。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::TaskError;

/// 支持的工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Tool {
    #[serde(rename = "createActivity")]
    CreateActivity,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::CreateActivity => "createActivity",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "createActivity" => Some(Tool::CreateActivity),
            _ => None,
        }
    }
}

/// createActivity 的参数
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityArgs {
    /// 项目名（必填）
    pub project_name: String,
    /// 任务标题（必填）
    pub title: String,
    /// 负责人姓名（必填，未提及时为 "Usuario"）
    pub user_name: String,
    /// 模块名，仅在明确提及时给出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// 阶段名，仅在明确提及时给出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<String>,
}

impl CreateActivityArgs {
    pub fn new(
        project_name: impl Into<String>,
        title: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            title: title.into(),
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// 必填字段非空
    pub fn validate(&self) -> Result<(), TaskError> {
        let required = [
            ("projectName", &self.project_name),
            ("title", &self.title),
            ("userName", &self.user_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TaskError::Validation(format!("{} is required", name)));
            }
        }
        Ok(())
    }

    fn from_object(args: &Map<String, Value>) -> Result<Self, TaskError> {
        Ok(Self {
            project_name: required_string(args, "projectName")?,
            title: required_string(args, "title")?,
            user_name: required_string(args, "userName")?,
            module_name: optional_string(args, "moduleName")?,
            phase_name: optional_string(args, "phaseName")?,
            estimated_hours: optional_string(args, "estimatedHours")?,
            estimated_minutes: optional_string(args, "estimatedMinutes")?,
        })
    }
}

fn missing(key: &str) -> Result<String, TaskError> {
    Err(TaskError::Validation(format!("{} is required", key)))
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, TaskError> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) | Some(Value::Null) | None => missing(key),
        Some(other) => Err(TaskError::Validation(format!(
            "{} must be a string, got {}",
            key,
            type_name(other)
        ))),
    }
}

/// 可选字段：缺失、null、空串都视为未提供
fn optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, TaskError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok(if s.is_empty() { None } else { Some(s.to_string()) })
        }
        Some(other) => Err(TaskError::Validation(format!(
            "{} must be a string, got {}",
            key,
            type_name(other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 校验后的意图；只由 IntentExtractor 产生，交给编排器消费一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Intent {
    pub tool: Tool,
    pub args: CreateActivityArgs,
}

impl Intent {
    /// 把已解析的 JSON 校验为 Intent
    pub fn from_value(value: &Value) -> Result<Self, TaskError> {
        let obj = value
            .as_object()
            .ok_or_else(|| TaskError::Validation("expected a JSON object".to_string()))?;

        let tool_name = match obj.get("tool") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(TaskError::Validation(format!(
                    "tool must be a string, got {}",
                    type_name(other)
                )))
            }
            None => return Err(TaskError::Validation("tool is required".to_string())),
        };
        let tool = Tool::parse(tool_name)
            .ok_or_else(|| TaskError::Validation(format!("unsupported tool: {}", tool_name)))?;

        let args = match obj.get("args") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(TaskError::Validation(format!(
                    "args must be an object, got {}",
                    type_name(other)
                )))
            }
            None => return Err(TaskError::Validation("args is required".to_string())),
        };

        let args = match tool {
            Tool::CreateActivity => CreateActivityArgs::from_object(args)?,
        };
        Ok(Self { tool, args })
    }
}

/// 返回 Intent 的 JSON Schema 字符串，可拼入 prompt
pub fn intent_schema_json() -> String {
    let schema = schema_for!(Intent);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_minimal() {
        let v = json!({
            "tool": "createActivity",
            "args": {"projectName": "Kronos", "title": "Revisar login", "userName": "Usuario"}
        });
        let intent = Intent::from_value(&v).unwrap();
        assert_eq!(intent.tool, Tool::CreateActivity);
        assert_eq!(intent.args, CreateActivityArgs::new("Kronos", "Revisar login", "Usuario"));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let v = json!({"tool": "deleteActivity", "args": {}});
        let err = Intent::from_value(&v).unwrap_err();
        assert!(matches!(err, TaskError::Validation(ref m) if m.contains("deleteActivity")));
    }

    #[test]
    fn test_missing_required_rejected() {
        let v = json!({"tool": "createActivity", "args": {"projectName": "Kronos", "title": "x"}});
        let err = Intent::from_value(&v).unwrap_err();
        assert!(matches!(err, TaskError::Validation(ref m) if m.contains("userName")));
    }

    #[test]
    fn test_blank_required_rejected() {
        let v = json!({"tool": "createActivity", "args": {"projectName": "  ", "title": "x", "userName": "Ana"}});
        assert!(Intent::from_value(&v).is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let v = json!({
            "tool": "createActivity",
            "args": {"projectName": "Kronos", "title": "x", "userName": "Ana", "estimatedHours": 3}
        });
        let err = Intent::from_value(&v).unwrap_err();
        assert!(matches!(err, TaskError::Validation(ref m) if m.contains("estimatedHours") && m.contains("number")));
    }

    #[test]
    fn test_optional_null_and_empty_are_absent() {
        let v = json!({
            "tool": "createActivity",
            "args": {"projectName": "Kronos", "title": "x", "userName": "Ana", "moduleName": null, "phaseName": ""}
        });
        let intent = Intent::from_value(&v).unwrap();
        assert!(intent.args.module_name.is_none());
        assert!(intent.args.phase_name.is_none());
    }

    #[test]
    fn test_args_validate() {
        assert!(CreateActivityArgs::new("Kronos", "t", "Ana").validate().is_ok());
        assert!(CreateActivityArgs::new("Kronos", "", "Ana").validate().is_err());
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = intent_schema_json();
        assert!(schema.contains("projectName"));
        assert!(schema.contains("createActivity"));
    }
}
