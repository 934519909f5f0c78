//! 任务创建编排器
//!
//! 严格顺序：项目 → 模块 → 阶段 → 用户 → 组装 → 提交。每个阶段在远端调用前上报一条「查找中」，
//! 之后上报一条「已解析」；任何阶段失败都只上报一条终止错误事件并立即返回，后续阶段不再执行。
//! 项目名必须匹配；模块 / 阶段 / 用户未匹配时回退到列表第一个。

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;

use crate::catalog::{CreatedTask, Project, TaskApi, TaskCreationPayload};
use crate::core::{EntityKind, TaskError};
use crate::intent::CreateActivityArgs;
use crate::progress::{PipelineStage, ProgressReporter};
use crate::resolver::{closest, resolve, MatchPolicy};

const STATUS_ID: i64 = 1;
const TYPE_ID: i64 = 5;
const PRIORITY_ID: i64 = 1;
const DEFAULT_ESTIMATED_HOURS: &str = "2";
const DEFAULT_ESTIMATED_MINUTES: &str = "0";

/// 成功创建后的结果
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub project: Project,
    pub payload: TaskCreationPayload,
    pub task: CreatedTask,
    /// 最终提示（与最后一条进度事件相同）
    pub message: String,
}

/// 已解析出的各实体 id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIds {
    pub project_id: i64,
    pub module_id: i64,
    pub phase_id: i64,
    pub responsible_id: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// 组装提交数据：默认 2 小时 0 分钟，计划开始 / 结束日期均为 now
pub fn build_payload(
    args: &CreateActivityArgs,
    ids: ResolvedIds,
    now: DateTime<Utc>,
) -> TaskCreationPayload {
    let planned = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    TaskCreationPayload {
        project_id: ids.project_id,
        status_id: STATUS_ID,
        is_incidence: false,
        is_delayed: false,
        name: args.title.clone(),
        type_id: TYPE_ID,
        phase_id: ids.phase_id,
        module_id: ids.module_id,
        planned_start_date: planned.clone(),
        planned_end_date: planned,
        priority_id: PRIORITY_ID,
        estimated_hours: non_empty(&args.estimated_hours)
            .unwrap_or(DEFAULT_ESTIMATED_HOURS)
            .to_string(),
        estimated_minutes: non_empty(&args.estimated_minutes)
            .unwrap_or(DEFAULT_ESTIMATED_MINUTES)
            .to_string(),
        responsible_id: ids.responsible_id,
    }
}

/// 识别字段汇总（在任何网络调用之前上报）
fn summary(args: &CreateActivityArgs) -> String {
    let module = non_empty(&args.module_name)
        .map(String::from)
        .unwrap_or_else(|| "(se usará el primero disponible)".to_string());
    let phase = non_empty(&args.phase_name)
        .map(String::from)
        .unwrap_or_else(|| "(se usará la primera disponible)".to_string());
    format!(
        "📋 Campos identificados:\n• Proyecto: {}\n• Tarea: {}\n• Usuario: {}\n• Módulo: {}\n• Fase: {}",
        args.project_name, args.title, args.user_name, module, phase
    )
}

/// 阶段对应的动作描述（用于错误提示）
fn action(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::ProjectSearch | PipelineStage::ProjectFound => "buscar el proyecto",
        PipelineStage::ModuleSearch | PipelineStage::ModuleSelected => "obtener los módulos",
        PipelineStage::PhaseSearch | PipelineStage::PhaseSelected => "obtener las fases",
        PipelineStage::UserSearch | PipelineStage::UserFound => "buscar el usuario",
        PipelineStage::Submitting | PipelineStage::Completed => "crear la tarea",
        _ => "procesar el comando",
    }
}

/// 终止错误事件的文本
pub fn failure_message(err: &TaskError, stage: PipelineStage) -> String {
    match err {
        TaskError::NotFound { message, .. } => message.clone(),
        TaskError::Validation(m) => format!("❌ Datos inválidos: {}", m),
        TaskError::Auth(m) => format!("❌ Error de autenticación: {}", m),
        TaskError::HttpStatus { status, message } => {
            format!("❌ Error al {} ({}): {}", action(stage), status, message)
        }
        TaskError::Timeout(_) => {
            format!("❌ Tiempo de espera agotado al {}.", action(stage))
        }
        TaskError::Network(m) => format!("❌ Error al {}: {}", action(stage), m),
        TaskError::Cancelled => "⛔ Operación cancelada.".to_string(),
        other => format!("❌ Error al {}: {}", action(stage), other),
    }
}

/// 编排器：持有 TaskApi，create_activity 跑完整条流水线
pub struct TaskOrchestrator {
    api: Arc<dyn TaskApi>,
}

impl TaskOrchestrator {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self { api }
    }

    /// 解析名称并创建任务；失败时已上报一条终止错误事件
    pub async fn create_activity(
        &self,
        args: &CreateActivityArgs,
        token: &str,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ActivityOutcome, TaskError> {
        let mut stage = PipelineStage::Identified;
        let result = self.run(args, token, reporter, cancel, &mut stage).await;
        if let Err(e) = &result {
            reporter.emit_error(stage, failure_message(e, stage));
        }
        result
    }

    async fn run(
        &self,
        args: &CreateActivityArgs,
        token: &str,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
        stage: &mut PipelineStage,
    ) -> Result<ActivityOutcome, TaskError> {
        args.validate()?;
        if token.trim().is_empty() {
            return Err(TaskError::Auth("Por favor, inicia sesión primero.".to_string()));
        }
        reporter.emit(PipelineStage::Identified, summary(args));

        // 项目：必须匹配
        *stage = PipelineStage::ProjectSearch;
        ensure_active(cancel)?;
        reporter.emit(*stage, format!("🔍 Buscando proyecto \"{}\"...", args.project_name));
        let projects = self.api.list_projects(token, &args.project_name).await?;
        let project = match resolve(&projects, Some(args.project_name.as_str()), MatchPolicy::Strict) {
            Some(p) => p.clone(),
            None => {
                if let Some(hint) = closest(&projects, &args.project_name) {
                    reporter.emit(*stage, format!("💡 ¿Quisiste decir \"{}\"?", hint.name));
                }
                return Err(TaskError::NotFound {
                    entity: EntityKind::Project,
                    message: format!("❌ Proyecto \"{}\" no encontrado.", args.project_name),
                });
            }
        };
        reporter.emit(
            PipelineStage::ProjectFound,
            format!("✅ Proyecto encontrado: {} (ID: {})", project.name, project.id),
        );

        // 模块
        *stage = PipelineStage::ModuleSearch;
        ensure_active(cancel)?;
        let module_name = non_empty(&args.module_name);
        reporter.emit(
            *stage,
            match module_name {
                Some(name) => format!("🔍 Buscando módulo \"{}\"...", name),
                None => "🔍 Obteniendo primer módulo disponible...".to_string(),
            },
        );
        let modules = self.api.list_modules(token, project.id).await?;
        let module = resolve(&modules, module_name, MatchPolicy::FallbackToFirst).ok_or_else(|| {
            TaskError::NotFound {
                entity: EntityKind::Module,
                message: match module_name {
                    Some(name) => format!("❌ Módulo \"{}\" no encontrado en el proyecto.", name),
                    None => "❌ No se encontraron módulos en el proyecto.".to_string(),
                },
            }
        })?;
        log_fallback(EntityKind::Module, module_name, &module.name);
        reporter.emit(
            PipelineStage::ModuleSelected,
            format!("✅ Módulo seleccionado: {} (ID: {})", module.name, module.id),
        );

        // 阶段
        *stage = PipelineStage::PhaseSearch;
        ensure_active(cancel)?;
        let phase_name = non_empty(&args.phase_name);
        reporter.emit(
            *stage,
            match phase_name {
                Some(name) => format!("🔍 Buscando fase \"{}\"...", name),
                None => "🔍 Obteniendo primera fase disponible...".to_string(),
            },
        );
        let phases = self.api.list_phases(token, project.id).await?;
        let phase = resolve(&phases, phase_name, MatchPolicy::FallbackToFirst).ok_or_else(|| {
            TaskError::NotFound {
                entity: EntityKind::Phase,
                message: match phase_name {
                    Some(name) => format!("❌ Fase \"{}\" no encontrada en el proyecto.", name),
                    None => "❌ No se encontraron fases en el proyecto.".to_string(),
                },
            }
        })?;
        log_fallback(EntityKind::Phase, phase_name, &phase.name);
        reporter.emit(
            PipelineStage::PhaseSelected,
            format!("✅ Fase seleccionada: {} (ID: {})", phase.name, phase.id),
        );

        // 用户
        *stage = PipelineStage::UserSearch;
        ensure_active(cancel)?;
        reporter.emit(*stage, format!("🔍 Buscando usuario \"{}\"...", args.user_name));
        let users = self.api.list_users(token, project.id).await?;
        let user = resolve(&users, Some(args.user_name.as_str()), MatchPolicy::FallbackToFirst).ok_or_else(
            || TaskError::NotFound {
                entity: EntityKind::User,
                message: format!(
                    "❌ Usuario \"{}\" no encontrado en el proyecto.",
                    args.user_name
                ),
            },
        )?;
        log_fallback(EntityKind::User, Some(args.user_name.as_str()), &user.full_name);
        reporter.emit(
            PipelineStage::UserFound,
            format!("✅ Usuario encontrado: {} (ID: {})", user.full_name, user.id),
        );

        *stage = PipelineStage::Preparing;
        reporter.emit(*stage, "📅 Preparando información de la tarea...");
        let ids = ResolvedIds {
            project_id: project.id,
            module_id: module.id,
            phase_id: phase.id,
            responsible_id: user.id,
        };
        let payload = build_payload(args, ids, Utc::now());

        // 取消只在提交前生效
        *stage = PipelineStage::Submitting;
        ensure_active(cancel)?;
        reporter.emit(*stage, "🚀 Creando tarea en el sistema...");
        let task = self.api.create_activity(token, &payload).await?;

        let message = format!(
            "✅ ¡Tarea \"{}\" creada con éxito en el proyecto {}! (ID: {})",
            task.name, project.name, task.id
        );
        reporter.emit(PipelineStage::Completed, message.clone());

        Ok(ActivityOutcome {
            project,
            payload,
            task,
            message,
        })
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), TaskError> {
    if cancel.is_cancelled() {
        Err(TaskError::Cancelled)
    } else {
        Ok(())
    }
}

fn log_fallback(entity: EntityKind, requested: Option<&str>, selected: &str) {
    if let Some(name) = requested {
        if !selected.to_lowercase().contains(&name.to_lowercase()) {
            tracing::warn!(%entity, requested = name, selected, "no match, using first available");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids() -> ResolvedIds {
        ResolvedIds {
            project_id: 1,
            module_id: 10,
            phase_id: 20,
            responsible_id: 30,
        }
    }

    #[test]
    fn test_build_payload_defaults() {
        let args = CreateActivityArgs::new("Kronos", "Revisar login", "Usuario");
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let payload = build_payload(&args, ids(), now);
        assert_eq!(payload.estimated_hours, "2");
        assert_eq!(payload.estimated_minutes, "0");
        assert_eq!(payload.status_id, 1);
        assert_eq!(payload.type_id, 5);
        assert_eq!(payload.priority_id, 1);
        assert!(!payload.is_incidence);
        assert!(!payload.is_delayed);
        assert_eq!(payload.planned_start_date, "2026-10-18T09:30:00.000Z");
        assert_eq!(payload.planned_start_date, payload.planned_end_date);
    }

    #[test]
    fn test_build_payload_explicit_estimates() {
        let mut args = CreateActivityArgs::new("Kronos", "t", "Ana");
        args.estimated_hours = Some("4".into());
        args.estimated_minutes = Some("".into());
        let payload = build_payload(&args, ids(), Utc::now());
        assert_eq!(payload.estimated_hours, "4");
        assert_eq!(payload.estimated_minutes, "0");
    }

    #[test]
    fn test_summary_annotations() {
        let mut args = CreateActivityArgs::new("Kronos", "t", "Ana");
        let text = summary(&args);
        assert!(text.contains("(se usará el primero disponible)"));
        assert!(text.contains("(se usará la primera disponible)"));

        args.module_name = Some("Frontend".into());
        let text = summary(&args);
        assert!(text.contains("• Módulo: Frontend"));
    }

    #[test]
    fn test_failure_message_http_status() {
        let err = TaskError::HttpStatus {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(
            failure_message(&err, PipelineStage::Submitting),
            "❌ Error al crear la tarea (500): boom"
        );
        let timeout = TaskError::Timeout("GET /projects".into());
        assert!(failure_message(&timeout, PipelineStage::ProjectSearch).contains("buscar el proyecto"));
    }
}
