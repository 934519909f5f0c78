//! Voicetask 命令行入口
//!
//! 初始化日志与配置，构建 VoiceAgent；带参数时处理一条指令，否则逐行读取 stdin（每行一条转写文本）。
//! 进度事件实时打印到 stdout，Ctrl+C 取消当前指令。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use voicetask::config::{load_config, AppConfig};
use voicetask::{observability, ProgressEvent, ProgressReporter, VoiceAgent};

#[derive(Debug, Parser)]
#[command(name = "voicetask", about = "Crea tareas a partir de comandos de voz transcritos")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bearer token（覆盖配置 [auth].token）
    #[arg(long)]
    token: Option<String>,

    /// 启用流式意图抽取
    #[arg(long)]
    stream: bool,

    /// 转写文本；为空时从 stdin 逐行读取
    text: Vec<String>,
}

fn print_event(event: &ProgressEvent) {
    let mark = if event.is_error { "ERR" } else { "   " };
    println!("[{:>3}%]{} {}", event.percent(), mark, event.message);
}

/// 处理一条指令：事件经 mpsc 推给打印任务，运行结束后等待打印完毕
async fn run_command(agent: &VoiceAgent, text: &str, token: &str) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let mut reporter = ProgressReporter::with_sink(tx);
    let result = agent.process_command(text, token, &mut reporter).await;
    drop(reporter);
    let _ = printer.await;

    match result {
        Ok(outcome) => {
            tracing::info!(task_id = outcome.task.id, project = %outcome.project.name, "task created");
            true
        }
        Err(e) => {
            tracing::warn!("command failed: {}", e);
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    if cli.stream {
        cfg.llm.streaming = true;
    }
    let token = cli
        .token
        .clone()
        .or_else(|| cfg.auth.token.clone())
        .unwrap_or_default();

    let agent = Arc::new(VoiceAgent::from_config(&cfg).context("Failed to create agent")?);

    let abort_agent = agent.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if abort_agent.is_busy() {
                abort_agent.abort();
            } else {
                std::process::exit(130);
            }
        }
    });

    if !cli.text.is_empty() {
        let text = cli.text.join(" ");
        if !run_command(&agent, &text, &token).await {
            anyhow::bail!("command failed");
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        run_command(&agent, &line, &token).await;
    }
    Ok(())
}
