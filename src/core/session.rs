//! 会话监管：单命令互斥与中断
//!
//! 同一会话同时最多一个命令在执行：try_begin 成功时返回 RunPermit（drop 即释放），
//! 已有命令在执行时返回 Busy。每次运行有独立的 CancellationToken，abort 取消当前运行。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::core::TaskError;

/// 会话级互斥：busy 标志 + 当前运行的取消令牌
#[derive(Debug, Default)]
pub struct SessionGuard {
    busy: Arc<AtomicBool>,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

/// 一次运行的许可；drop 时清除令牌并释放 busy 标志
#[derive(Debug)]
pub struct RunPermit {
    busy: Arc<AtomicBool>,
    current: Arc<Mutex<Option<CancellationToken>>>,
    cancel_token: CancellationToken,
}

impl RunPermit {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = None;
        self.busy.store(false, Ordering::Release);
    }
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试开始一次运行；已有运行时返回 Busy，不排队
    ///
    /// busy 的置位与令牌安装都在 current 锁内完成，abort 不会落在两者之间。
    pub fn try_begin(&self) -> Result<RunPermit, TaskError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TaskError::Busy);
        }
        let token = CancellationToken::new();
        *current = Some(token.clone());
        Ok(RunPermit {
            busy: self.busy.clone(),
            current: self.current.clone(),
            cancel_token: token,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 取消当前运行（用户中断）；没有运行时什么也不做
    pub fn abort(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.as_ref() {
            token.cancel();
        }
    }
}
