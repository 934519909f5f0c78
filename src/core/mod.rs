//! 核心层：错误类型、会话互斥

pub mod error;
pub mod session;

pub use error::{EntityKind, TaskError};
pub use session::{RunPermit, SessionGuard};
