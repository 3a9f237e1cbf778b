//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **PidFileLock**: PID を書き込むロックファイル（InstanceLock）
//! - **TracingEventSink**: tracing へ出力する EventSink（デフォルト）
//! - **MemoryEventSink**: 記録する（テスト用）

pub mod event_sinks;
pub mod pid_file;

pub use self::event_sinks::{MemoryEventSink, TracingEventSink};
pub use self::pid_file::PidFileLock;
