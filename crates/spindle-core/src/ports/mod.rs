//! Ports - 抽象化レイヤー
//!
//! pool と driver が外部に依存する部分（イベントの出力先、時刻、単一起動ロック）を
//! trait として定義し、実装は `impls` に置く。

pub mod clock;
pub mod event_sink;
pub mod lock_file;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::lock_file::InstanceLock;
