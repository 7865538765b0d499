//! 场景脚本
//!
//! 用 JSON 描述时序参数、Txop 与一串带时间戳的介质/请求事件，
//! 在单个节点上重放并得到通知轨迹。

mod runner;
mod scripted;
mod spec;
mod trace;

pub use runner::{ScenarioError, ScenarioOutcome, run_scenario};
pub use scripted::{QueuedTx, ScriptedTxop, TraceLog, TxQueue};
pub use spec::{ScenarioSpec, ScriptAction, ScriptEvent, TimingSpec, TxopSpec};
pub use trace::{TraceFile, TraceRecord};
