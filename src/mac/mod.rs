//! 信道接入模块
//!
//! 共享无线介质上的 CSMA/CA（DCF/EDCA）接入仲裁：介质状态跟踪、各 Txop 的退避状态、
//! 接入协调器以及 ACK 超时监视。

// 子模块声明
mod ack_timeout;
mod config;
mod events;
mod id;
mod mac_world;
mod manager;
mod medium;
mod stats;
mod timer;
mod txop;

// 重新导出公共接口
pub use ack_timeout::AckTimeoutMonitor;
pub use config::{ChannelAccessConfig, ConfigError};
pub use events::{AccessTimeout, AckTimeoutExpired};
pub use id::{NodeId, TxopId};
pub use mac_world::MacWorld;
pub use manager::{ChannelAccessManager, DEFAULT_AIFSN};
pub use medium::MediumState;
pub use stats::AccessStats;
pub use timer::TimerSlot;
pub use txop::{AccessCategory, Notification, Txop};
