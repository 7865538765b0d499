//! 通知轨迹记录（结构化，用于比对参考轨迹与离线分析）

use serde::{Deserialize, Serialize};

use crate::mac::{AccessStats, Notification};

/// 一条通知：时刻、Txop 下标与通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub t_ns: u64,
    pub txop: usize,
    pub kind: Notification,
}

impl TraceRecord {
    pub fn t_us(&self) -> u64 {
        self.t_ns / 1_000
    }
}

/// 写入 `--trace-json` 的文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(default)]
    pub name: Option<String>,
    pub end_ns: u64,
    pub stats: AccessStats,
    pub records: Vec<TraceRecord>,
}
