//! 场景运行器
//!
//! 把 `ScenarioSpec` 中的脚本事件调度进仿真器，驱动单个节点的协调器，
//! 返回按时间排序的通知轨迹。

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info};

use super::scripted::{QueuedTx, ScriptedTxop, TraceLog, TxQueue};
use super::spec::{ScenarioSpec, ScriptAction, TimingSpec};
use super::trace::{TraceFile, TraceRecord};
use crate::mac::{AccessStats, ChannelAccessConfig, ConfigError, MacWorld, NodeId, TxopId};
use crate::sim::{Event, SimTime, Simulator, World};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid timing: {0}")]
    Config(#[from] ConfigError),
    #[error("scenario declares no txops")]
    NoTxops,
    #[error("event #{index} refers to unknown txop {txop}")]
    UnknownTxop { index: usize, txop: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
}

impl TimingSpec {
    pub fn to_config(self) -> ChannelAccessConfig {
        ChannelAccessConfig {
            slot: SimTime::from_micros(self.slot_us),
            sifs: SimTime::from_micros(self.sifs_us),
            eifs_no_difs: SimTime::from_micros(self.eifs_no_difs_us),
        }
    }
}

impl ScenarioSpec {
    pub fn from_json(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.timing.to_config().validate()?;
        if self.txops.is_empty() {
            return Err(ScenarioError::NoTxops);
        }
        for (index, t) in self.txops.iter().enumerate() {
            if t.aifsn() == 0 {
                return Err(ConfigError::ZeroAifsn { index }.into());
            }
        }
        for (index, ev) in self.events.iter().enumerate() {
            let txop = match ev.action {
                ScriptAction::RequestAccess { txop, .. } | ScriptAction::StartBackoff { txop, .. } => {
                    txop
                }
                _ => continue,
            };
            if txop >= self.txops.len() {
                return Err(ScenarioError::UnknownTxop { index, txop });
            }
        }
        Ok(())
    }
}

/// 场景运行结果
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub records: Vec<TraceRecord>,
    pub stats: AccessStats,
    pub end: SimTime,
}

impl ScenarioOutcome {
    /// 某个 Txop 获得接入的时刻（微秒）
    pub fn grants_us(&self, txop: usize) -> Vec<u64> {
        self.records
            .iter()
            .filter(|r| r.txop == txop && r.kind == crate::mac::Notification::AccessGranted)
            .map(TraceRecord::t_us)
            .collect()
    }

    pub fn to_trace_file(&self, name: Option<String>) -> TraceFile {
        TraceFile {
            name,
            end_ns: self.end.0,
            stats: self.stats.clone(),
            records: self.records.clone(),
        }
    }
}

enum Step {
    Request { txop: TxopId, frame: QueuedTx, queue: TxQueue },
    RxStart(SimTime),
    RxEndOk,
    RxEndError,
    CcaBusy(SimTime),
    NavStart(SimTime),
    NavReset(SimTime),
    Switching(SimTime),
    TxStart(SimTime),
    AckTimeoutReset,
    Sleep,
    WakeUp,
    StartBackoff { txop: TxopId, slots: u32 },
}

/// 事件：执行一条脚本动作
struct ScriptStep {
    node: NodeId,
    step: Step,
}

impl Event for ScriptStep {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let ScriptStep { node, step } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<MacWorld>()
            .expect("world must be MacWorld");
        let cam = w.node_mut(node);
        match step {
            Step::Request { txop, frame, queue } => {
                if cam.medium().is_sleeping() {
                    debug!(txop = txop.0, "休眠中，丢弃脚本请求");
                    return;
                }
                if cam.is_access_requested(txop) {
                    debug!(txop = txop.0, "已在等待接入，丢弃脚本请求");
                    return;
                }
                queue.lock().expect("tx queue lock").push_back(frame);
                cam.request_access(txop, sim);
            }
            Step::RxStart(d) => cam.notify_rx_start_now(d, sim),
            Step::RxEndOk => cam.notify_rx_end_ok_now(sim),
            Step::RxEndError => cam.notify_rx_end_error_now(sim),
            Step::CcaBusy(d) => cam.notify_maybe_cca_busy_start_now(d, sim),
            Step::NavStart(d) => cam.notify_nav_start_now(d, sim),
            Step::NavReset(d) => cam.notify_nav_reset_now(d, sim),
            Step::Switching(d) => cam.notify_switching_start_now(d, sim),
            Step::TxStart(d) => cam.notify_tx_start_now(d, sim),
            Step::AckTimeoutReset => cam.notify_ack_timeout_reset_now(sim),
            Step::Sleep => cam.notify_sleep_now(sim),
            Step::WakeUp => cam.notify_wake_up_now(sim),
            Step::StartBackoff { txop, slots } => cam.start_backoff_now(txop, slots, sim),
        }
    }
}

/// 运行一个场景：先校验，再构建单节点世界并执行脚本
#[tracing::instrument(skip(spec), fields(name = spec.name.as_deref().unwrap_or("unnamed")))]
pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioOutcome, ScenarioError> {
    spec.validate()?;

    let mut sim = Simulator::default();
    let mut world = MacWorld::default();
    let node = world.add_node(spec.timing.to_config());
    let log: TraceLog = Arc::new(Mutex::new(Vec::new()));

    let mut queues: Vec<TxQueue> = Vec::with_capacity(spec.txops.len());
    for (i, t) in spec.txops.iter().enumerate() {
        let queue: TxQueue = Arc::new(Mutex::new(VecDeque::new()));
        let name = t.name.clone().unwrap_or_else(|| format!("txop{i}"));
        let txop = ScriptedTxop::new(
            name,
            t.category().is_edca(),
            t.backoff_draws.iter().copied(),
            Arc::clone(&queue),
            Arc::clone(&log),
        );
        let cam = world.node_mut(node);
        let id = cam.add_txop(Box::new(txop));
        cam.set_aifsn(id, t.aifsn());
        queues.push(queue);
    }

    let us = SimTime::from_micros;
    let mut push = |at: SimTime, step: Step| {
        sim.schedule(at, ScriptStep { node, step });
    };
    for ev in &spec.events {
        let at = us(ev.at_us);
        match ev.action {
            ScriptAction::RequestAccess {
                txop,
                tx_us,
                ack_timeout_us,
            } => {
                let frame = QueuedTx {
                    tx: us(tx_us),
                    ack_timeout: ack_timeout_us.map(us),
                };
                let queue = Arc::clone(&queues[txop]);
                let txop = TxopId(txop);
                push(at, Step::Request { txop, frame, queue });
            }
            ScriptAction::RxOk { duration_us } => {
                push(at, Step::RxStart(us(duration_us)));
                push(at.saturating_add(us(duration_us)), Step::RxEndOk);
            }
            ScriptAction::RxError { duration_us } => {
                push(at, Step::RxStart(us(duration_us)));
                push(at.saturating_add(us(duration_us)), Step::RxEndError);
            }
            ScriptAction::RxStart { duration_us } => push(at, Step::RxStart(us(duration_us))),
            ScriptAction::CcaBusy { duration_us } => push(at, Step::CcaBusy(us(duration_us))),
            ScriptAction::NavStart { duration_us } => push(at, Step::NavStart(us(duration_us))),
            ScriptAction::NavReset { duration_us } => push(at, Step::NavReset(us(duration_us))),
            ScriptAction::Switching { duration_us } => push(at, Step::Switching(us(duration_us))),
            ScriptAction::TxStart { duration_us } => push(at, Step::TxStart(us(duration_us))),
            ScriptAction::AckTimeoutReset => push(at, Step::AckTimeoutReset),
            ScriptAction::Sleep => push(at, Step::Sleep),
            ScriptAction::WakeUp => push(at, Step::WakeUp),
            ScriptAction::StartBackoff { txop, slots } => {
                let txop = TxopId(txop);
                push(at, Step::StartBackoff { txop, slots });
            }
        }
    }

    info!(txops = spec.txops.len(), events = spec.events.len(), "▶️  运行场景");
    match spec.until_us {
        Some(until) => sim.run_until(SimTime::from_micros(until), &mut world),
        None => sim.run(&mut world),
    }

    let records = std::mem::take(&mut *log.lock().expect("trace log lock"));
    let stats = world.node(node).stats.clone();
    info!(records = records.len(), grants = stats.grants, "✅ 场景完成");
    Ok(ScenarioOutcome {
        records,
        stats,
        end: sim.now(),
    })
}
