use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::mac::{ChannelAccessConfig, ChannelAccessManager, MacWorld, NodeId, Notification, TxopId};
use crate::scenario::{
    QueuedTx, ScenarioSpec, ScriptAction, ScriptEvent, ScriptedTxop, TimingSpec, TraceLog,
    TxQueue, TxopSpec,
};
use crate::sim::{SimTime, Simulator};

pub(super) fn us(v: u64) -> SimTime {
    SimTime::from_micros(v)
}

pub(super) fn timing(slot_us: u64, sifs_us: u64, eifs_no_difs_us: u64) -> TimingSpec {
    TimingSpec {
        slot_us,
        sifs_us,
        eifs_no_difs_us,
    }
}

pub(super) fn legacy(aifsn: u32, draws: &[u32]) -> TxopSpec {
    TxopSpec {
        aifsn: Some(aifsn),
        backoff_draws: draws.to_vec(),
        ..TxopSpec::default()
    }
}

pub(super) fn at(at_us: u64, action: ScriptAction) -> ScriptEvent {
    ScriptEvent { at_us, action }
}

pub(super) fn request(txop: usize, tx_us: u64) -> ScriptAction {
    ScriptAction::RequestAccess {
        txop,
        tx_us,
        ack_timeout_us: None,
    }
}

pub(super) fn rx_ok(duration_us: u64) -> ScriptAction {
    ScriptAction::RxOk { duration_us }
}

pub(super) fn scenario(t: TimingSpec, txops: Vec<TxopSpec>, events: Vec<ScriptEvent>) -> ScenarioSpec {
    ScenarioSpec {
        name: None,
        timing: t,
        txops,
        events,
        until_us: None,
    }
}

/// 单节点试验台：直接调用协调器 API，而不是通过脚本事件
pub(super) struct Bench {
    pub sim: Simulator,
    pub world: MacWorld,
    pub node: NodeId,
    log: TraceLog,
    queues: Vec<TxQueue>,
}

impl Bench {
    pub fn new(slot_us: u64, sifs_us: u64, eifs_no_difs_us: u64) -> Self {
        let mut world = MacWorld::default();
        let node = world.add_node(timing(slot_us, sifs_us, eifs_no_difs_us).to_config());
        Self {
            sim: Simulator::default(),
            world,
            node,
            log: Arc::new(Mutex::new(Vec::new())),
            queues: Vec::new(),
        }
    }

    pub fn with_config(cfg: ChannelAccessConfig) -> Self {
        let mut world = MacWorld::default();
        let node = world.add_node(cfg);
        Self {
            sim: Simulator::default(),
            world,
            node,
            log: Arc::new(Mutex::new(Vec::new())),
            queues: Vec::new(),
        }
    }

    pub fn add_txop(&mut self, aifsn: u32, edca: bool, draws: &[u32]) -> TxopId {
        let queue: TxQueue = Arc::new(Mutex::new(VecDeque::new()));
        let name = format!("q{}", self.queues.len());
        let txop = ScriptedTxop::new(
            name,
            edca,
            draws.iter().copied(),
            Arc::clone(&queue),
            Arc::clone(&self.log),
        );
        let cam = self.world.node_mut(self.node);
        let id = cam.add_txop(Box::new(txop));
        cam.set_aifsn(id, aifsn);
        self.queues.push(queue);
        id
    }

    pub fn cam(&self) -> &ChannelAccessManager {
        self.world.node(self.node)
    }

    /// 推进到 `t_us`（含该时刻的事件），再对协调器执行 `f`
    pub fn at<R>(
        &mut self,
        t_us: u64,
        f: impl FnOnce(&mut ChannelAccessManager, &mut Simulator) -> R,
    ) -> R {
        self.sim.run_until(us(t_us), &mut self.world);
        f(self.world.node_mut(self.node), &mut self.sim)
    }

    /// 与脚本运行器相同：请求被接受时才把帧放入队列
    pub fn request(&mut self, t_us: u64, id: TxopId, tx_us: u64, ack_timeout_us: Option<u64>) {
        self.sim.run_until(us(t_us), &mut self.world);
        let cam = self.world.node(self.node);
        if !cam.medium().is_sleeping() && !cam.is_access_requested(id) {
            self.queues[id.0]
                .lock()
                .expect("tx queue lock")
                .push_back(QueuedTx {
                    tx: us(tx_us),
                    ack_timeout: ack_timeout_us.map(us),
                });
        }
        self.at(t_us, |cam, sim| cam.request_access(id, sim));
    }

    pub fn queued_frames(&self, id: TxopId) -> usize {
        self.queues[id.0].lock().expect("tx queue lock").len()
    }

    pub fn run(&mut self) {
        self.sim.run(&mut self.world);
    }

    /// (微秒, txop 下标, 通知)
    pub fn records(&self) -> Vec<(u64, usize, Notification)> {
        self.log
            .lock()
            .expect("trace log lock")
            .iter()
            .map(|r| (r.t_us(), r.txop, r.kind))
            .collect()
    }
}
