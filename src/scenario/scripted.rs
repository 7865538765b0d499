//! 脚本驱动的 Txop 协作方
//!
//! 记录收到的每条通知；获得接入时按排队的帧立即开始发送（并可选 arm ACK 超时），
//! 碰撞时按脚本给定的序列重抽退避。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::trace::TraceRecord;
use crate::mac::{ChannelAccessManager, Notification, Txop, TxopId};
use crate::sim::{SimTime, Simulator};

/// 一个等待发送的帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTx {
    pub tx: SimTime,
    /// 发送结束后等待 ACK 的时长
    pub ack_timeout: Option<SimTime>,
}

pub type TxQueue = Arc<Mutex<VecDeque<QueuedTx>>>;
pub type TraceLog = Arc<Mutex<Vec<TraceRecord>>>;

pub struct ScriptedTxop {
    name: String,
    edca: bool,
    draws: VecDeque<u32>,
    queue: TxQueue,
    log: TraceLog,
}

impl ScriptedTxop {
    pub fn new(
        name: impl Into<String>,
        edca: bool,
        draws: impl IntoIterator<Item = u32>,
        queue: TxQueue,
        log: TraceLog,
    ) -> Self {
        Self {
            name: name.into(),
            edca,
            draws: draws.into_iter().collect(),
            queue,
            log,
        }
    }

    fn record(&self, me: TxopId, kind: Notification, sim: &Simulator) {
        self.log.lock().expect("trace log lock").push(TraceRecord {
            t_ns: sim.now().0,
            txop: me.0,
            kind,
        });
    }

    fn redraw(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator) {
        let slots = self.draws.pop_front().unwrap_or(0);
        debug!(txop = %self.name, slots, "重抽退避");
        cam.start_backoff_now(me, slots, sim);
    }
}

impl Txop for ScriptedTxop {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_edca(&self) -> bool {
        self.edca
    }

    fn notify_access_granted(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator) {
        self.record(me, Notification::AccessGranted, sim);
        let frame = self.queue.lock().expect("tx queue lock").pop_front();
        let Some(frame) = frame else {
            warn!(txop = %self.name, "获得接入但没有待发送的帧");
            cam.notify_tx_start_now(SimTime::ZERO, sim);
            return;
        };
        cam.notify_tx_start_now(frame.tx, sim);
        if let Some(ack) = frame.ack_timeout {
            cam.notify_ack_timeout_start_now(frame.tx.saturating_add(ack), sim);
        }
    }

    fn notify_internal_collision(
        &mut self,
        me: TxopId,
        cam: &mut ChannelAccessManager,
        sim: &mut Simulator,
    ) {
        self.record(me, Notification::InternalCollision, sim);
        self.redraw(me, cam, sim);
    }

    fn notify_collision(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator) {
        self.record(me, Notification::Collision, sim);
        self.redraw(me, cam, sim);
    }

    fn notify_channel_switching(
        &mut self,
        me: TxopId,
        _cam: &mut ChannelAccessManager,
        sim: &mut Simulator,
    ) {
        self.record(me, Notification::ChannelSwitching, sim);
        // 原定要发送的帧作废
        self.queue.lock().expect("tx queue lock").pop_front();
    }

    fn notify_sleep(&mut self, me: TxopId, _cam: &mut ChannelAccessManager, sim: &mut Simulator) {
        self.record(me, Notification::Sleep, sim);
    }

    fn notify_wake_up(&mut self, me: TxopId, _cam: &mut ChannelAccessManager, sim: &mut Simulator) {
        self.record(me, Notification::WakeUp, sim);
        self.queue.lock().expect("tx queue lock").clear();
    }
}
