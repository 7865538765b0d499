//! 信道接入协调器
//!
//! 为本节点每个已注册的 Txop 计算可以开始发送的精确虚拟时刻：
//!
//! - `aifs_end(q)  = idle_since + aifsn(q) * slot`
//! - `start(q)     = max(aifs_end(q), q.backoff_start)`
//! - `ready(q)     = start(q) + backoff_slots(q) * slot`
//!
//! 每次状态变化前先按已经过完的空闲 slot 扣减退避计数（介质忙打断的 slot 不计），
//! 变化后把唯一的接入定时器调整到所有等待队列中最早的就绪时刻。
//! 同一时刻多个队列就绪时，AIFSN 最小者胜出（相同则先注册者胜出），
//! 其余队列收到内部碰撞。

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use super::ack_timeout::AckTimeoutMonitor;
use super::config::ChannelAccessConfig;
use super::events::AccessTimeout;
use super::id::{NodeId, TxopId};
use super::medium::MediumState;
use super::stats::AccessStats;
use super::timer::TimerSlot;
use super::txop::{Notification, Txop, TxopState};
use crate::sim::{SimTime, Simulator};

/// DCF 的默认 AIFSN（DIFS = SIFS + 2 slot）
pub const DEFAULT_AIFSN: u32 = 2;

struct Registered {
    name: String,
    state: TxopState,
    // 回调期间被取出
    txop: Option<Box<dyn Txop>>,
}

/// 信道接入协调器：每个仿真节点一个。
pub struct ChannelAccessManager {
    node: NodeId,
    cfg: ChannelAccessConfig,
    medium: MediumState,
    ack: AckTimeoutMonitor,
    txops: Vec<Registered>,
    access_timer: TimerSlot,
    outbox: VecDeque<(TxopId, Notification)>,
    dispatching: bool,
    pub stats: AccessStats,
}

impl ChannelAccessManager {
    /// 创建协调器。`slot` 必须为正。
    pub fn new(node: NodeId, cfg: ChannelAccessConfig) -> Self {
        assert!(cfg.slot > SimTime::ZERO, "slot time must be positive");
        Self {
            node,
            cfg,
            medium: MediumState::default(),
            ack: AckTimeoutMonitor::default(),
            txops: Vec::new(),
            access_timer: TimerSlot::default(),
            outbox: VecDeque::new(),
            dispatching: false,
            stats: AccessStats::default(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &ChannelAccessConfig {
        &self.cfg
    }

    pub fn medium(&self) -> &MediumState {
        &self.medium
    }

    pub fn ack_timeout(&self) -> &AckTimeoutMonitor {
        &self.ack
    }

    pub fn set_slot(&mut self, slot: SimTime) {
        assert!(slot > SimTime::ZERO, "slot time must be positive");
        self.cfg.slot = slot;
    }

    pub fn set_sifs(&mut self, sifs: SimTime) {
        self.cfg.sifs = sifs;
    }

    /// 接收出错后、SIFS 之外的额外等待
    pub fn set_eifs_no_difs(&mut self, eifs_no_difs: SimTime) {
        self.cfg.eifs_no_difs = eifs_no_difs;
    }

    /// 注册一个 Txop。注册顺序固定，并在 AIFSN 相同时决定优先级。
    pub fn add_txop(&mut self, txop: Box<dyn Txop>) -> TxopId {
        let id = TxopId(self.txops.len());
        let name = txop.name().to_string();
        let edca = txop.is_edca();
        debug!(node = self.node.0, txop = %name, id = id.0, edca, "注册 Txop");
        self.txops.push(Registered {
            name,
            state: TxopState::new(DEFAULT_AIFSN, edca),
            txop: Some(txop),
        });
        id
    }

    /// 配置期设置 AIFSN（至少为 1）
    pub fn set_aifsn(&mut self, id: TxopId, aifsn: u32) {
        self.assert_registered(id);
        assert!(aifsn >= 1, "aifsn must be at least 1");
        self.txops[id.0].state.aifsn = aifsn;
    }

    pub fn txop_count(&self) -> usize {
        self.txops.len()
    }

    pub fn txop_name(&self, id: TxopId) -> &str {
        &self.txops[id.0].name
    }

    pub fn aifsn(&self, id: TxopId) -> u32 {
        self.txops[id.0].state.aifsn
    }

    pub fn is_edca(&self, id: TxopId) -> bool {
        self.txops[id.0].state.edca
    }

    pub fn backoff_slots(&self, id: TxopId) -> u32 {
        self.txops[id.0].state.backoff_slots
    }

    pub fn is_access_requested(&self, id: TxopId) -> bool {
        self.txops[id.0].state.pending
    }

    /// 当前接入定时器的触发时刻
    pub fn next_evaluation(&self) -> Option<SimTime> {
        self.access_timer.deadline()
    }

    /// 介质空闲起点，已包含 SIFS、EIFS、NAV、CCA 忙、信道切换与 ACK 超时的影响
    pub fn idle_since(&self) -> SimTime {
        self.medium
            .idle_since(self.cfg.sifs, self.cfg.eifs_no_difs)
            .max(self.ack.access_start(self.cfg.sifs, self.cfg.eifs_no_difs))
    }

    /// 按当前状态计算的就绪时刻
    pub fn ready_time(&self, id: TxopId) -> SimTime {
        self.ready_time_of(&self.txops[id.0].state)
    }

    fn aifs_end_of(&self, st: &TxopState) -> SimTime {
        self.idle_since()
            .saturating_add(self.cfg.slot.saturating_mul(st.aifsn as u64))
    }

    fn backoff_start_of(&self, st: &TxopState) -> SimTime {
        self.aifs_end_of(st).max(st.backoff_start)
    }

    fn ready_time_of(&self, st: &TxopState) -> SimTime {
        self.backoff_start_of(st)
            .saturating_add(self.cfg.slot.saturating_mul(st.backoff_slots as u64))
    }

    fn assert_registered(&self, id: TxopId) {
        assert!(
            id.0 < self.txops.len(),
            "txop {:?} is not registered on node {:?}",
            id,
            self.node
        );
    }

    /// 扣减自上次更新以来在空闲介质上完整经过的 slot
    fn update_backoff(&mut self, now: SimTime) {
        let idle = self.idle_since();
        let slot = self.cfg.slot;
        for r in &mut self.txops {
            let st = &mut r.state;
            let aifs_end = idle.saturating_add(slot.saturating_mul(st.aifsn as u64));
            let start = aifs_end.max(st.backoff_start);
            if start > now {
                continue;
            }
            let mut elapsed = (now.0 - start.0) / slot.0;
            // EDCA 在 AIFS 结束的边界上也递减一次
            if st.edca && aifs_end >= st.backoff_start {
                elapsed = elapsed.saturating_add(1);
            }
            let n = elapsed.min(st.backoff_slots as u64);
            if n == 0 {
                continue;
            }
            let bound = start.saturating_add(slot.saturating_mul(n));
            trace!(
                txop = %r.name,
                consumed = n,
                remaining = st.backoff_slots as u64 - n,
                bound = ?bound,
                "扣减退避计数"
            );
            st.consume_slots(n as u32, bound);
        }
    }

    /// 把唯一的接入定时器调整到最早的就绪时刻（或信道切换通知时刻）
    fn restart_access_timeout(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        if self.medium.is_sleeping() {
            self.access_timer.cancel(sim);
            return;
        }

        let mut next: Option<SimTime> = None;
        for r in &self.txops {
            if let Some(at) = r.state.switch_notice {
                let at = at.max(now);
                next = Some(next.map_or(at, |n| n.min(at)));
            }
            if r.state.pending {
                let ready = self.ready_time_of(&r.state);
                if ready > now {
                    next = Some(next.map_or(ready, |n| n.min(ready)));
                }
            }
        }

        match next {
            Some(at) if self.access_timer.deadline() == Some(at) => {
                trace!(at = ?at, "接入评估时刻不变");
            }
            Some(at) => {
                debug!(node = self.node.0, at = ?at, "重新调度接入评估");
                self.access_timer
                    .arm(sim, at, AccessTimeout { node: self.node });
            }
            None => self.access_timer.cancel(sim),
        }
    }

    /// 投递通知。回调进行中产生的通知排队，由最外层循环在当前回调返回后依次投递。
    fn notify(&mut self, id: TxopId, what: Notification, sim: &mut Simulator) {
        self.stats.record(what);
        self.outbox.push_back((id, what));
        if self.dispatching {
            trace!(id = id.0, ?what, "回调进行中，通知延后投递");
            return;
        }

        self.dispatching = true;
        while let Some((id, what)) = self.outbox.pop_front() {
            // 暂时把 Txop 取出来，避免 &mut self 与 &mut txop 的重叠借用。
            let mut txop = self.txops[id.0]
                .txop
                .take()
                .expect("txop is detached only while its own callback runs");
            debug!(
                node = self.node.0,
                txop = %self.txops[id.0].name,
                ?what,
                now = ?sim.now(),
                "投递通知"
            );
            match what {
                Notification::AccessGranted => txop.notify_access_granted(id, self, sim),
                Notification::InternalCollision => txop.notify_internal_collision(id, self, sim),
                Notification::Collision => txop.notify_collision(id, self, sim),
                Notification::ChannelSwitching => txop.notify_channel_switching(id, self, sim),
                Notification::Sleep => txop.notify_sleep(id, self, sim),
                Notification::WakeUp => txop.notify_wake_up(id, self, sim),
            }
            self.txops[id.0].txop = Some(txop);
        }
        self.dispatching = false;
    }

    /// 在当前时刻评估：就绪队列中选出一个授予接入，其余内部碰撞
    fn grant_access(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        if self.medium.is_sleeping() || self.medium.is_switching(now) {
            return;
        }

        let ready: Vec<TxopId> = self
            .txops
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state.pending && self.ready_time_of(&r.state) <= now)
            .map(|(i, _)| TxopId(i))
            .collect();
        if ready.is_empty() {
            return;
        }

        if self.medium.is_busy(now) {
            warn!(node = self.node.0, now = ?now, ready = ready.len(), "评估时介质忙，按碰撞处理");
            for id in ready {
                self.notify(id, Notification::Collision, sim);
            }
            return;
        }

        let Some(winner) = ready
            .iter()
            .copied()
            .min_by_key(|id| (self.txops[id.0].state.aifsn, *id))
        else {
            return;
        };
        // 先确定谁碰撞，再统一投递：回调会改变协调器状态
        let losers: Vec<TxopId> = ready.into_iter().filter(|&id| id != winner).collect();

        let st = &mut self.txops[winner.0].state;
        st.pending = false;
        st.backoff_slots = 0;
        info!(
            node = self.node.0,
            txop = %self.txops[winner.0].name,
            now = ?now,
            internal_collisions = losers.len(),
            "📡 授予接入"
        );

        self.notify(winner, Notification::AccessGranted, sim);
        for id in losers {
            self.notify(id, Notification::InternalCollision, sim);
        }
    }

    fn deliver_switch_notices(&mut self, now: SimTime, sim: &mut Simulator) {
        let due: Vec<TxopId> = self
            .txops
            .iter_mut()
            .enumerate()
            .filter_map(|(i, r)| match r.state.switch_notice {
                Some(at) if at <= now => {
                    r.state.switch_notice = None;
                    Some(TxopId(i))
                }
                _ => None,
            })
            .collect();
        for id in due {
            self.notify(id, Notification::ChannelSwitching, sim);
        }
    }

    fn on_medium_change(
        &mut self,
        sim: &mut Simulator,
        change: impl FnOnce(&mut MediumState, SimTime),
    ) {
        let now = sim.now();
        self.update_backoff(now);
        change(&mut self.medium, now);
        self.restart_access_timeout(sim);
    }

    /// 请求接入
    #[tracing::instrument(skip(self, sim), fields(node = self.node.0, now = ?sim.now()))]
    pub fn request_access(&mut self, id: TxopId, sim: &mut Simulator) {
        self.assert_registered(id);
        let now = sim.now();
        if self.medium.is_sleeping() {
            debug!("休眠中，忽略接入请求");
            return;
        }
        self.update_backoff(now);

        let st = &mut self.txops[id.0].state;
        if st.pending {
            trace!("已在等待接入");
            return;
        }
        st.pending = true;
        let slots = st.backoff_slots;

        if self.medium.is_switching(now) {
            debug!(switching_end = ?self.medium.switching_end(), "信道切换中，推迟评估");
            self.restart_access_timeout(sim);
            return;
        }

        if slots == 0 {
            if self.medium.is_busy(now) {
                debug!("介质忙且无退避：碰撞");
                self.notify(id, Notification::Collision, sim);
            } else if self.backoff_start_of(&self.txops[id.0].state) > now {
                debug!("仍在 AIFS 内且无退避：内部碰撞");
                self.notify(id, Notification::InternalCollision, sim);
            }
        }

        self.grant_access(sim);
        self.restart_access_timeout(sim);
    }

    /// 协作方抽取新的退避 slot 数（从当前时刻开始计数）
    #[tracing::instrument(skip(self, sim), fields(node = self.node.0, now = ?sim.now()))]
    pub fn start_backoff_now(&mut self, id: TxopId, slots: u32, sim: &mut Simulator) {
        self.assert_registered(id);
        let now = sim.now();
        self.update_backoff(now);
        let st = &mut self.txops[id.0].state;
        st.backoff_slots = slots;
        st.backoff_start = now;
        let pending = st.pending;

        // 新的计数可能已在当前时刻就绪；定时器只覆盖将来的时刻
        if pending
            && !self.medium.is_sleeping()
            && !self.medium.is_switching(now)
            && !self.medium.is_busy(now)
        {
            self.grant_access(sim);
        }
        self.restart_access_timeout(sim);
    }

    /// 接入定时器触发
    pub(crate) fn access_timeout(&mut self, sim: &mut Simulator) {
        self.access_timer.expire();
        let now = sim.now();
        trace!(node = self.node.0, now = ?now, "接入评估");
        self.update_backoff(now);
        self.deliver_switch_notices(now, sim);
        self.grant_access(sim);
        self.restart_access_timeout(sim);
    }

    pub fn notify_tx_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        debug_assert!(
            !self.medium.is_switching(sim.now()),
            "cannot transmit while switching channel"
        );
        trace!(node = self.node.0, duration = ?duration, "本地发送开始");
        self.on_medium_change(sim, |m, now| m.tx_start(now, duration));
    }

    pub fn notify_rx_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        trace!(node = self.node.0, duration = ?duration, "接收开始");
        self.on_medium_change(sim, |m, now| m.rx_start(now, duration));
    }

    pub fn notify_rx_end_ok_now(&mut self, sim: &mut Simulator) {
        trace!(node = self.node.0, "接收成功结束");
        self.on_medium_change(sim, |m, now| m.rx_end_now(now, true));
    }

    /// 接收出错：之后的空闲窗口使用 EIFS
    pub fn notify_rx_end_error_now(&mut self, sim: &mut Simulator) {
        debug!(node = self.node.0, "接收出错结束，启用 EIFS");
        self.on_medium_change(sim, |m, now| m.rx_end_now(now, false));
    }

    pub fn notify_maybe_cca_busy_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        trace!(node = self.node.0, duration = ?duration, "CCA 忙");
        self.on_medium_change(sim, |m, now| m.cca_busy_start(now, duration));
    }

    pub fn notify_nav_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        trace!(node = self.node.0, duration = ?duration, "NAV 开始");
        self.on_medium_change(sim, |m, now| m.nav_start(now, duration));
    }

    pub fn notify_nav_reset_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        trace!(node = self.node.0, duration = ?duration, "NAV 复位");
        self.on_medium_change(sim, |m, now| m.nav_reset(now, duration));
    }

    /// 信道切换：作废所有等待中的接入，在其原定时刻投递 `ChannelSwitching`
    #[tracing::instrument(skip(self, sim), fields(node = self.node.0, now = ?sim.now()))]
    pub fn notify_switching_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        let now = sim.now();
        debug_assert!(
            !self.medium.is_transmitting(now),
            "cannot switch channel while transmitting"
        );
        self.update_backoff(now);

        // 在修改状态之前记录原定的接入时刻
        let former: Vec<Option<SimTime>> = self
            .txops
            .iter()
            .map(|r| r.state.pending.then(|| self.ready_time_of(&r.state)))
            .collect();

        self.medium.switching_start(now, duration);
        self.ack.truncate(now, sim);
        self.access_timer.cancel(sim);

        for (r, at) in self.txops.iter_mut().zip(former) {
            r.state.reset(now);
            if let Some(at) = at {
                r.state.switch_notice = Some(at.max(now));
            }
        }
        info!(switching_end = ?self.medium.switching_end(), "🔀 信道切换开始");

        self.deliver_switch_notices(now, sim);
        self.restart_access_timeout(sim);
    }

    #[tracing::instrument(skip(self, sim), fields(node = self.node.0, now = ?sim.now()))]
    pub fn notify_sleep_now(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        self.update_backoff(now);
        self.medium.set_sleeping(true);
        self.access_timer.cancel(sim);
        info!("💤 进入休眠");
        for i in 0..self.txops.len() {
            self.notify(TxopId(i), Notification::Sleep, sim);
        }
    }

    /// 唤醒：清空所有队列的退避与请求
    #[tracing::instrument(skip(self, sim), fields(node = self.node.0, now = ?sim.now()))]
    pub fn notify_wake_up_now(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        self.medium.set_sleeping(false);
        for r in &mut self.txops {
            r.state.reset(now);
            r.state.switch_notice = None;
        }
        info!("⏰ 唤醒");
        for i in 0..self.txops.len() {
            self.notify(TxopId(i), Notification::WakeUp, sim);
        }
        self.restart_access_timeout(sim);
    }

    /// 发送后等待 ACK，截止时刻为 `now + duration`
    pub fn notify_ack_timeout_start_now(&mut self, duration: SimTime, sim: &mut Simulator) {
        let now = sim.now();
        self.update_backoff(now);
        self.ack.arm(self.node, now, duration, sim);
        self.restart_access_timeout(sim);
    }

    /// 收到 ACK
    pub fn notify_ack_timeout_reset_now(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        self.update_backoff(now);
        if self.ack.reset(now, sim) {
            self.restart_access_timeout(sim);
        }
    }

    pub(crate) fn ack_timeout_expired(&mut self, sim: &mut Simulator) {
        let now = sim.now();
        self.update_backoff(now);
        if self.ack.expire(now) {
            self.restart_access_timeout(sim);
        }
    }
}
