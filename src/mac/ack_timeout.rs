//! ACK 超时监视
//!
//! 每个协调器最多一个已 arm 的 ACK 截止时刻。超时前被复位则视为成功；
//! 超时未复位则把该时刻之后的空闲窗口按 EIFS 计算（与接收出错同样处理），
//! 不产生任何碰撞通知。

use tracing::{debug, trace};

use super::events::AckTimeoutExpired;
use super::id::NodeId;
use super::timer::TimerSlot;
use crate::sim::{SimTime, Simulator};

#[derive(Debug, Default)]
pub struct AckTimeoutMonitor {
    armed: bool,
    /// 已 arm 时为截止时刻；否则为最近一次复位/超时/截断的时刻
    horizon: SimTime,
    /// 最近一次截止是超时（未复位）结束的
    expired: bool,
    timer: TimerSlot,
}

impl AckTimeoutMonitor {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn expiry(&self) -> Option<SimTime> {
        self.armed.then_some(self.horizon)
    }

    /// 最近一次超时是否仍在要求 EIFS
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// 本监视器对空闲起点的约束
    pub fn access_start(&self, sifs: SimTime, eifs_no_difs: SimTime) -> SimTime {
        let start = self.horizon.saturating_add(sifs);
        if self.expired {
            start.saturating_add(eifs_no_difs)
        } else {
            start
        }
    }

    pub(crate) fn arm(&mut self, node: NodeId, now: SimTime, duration: SimTime, sim: &mut Simulator) {
        let expiry = now.saturating_add(duration);
        self.armed = true;
        self.expired = false;
        self.horizon = expiry;
        self.timer.arm(sim, expiry, AckTimeoutExpired { node });
        debug!(expiry = ?expiry, "ACK 超时已设置");
    }

    /// 复位。返回是否改变了状态。
    ///
    /// 与超时发生在同一时刻的复位优先：撤销该次超时带来的 EIFS。
    pub(crate) fn reset(&mut self, now: SimTime, sim: &mut Simulator) -> bool {
        if self.armed {
            self.timer.cancel(sim);
            self.armed = false;
            self.horizon = now;
            debug!("ACK 超时已复位");
            return true;
        }
        if self.expired && self.horizon == now {
            self.expired = false;
            debug!("同一时刻的复位撤销了超时");
            return true;
        }
        trace!("无已设置的 ACK 超时，忽略复位");
        false
    }

    /// 超时事件触发
    pub(crate) fn expire(&mut self, now: SimTime) -> bool {
        self.timer.expire();
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.expired = true;
        self.horizon = now;
        debug!("ACK 超时，后续空闲窗口使用 EIFS");
        true
    }

    /// 信道切换时截断，不计为超时
    pub(crate) fn truncate(&mut self, now: SimTime, sim: &mut Simulator) {
        if self.armed {
            self.timer.cancel(sim);
            self.armed = false;
            self.horizon = self.horizon.min(now);
        }
    }
}
