//! 介质状态跟踪
//!
//! 记录本节点观察到的所有真实/虚拟占用：本地发送、接收（及其结果）、
//! CCA 忙、信道切换、NAV 与休眠，并回答“介质从何时起空闲”。
//!
//! 只由 `ChannelAccessManager` 持有和修改。

use crate::sim::SimTime;

/// 介质状态
///
/// 发送、接收与信道切换三者在时间上互不重叠；CCA 忙可与任意一者重叠。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediumState {
    tx_end: SimTime,
    rx_start: SimTime,
    rx_expected_end: SimTime,
    rx_ongoing: bool,
    rx_end: SimTime,
    rx_error: bool,
    nav_end: SimTime,
    switching_end: SimTime,
    cca_busy_end: SimTime,
    sleeping: bool,
}

impl Default for MediumState {
    fn default() -> Self {
        Self {
            tx_end: SimTime::ZERO,
            rx_start: SimTime::ZERO,
            rx_expected_end: SimTime::ZERO,
            rx_ongoing: false,
            rx_end: SimTime::ZERO,
            rx_error: false,
            nav_end: SimTime::ZERO,
            switching_end: SimTime::ZERO,
            cca_busy_end: SimTime::ZERO,
            sleeping: false,
        }
    }
}

impl MediumState {
    pub fn tx_end(&self) -> SimTime {
        self.tx_end
    }

    /// 最近一次接收的开始时刻
    pub fn last_rx_start(&self) -> SimTime {
        self.rx_start
    }

    pub fn rx_end(&self) -> SimTime {
        self.rx_end
    }

    pub fn nav_end(&self) -> SimTime {
        self.nav_end
    }

    pub fn cca_busy_end(&self) -> SimTime {
        self.cca_busy_end
    }

    pub fn switching_end(&self) -> SimTime {
        self.switching_end
    }

    pub fn is_receiving(&self) -> bool {
        self.rx_ongoing
    }

    /// 最近一次接收是否以错误结束（决定是否使用 EIFS）
    pub fn last_rx_was_error(&self) -> bool {
        self.rx_error
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn is_transmitting(&self, now: SimTime) -> bool {
        self.tx_end > now
    }

    pub fn is_switching(&self, now: SimTime) -> bool {
        self.switching_end > now
    }

    /// 物理或虚拟载波侦听认为介质忙
    pub fn is_busy(&self, now: SimTime) -> bool {
        self.rx_ongoing
            || self.tx_end > now
            || self.nav_end > now
            || self.cca_busy_end > now
            || self.switching_end > now
    }

    /// 介质空闲起点：所有占用结束时刻加 SIFS 后的最大值；
    /// 若最近一次接收出错，接收部分额外加 `eifs_no_difs`。
    pub fn idle_since(&self, sifs: SimTime, eifs_no_difs: SimTime) -> SimTime {
        let rx_access = if self.rx_ongoing {
            self.rx_expected_end.saturating_add(sifs)
        } else if self.rx_error {
            self.rx_end.saturating_add(sifs).saturating_add(eifs_no_difs)
        } else {
            self.rx_end.saturating_add(sifs)
        };
        [
            rx_access,
            self.tx_end.saturating_add(sifs),
            self.nav_end.saturating_add(sifs),
            self.cca_busy_end.saturating_add(sifs),
            self.switching_end.saturating_add(sifs),
        ]
        .into_iter()
        .max()
        .unwrap_or(SimTime::ZERO)
    }

    pub(crate) fn tx_start(&mut self, now: SimTime, duration: SimTime) {
        if self.rx_ongoing {
            // PHY 在 SIFS 内开始接收后又被本地发送打断：按成功接收截断
            self.finish_rx(now, true);
        }
        self.tx_end = self.tx_end.max(now.saturating_add(duration));
    }

    pub(crate) fn rx_start(&mut self, now: SimTime, duration: SimTime) {
        self.rx_ongoing = true;
        self.rx_start = now;
        self.rx_expected_end = now.saturating_add(duration);
    }

    pub(crate) fn rx_end_now(&mut self, now: SimTime, ok: bool) {
        self.finish_rx(now, ok);
    }

    fn finish_rx(&mut self, now: SimTime, ok: bool) {
        self.rx_ongoing = false;
        self.rx_end = now;
        self.rx_error = !ok;
    }

    pub(crate) fn cca_busy_start(&mut self, now: SimTime, duration: SimTime) {
        self.cca_busy_end = self.cca_busy_end.max(now.saturating_add(duration));
    }

    pub(crate) fn nav_start(&mut self, now: SimTime, duration: SimTime) {
        self.nav_end = self.nav_end.max(now.saturating_add(duration));
    }

    /// NAV 复位：可缩短 NAV
    pub(crate) fn nav_reset(&mut self, now: SimTime, duration: SimTime) {
        self.nav_end = now.saturating_add(duration);
    }

    /// 切换信道：截断进行中的接收、NAV 与 CCA 忙
    pub(crate) fn switching_start(&mut self, now: SimTime, duration: SimTime) {
        if self.rx_ongoing {
            self.finish_rx(now, true);
        }
        self.nav_end = self.nav_end.min(now);
        self.cca_busy_end = self.cca_busy_end.min(now);
        self.switching_end = now.saturating_add(duration);
    }

    pub(crate) fn set_sleeping(&mut self, sleeping: bool) {
        self.sleeping = sleeping;
    }
}
