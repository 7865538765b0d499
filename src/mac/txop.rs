//! Txop（发送队列 / AC）
//!
//! `Txop` 是 MAC 协作方实现的能力接口：协调器只负责在正确的时刻回调，
//! 回调之后做什么（发送、重抽退避、丢弃队列）由实现方决定。

use serde::{Deserialize, Serialize};

use super::id::TxopId;
use super::manager::ChannelAccessManager;
use crate::sim::{SimTime, Simulator};

/// 协调器向 Txop 发出的通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    AccessGranted,
    InternalCollision,
    Collision,
    ChannelSwitching,
    Sleep,
    WakeUp,
}

/// Txop 能力接口
///
/// 每个回调都拿到自身的 `TxopId` 以及协调器与仿真器的可变引用，可以同步地
/// 回调协调器（例如 `notify_tx_start_now`、`start_backoff_now`）。
/// 回调期间由协调器产生的其它通知会在本次回调返回后、同一时刻投递。
pub trait Txop: Send {
    /// 名称（用于日志）
    fn name(&self) -> &str;

    /// 是否为 EDCA 队列：EDCA 在 AIFS 结束的 slot 边界上也递减一次退避计数
    fn is_edca(&self) -> bool {
        false
    }

    /// 获得接入。实现方必须在返回前调用 `notify_tx_start_now`。
    fn notify_access_granted(
        &mut self,
        me: TxopId,
        cam: &mut ChannelAccessManager,
        sim: &mut Simulator,
    );

    /// 与本节点其它队列同时就绪，需要重新抽取退避
    fn notify_internal_collision(
        &mut self,
        me: TxopId,
        cam: &mut ChannelAccessManager,
        sim: &mut Simulator,
    );

    /// 介质忙时以零退避请求接入，需要重新抽取退避
    fn notify_collision(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator);

    /// 原定的接入因信道切换而作废
    fn notify_channel_switching(
        &mut self,
        me: TxopId,
        cam: &mut ChannelAccessManager,
        sim: &mut Simulator,
    );

    fn notify_sleep(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator);

    fn notify_wake_up(&mut self, me: TxopId, cam: &mut ChannelAccessManager, sim: &mut Simulator);
}

/// 业务类别（voice/video/best-effort/background）及传统 DCF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessCategory {
    Voice,
    Video,
    BestEffort,
    Background,
    Legacy,
}

impl AccessCategory {
    /// 默认 AIFSN（802.11 EDCA 参数集；Legacy 对应 DIFS = SIFS + 2 slot）
    pub fn default_aifsn(self) -> u32 {
        match self {
            AccessCategory::Voice | AccessCategory::Video => 2,
            AccessCategory::BestEffort => 3,
            AccessCategory::Background => 7,
            AccessCategory::Legacy => 2,
        }
    }

    pub fn is_edca(self) -> bool {
        !matches!(self, AccessCategory::Legacy)
    }
}

/// 协调器为每个已注册 Txop 维护的接入状态
#[derive(Debug, Clone)]
pub(crate) struct TxopState {
    pub(crate) aifsn: u32,
    pub(crate) backoff_slots: u32,
    /// 剩余退避 slot 的计数起点
    pub(crate) backoff_start: SimTime,
    pub(crate) pending: bool,
    /// 因信道切换而作废的接入：在原定时刻投递 `ChannelSwitching`
    pub(crate) switch_notice: Option<SimTime>,
    pub(crate) edca: bool,
}

impl TxopState {
    pub(crate) fn new(aifsn: u32, edca: bool) -> Self {
        Self {
            aifsn,
            backoff_slots: 0,
            backoff_start: SimTime::ZERO,
            pending: false,
            switch_notice: None,
            edca,
        }
    }

    /// 扣减 `n` 个已经过完的 slot，并把计数起点推进到 `bound`
    pub(crate) fn consume_slots(&mut self, n: u32, bound: SimTime) {
        self.backoff_slots = self.backoff_slots.saturating_sub(n);
        self.backoff_start = bound;
    }

    /// 清空退避与请求（信道切换 / 唤醒时）
    pub(crate) fn reset(&mut self, now: SimTime) {
        self.backoff_slots = 0;
        self.backoff_start = now;
        self.pending = false;
    }
}
