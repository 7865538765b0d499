//! 接入统计

use serde::{Deserialize, Serialize};

use super::txop::Notification;

/// 协调器发出的各类通知计数
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStats {
    pub grants: u64,
    pub internal_collisions: u64,
    pub collisions: u64,
    pub channel_switches: u64,
}

impl AccessStats {
    pub(crate) fn record(&mut self, what: Notification) {
        match what {
            Notification::AccessGranted => self.grants += 1,
            Notification::InternalCollision => self.internal_collisions += 1,
            Notification::Collision => self.collisions += 1,
            Notification::ChannelSwitching => self.channel_switches += 1,
            Notification::Sleep | Notification::WakeUp => {}
        }
    }
}
