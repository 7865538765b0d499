//! 信道接入时序参数

use thiserror::Error;

use crate::sim::SimTime;

/// 协调器时序配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAccessConfig {
    /// 退避 slot 时长
    pub slot: SimTime,
    /// SIFS
    pub sifs: SimTime,
    /// 接收出错后在 SIFS 之外额外等待的时长（EIFS = SIFS + eifs_no_difs）
    pub eifs_no_difs: SimTime,
}

impl Default for ChannelAccessConfig {
    // 802.11a OFDM：slot 9us，SIFS 16us，最低速率 ACK 约 44us
    fn default() -> Self {
        Self {
            slot: SimTime::from_micros(9),
            sifs: SimTime::from_micros(16),
            eifs_no_difs: SimTime::from_micros(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("slot time must be positive")]
    ZeroSlot,
    #[error("aifsn of txop {index} must be at least 1")]
    ZeroAifsn { index: usize },
}

impl ChannelAccessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot == SimTime::ZERO {
            return Err(ConfigError::ZeroSlot);
        }
        Ok(())
    }
}
