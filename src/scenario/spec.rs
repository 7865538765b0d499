use serde::{Deserialize, Serialize};

use crate::mac::AccessCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub timing: TimingSpec,
    pub txops: Vec<TxopSpec>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    /// Stop the simulation at this time; defaults to running until no events remain.
    #[serde(default)]
    pub until_us: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingSpec {
    pub slot_us: u64,
    pub sifs_us: u64,
    pub eifs_no_difs_us: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxopSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<AccessCategory>,
    /// Overrides the category default.
    #[serde(default)]
    pub aifsn: Option<u32>,
    /// Backoff values handed out, in order, on each collision or internal
    /// collision. Once exhausted every further draw is 0.
    #[serde(default)]
    pub backoff_draws: Vec<u32>,
}

impl TxopSpec {
    pub fn category(&self) -> AccessCategory {
        self.category.unwrap_or(AccessCategory::Legacy)
    }

    pub fn aifsn(&self) -> u32 {
        self.aifsn.unwrap_or_else(|| self.category().default_aifsn())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub at_us: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptAction {
    RequestAccess {
        txop: usize,
        tx_us: u64,
        /// Once granted, wait this long after the transmission ends for an ACK.
        #[serde(default)]
        ack_timeout_us: Option<u64>,
    },
    /// Reception starting at `at_us` and ending successfully after `duration_us`.
    RxOk { duration_us: u64 },
    /// Reception starting at `at_us` and ending with an error after `duration_us`.
    RxError { duration_us: u64 },
    /// Reception start whose end is never reported by the script.
    RxStart { duration_us: u64 },
    CcaBusy { duration_us: u64 },
    NavStart { duration_us: u64 },
    NavReset { duration_us: u64 },
    Switching { duration_us: u64 },
    TxStart { duration_us: u64 },
    AckTimeoutReset,
    Sleep,
    WakeUp,
    StartBackoff { txop: usize, slots: u32 },
}
