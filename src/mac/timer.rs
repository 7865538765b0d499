//! 单槽可取消定时器
//!
//! 每个用途最多只持有一个存活的调度事件：重新 arm 之前总是先取消旧事件。

use crate::sim::{Event, EventId, SimTime, Simulator};
use tracing::trace;

#[derive(Debug, Default)]
pub struct TimerSlot {
    live: Option<(EventId, SimTime)>,
}

impl TimerSlot {
    /// 当前存活事件的触发时刻
    pub fn deadline(&self) -> Option<SimTime> {
        self.live.map(|(_, at)| at)
    }

    pub fn is_running(&self) -> bool {
        self.live.is_some()
    }

    /// 在 `at` 调度 `ev`，若已有存活事件则先取消。
    pub fn arm<E: Event>(&mut self, sim: &mut Simulator, at: SimTime, ev: E) {
        self.cancel(sim);
        let id = sim.schedule(at, ev);
        trace!(at = ?at, "定时器已设置");
        self.live = Some((id, at));
    }

    pub fn cancel(&mut self, sim: &mut Simulator) {
        if let Some((id, at)) = self.live.take() {
            trace!(at = ?at, "定时器已取消");
            sim.cancel(id);
        }
    }

    /// 事件已触发：清空槽位（事件本身已出队，无需取消）。
    pub fn expire(&mut self) {
        self.live = None;
    }
}
