//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列，并支持取消已调度事件。

use super::event::Event;
use super::scheduled_event::{EventId, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    // 尚未执行也未取消的事件序列号
    live: HashSet<u64>,
    // 已取消但仍在堆中的事件序列号；出堆时跳过。
    cancelled: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行，返回可用于取消的句柄。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        debug_assert!(at >= self.now, "cannot schedule into the past");
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.live.insert(seq);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 在 `now + delay` 调度事件
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消一个尚未执行的事件。对已执行或已取消的句柄无效果。
    pub fn cancel(&mut self, id: EventId) {
        if self.live.remove(&id.0) {
            trace!(seq = id.0, "取消事件");
            self.cancelled.insert(id.0);
        }
    }

    /// 事件是否仍在队列中等待执行
    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains(&id.0)
    }

    /// 队列中尚未取消的事件数量
    pub fn pending_events(&self) -> usize {
        self.live.len()
    }

    fn pop_live(&mut self) -> Option<ScheduledEvent> {
        while let Some(item) = self.q.pop() {
            if self.cancelled.remove(&item.seq) {
                trace!(seq = item.seq, "跳过已取消事件");
                continue;
            }
            self.live.remove(&item.seq);
            return Some(item);
        }
        None
    }

    fn peek_live_at(&mut self) -> Option<SimTime> {
        while let Some((seq, at)) = self.q.peek().map(|top| (top.seq, top.at)) {
            if self.cancelled.remove(&seq) {
                self.q.pop();
                continue;
            }
            return Some(at);
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(at) = self.peek_live_at() {
            if at > until {
                break;
            }
            let item = self.pop_live().expect("peek then pop");
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(item) = self.pop_live() {
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
