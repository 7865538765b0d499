//! 协调器内部事件
//!
//! 两个事件都只携带节点号，触发时重新从协调器当前状态计算，而不依赖调度时的快照。

use super::id::NodeId;
use super::mac_world::MacWorld;
use crate::sim::{Event, Simulator, World};

fn mac_world(world: &mut dyn World) -> &mut MacWorld {
    world
        .as_any_mut()
        .downcast_mut::<MacWorld>()
        .expect("world must be MacWorld")
}

/// 事件：接入评估时刻到达（唯一的接入定时器）
#[derive(Debug)]
pub struct AccessTimeout {
    pub node: NodeId,
}

impl Event for AccessTimeout {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AccessTimeout { node } = *self;
        mac_world(world).node_mut(node).access_timeout(sim);
    }
}

/// 事件：ACK 截止时刻到达且未被复位
#[derive(Debug)]
pub struct AckTimeoutExpired {
    pub node: NodeId,
}

impl Event for AckTimeoutExpired {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AckTimeoutExpired { node } = *self;
        mac_world(world).node_mut(node).ack_timeout_expired(sim);
    }
}
