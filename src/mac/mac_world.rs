//! MAC 世界实现
//!
//! 定义持有各节点信道接入协调器的世界（World）实现。

use super::config::ChannelAccessConfig;
use super::id::NodeId;
use super::manager::ChannelAccessManager;
use crate::sim::World;
use std::any::Any;

/// 每个仿真节点一个协调器
#[derive(Default)]
pub struct MacWorld {
    nodes: Vec<ChannelAccessManager>,
}

impl MacWorld {
    /// 添加节点并返回其标识符
    pub fn add_node(&mut self, cfg: ChannelAccessConfig) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ChannelAccessManager::new(id, cfg));
        id
    }

    pub fn node(&self, id: NodeId) -> &ChannelAccessManager {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ChannelAccessManager {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl World for MacWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
