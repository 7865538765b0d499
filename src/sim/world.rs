//! 世界 trait
//!
//! 定义仿真世界接口。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如持有各节点的信道接入协调器）。
///
/// 事件通过 `as_any_mut` 向下转型取得具体世界。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// 每个事件执行完后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
