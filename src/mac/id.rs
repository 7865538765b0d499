//! 标识符类型
//!
//! 定义节点与 Txop（发送队列）的标识符。

/// 节点标识符：一个节点拥有一个信道接入协调器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Txop 标识符：注册顺序下标，同时决定同 AIFSN 时的优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxopId(pub usize);
