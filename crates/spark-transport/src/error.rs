//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为传输契约中“同步暴露给调用方”的错误提供集中定义；
//! - IO 层面的失败不在此列：它们一律经由 [`CloseReason`](crate::CloseReason) 异步送达，
//!   从不通过 `write` 抛回调用方。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error`，兼容 `std::error::Error`；
//! - 出错时 Descriptor 的状态保持不变，调用方可以修正用法后重试。

use thiserror::Error;

use crate::reactor::DescriptorId;

/// 传输契约的同步错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“协议用法错误”与“通道已不可用”区分开，前者需要调用方修正代码，
///   后者由连接丢失通知路径处理；
/// - **契约 (What)**：
///   - 所有变体均为 `Clone + Eq`，便于测试直接断言；
///   - 返回错误时不会产生任何状态变更；
/// - **风险 (Trade-offs)**：`state` 使用静态字符串而非具体状态枚举，避免契约层反向依赖实现 crate。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// 在前一个生产者注销之前再次注册生产者。
    ///
    /// - **契约 (What)**：同一时刻至多注册一个生产者，调用方需先 `unregister_producer`。
    #[error("cannot register a producer on descriptor {descriptor}: a producer is already registered")]
    ProducerAlreadyRegistered { descriptor: DescriptorId },

    /// 在当前连接状态下不允许执行的操作。
    ///
    /// - **契约 (What)**：`operation` 为被拒绝的方法名，`state` 为拒绝时所处状态；
    /// - **风险 (Trade-offs)**：典型来源是在断开过程中恢复读取，通常意味着上层状态不同步。
    #[error("`{operation}` is not permitted on descriptor {descriptor} while {state}")]
    InvalidState {
        descriptor: DescriptorId,
        operation: &'static str,
        state: &'static str,
    },
}
