//! 生产者/消费者流控契约。
//!
//! # 教案级注释
//!
//! ## 意图（Why）
//! - 上游数据源（Producer）与 Descriptor（Consumer）之间采用“拉取式”流控，
//!   防止应用无限制写入导致内存膨胀；
//! - Descriptor 同时也是一个生产者：它向读就绪侧“生产”入站数据，可被下游暂停。
//!
//! ## 契约说明（What）
//! - 流式生产者（streaming）会持续推送数据，直到被 `pause_producing`；
//! - 非流式生产者（non-streaming）每次 `resume_producing` 只提供一个单元的数据，
//!   因此暂停它们没有意义，Descriptor 永远不会暂停非流式生产者；
//! - `resume_producing` 携带 `&mut dyn Consumer`：生产者在回调中直接写入，
//!   无需自行持有对 Descriptor 的共享引用。
//!
//! ## 风险提示（Trade-offs）
//! - 回调期间生产者被“借出”，此时在同一 Consumer 上再注册生产者会返回
//!   [`TransportError::ProducerAlreadyRegistered`]；
//! - 回调中触发的暂停会在回调返回后立即送达。

use bytes::Bytes;

use crate::{
    Result,
    error::TransportError,
    io::Fileno,
    reactor::DescriptorId,
    reason::CloseReason,
};

/// 出站数据的上游来源。
pub trait Producer {
    /// 暂停推送；只会作用于流式生产者。
    fn pause_producing(&mut self);

    /// 恢复（或对非流式生产者而言：再提供一个单元的）数据，写入 `consumer`。
    fn resume_producing(&mut self, consumer: &mut dyn Consumer);

    /// 永久停止；此后不会再被要求产出数据。
    fn stop_producing(&mut self);
}

/// 接收出站数据并对生产者施加背压的一方。
///
/// - **契约 (What)**：`write`/`write_sequence` 永不阻塞、永不部分接受；连接断开后静默忽略；
/// - **风险 (Trade-offs)**：负载类型固定为 [`Bytes`]，文本必须由调用方显式编码，
///   不会被悄悄接受。
pub trait Consumer {
    /// 追加一段出站数据。
    fn write(&mut self, data: Bytes);

    /// 按顺序追加多段出站数据，等价于逐段 `write`。
    fn write_sequence(&mut self, chunks: Vec<Bytes>);

    /// 注册生产者；`streaming` 区分推送式与拉取式。
    ///
    /// - 已有生产者时返回 [`TransportError::ProducerAlreadyRegistered`]，不改变任何状态；
    /// - 已断开时立即对新生产者调用 `stop_producing` 并返回 `Ok(())`。
    fn register_producer(&mut self, producer: Box<dyn Producer>, streaming: bool) -> Result<()>;

    /// 注销生产者，不影响连接状态。
    fn unregister_producer(&mut self);

    /// 注销生产者并请求断开，用于打破生产者与消费者之间的所有权环。
    fn stop_consuming(&mut self);
}

/// 交给所有者回调使用的完整传输视图。
pub trait Transport: Consumer {
    fn id(&self) -> DescriptorId;

    fn fileno(&self) -> Fileno;

    /// 在输出刷完后关闭连接；立即停止读取。
    fn lose_connection(&mut self);

    fn is_connected(&self) -> bool;

    fn is_disconnecting(&self) -> bool;
}

/// Descriptor 作为生产者时向读就绪侧提供的流控接口。
///
/// - `pause_producing`：撤销读就绪兴趣；
/// - `resume_producing`：重新登记读就绪兴趣；断开中或已断开时返回 [`TransportError::InvalidState`]；
/// - `stop_producing`：等价于请求断开。
pub trait InboundProducer {
    fn pause_producing(&mut self);
    fn resume_producing(&mut self) -> Result<(), TransportError>;
    fn stop_producing(&mut self);
}

/// Descriptor 的所有者（通常是协议实现）接收的回调。
///
/// # 教案式说明
/// - **意图 (Why)**：把读到的数据与关闭通知交还给上层协议，同时允许其在回调中直接写回；
/// - **契约 (What)**：
///   - `on_connected`：连接进入 Connected 时调用一次；
///   - `on_data`：每段非空入站数据调用一次；
///   - `on_closed`：进入终态时恰好调用一次，`reason` 区分正常关闭与异常丢失；
/// - **风险 (Trade-offs)**：回调期间所有者被借出，Descriptor 不会重入同一所有者。
pub trait DescriptorHandler {
    fn on_connected(&mut self, _transport: &mut dyn Transport) {}

    fn on_data(&mut self, transport: &mut dyn Transport, data: Bytes);

    fn on_closed(&mut self, reason: &CloseReason);
}
