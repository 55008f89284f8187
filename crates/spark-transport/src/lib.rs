#![deny(unsafe_code)]
#![doc = "spark-transport: 非阻塞传输层契约接口统一抽象层。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：事件循环只会报告“可读/可写”就绪事件，本 crate 定义把这些事件转化为有序、可流控字节流所需的全部协作契约。"]
#![doc = "- **What**：定义 `Reactor`、`Selectable`、`RawTransport`、`Producer`/`Consumer`/`Transport`、`DescriptorHandler` 等 trait，以及关闭原因与错误类型。"]
#![doc = "- **How**：契约层不做任何 IO；具体的缓冲、状态机与背压实现位于 `spark-transport-fd`，事件循环由调用方提供。"]

/// `Result` 是传输层契约内部使用的统一返回别名。
///
/// # 使用方式（How）
/// - 错误类型默认为 [`TransportError`]，调用方也可以显式指定其他错误类型。
pub type Result<T, E = TransportError> = core::result::Result<T, E>;

pub mod error;
pub mod io;
pub mod producer;
pub mod reactor;
pub mod reason;
#[cfg(feature = "test-stubs")]
pub mod test_stubs;

pub use error::TransportError;
pub use io::{Fileno, RawTransport, ReadOutcome, WriteOutcome};
pub use producer::{Consumer, DescriptorHandler, InboundProducer, Producer, Transport};
pub use reactor::{DescriptorId, IoStatus, Reactor, Selectable};
pub use reason::{CloseReason, LostReason};
