#![deny(unsafe_code)]
#![doc = r#"
# spark-transport-fd

## 设计动机（Why）
- **定位**：该 crate 提供事件驱动网络栈底部的通用非阻塞传输对象 [`Descriptor`]，
  把事件循环报告的就绪通知转化为可靠、有序、可流控的字节流。
- **架构角色**：实现 `spark-transport` 中的 `Consumer`/`Transport`/`InboundProducer`/`Selectable`
  契约；具体 IO 通过注入的 `RawTransport` 完成，事件循环通过注入的 `Reactor` 完成。
- **设计理念**：`write` 永远是纯内存操作，所有 IO 只在可写就绪回调中发生；
  生产者与消费者之间采用拉取式背压，防止内存无界增长。

## 核心契约（What）
- **写缓冲**：暂存队列 + 主缓冲 + 已写偏移，按需压缩；字节按写入顺序写出，从不重排；
- **连接状态机**：`Pending → Connected → Disconnecting → Disconnected`，断开总是发生在
  缓冲输出刷完之后，除非被外部连接丢失抢占；
- **背压**：未刷出字节超过高水位时暂停流式生产者，缓冲完全排空后恢复。

## 实现策略（How）
- `buffer`、`state`、`flow` 三个内部模块分别负责缓冲、状态与生产者簿记，
  `descriptor` 模块把它们与事件循环注册组合起来；
- `config` 模块提供可从 TOML 加载的 [`DescriptorConfig`]；
- Unix 平台上 `stream` 模块提供基于标准库非阻塞流的 [`StreamTransport`]。

## 风险与考量（Trade-offs）
- 单线程协作式模型：同一 Descriptor 的所有回调与应用调用必须在同一逻辑线程上串行发生；
- 本层不做自动重连，重连完全由所有者负责。
"#]

mod buffer;
mod config;
mod descriptor;
mod flow;
mod payload;
mod state;
#[cfg(unix)]
mod stream;

pub use config::{
    ConfigError, DEFAULT_COMPACTION_THRESHOLD, DEFAULT_HIGH_WATER_MARK, DescriptorConfig,
};
pub use descriptor::Descriptor;
pub use payload::WritePayload;
pub use state::ConnectionState;
#[cfg(unix)]
pub use stream::StreamTransport;
