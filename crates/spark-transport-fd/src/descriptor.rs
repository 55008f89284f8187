use core::fmt;
use std::sync::Arc;

use bytes::Bytes;
use spark_transport::{
    CloseReason, Consumer, DescriptorHandler, DescriptorId, Fileno, InboundProducer, IoStatus,
    Producer, RawTransport, ReadOutcome, Reactor, Selectable, Transport, TransportError,
    WriteOutcome,
};
use tracing::{debug, trace, warn};

use crate::{
    buffer::WriteBuffer,
    config::{ConfigError, DescriptorConfig},
    flow::ProducerFlow,
    payload::WritePayload,
    state::ConnectionState,
};

/// 绑定到单个操作系统通道的传输对象。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 把事件循环报告的“可读/可写”就绪事件转化为可靠、有序、可流控的字节流；
/// - 让上游生产者与下游消费者在不无限增长内存的前提下协作。
///
/// ## 逻辑 (How)
/// - `write` 只把数据放入暂存队列并登记写兴趣，真正的 IO 只在 [`do_write`](Self::do_write)
///   中通过注入的 [`RawTransport`] 发生；
/// - 缓冲排空时撤销写兴趣，若有需要则向生产者要数据，否则在断开请求下完成拆除；
/// - 写原语报告失败或事件循环通知连接丢失时，丢弃全部未写出数据并进入终态。
///
/// ## 契约 (What)
/// - 构造时显式注入 [`Reactor`]，不从任何全局状态查找；
/// - 所有状态变更都同步发生在就绪回调或应用直接调用之中，同一 Descriptor 不会被并发驱动；
/// - 终态之后 `write`/`write_sequence` 静默忽略，`register_producer` 立即停止新生产者。
///
/// ## 注意事项 (Trade-offs)
/// - 生产者恢复采用“缓冲完全排空才恢复”的策略，没有低水位；以一定的突发性换取简单的不变式；
/// - 所有者与生产者在回调期间被借出，回调中的重入操作（写入、注销、断开）均受支持。
pub struct Descriptor<T: RawTransport> {
    id: DescriptorId,
    reactor: Arc<dyn Reactor>,
    transport: T,
    handler: Option<Box<dyn DescriptorHandler>>,
    config: DescriptorConfig,
    state: ConnectionState,
    buffer: WriteBuffer,
    flow: ProducerFlow,
    close_reason: Option<CloseReason>,
}

impl<T: RawTransport> Descriptor<T> {
    /// 使用默认配置创建处于 `Pending` 状态的 Descriptor。
    pub fn new(
        reactor: Arc<dyn Reactor>,
        transport: T,
        handler: Box<dyn DescriptorHandler>,
    ) -> Self {
        Self::build(reactor, transport, handler, DescriptorConfig::default())
    }

    /// 使用给定配置创建 Descriptor；配置非法时返回错误。
    pub fn with_config(
        reactor: Arc<dyn Reactor>,
        transport: T,
        handler: Box<dyn DescriptorHandler>,
        config: DescriptorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(reactor, transport, handler, config))
    }

    fn build(
        reactor: Arc<dyn Reactor>,
        transport: T,
        handler: Box<dyn DescriptorHandler>,
        config: DescriptorConfig,
    ) -> Self {
        Self {
            id: DescriptorId::next(),
            reactor,
            transport,
            handler: Some(handler),
            config,
            state: ConnectionState::Pending,
            buffer: WriteBuffer::new(),
            flow: ProducerFlow::new(),
            close_reason: None,
        }
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_disconnecting(&self) -> bool {
        self.state.is_disconnecting()
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.is_disconnected()
    }

    pub fn has_producer(&self) -> bool {
        self.flow.is_registered()
    }

    pub fn is_producer_paused(&self) -> bool {
        self.flow.is_paused()
    }

    /// 尚未写出的字节数（已合并与暂存两部分之和）。
    pub fn buffered_len(&self) -> usize {
        self.buffer.unflushed_len()
    }

    /// 连接期间返回底层句柄，其余时间返回 [`Fileno::INVALID`]。
    pub fn fileno(&self) -> Fileno {
        if self.state.is_connected() {
            self.transport.fileno()
        } else {
            Fileno::INVALID
        }
    }

    /// 终态之后的关闭原因。
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 通道已建立：进入 Connected，登记读兴趣并通知所有者。
    ///
    /// 只在 `Pending` 状态生效；非流式生产者若在连接前注册，首次拉取发生在此处。
    /// 所有者在 `on_connected` 中注册的非流式生产者已在注册时拉取过，不会被重复拉取。
    pub fn start(&mut self) {
        if self.state != ConnectionState::Pending {
            debug!(descriptor = %self.id, state = %self.state, "start ignored");
            return;
        }
        self.set_state(ConnectionState::Connected);
        self.start_reading();
        self.with_handler(|handler, transport| handler.on_connected(transport));
        if self.flow.take_deferred_pull() && self.state == ConnectionState::Connected {
            self.resume_producer();
        }
    }

    /// 可靠地写出一段字节序列。
    ///
    /// 只做内存操作并登记写兴趣，永不阻塞；未连接或已断开时静默忽略。
    pub fn write(&mut self, data: impl WritePayload) {
        self.write_bytes(data.into_bytes());
    }

    /// 按顺序写出多段字节序列，等价于逐段 [`write`](Self::write)。
    pub fn write_sequence<I>(&mut self, chunks: I)
    where
        I: IntoIterator,
        I::Item: WritePayload,
    {
        if !self.state.is_connected() {
            return;
        }
        let before = self.buffer.unflushed_len();
        for chunk in chunks {
            self.buffer.stage(chunk.into_bytes());
        }
        if self.buffer.unflushed_len() > before {
            self.after_stage();
        }
    }

    fn write_bytes(&mut self, data: Bytes) {
        if !self.state.is_connected() || data.is_empty() {
            return;
        }
        self.buffer.stage(data);
        self.after_stage();
    }

    fn after_stage(&mut self) {
        let unflushed = self.buffer.unflushed_len();
        if self
            .flow
            .should_pause(unflushed, self.config.high_water_mark())
        {
            trace!(descriptor = %self.id, unflushed, "pausing streaming producer");
            self.flow.pause();
        }
        self.start_writing();
    }

    /// 在输出刷完后关闭连接。
    ///
    /// 立即撤销读兴趣、登记写兴趣并进入 `Disconnecting`；已在断开中时重复调用是幂等的。
    pub fn lose_connection(&mut self) {
        if !self.state.is_connected() {
            return;
        }
        self.stop_reading();
        self.start_writing();
        if !self.state.is_disconnecting() {
            self.set_state(ConnectionState::Disconnecting);
        }
    }

    /// 连接已丢失（或拆除完成）：进入终态，停止生产者，丢弃未写出数据并通知所有者。
    ///
    /// 可在任意时刻调用；终态之后重复调用被忽略。
    pub fn connection_lost(&mut self, reason: CloseReason) {
        if self.state.is_disconnected() {
            return;
        }
        let discarded = self.buffer.unflushed_len();
        debug!(descriptor = %self.id, %reason, discarded, "connection lost");
        self.set_state(ConnectionState::Disconnected);
        self.flow.stop();
        self.buffer.clear();
        self.reactor.remove_reader(self.id);
        self.reactor.remove_writer(self.id);
        self.close_reason = Some(reason.clone());
        if let Some(mut handler) = self.handler.take() {
            handler.on_closed(&reason);
        }
    }

    /// 可写就绪回调：合并暂存数据，尝试写出，并根据结果推进状态。
    pub fn do_write(&mut self) -> IoStatus {
        match self.state {
            ConnectionState::Pending => return IoStatus::Stalled,
            ConnectionState::Disconnected => return self.closed_status(),
            ConnectionState::Connected | ConnectionState::Disconnecting => {}
        }

        let data = self.buffer.prepare_flush(self.config.compaction_threshold());
        let offered = data.len();
        let written = if offered == 0 {
            0
        } else {
            match self.transport.write_some(data) {
                WriteOutcome::Written(written) => written,
                WriteOutcome::Lost(reason) => {
                    warn!(descriptor = %self.id, %reason, offered, "write failed, dropping connection");
                    let reason = CloseReason::Lost(reason);
                    self.connection_lost(reason.clone());
                    return IoStatus::Closed(reason);
                }
            }
        };
        trace!(descriptor = %self.id, offered, written, "flush attempt");

        if !self.buffer.consume(written) {
            return if written == 0 {
                IoStatus::Stalled
            } else {
                IoStatus::Progress
            };
        }

        self.stop_writing();
        if self.flow.needs_resume_on_drain() {
            self.resume_producer();
        } else if self.state.is_disconnecting() {
            return self.finish_disconnect();
        }
        IoStatus::Progress
    }

    /// 可读就绪回调：读取一段数据交给所有者。
    pub fn do_read(&mut self) -> IoStatus {
        match self.state {
            ConnectionState::Connected => {}
            ConnectionState::Disconnected => return self.closed_status(),
            ConnectionState::Pending | ConnectionState::Disconnecting => {
                return IoStatus::Stalled;
            }
        }

        match self.transport.read_some() {
            ReadOutcome::Data(data) if data.is_empty() => IoStatus::Stalled,
            ReadOutcome::Data(data) => {
                trace!(descriptor = %self.id, len = data.len(), "data received");
                self.with_handler(|handler, transport| handler.on_data(transport, data));
                IoStatus::Progress
            }
            ReadOutcome::Empty => IoStatus::Stalled,
            ReadOutcome::Closed(reason) => {
                self.connection_lost(reason.clone());
                IoStatus::Closed(reason)
            }
        }
    }

    /// 注册上游生产者。
    pub fn register_producer(
        &mut self,
        mut producer: Box<dyn Producer>,
        streaming: bool,
    ) -> Result<(), TransportError> {
        if self.flow.is_registered() {
            return Err(TransportError::ProducerAlreadyRegistered {
                descriptor: self.id,
            });
        }
        if self.state.is_disconnected() {
            producer.stop_producing();
            return Ok(());
        }
        debug!(descriptor = %self.id, streaming, "producer registered");
        self.flow.install(producer, streaming);
        if !streaming {
            if self.state.is_connected() {
                self.resume_producer();
            } else {
                self.flow.defer_first_pull();
            }
        }
        Ok(())
    }

    /// 注销生产者，不影响连接状态。
    ///
    /// 断开过程中注销时重新登记写兴趣，使拆除可以在下一次可写回调中完成。
    pub fn unregister_producer(&mut self) {
        if !self.flow.is_registered() {
            return;
        }
        debug!(descriptor = %self.id, "producer unregistered");
        drop(self.flow.unregister());
        if self.state.is_disconnecting() {
            self.start_writing();
        }
    }

    /// 注销生产者并请求断开。
    pub fn stop_consuming(&mut self) {
        self.unregister_producer();
        self.lose_connection();
    }

    /// 撤销读兴趣，对读就绪侧施加背压。
    pub fn pause_producing(&mut self) {
        self.stop_reading();
    }

    /// 重新登记读兴趣；只在 Connected 且未请求断开时允许。
    pub fn resume_producing(&mut self) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::InvalidState {
                descriptor: self.id,
                operation: "resume_producing",
                state: self.state.as_str(),
            });
        }
        self.start_reading();
        Ok(())
    }

    /// 等价于 [`lose_connection`](Self::lose_connection)。
    pub fn stop_producing(&mut self) {
        self.lose_connection();
    }

    fn resume_producer(&mut self) {
        if let Some(mut producer) = self.flow.lend() {
            trace!(descriptor = %self.id, "resuming producer");
            producer.resume_producing(self);
            self.flow.restore(producer);
        }
    }

    fn finish_disconnect(&mut self) -> IoStatus {
        self.connection_lost(CloseReason::Done);
        IoStatus::Closed(CloseReason::Done)
    }

    fn closed_status(&self) -> IoStatus {
        IoStatus::Closed(self.close_reason.clone().unwrap_or(CloseReason::Done))
    }

    fn with_handler<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut dyn DescriptorHandler, &mut Self),
    {
        let Some(mut handler) = self.handler.take() else {
            return;
        };
        // 所有者经 `dyn Transport` 只能请求优雅断开，回调期间不会进入终态。
        callback(handler.as_mut(), self);
        self.handler = Some(handler);
    }

    fn set_state(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal descriptor transition {} -> {}",
            self.state,
            next
        );
        debug!(descriptor = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn start_reading(&self) {
        self.reactor.add_reader(self.id);
    }

    fn stop_reading(&self) {
        self.reactor.remove_reader(self.id);
    }

    fn start_writing(&self) {
        self.reactor.add_writer(self.id);
    }

    fn stop_writing(&self) {
        self.reactor.remove_writer(self.id);
    }
}

impl<T: RawTransport> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("buffered", &self.buffer.unflushed_len())
            .field("producer", &self.flow.is_registered())
            .field("producer_paused", &self.flow.is_paused())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: RawTransport> Consumer for Descriptor<T> {
    fn write(&mut self, data: Bytes) {
        self.write_bytes(data);
    }

    fn write_sequence(&mut self, chunks: Vec<Bytes>) {
        Descriptor::write_sequence(self, chunks);
    }

    fn register_producer(
        &mut self,
        producer: Box<dyn Producer>,
        streaming: bool,
    ) -> Result<(), TransportError> {
        Descriptor::register_producer(self, producer, streaming)
    }

    fn unregister_producer(&mut self) {
        Descriptor::unregister_producer(self);
    }

    fn stop_consuming(&mut self) {
        Descriptor::stop_consuming(self);
    }
}

impl<T: RawTransport> Transport for Descriptor<T> {
    fn id(&self) -> DescriptorId {
        self.id
    }

    fn fileno(&self) -> Fileno {
        Descriptor::fileno(self)
    }

    fn lose_connection(&mut self) {
        Descriptor::lose_connection(self);
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn is_disconnecting(&self) -> bool {
        self.state.is_disconnecting()
    }
}

impl<T: RawTransport> InboundProducer for Descriptor<T> {
    fn pause_producing(&mut self) {
        Descriptor::pause_producing(self);
    }

    fn resume_producing(&mut self) -> Result<(), TransportError> {
        Descriptor::resume_producing(self)
    }

    fn stop_producing(&mut self) {
        Descriptor::stop_producing(self);
    }
}

impl<T: RawTransport> Selectable for Descriptor<T> {
    fn id(&self) -> DescriptorId {
        self.id
    }

    fn fileno(&self) -> Fileno {
        Descriptor::fileno(self)
    }

    fn do_read(&mut self) -> IoStatus {
        Descriptor::do_read(self)
    }

    fn do_write(&mut self) -> IoStatus {
        Descriptor::do_write(self)
    }

    fn connection_lost(&mut self, reason: CloseReason) {
        Descriptor::connection_lost(self, reason);
    }
}
