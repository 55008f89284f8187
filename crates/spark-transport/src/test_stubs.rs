//! 传输契约的测试桩集合，集中提供记录型 Reactor、脚本化底层传输与记录型生产者/所有者。
//!
//! # 设计定位（Why）
//! - Descriptor 的单元测试与集成测试都需要满足 [`Reactor`]、[`RawTransport`]、[`Producer`]、
//!   [`DescriptorHandler`] 契约，但只关心调用序列；
//! - 统一出口避免各测试文件重复定义桩类型，接口演进时可获得集中编译错误提示。
//!
//! # 使用方式（How）
//! - 每个桩在构造时同时返回一个“探针”（Probe），桩本体交给 Descriptor 持有，
//!   探针留在测试中读取记录；二者通过 `Arc<Mutex<_>>` 共享状态；
//! - [`ScriptedTransport`] 按脚本逐次决定每次写原语接受多少字节，脚本耗尽后全部接受。
//!
//! # 风险与权衡（Trade-offs）
//! - 桩对象只用于测试与示例；它们不做任何真实 IO。

use std::{collections::BTreeSet, collections::VecDeque, sync::Arc};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    io::{Fileno, RawTransport, ReadOutcome, WriteOutcome},
    producer::{Consumer, DescriptorHandler, Producer, Transport},
    reactor::{DescriptorId, Reactor},
    reason::{CloseReason, LostReason},
};

/// Reactor 收到的一次注册调用。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReactorCall {
    AddReader(DescriptorId),
    RemoveReader(DescriptorId),
    AddWriter(DescriptorId),
    RemoveWriter(DescriptorId),
}

#[derive(Debug, Default)]
struct ReactorTables {
    readers: BTreeSet<DescriptorId>,
    writers: BTreeSet<DescriptorId>,
    calls: Vec<ReactorCall>,
}

/// 记录注册表与调用序列的 Reactor。
///
/// - **契约 (What)**：注册表语义与真实事件循环一致（幂等集合），`calls` 保留原始调用顺序；
/// - 测试可通过 [`is_writing`](Self::is_writing) 模拟“只有登记了写兴趣才会收到可写回调”。
#[derive(Debug, Default)]
pub struct RecordingReactor {
    tables: Mutex<ReactorTables>,
}

impl RecordingReactor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_reading(&self, id: DescriptorId) -> bool {
        self.tables.lock().readers.contains(&id)
    }

    pub fn is_writing(&self, id: DescriptorId) -> bool {
        self.tables.lock().writers.contains(&id)
    }

    pub fn calls(&self) -> Vec<ReactorCall> {
        self.tables.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.tables.lock().calls.clear();
    }
}

impl Reactor for RecordingReactor {
    fn add_reader(&self, id: DescriptorId) {
        let mut tables = self.tables.lock();
        tables.readers.insert(id);
        tables.calls.push(ReactorCall::AddReader(id));
    }

    fn remove_reader(&self, id: DescriptorId) {
        let mut tables = self.tables.lock();
        tables.readers.remove(&id);
        tables.calls.push(ReactorCall::RemoveReader(id));
    }

    fn add_writer(&self, id: DescriptorId) {
        let mut tables = self.tables.lock();
        tables.writers.insert(id);
        tables.calls.push(ReactorCall::AddWriter(id));
    }

    fn remove_writer(&self, id: DescriptorId) {
        let mut tables = self.tables.lock();
        tables.writers.remove(&id);
        tables.calls.push(ReactorCall::RemoveWriter(id));
    }
}

/// 脚本中的单步写行为。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteStep {
    /// 最多接受 `n` 个字节。
    Accept(usize),
    /// 接受全部字节。
    AcceptAll,
    /// 报告连接丢失。
    Fail(LostReason),
}

#[derive(Debug, Default)]
struct ScriptState {
    write_script: VecDeque<WriteStep>,
    read_script: VecDeque<ReadOutcome>,
    attempts: Vec<Bytes>,
    delivered: Vec<u8>,
    fileno: Option<i64>,
}

/// 按脚本响应写原语的底层传输。
#[derive(Debug)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

/// [`ScriptedTransport`] 的观察端。
#[derive(Clone, Debug)]
pub struct TransportProbe {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, TransportProbe) {
        let state = Arc::new(Mutex::new(ScriptState {
            fileno: Some(3),
            ..ScriptState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            TransportProbe { state },
        )
    }
}

impl TransportProbe {
    /// 追加若干写步骤。
    pub fn script_writes(&self, steps: impl IntoIterator<Item = WriteStep>) {
        self.state.lock().write_script.extend(steps);
    }

    /// 追加若干读结果。
    pub fn script_reads(&self, outcomes: impl IntoIterator<Item = ReadOutcome>) {
        self.state.lock().read_script.extend(outcomes);
    }

    /// 每次写原语调用时收到的完整待写数据。
    pub fn attempts(&self) -> Vec<Bytes> {
        self.state.lock().attempts.clone()
    }

    /// 写原语实际接受的字节，按顺序拼接。
    pub fn delivered(&self) -> Vec<u8> {
        self.state.lock().delivered.clone()
    }

    pub fn set_fileno(&self, fileno: Option<i64>) {
        self.state.lock().fileno = fileno;
    }
}

impl RawTransport for ScriptedTransport {
    fn write_some(&mut self, data: &[u8]) -> WriteOutcome {
        let mut state = self.state.lock();
        state.attempts.push(Bytes::copy_from_slice(data));
        let accepted = match state.write_script.pop_front().unwrap_or(WriteStep::AcceptAll) {
            WriteStep::Accept(limit) => limit.min(data.len()),
            WriteStep::AcceptAll => data.len(),
            WriteStep::Fail(reason) => return WriteOutcome::Lost(reason),
        };
        state.delivered.extend_from_slice(&data[..accepted]);
        WriteOutcome::Written(accepted)
    }

    fn read_some(&mut self) -> ReadOutcome {
        self.state
            .lock()
            .read_script
            .pop_front()
            .unwrap_or(ReadOutcome::Empty)
    }

    fn fileno(&self) -> Fileno {
        self.state
            .lock()
            .fileno
            .map_or(Fileno::INVALID, Fileno::new)
    }
}

/// 生产者收到的一次流控调用。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProducerEvent {
    Paused,
    Resumed,
    Stopped,
}

#[derive(Debug, Default)]
struct ProducerState {
    events: Vec<ProducerEvent>,
    chunks: VecDeque<Bytes>,
    unregister_when_exhausted: bool,
}

/// 记录流控调用的生产者；每次 `resume_producing` 写出预置队列中的下一段数据。
#[derive(Debug)]
pub struct RecordingProducer {
    state: Arc<Mutex<ProducerState>>,
}

/// [`RecordingProducer`] 的观察端。
#[derive(Clone, Debug)]
pub struct ProducerProbe {
    state: Arc<Mutex<ProducerState>>,
}

impl RecordingProducer {
    pub fn new() -> (Self, ProducerProbe) {
        Self::with_chunks(Vec::new())
    }

    /// 预置每次恢复时要写出的数据段。
    pub fn with_chunks(chunks: Vec<Bytes>) -> (Self, ProducerProbe) {
        let state = Arc::new(Mutex::new(ProducerState {
            chunks: chunks.into(),
            ..ProducerState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            ProducerProbe { state },
        )
    }

    /// 数据段耗尽后在下一次恢复时注销自身（典型的文件发送器行为）。
    pub fn unregister_when_exhausted(self) -> Self {
        self.state.lock().unregister_when_exhausted = true;
        self
    }
}

impl ProducerProbe {
    pub fn events(&self) -> Vec<ProducerEvent> {
        self.state.lock().events.clone()
    }

    pub fn count(&self, event: ProducerEvent) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|recorded| **recorded == event)
            .count()
    }
}

impl Producer for RecordingProducer {
    fn pause_producing(&mut self) {
        self.state.lock().events.push(ProducerEvent::Paused);
    }

    fn resume_producing(&mut self, consumer: &mut dyn Consumer) {
        let (next, unregister) = {
            let mut state = self.state.lock();
            state.events.push(ProducerEvent::Resumed);
            let next = state.chunks.pop_front();
            let unregister = next.is_none() && state.unregister_when_exhausted;
            (next, unregister)
        };
        if let Some(chunk) = next {
            consumer.write(chunk);
        } else if unregister {
            consumer.unregister_producer();
        }
    }

    fn stop_producing(&mut self) {
        self.state.lock().events.push(ProducerEvent::Stopped);
    }
}

/// 所有者收到的一次回调。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HandlerEvent {
    Connected,
    Data(Bytes),
    Closed(CloseReason),
}

#[derive(Debug, Default)]
struct HandlerState {
    events: Vec<HandlerEvent>,
    echo: bool,
    close_after_data: bool,
}

/// 记录回调的所有者；可选地把收到的数据原样写回。
#[derive(Debug)]
pub struct RecordingHandler {
    state: Arc<Mutex<HandlerState>>,
}

/// [`RecordingHandler`] 的观察端。
#[derive(Clone, Debug)]
pub struct HandlerProbe {
    state: Arc<Mutex<HandlerState>>,
}

impl RecordingHandler {
    pub fn new() -> (Self, HandlerProbe) {
        let state = Arc::new(Mutex::new(HandlerState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            HandlerProbe { state },
        )
    }

    /// 收到数据时原样写回。
    pub fn echo(self) -> Self {
        self.state.lock().echo = true;
        self
    }

    /// 收到第一段数据后请求断开。
    pub fn close_after_data(self) -> Self {
        self.state.lock().close_after_data = true;
        self
    }
}

impl HandlerProbe {
    pub fn events(&self) -> Vec<HandlerEvent> {
        self.state.lock().events.clone()
    }

    /// 所有 `Closed` 回调携带的原因。
    pub fn close_reasons(&self) -> Vec<CloseReason> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                HandlerEvent::Closed(reason) => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DescriptorHandler for RecordingHandler {
    fn on_connected(&mut self, _transport: &mut dyn Transport) {
        self.state.lock().events.push(HandlerEvent::Connected);
    }

    fn on_data(&mut self, transport: &mut dyn Transport, data: Bytes) {
        let (echo, close) = {
            let mut state = self.state.lock();
            state.events.push(HandlerEvent::Data(data.clone()));
            (state.echo, state.close_after_data)
        };
        if echo {
            transport.write(data);
        }
        if close {
            transport.lose_connection();
        }
    }

    fn on_closed(&mut self, reason: &CloseReason) {
        self.state
            .lock()
            .events
            .push(HandlerEvent::Closed(reason.clone()));
    }
}
