//! `descriptor_contract` 集成测试：从公开 API 验证 Descriptor 的写缓冲与连接状态机契约。
//!
//! # 测试目标（Why）
//! - 写入只做内存操作，真正的 IO 只在可写回调中发生，且字节按写入顺序、不重不漏地写出；
//! - 主动断开总是等输出刷完才完成，外部连接丢失则立即生效并丢弃未写出数据；
//! - 终态之后的写入、断开请求与 IO 回调都是安全的空操作。
//!
//! # 结构安排（How）
//! - 写缓冲：合并暂存、部分写出、零字节写出、刷写中追加；
//! - 状态机：启动、主动断开、重复断开、连接丢失、写失败；
//! - 读路径与入站流控：数据投递、回显、回调内断开、`resume_producing` 状态校验。

mod support;

use std::{io::ErrorKind, sync::Arc};

use bytes::Bytes;
use spark_transport::{
    CloseReason, Fileno, IoStatus, LostReason, ReadOutcome, Reactor, Selectable, TransportError,
    test_stubs::{
        HandlerEvent, ReactorCall, RecordingHandler, RecordingReactor, ScriptedTransport,
        WriteStep,
    },
};
use spark_transport_fd::{ConfigError, ConnectionState, Descriptor, DescriptorConfig};
use support::Fixture;

fn bytes(data: &'static [u8]) -> Bytes {
    Bytes::from_static(data)
}

/// 连接建立前的写入被静默忽略，也不会登记写兴趣。
#[test]
fn writes_before_start_are_ignored() {
    let mut fixture = Fixture::pending_with(DescriptorConfig::default(), RecordingHandler::new());
    fixture.descriptor.write(b"abc");

    assert_eq!(fixture.descriptor.state(), ConnectionState::Pending);
    assert_eq!(fixture.descriptor.buffered_len(), 0);
    assert!(!fixture.is_writing());
    assert_eq!(fixture.descriptor.do_write(), IoStatus::Stalled);
    assert_eq!(fixture.descriptor.fileno(), Fileno::INVALID);
    assert!(fixture.handler.events().is_empty());
}

/// `start` 进入 Connected、登记读兴趣并通知所有者；重复调用无效果。
#[test]
fn start_registers_reader_and_notifies_handler() {
    let mut fixture = Fixture::connected();

    assert_eq!(fixture.descriptor.state(), ConnectionState::Connected);
    assert!(fixture.is_reading());
    assert!(!fixture.is_writing());
    assert_eq!(fixture.handler.events(), vec![HandlerEvent::Connected]);
    assert_eq!(fixture.descriptor.fileno(), Fileno::new(3));

    fixture.descriptor.start();
    assert_eq!(fixture.handler.events(), vec![HandlerEvent::Connected]);
}

/// 两次写入在下一次可写回调中合并为一次写原语调用。
///
/// # 契约校验（What）
/// - 写原语只被调用一次，收到的数据为 `abcdef`；
/// - 缓冲排空后撤销写兴趣。
#[test]
fn staged_chunks_merge_into_single_flush() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.write(b"abc");
    fixture.descriptor.write(b"def");
    assert!(fixture.is_writing());
    assert_eq!(fixture.descriptor.buffered_len(), 6);

    let statuses = fixture.flush(4);

    assert_eq!(statuses, vec![IoStatus::Progress]);
    assert_eq!(fixture.transport.attempts(), vec![bytes(b"abcdef")]);
    assert_eq!(fixture.transport.delivered(), b"abcdef");
    assert_eq!(fixture.descriptor.buffered_len(), 0);
    assert!(!fixture.is_writing());
}

/// 部分写出后只重发剩余部分，写兴趣保持到缓冲排空。
#[test]
fn partial_write_resends_only_the_remainder() {
    let mut fixture = Fixture::connected();
    fixture.transport.script_writes([WriteStep::Accept(4)]);
    fixture.descriptor.write(b"hello world");

    assert_eq!(fixture.descriptor.do_write(), IoStatus::Progress);
    assert!(fixture.is_writing());
    assert_eq!(fixture.descriptor.buffered_len(), 7);

    assert_eq!(fixture.descriptor.do_write(), IoStatus::Progress);
    assert_eq!(
        fixture.transport.attempts(),
        vec![bytes(b"hello world"), bytes(b"o world")]
    );
    assert_eq!(fixture.transport.delivered(), b"hello world");
    assert!(!fixture.is_writing());
}

/// 写原语写出 0 字节视为暂时无进展，数据与写兴趣都保持不变。
#[test]
fn zero_byte_write_keeps_data_and_interest() {
    let mut fixture = Fixture::connected();
    fixture.transport.script_writes([WriteStep::Accept(0)]);
    fixture.descriptor.write(b"ping");

    assert_eq!(fixture.descriptor.do_write(), IoStatus::Stalled);
    assert_eq!(fixture.descriptor.buffered_len(), 4);
    assert!(fixture.is_writing());
    assert_eq!(fixture.descriptor.state(), ConnectionState::Connected);

    assert_eq!(fixture.descriptor.do_write(), IoStatus::Progress);
    assert_eq!(fixture.transport.delivered(), b"ping");
}

/// 刷写途中追加的数据排在未写出部分之后。
#[test]
fn writes_during_partial_flush_queue_behind_remainder() {
    let mut fixture = Fixture::connected();
    fixture.transport.script_writes([WriteStep::Accept(2)]);
    fixture.descriptor.write(b"abcd");
    fixture.descriptor.do_write();

    fixture.descriptor.write(b"ef");
    fixture.descriptor.write_sequence([b"gh".as_slice(), b"".as_slice(), b"i".as_slice()]);
    fixture.flush(4);

    assert_eq!(
        fixture.transport.attempts(),
        vec![bytes(b"abcd"), bytes(b"cdefghi")]
    );
    assert_eq!(fixture.transport.delivered(), b"abcdefghi");
}

/// 空负载不进入缓冲，也不会唤醒写路径。
#[test]
fn empty_payloads_do_not_arm_the_writer() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.write(Vec::new());
    fixture.descriptor.write_sequence(Vec::<Bytes>::new());

    assert!(!fixture.is_writing());
    assert_eq!(fixture.descriptor.buffered_len(), 0);
}

/// 缓冲为空时断开：下一次可写回调直接完成拆除，不调用写原语。
#[test]
fn lose_connection_with_empty_buffer_closes_on_next_writable() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.lose_connection();

    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnecting);
    assert!(fixture.descriptor.is_connected());
    assert!(fixture.descriptor.is_disconnecting());
    assert!(!fixture.is_reading());
    assert!(fixture.is_writing());
    assert!(fixture.handler.close_reasons().is_empty());

    assert_eq!(
        fixture.descriptor.do_write(),
        IoStatus::Closed(CloseReason::Done)
    );
    assert!(fixture.transport.attempts().is_empty());
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnected);
    assert_eq!(fixture.descriptor.close_reason(), Some(&CloseReason::Done));
    assert_eq!(fixture.handler.close_reasons(), vec![CloseReason::Done]);
    assert!(!fixture.is_writing());
}

/// 断开请求等待缓冲全部写出后才完成。
#[test]
fn lose_connection_flushes_pending_output_first() {
    let mut fixture = Fixture::connected();
    fixture.transport.script_writes([WriteStep::Accept(3)]);
    fixture.descriptor.write(b"abcdef");
    fixture.descriptor.lose_connection();

    let statuses = fixture.flush(8);

    assert_eq!(
        statuses,
        vec![IoStatus::Progress, IoStatus::Closed(CloseReason::Done)]
    );
    assert_eq!(fixture.transport.delivered(), b"abcdef");
    assert_eq!(fixture.handler.close_reasons(), vec![CloseReason::Done]);
}

/// 重复断开是幂等的；终态之后的断开请求不触碰事件循环。
#[test]
fn lose_connection_is_idempotent() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.lose_connection();
    fixture.descriptor.lose_connection();
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnecting);

    fixture.flush(4);
    assert_eq!(fixture.handler.close_reasons(), vec![CloseReason::Done]);

    fixture.reactor.clear_calls();
    fixture.descriptor.lose_connection();
    assert!(fixture.reactor.calls().is_empty());
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnected);
}

/// 外部连接丢失抢占一切：丢弃缓冲、撤销注册、只通知一次。
#[test]
fn connection_lost_discards_buffer_and_notifies_once() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.write(b"never sent");
    let reason = CloseReason::lost("peer reset");

    fixture.descriptor.connection_lost(reason.clone());

    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnected);
    assert_eq!(fixture.descriptor.buffered_len(), 0);
    assert!(!fixture.is_reading());
    assert!(!fixture.is_writing());
    assert_eq!(
        fixture.descriptor.do_write(),
        IoStatus::Closed(reason.clone())
    );
    assert!(fixture.transport.attempts().is_empty());

    fixture.descriptor.connection_lost(CloseReason::Done);
    assert_eq!(fixture.handler.close_reasons(), vec![reason.clone()]);
    assert_eq!(fixture.descriptor.close_reason(), Some(&reason));
}

/// 写原语报告失败是致命的：缓冲被丢弃，所有者收到携带原因的关闭通知。
#[test]
fn write_failure_loses_the_connection() {
    let mut fixture = Fixture::connected();
    let lost = LostReason::new(ErrorKind::ConnectionReset, "reset by peer");
    fixture
        .transport
        .script_writes([WriteStep::Fail(lost.clone())]);
    fixture.descriptor.write(b"abc");

    let status = fixture.descriptor.do_write();

    assert_eq!(status, IoStatus::Closed(CloseReason::Lost(lost.clone())));
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnected);
    assert_eq!(fixture.descriptor.buffered_len(), 0);
    assert!(fixture.transport.delivered().is_empty());
    assert_eq!(
        fixture.handler.close_reasons(),
        vec![CloseReason::Lost(lost)]
    );
}

/// 终态之后的写入被静默忽略。
#[test]
fn writes_after_disconnect_are_ignored() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.connection_lost(CloseReason::Done);
    fixture.reactor.clear_calls();

    fixture.descriptor.write(b"late");
    fixture.descriptor.write_sequence([b"later"]);

    assert_eq!(fixture.descriptor.buffered_len(), 0);
    assert!(fixture.reactor.calls().is_empty());
    assert!(fixture.transport.attempts().is_empty());
}

/// 句柄只在连接期间（含断开中）可见，其余时间返回哨兵值。
#[test]
fn fileno_is_sentinel_outside_the_connection() {
    let mut fixture = Fixture::pending_with(DescriptorConfig::default(), RecordingHandler::new());
    assert_eq!(fixture.descriptor.fileno(), Fileno::INVALID);

    fixture.descriptor.start();
    assert_eq!(fixture.descriptor.fileno(), Fileno::new(3));

    fixture.descriptor.lose_connection();
    assert_eq!(fixture.descriptor.fileno(), Fileno::new(3));

    fixture.flush(4);
    assert_eq!(fixture.descriptor.fileno(), Fileno::INVALID);
    assert!(!fixture.descriptor.fileno().is_valid());
}

/// 读到的数据交给所有者；回显的数据经由写缓冲送出。
#[test]
fn read_data_reaches_handler_and_echo_flows_back() {
    let (handler, probe) = RecordingHandler::new();
    let mut fixture =
        Fixture::pending_with(DescriptorConfig::default(), (handler.echo(), probe));
    fixture.descriptor.start();
    fixture
        .transport
        .script_reads([ReadOutcome::Data(bytes(b"ping"))]);

    assert_eq!(fixture.descriptor.do_read(), IoStatus::Progress);
    assert_eq!(fixture.descriptor.do_read(), IoStatus::Stalled);
    assert_eq!(
        fixture.handler.events(),
        vec![HandlerEvent::Connected, HandlerEvent::Data(bytes(b"ping"))]
    );
    assert!(fixture.is_writing());

    fixture.flush(4);
    assert_eq!(fixture.transport.delivered(), b"ping");
}

/// 对端正常关闭读端：进入终态并以 `Done` 通知所有者。
#[test]
fn read_eof_closes_cleanly() {
    let mut fixture = Fixture::connected();
    fixture
        .transport
        .script_reads([ReadOutcome::Closed(CloseReason::Done)]);

    assert_eq!(
        fixture.descriptor.do_read(),
        IoStatus::Closed(CloseReason::Done)
    );
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnected);
    assert_eq!(fixture.handler.close_reasons(), vec![CloseReason::Done]);
    assert_eq!(
        fixture.descriptor.do_read(),
        IoStatus::Closed(CloseReason::Done)
    );
}

/// 所有者在数据回调中请求断开：读兴趣立即撤销，拆除在下一次可写回调中完成。
#[test]
fn handler_can_close_from_data_callback() {
    let (handler, probe) = RecordingHandler::new();
    let mut fixture =
        Fixture::pending_with(DescriptorConfig::default(), (handler.close_after_data(), probe));
    fixture.descriptor.start();
    fixture
        .transport
        .script_reads([ReadOutcome::Data(bytes(b"bye"))]);

    fixture.descriptor.do_read();

    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnecting);
    assert!(!fixture.is_reading());
    assert_eq!(
        fixture.flush(4),
        vec![IoStatus::Closed(CloseReason::Done)]
    );
    assert_eq!(fixture.handler.close_reasons(), vec![CloseReason::Done]);
}

/// 断开中不再读取数据。
#[test]
fn reads_stop_while_disconnecting() {
    let mut fixture = Fixture::connected();
    fixture
        .transport
        .script_reads([ReadOutcome::Data(bytes(b"ignored"))]);
    fixture.descriptor.lose_connection();

    assert_eq!(fixture.descriptor.do_read(), IoStatus::Stalled);
    assert_eq!(fixture.handler.events(), vec![HandlerEvent::Connected]);
}

/// 入站流控：暂停/恢复读兴趣；断开中恢复读取会被拒绝。
#[test]
fn inbound_flow_control_respects_state() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.pause_producing();
    assert!(!fixture.is_reading());

    fixture
        .descriptor
        .resume_producing()
        .expect("已连接时允许恢复读取");
    assert!(fixture.is_reading());

    fixture.descriptor.stop_producing();
    assert_eq!(fixture.descriptor.state(), ConnectionState::Disconnecting);

    let err = fixture
        .descriptor
        .resume_producing()
        .expect_err("断开中恢复读取必须失败");
    assert!(matches!(
        err,
        TransportError::InvalidState {
            operation: "resume_producing",
            state: "disconnecting",
            ..
        }
    ));
    assert!(!fixture.is_reading());
}

/// 通过 `Selectable` 对象驱动与直接调用等价，事件循环只需持有 trait 对象。
#[test]
fn selectable_object_drives_the_descriptor() {
    let mut fixture = Fixture::connected();
    fixture.descriptor.write(b"via trait");
    let id = fixture.descriptor.id();

    let selectable: &mut dyn Selectable = &mut fixture.descriptor;
    assert_eq!(selectable.id(), id);
    assert_eq!(selectable.fileno(), Fileno::new(3));
    assert_eq!(selectable.do_write(), IoStatus::Progress);
    selectable.connection_lost(CloseReason::Done);
    assert_eq!(selectable.fileno(), Fileno::INVALID);

    assert_eq!(fixture.transport.delivered(), b"via trait");
    assert_eq!(
        fixture.reactor.calls().last(),
        Some(&ReactorCall::RemoveWriter(id))
    );
}

/// 非法配置在构造时被拒绝。
#[test]
fn invalid_config_is_rejected_at_construction() {
    let reactor = RecordingReactor::new();
    let (transport, _probe) = ScriptedTransport::new();
    let (handler, _handler_probe) = RecordingHandler::new();

    let result = Descriptor::with_config(
        reactor as Arc<dyn Reactor>,
        transport,
        Box::new(handler),
        DescriptorConfig::new().with_high_water_mark(0),
    );

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "high_water_mark",
            ..
        })
    ));
}
