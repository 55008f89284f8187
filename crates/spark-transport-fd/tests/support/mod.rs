//! Descriptor 集成测试共用的夹具。
//!
//! # 设计动机（Why）
//! - 每个用例都需要“记录型 Reactor + 脚本化底层传输 + 记录型所有者”三件套；
//! - `flush` 模拟事件循环：只有登记了写兴趣时才投递可写回调。

#![allow(dead_code)]

use std::sync::Arc;

use spark_transport::{
    DescriptorHandler, IoStatus, Reactor,
    test_stubs::{HandlerProbe, RecordingHandler, RecordingReactor, ScriptedTransport, TransportProbe},
};
use spark_transport_fd::{Descriptor, DescriptorConfig};

pub struct Fixture {
    pub descriptor: Descriptor<ScriptedTransport>,
    pub reactor: Arc<RecordingReactor>,
    pub transport: TransportProbe,
    pub handler: HandlerProbe,
}

impl Fixture {
    /// 已连接、使用默认配置的 Descriptor。
    pub fn connected() -> Self {
        Self::connected_with(DescriptorConfig::default())
    }

    pub fn connected_with(config: DescriptorConfig) -> Self {
        let mut fixture = Self::pending_with(config, RecordingHandler::new());
        fixture.descriptor.start();
        fixture
    }

    pub fn pending_with(config: DescriptorConfig, handler: (RecordingHandler, HandlerProbe)) -> Self {
        let (handler, handler_probe) = handler;
        Self::assemble(config, Box::new(handler), handler_probe)
    }

    /// 使用自定义所有者；`handler` 探针不会记录任何事件。
    pub fn pending_with_handler(config: DescriptorConfig, handler: Box<dyn DescriptorHandler>) -> Self {
        let (_recording, idle_probe) = RecordingHandler::new();
        Self::assemble(config, handler, idle_probe)
    }

    fn assemble(
        config: DescriptorConfig,
        handler: Box<dyn DescriptorHandler>,
        handler_probe: HandlerProbe,
    ) -> Self {
        let reactor = RecordingReactor::new();
        let (transport, transport_probe) = ScriptedTransport::new();
        let descriptor = Descriptor::with_config(
            Arc::clone(&reactor) as Arc<dyn Reactor>,
            transport,
            handler,
            config,
        )
        .expect("valid config");
        Self {
            descriptor,
            reactor,
            transport: transport_probe,
            handler: handler_probe,
        }
    }

    pub fn is_writing(&self) -> bool {
        self.reactor.is_writing(self.descriptor.id())
    }

    pub fn is_reading(&self) -> bool {
        self.reactor.is_reading(self.descriptor.id())
    }

    /// 只要登记了写兴趣就投递可写回调，最多 `max_rounds` 轮；返回每轮结果。
    pub fn flush(&mut self, max_rounds: usize) -> Vec<IoStatus> {
        let mut statuses = Vec::new();
        for _ in 0..max_rounds {
            if !self.is_writing() {
                break;
            }
            let status = self.descriptor.do_write();
            let closed = status.is_closed();
            statuses.push(status);
            if closed {
                break;
            }
        }
        statuses
    }
}
