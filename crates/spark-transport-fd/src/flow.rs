use spark_transport::producer::Producer;

/// 生产者槽位。
///
/// - `Lent`：生产者正处于自身回调中（已被借出），逻辑上仍然注册；
/// - 回调期间的注销会把槽位改为 `Empty`，归还时据此决定是否放回。
enum Slot {
    Empty,
    Registered(Box<dyn Producer>),
    Lent,
}

/// 单个上游生产者的注册与背压簿记。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - Descriptor 在回调生产者时需要把自身作为 `&mut dyn Consumer` 交出去，
///   生产者因此必须先从槽位中“借出”，回调结束再归还；
/// - 回调中生产者可能写入（触发暂停）、注销自身或请求断开，这些都要在归还时正确落地。
///
/// ## 契约（What）
/// - 同一时刻至多注册一个生产者；
/// - 只有流式生产者会被暂停，且每个暂停周期只暂停一次；
/// - 恢复只发生在写缓冲完全排空时（全有或全无，没有低水位）；
/// - 借出期间触发的暂停、停止请求在归还时补发。
pub(crate) struct ProducerFlow {
    slot: Slot,
    streaming: bool,
    paused: bool,
    pause_deferred: bool,
    stop_deferred: bool,
    first_pull_deferred: bool,
}

impl ProducerFlow {
    pub(crate) fn new() -> Self {
        Self {
            slot: Slot::Empty,
            streaming: false,
            paused: false,
            pause_deferred: false,
            stop_deferred: false,
            first_pull_deferred: false,
        }
    }

    pub(crate) fn is_registered(&self) -> bool {
        !matches!(self.slot, Slot::Empty)
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.is_registered() && self.streaming
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    /// 安装生产者；调用方已确认槽位为空。
    pub(crate) fn install(&mut self, producer: Box<dyn Producer>, streaming: bool) {
        debug_assert!(!self.is_registered());
        self.slot = Slot::Registered(producer);
        self.streaming = streaming;
        self.paused = false;
        self.pause_deferred = false;
        self.stop_deferred = false;
        self.first_pull_deferred = false;
    }

    /// 注销生产者，不通知它；返回被移除的生产者以便调用方丢弃。
    pub(crate) fn unregister(&mut self) -> Option<Box<dyn Producer>> {
        let previous = core::mem::replace(&mut self.slot, Slot::Empty);
        self.streaming = false;
        self.paused = false;
        self.pause_deferred = false;
        self.stop_deferred = false;
        self.first_pull_deferred = false;
        match previous {
            Slot::Registered(producer) => Some(producer),
            Slot::Empty | Slot::Lent => None,
        }
    }

    /// 连接建立前注册的非流式生产者欠一次首次拉取，由 `start` 兑现。
    pub(crate) fn defer_first_pull(&mut self) {
        debug_assert!(self.is_registered() && !self.streaming);
        self.first_pull_deferred = true;
    }

    /// 取走欠下的首次拉取；只有当前注册的仍是那个生产者时才返回 `true`。
    pub(crate) fn take_deferred_pull(&mut self) -> bool {
        core::mem::take(&mut self.first_pull_deferred)
    }

    /// 未刷出字节数超过水位时是否应暂停。
    pub(crate) fn should_pause(&self, unflushed: usize, high_water_mark: usize) -> bool {
        self.is_streaming() && !self.paused && unflushed > high_water_mark
    }

    /// 暂停流式生产者；借出期间延后到归还时送达。
    pub(crate) fn pause(&mut self) {
        debug_assert!(self.is_streaming());
        self.paused = true;
        match &mut self.slot {
            Slot::Registered(producer) => producer.pause_producing(),
            Slot::Lent => self.pause_deferred = true,
            Slot::Empty => {}
        }
    }

    /// 缓冲排空时是否需要向生产者要数据：非流式生产者总是需要，流式生产者仅在被暂停时需要。
    pub(crate) fn needs_resume_on_drain(&self) -> bool {
        matches!(self.slot, Slot::Registered(_)) && (!self.streaming || self.paused)
    }

    /// 借出生产者以便回调；同时清除暂停标记，回调内的再次暂停会被重新记录。
    pub(crate) fn lend(&mut self) -> Option<Box<dyn Producer>> {
        match core::mem::replace(&mut self.slot, Slot::Lent) {
            Slot::Registered(producer) => {
                self.paused = false;
                Some(producer)
            }
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// 归还借出的生产者，并补发借出期间延后的暂停或停止。
    pub(crate) fn restore(&mut self, mut producer: Box<dyn Producer>) {
        if self.stop_deferred {
            self.stop_deferred = false;
            producer.stop_producing();
            return;
        }
        if !matches!(self.slot, Slot::Lent) {
            // 回调中已注销（可能还注册了新的生产者），旧生产者直接丢弃。
            return;
        }
        if self.pause_deferred {
            self.pause_deferred = false;
            producer.pause_producing();
        }
        self.slot = Slot::Registered(producer);
    }

    /// 停止并移除生产者；借出期间延后到归还时停止。
    pub(crate) fn stop(&mut self) {
        let lent = matches!(self.slot, Slot::Lent);
        if let Some(mut producer) = self.unregister() {
            producer.stop_producing();
        }
        self.stop_deferred = lent;
    }
}
