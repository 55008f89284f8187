//! 事件循环（Reactor）与被驱动对象（Selectable）之间的契约。
//!
//! ## 定位（Why）
//! - 事件循环本身不在本工作区实现；这里只约定 Descriptor 调用事件循环的四个注册方法，
//!   以及事件循环回调 Descriptor 的入口；
//! - Descriptor 在构造时显式注入 Reactor 引用，从不通过全局状态查找。
//!
//! ## 约束（What）
//! - 同一 Descriptor 的回调绝不会与其它回调或应用调用并发交错；
//! - 注册表只由 Reactor 维护，Descriptor 只增删自身条目。

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{io::Fileno, reason::CloseReason};

/// Descriptor 在 Reactor 注册表中的键。
///
/// - **契约 (What)**：由 [`DescriptorId::next`] 进程内单调分配，永不复用；
/// - **风险 (Trade-offs)**：不使用 `fileno` 作为键，因为句柄在关闭后会被内核复用。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DescriptorId(u64);

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

impl DescriptorId {
    /// 分配一个新的标识。
    pub fn next() -> Self {
        Self(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd#{}", self.0)
    }
}

/// Descriptor 依赖的事件循环能力。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把“是否需要读/写就绪通知”的决定权交给 Descriptor，把“何时就绪”的判断留给事件循环；
/// - 四个方法都必须幂等：重复添加或移除同一 Descriptor 不应产生副作用。
///
/// ## 契约说明（What）
/// - `add_reader`/`remove_reader`：登记/撤销读就绪兴趣；
/// - `add_writer`/`remove_writer`：登记/撤销写就绪兴趣；
/// - **前置条件**：调用发生在事件循环所在的逻辑线程上；
/// - **后置条件**：每个就绪事件对已登记的 Descriptor 恰好回调一次 `do_read`/`do_write`。
///
/// ## 风险提示（Trade-offs）
/// - 方法接收 `&self`，实现内部需自行使用互斥或单线程单元维护注册表；
/// - `Send + Sync` 约束允许在其它线程持有句柄（例如跨线程唤醒），但回调仍在事件循环线程执行。
pub trait Reactor: Send + Sync {
    fn add_reader(&self, id: DescriptorId);
    fn remove_reader(&self, id: DescriptorId);
    fn add_writer(&self, id: DescriptorId);
    fn remove_writer(&self, id: DescriptorId);
}

/// 一次就绪回调的结果，告知事件循环后续如何处理该 Descriptor。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IoStatus {
    /// 有进展：写出了字节、读到了数据，或缓冲区已排空。
    Progress,
    /// 本轮没有任何进展，但连接仍然存活；等待下一次就绪事件。
    Stalled,
    /// Descriptor 已完成拆除，事件循环应丢弃它。
    Closed(CloseReason),
}

impl IoStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, IoStatus::Closed(_))
    }
}

/// 事件循环驱动的对象。
///
/// - **意图 (Why)**：事件循环只需面向该 trait 调度，不关心具体缓冲/状态实现；
/// - **契约 (What)**：`do_read`/`do_write` 仅在对应就绪事件时调用；`connection_lost`
///   可在任意时刻调用（例如对端复位），调用后对象进入终态。
pub trait Selectable {
    fn id(&self) -> DescriptorId;
    fn fileno(&self) -> Fileno;
    fn do_read(&mut self) -> IoStatus;
    fn do_write(&mut self) -> IoStatus;
    fn connection_lost(&mut self, reason: CloseReason);
}
