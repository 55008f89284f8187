use core::fmt;

use bytes::Bytes;

use crate::reason::{CloseReason, LostReason};

/// 具体传输实现必须提供的底层非阻塞 IO 能力。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - Descriptor 负责缓冲、状态机与背压，但真正触达操作系统的读写只发生在这里；
/// - 以组合代替继承：Descriptor 持有一个 `RawTransport`，TCP、Unix 套接字、管道
///   或测试用的脚本化实现都只需实现这三个方法。
///
/// ## 契约说明（What）
/// - `write_some`：尽可能多地写出 `data`，**不得阻塞**；返回实际写出的字节数
///   （可以为 0，表示内核缓冲区暂满），或返回连接丢失信号；
/// - `read_some`：尝试读取一段数据，**不得阻塞**；
/// - `fileno`：连接建立后返回有效的操作系统句柄，之前或之后返回 [`Fileno::INVALID`]。
///
/// ## 风险提示（Trade-offs）
/// - `write_some` 返回 `Lost` 后 Descriptor 不会重试，该结果被视为“通道已消失”的权威信号；
/// - 实现不应在 `write_some` 中自行缓冲数据，否则会破坏 Descriptor 的字节计数。
pub trait RawTransport {
    /// 尝试写出 `data` 的一个前缀。
    fn write_some(&mut self, data: &[u8]) -> WriteOutcome;

    /// 尝试读取一段入站数据。
    fn read_some(&mut self) -> ReadOutcome;

    /// 返回底层句柄。
    fn fileno(&self) -> Fileno;
}

/// 一次写原语调用的结果。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    /// 写出了前 `n` 个字节；`n == 0` 表示本轮没有进展，下一次可写就绪时重试。
    Written(usize),
    /// 通道已不可用，附带原因。
    Lost(LostReason),
}

/// 一次读原语调用的结果。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadOutcome {
    /// 读到了一段非空数据。
    Data(Bytes),
    /// 本轮没有可读数据（例如 `WouldBlock`）。
    Empty,
    /// 对端关闭（`Done`）或读取失败（`Lost`）。
    Closed(CloseReason),
}

/// 操作系统层面的句柄编号。
///
/// - **契约 (What)**：负值一律视为无效，[`Fileno::INVALID`] 为约定的哨兵值；
/// - **风险 (Trade-offs)**：使用 `i64` 同时容纳 Unix 文件描述符与 Windows 套接字句柄。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Fileno(i64);

impl Fileno {
    /// 未连接或已拆除时返回的哨兵值。
    pub const INVALID: Fileno = Fileno(-1);

    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for Fileno {
    fn default() -> Self {
        Fileno::INVALID
    }
}

impl fmt::Display for Fileno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
