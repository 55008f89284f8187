//! # 连接状态机
//!
//! ## 状态图（What）
//! - `Pending → Connected → Disconnecting → Disconnected`；
//! - `Pending`、`Connected` 都可以被外部连接丢失直接打断进入 `Disconnected`；
//! - `Disconnected` 是终态，Descriptor 此后保持惰性，只能被丢弃而不能复用；
//! - 自环（例如重复 `lose_connection`）视为幂等，不构成非法跃迁。

use core::fmt;

/// Descriptor 的连接状态。
///
/// # 教案式说明
/// - **意图 (Why)**：以单一枚举取代 `connected`/`disconnecting`/`disconnected` 三个布尔量，
///   让“已断开则必不处于连接态”在类型上成立；
/// - **契约 (What)**：`Disconnecting` 是 Connected 的子状态，输出尚未刷完，
///   [`is_connected`](Self::is_connected) 对其返回 `true`。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConnectionState {
    /// 已创建、尚未建立连接。
    Pending,
    /// 通道已建立。
    Connected,
    /// 已请求断开，等待缓冲输出刷完。
    Disconnecting,
    /// 拆除完成。
    Disconnected,
}

impl ConnectionState {
    /// 判断状态是否允许跃迁至 `target`。
    pub fn can_transition_to(self, target: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Pending, Pending)
                | (Pending, Connected)
                | (Pending, Disconnected)
                | (Connected, Connected)
                | (Connected, Disconnecting)
                | (Connected, Disconnected)
                | (Disconnecting, Disconnecting)
                | (Disconnecting, Disconnected)
                | (Disconnected, Disconnected)
        )
    }

    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Disconnecting
        )
    }

    pub fn is_disconnecting(self) -> bool {
        matches!(self, ConnectionState::Disconnecting)
    }

    pub fn is_disconnected(self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
