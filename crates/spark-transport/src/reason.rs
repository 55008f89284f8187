use std::{borrow::Cow, fmt, io};

/// 连接彻底关闭的原因，随 `connection_lost` 通知送达所有者。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 区分“主动断开且输出已全部刷出”的正常关闭与“对端复位/IO 失败”的异常丢失；
/// - 所有者据此决定是否需要重连或上报故障，本层不做任何自动重连。
///
/// ## 契约说明（What）
/// - `Done`：`lose_connection` 之后缓冲区已清空，Descriptor 主动完成拆除；
/// - `Lost`：写原语报告失败、读端报告错误，或事件循环外部通知连接丢失；
///   未刷出的缓冲数据被整体丢弃。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CloseReason {
    Done,
    Lost(LostReason),
}

impl CloseReason {
    /// 构造携带说明文字的连接丢失原因。
    pub fn lost(message: impl Into<Cow<'static, str>>) -> Self {
        CloseReason::Lost(LostReason::new(io::ErrorKind::Other, message))
    }

    /// 判断是否为正常关闭。
    pub fn is_clean(&self) -> bool {
        matches!(self, CloseReason::Done)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Done => f.write_str("connection was closed cleanly"),
            CloseReason::Lost(reason) => write!(f, "connection was lost: {reason}"),
        }
    }
}

impl From<io::Error> for CloseReason {
    fn from(error: io::Error) -> Self {
        CloseReason::Lost(LostReason::from(error))
    }
}

/// 连接丢失的细节。
///
/// - **契约 (What)**：`kind` 保留底层 `io::ErrorKind` 供分类使用，`message` 为人类可读描述；
/// - **风险 (Trade-offs)**：不保存原始 `io::Error`，以换取 `Clone + Eq`，便于同时交给所有者与返回给事件循环。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LostReason {
    kind: io::ErrorKind,
    message: Cow<'static, str>,
}

impl LostReason {
    pub fn new(kind: io::ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl From<io::Error> for LostReason {
    fn from(error: io::Error) -> Self {
        Self {
            kind: error.kind(),
            message: Cow::Owned(error.to_string()),
        }
    }
}
