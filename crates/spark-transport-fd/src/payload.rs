//! 出站负载的类型边界。
//!
//! ## 意图（Why）
//! - 写缓冲只接受原始字节序列；文本必须由调用方显式编码后再写入，
//!   绝不能被悄悄转换后进入缓冲区；
//! - 用封闭 trait 在编译期拒绝 `&str`/`String`，把运行期类型检查变成类型系统约束。
//!
//! ```compile_fail
//! use spark_transport_fd::WritePayload;
//!
//! fn accepts<P: WritePayload>(_payload: P) {}
//! accepts("text is not a byte sequence");
//! ```

use bytes::{Bytes, BytesMut};

mod sealed {
    pub trait Sealed {}
}

/// 可以进入写缓冲的字节序列类型。
///
/// - **契约 (What)**：实现者只有 `Bytes`、`BytesMut`、`Vec<u8>`、`&[u8]` 与字节数组引用；
///   `&[u8]` 会被复制，其余类型零拷贝转换；
/// - **风险 (Trade-offs)**：trait 封闭，下游无法为文本类型补充实现。
pub trait WritePayload: sealed::Sealed {
    fn into_bytes(self) -> Bytes;
}

impl sealed::Sealed for Bytes {}
impl WritePayload for Bytes {
    fn into_bytes(self) -> Bytes {
        self
    }
}

impl sealed::Sealed for BytesMut {}
impl WritePayload for BytesMut {
    fn into_bytes(self) -> Bytes {
        self.freeze()
    }
}

impl sealed::Sealed for Vec<u8> {}
impl WritePayload for Vec<u8> {
    fn into_bytes(self) -> Bytes {
        Bytes::from(self)
    }
}

impl sealed::Sealed for &[u8] {}
impl WritePayload for &[u8] {
    fn into_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> sealed::Sealed for &[u8; N] {}
impl<const N: usize> WritePayload for &[u8; N] {
    fn into_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}
