use std::{
    io::{self, Read, Write},
    net::TcpStream,
    os::{fd::AsRawFd, unix::net::UnixStream},
};

use bytes::Bytes;
use spark_transport::{CloseReason, Fileno, RawTransport, ReadOutcome, WriteOutcome};

const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// 基于标准库非阻塞流的底层传输。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 为 Descriptor 提供一个可以直接挂到 TCP/Unix 套接字上的 [`RawTransport`]；
/// - 把 `io::Error` 的各种类别映射为 Descriptor 能理解的三类结果：有进展、无进展、连接丢失。
///
/// ## 逻辑（How）
/// - `WouldBlock` 映射为“写出 0 字节”或“本轮无数据”，等待下一次就绪事件；
/// - `Interrupted` 原地重试；
/// - 读到 EOF（`Ok(0)`）视为对端正常关闭，其余错误视为连接丢失；
/// - 读取复用同一块暂存区，交给所有者的数据按实际长度复制，不会拖住整块暂存区。
///
/// ## 契约（What）
/// - **前置条件**：通过 [`new`](Self::new) 传入的流必须已处于非阻塞模式；
///   [`tcp`](Self::tcp)/[`unix`](Self::unix) 会自行设置；
/// - `fileno` 返回流的原始文件描述符。
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    scratch: Vec<u8>,
}

impl<S> StreamTransport<S>
where
    S: Read + Write + AsRawFd,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            scratch: vec![0; DEFAULT_READ_CHUNK],
        }
    }

    /// 单次读取的最大字节数；取值 0 时按 1 处理。
    pub fn with_read_chunk(mut self, bytes: usize) -> Self {
        self.scratch = vec![0; bytes.max(1)];
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl StreamTransport<TcpStream> {
    /// 切换为非阻塞模式并包装 TCP 流。
    pub fn tcp(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self::new(stream))
    }
}

impl StreamTransport<UnixStream> {
    /// 切换为非阻塞模式并包装 Unix 域流。
    pub fn unix(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self::new(stream))
    }
}

impl<S> RawTransport for StreamTransport<S>
where
    S: Read + Write + AsRawFd,
{
    fn write_some(&mut self, data: &[u8]) -> WriteOutcome {
        loop {
            match self.stream.write(data) {
                Ok(written) => return WriteOutcome::Written(written),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return WriteOutcome::Written(0);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return WriteOutcome::Lost(err.into()),
            }
        }
    }

    fn read_some(&mut self) -> ReadOutcome {
        loop {
            match self.stream.read(&mut self.scratch) {
                Ok(0) => return ReadOutcome::Closed(CloseReason::Done),
                Ok(read) => {
                    return ReadOutcome::Data(Bytes::copy_from_slice(&self.scratch[..read]));
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return ReadOutcome::Empty,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return ReadOutcome::Closed(err.into()),
            }
        }
    }

    fn fileno(&self) -> Fileno {
        Fileno::new(i64::from(self.stream.as_raw_fd()))
    }
}
