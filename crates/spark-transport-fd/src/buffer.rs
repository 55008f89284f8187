use bytes::Bytes;

/// Descriptor 的出站写缓冲。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - `write` 必须是 O(1) 的纯内存操作，且不能触碰可能正被部分写出的主缓冲；
///   因此新数据先进入暂存队列 `staged`，只有在真正尝试刷写时才合并进主缓冲 `pending`；
/// - 多次小写入在一次刷写中合并为一次底层写调用，减少系统调用次数。
///
/// ## 逻辑（How）
/// - `offset` 记录 `pending` 头部已写出但尚未物理移除的字节数，部分写只推进该偏移；
/// - 仅当 `offset` 超过压缩阈值时才一次性丢弃已写出的前缀，摊还移除成本，
///   避免每次部分写都搬移整段内存造成的 O(n²) 行为；
/// - `staged_len` 随暂存队列同步维护，背压判定无需重新扫描队列。
///
/// ## 契约（What）
/// - 不变式：`staged_len == staged 中各段长度之和`，`offset <= pending.len()`；
/// - 字节按 `stage` 的调用顺序写出，合并只跨越调用边界拼接、从不重排。
#[derive(Debug, Default)]
pub(crate) struct WriteBuffer {
    pending: Vec<u8>,
    offset: usize,
    staged: Vec<Bytes>,
    staged_len: usize,
}

impl WriteBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 暂存一段数据；空段被忽略。
    pub(crate) fn stage(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.staged_len += chunk.len();
        self.staged.push(chunk);
    }

    /// 尚未写出的字节总数（主缓冲剩余部分加暂存部分）。
    pub(crate) fn unflushed_len(&self) -> usize {
        self.pending.len() - self.offset + self.staged_len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.unflushed_len() == 0
    }

    /// 刷写前的准备：按需压缩，再合并暂存队列，返回待写出的连续字节。
    pub(crate) fn prepare_flush(&mut self, compaction_threshold: usize) -> &[u8] {
        if self.offset > compaction_threshold {
            self.pending.drain(..self.offset);
            self.offset = 0;
        }
        if !self.staged.is_empty() {
            self.pending.reserve(self.staged_len);
            for chunk in self.staged.drain(..) {
                self.pending.extend_from_slice(&chunk);
            }
            self.staged_len = 0;
        }
        &self.pending[self.offset..]
    }

    /// 记录底层写出了 `written` 个字节；返回主缓冲是否已全部写出。
    ///
    /// 全部写出时主缓冲被重置为空，偏移归零。
    pub(crate) fn consume(&mut self, written: usize) -> bool {
        let remaining = self.pending.len() - self.offset;
        debug_assert!(
            written <= remaining,
            "raw transport reported {written} bytes written but only {remaining} were offered"
        );
        self.offset += written.min(remaining);
        if self.offset == self.pending.len() {
            self.pending.clear();
            self.offset = 0;
            true
        } else {
            false
        }
    }

    /// 丢弃所有未写出的数据。
    pub(crate) fn clear(&mut self) {
        self.pending = Vec::new();
        self.offset = 0;
        self.staged.clear();
        self.staged_len = 0;
    }

    #[cfg(test)]
    fn consumed_offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    fn staged_len(&self) -> usize {
        self.staged_len
    }
}
