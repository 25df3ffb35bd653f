//! 分块：计算块边界，以及下载单个块
//!
//! 每个块只写输出文件中属于自己的区间，和兄弟块之间唯一共享的可变状态是
//! 进度统计（内部加锁）。

use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::error::DownloadError;
use crate::core::http::{stream_body, BodySink, ByteRange, HttpClient};
use crate::core::progress::ProgressTracker;
use crate::core::state::TaskStatus;
use crate::core::writer::ChunkWriter;

/// 计算实际使用的线程数：不少于 1，不多于文件字节数
pub fn effective_threads(desired: usize, total_size: u64) -> usize {
    let desired = desired.max(1) as u64;
    desired.min(total_size.max(1)) as usize
}

/// 把 `[0, total_size)` 切成 `threads` 个连续区间
///
/// 块大小取整除结果，余数全部并入最后一块。`threads` 应先经过 [`effective_threads`]。
pub fn partition(total_size: u64, threads: usize) -> Vec<ByteRange> {
    if total_size == 0 {
        return Vec::new();
    }
    let threads = effective_threads(threads, total_size) as u64;
    let base = total_size / threads;

    (0..threads)
        .map(|i| {
            let start = i * base;
            let end = if i == threads - 1 { total_size - 1 } else { start + base - 1 };
            ByteRange::new(start, end)
        })
        .collect()
}

/// 一个块的描述和结果
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub index: usize,
    pub url: String,
    pub file: Arc<File>,
    /// 写游标，下载过程中递增，完成时等于 `end + 1`
    pub start: u64,
    pub end: u64,
    pub status: TaskStatus,
}

impl ChunkSpec {
    pub fn new(index: usize, url: impl Into<String>, file: Arc<File>, range: ByteRange) -> Self {
        Self {
            index,
            url: url.into(),
            file,
            start: range.start,
            end: range.end,
            status: TaskStatus::Pending,
        }
    }

    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }
}

/// 把响应体写进块区间，同时上报进度
struct ChunkSink<'a> {
    writer: &'a mut ChunkWriter,
    tracker: &'a ProgressTracker,
}

#[async_trait]
impl BodySink for ChunkSink<'_> {
    async fn accept(&mut self, data: Bytes) -> Result<usize, DownloadError> {
        let written = self.writer.write(data).await?;
        self.tracker.report(written as u64);
        Ok(written)
    }
}

/// 下载一个块，返回设置好结果的 `ChunkSpec`
///
/// 失败只记录在 `status` 里，不会向上抛出。
pub async fn download_chunk(
    client: Arc<dyn HttpClient>,
    mut spec: ChunkSpec,
    tracker: Arc<ProgressTracker>,
) -> ChunkSpec {
    let range = spec.range();
    let mut writer = ChunkWriter::new(Arc::clone(&spec.file), range.start, range.end);
    let result = fetch_into(client.as_ref(), &spec, &mut writer, &tracker).await;
    spec.start = writer.cursor();

    if let Err(e) = &result {
        log::error!("块 {} ({}-{}) 下载失败: {}", spec.index, range.start, range.end, e);
    } else {
        log::debug!("块 {} 下载完成", spec.index);
    }
    spec.status = result.into();
    spec
}

async fn fetch_into(
    client: &dyn HttpClient,
    spec: &ChunkSpec,
    writer: &mut ChunkWriter,
    tracker: &ProgressTracker,
) -> Result<(), DownloadError> {
    let range = spec.range();
    log::debug!("块 {} 请求 {}", spec.index, range.header_value());
    let response = client.get_range(&spec.url, range.start, range.end).await?;

    // 服务器忽略 Range 返回 200 时，只有在本块就是整个文件的情况下才能接受
    let whole_file = range.start == 0 && tracker.total_size() == range.end + 1;
    match response.status {
        206 => {}
        200 if whole_file => {}
        status => return Err(DownloadError::UnexpectedStatus { status }),
    }

    let mut sink = ChunkSink { writer: &mut *writer, tracker };
    stream_body(response.body, &mut sink).await?;

    if !writer.is_complete() {
        return Err(DownloadError::Truncated { expected: writer.end() + 1, actual: writer.cursor() });
    }
    Ok(())
}
