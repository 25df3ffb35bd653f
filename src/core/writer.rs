//! 块写入器：按绝对偏移写入共享输出文件
//!
//! 所有块共用同一个文件句柄，但每个块只写自己的 `[start, end]` 区间，
//! 区间在派发前就已确定且互不重叠，所以文件本身不需要加锁。
//! 这里只使用定位写（unix 上是 `pwrite`），不要改成 seek + write：
//! 那会让多个块争用同一个文件游标。实际写入放在 `spawn_blocking` 线程上，
//! 不占用 tokio 工作线程。

use std::fs::File;
use std::io;
use std::sync::Arc;

use bytes::Bytes;

use crate::core::error::DownloadError;

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset)
}

/// 单个块的写入器，持有该块的写游标
#[derive(Debug)]
pub struct ChunkWriter {
    file: Arc<File>,
    cursor: u64,
    end: u64,
}

impl ChunkWriter {
    pub fn new(file: Arc<File>, start: u64, end: u64) -> Self {
        Self { file, cursor: start, end }
    }

    /// 下一次写入的偏移，最大为 `end + 1`
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// 区间是否已写满
    pub fn is_complete(&self) -> bool {
        self.cursor == self.end + 1
    }

    /// 在当前游标处写入整块数据并推进游标，返回写入的字节数
    pub async fn write(&mut self, data: Bytes) -> Result<usize, DownloadError> {
        let offset = self.cursor;
        let region = ChunkWriter { file: Arc::clone(&self.file), cursor: offset, end: self.end };
        let written = tokio::task::spawn_blocking(move || region.write_at(&data, offset))
            .await
            .map_err(|e| DownloadError::TaskJoin(e.to_string()))??;
        self.cursor += written as u64;
        Ok(written)
    }

    /// 在指定偏移写入，偏移必须落在本块区间内
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, DownloadError> {
        if offset + buf.len() as u64 > self.end + 1 {
            return Err(DownloadError::RegionOverflow { offset, len: buf.len(), end: self.end });
        }

        let mut done = 0usize;
        while done < buf.len() {
            let at = offset + done as u64;
            match write_at(&self.file, &buf[done..], at) {
                Ok(0) => return Err(DownloadError::ShortWrite { offset: at }),
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DownloadError::Io(e)),
            }
        }
        Ok(done)
    }
}
