//! 大文件协调器：获取大小、预分配输出文件、切块、并发下载、汇总结果
//!
//! 失败的块不会回滚其他块已写入的数据，输出文件会保留完整长度，
//! 未完成区间保持为 0。

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;

use crate::core::chunk::{download_chunk, effective_threads, partition, ChunkSpec};
use crate::core::error::DownloadError;
use crate::core::http::{ByteRange, HttpClient};
use crate::core::probe::SizeProbe;
use crate::core::progress::{ProgressLabel, ProgressReporter, ProgressTracker};
use crate::core::state::TaskStatus;

/// 大文件下载参数
#[derive(Clone)]
pub struct BigFileOptions {
    /// 期望的并发块数，实际值会被限制在 `[1, 文件大小]`
    pub threads: usize,
    pub probe: SizeProbe,
    pub reporter: Arc<dyn ProgressReporter>,
}

impl BigFileOptions {
    pub fn new(threads: usize, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { threads, probe: SizeProbe::Remote, reporter }
    }

    pub fn with_probe(mut self, probe: SizeProbe) -> Self {
        self.probe = probe;
        self
    }
}

/// 单个块的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub index: usize,
    pub range: ByteRange,
    /// 实际写入本块区间的字节数
    pub written: u64,
    pub status: TaskStatus,
}

#[derive(Debug, Clone)]
pub struct BigFileReport {
    pub url: String,
    pub output: PathBuf,
    pub total_size: u64,
    pub chunks: Vec<ChunkResult>,
    /// 所有块结束后把文件落盘失败的原因
    pub sync_error: Option<String>,
}

impl BigFileReport {
    pub fn is_success(&self) -> bool {
        self.sync_error.is_none() && self.chunks.iter().all(|c| c.status.is_completed())
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkResult> {
        self.chunks.iter().filter(|c| !c.status.is_completed())
    }

    pub fn downloaded(&self) -> u64 {
        self.chunks.iter().map(|c| c.written).sum()
    }

    /// 全部块成功返回 0，否则返回 1
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// 分块下载一个大文件
///
/// 获取大小失败、创建或预分配输出文件失败会直接返回错误（此时尚未派发任何块）；
/// 单个块的失败记录在返回的报告里。
pub async fn download_big_file(
    client: Arc<dyn HttpClient>,
    url: &str,
    output: impl AsRef<Path>,
    options: &BigFileOptions,
) -> Result<BigFileReport, DownloadError> {
    let output = output.as_ref();

    // 先拿到大小，失败时不创建、不截断输出文件
    let total_size = options.probe.total_size(client.as_ref(), url).await?;
    log::info!("文件大小: {} 字节 ({})", total_size, url);

    let file = Arc::new(create_presized(output, total_size)?);
    let threads = effective_threads(options.threads, total_size);
    let tracker = Arc::new(ProgressTracker::new(total_size, ProgressLabel::Overall, Arc::clone(&options.reporter)));

    let handles: Vec<_> = partition(total_size, threads)
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            log::debug!("启动块 {}: 字节范围 {}-{}", index, range.start, range.end);
            let spec = ChunkSpec::new(index, url, Arc::clone(&file), range);
            let handle = tokio::spawn(download_chunk(Arc::clone(&client), spec, Arc::clone(&tracker)));
            (index, range, handle)
        })
        .collect();
    log::info!("已派发 {} 个块: {}", handles.len(), output.display());

    // 等待所有块结束后再汇总
    let joined = join_all(handles.into_iter().map(|(index, range, handle)| async move {
        (index, range, handle.await)
    }))
    .await;

    let chunks: Vec<ChunkResult> = joined
        .into_iter()
        .map(|(index, range, joined)| match joined {
            Ok(spec) => ChunkResult {
                index,
                range,
                written: spec.start - range.start,
                status: spec.status,
            },
            Err(e) => {
                log::error!("块 {} 的工作任务异常退出: {}", index, e);
                ChunkResult {
                    index,
                    range,
                    written: 0,
                    status: TaskStatus::Failed(DownloadError::TaskJoin(e.to_string()).to_string()),
                }
            }
        })
        .collect();

    // 不论成败都补上最后一行 100%
    tracker.finish();

    let sync_error = file.sync_all().err().map(|e| {
        log::error!("输出文件落盘失败 {}: {}", output.display(), e);
        DownloadError::Io(e).to_string()
    });

    let report = BigFileReport {
        url: url.to_string(),
        output: output.to_path_buf(),
        total_size,
        chunks,
        sync_error,
    };

    if report.failed_chunks().next().is_some() {
        log::warn!(
            "{} 个块下载失败，已完成的块保留在 {}",
            report.failed_chunks().count(),
            output.display()
        );
    }
    Ok(report)
}

/// 创建（或截断）输出文件并预分配到完整大小
fn create_presized(path: &Path, total_size: u64) -> Result<File, DownloadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DownloadError::create_file(path, e))?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| DownloadError::create_file(path, e))?;
    file.set_len(total_size).map_err(|e| DownloadError::create_file(path, e))?;
    Ok(file)
}
