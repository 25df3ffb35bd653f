//! 多文件下载：每个任务一个完整的 GET，各自写入自己的文件、各自输出进度

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::core::error::DownloadError;
use crate::core::http::{stream_body, BodySink, HttpClient};
use crate::core::progress::{ProgressLabel, ProgressReporter, ProgressTracker};
use crate::core::state::TaskStatus;

const HTML_CONTENT_TYPE: &str = "text/html";
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// 单个文件的下载任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub output: PathBuf,
    pub status: TaskStatus,
    /// 写入文件的字节数
    pub bytes: u64,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            status: TaskStatus::Pending,
            bytes: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MultiFileReport {
    pub tasks: Vec<DownloadTask>,
    pub elapsed: Duration,
}

impl MultiFileReport {
    pub fn succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.status.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.succeeded()
    }

    pub fn total_bytes(&self) -> u64 {
        self.tasks.iter().filter(|t| t.status.is_completed()).map(|t| t.bytes).sum()
    }

    /// 任意任务失败即返回 1
    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 { 0 } else { 1 }
    }
}

struct FileSink<'a> {
    writer: BufWriter<File>,
    tracker: &'a ProgressTracker,
    written: u64,
}

#[async_trait]
impl BodySink for FileSink<'_> {
    async fn accept(&mut self, data: Bytes) -> Result<usize, DownloadError> {
        self.writer.write_all(&data).await?;
        self.written += data.len() as u64;
        self.tracker.report(data.len() as u64);
        Ok(data.len())
    }
}

/// 下载一个完整文件，结果写入返回任务的 `status`
pub async fn download_one_file(
    client: Arc<dyn HttpClient>,
    mut task: DownloadTask,
    reporter: Arc<dyn ProgressReporter>,
) -> DownloadTask {
    let result = fetch_file(client.as_ref(), &task.url, &task.output, reporter).await;
    match result {
        Ok(bytes) => {
            log::info!("下载完成: {} -> {} ({} 字节)", task.url, task.output.display(), bytes);
            task.bytes = bytes;
            task.status = TaskStatus::Completed;
        }
        Err(e) => {
            log::error!("下载失败: {} -> {}: {}", task.url, task.output.display(), e);
            task.status = TaskStatus::Failed(e.to_string());
        }
    }
    task
}

async fn fetch_file(
    client: &dyn HttpClient,
    url: &str,
    output: &Path,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<u64, DownloadError> {
    // 先打开文件再请求：请求失败时留下一个空文件
    let file = create_output(output).await?;

    let response = client.get_full(url).await?;
    if response.status != 200 {
        return Err(DownloadError::UnexpectedStatus { status: response.status });
    }
    // 期望二进制内容却拿到 HTML，多半是代理或运营商的错误页
    if let Some(content_type) = response.content_type.as_deref() {
        if content_type.to_ascii_lowercase().contains(HTML_CONTENT_TYPE) {
            return Err(DownloadError::UnexpectedContentType(content_type.to_string()));
        }
    }

    let expected = response.content_length.unwrap_or(0);
    let tracker = ProgressTracker::new(expected, ProgressLabel::File(url.to_string()), reporter);
    let mut sink = FileSink {
        writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        tracker: &tracker,
        written: 0,
    };
    stream_body(response.body, &mut sink).await?;
    sink.writer.flush().await?;

    if expected > 0 && sink.written != expected {
        return Err(DownloadError::Truncated { expected, actual: sink.written });
    }
    tracker.finish();
    Ok(sink.written)
}

async fn create_output(path: &Path) -> Result<File, DownloadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| DownloadError::create_file(path, e))?;
    }
    File::create(path).await.map_err(|e| DownloadError::create_file(path, e))
}

/// 并发下载多个文件，等待全部结束后汇总
///
/// 每个任务的结果都会单独保留，一个任务失败不影响其他任务。
pub async fn download_many(
    client: Arc<dyn HttpClient>,
    tasks: Vec<DownloadTask>,
    reporter: Arc<dyn ProgressReporter>,
) -> MultiFileReport {
    let started = Instant::now();

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let fallback = task.clone();
            let handle = tokio::spawn(download_one_file(Arc::clone(&client), task, Arc::clone(&reporter)));
            (fallback, handle)
        })
        .collect();
    log::info!("已派发 {} 个下载任务", handles.len());

    let tasks = join_all(handles.into_iter().map(|(fallback, handle)| async move {
        match handle.await {
            Ok(task) => task,
            Err(e) => {
                log::error!("任务 {} 的工作任务异常退出: {}", fallback.url, e);
                DownloadTask {
                    status: TaskStatus::Failed(DownloadError::TaskJoin(e.to_string()).to_string()),
                    ..fallback
                }
            }
        }
    }))
    .await;

    MultiFileReport { tasks, elapsed: started.elapsed() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::fake::{FakeClient, FakeResource};
    use crate::core::progress::testing::CollectingReporter;

    fn run_env() -> (tempfile::TempDir, Arc<CollectingReporter>) {
        (tempfile::tempdir().unwrap(), Arc::new(CollectingReporter::default()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_404_and_200_reported_individually() {
        let body = b"binary payload".to_vec();
        let client: Arc<dyn HttpClient> = Arc::new(
            FakeClient::new()
                .with("http://h/ok.bin", FakeResource::ok(body.clone()))
                .with("http://h/missing.bin", FakeResource::ok(Vec::new()).status(404)),
        );
        let (dir, reporter) = run_env();
        let ok_path = dir.path().join("ok.bin");
        let missing_path = dir.path().join("missing.bin");

        let report = download_many(
            client,
            vec![
                DownloadTask::new("http://h/missing.bin", &missing_path),
                DownloadTask::new("http://h/ok.bin", &ok_path),
            ],
            reporter.clone(),
        )
        .await;

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.tasks[0].url, "http://h/missing.bin");
        assert!(report.tasks[0].status.reason().unwrap().contains("404"));
        assert!(report.tasks[1].status.is_completed());

        assert_eq!(std::fs::read(&ok_path).unwrap(), body);
        assert_eq!(std::fs::metadata(&missing_path).unwrap().len(), 0);
        assert!(reporter.lines().contains(&"Downloading http://h/ok.bin: 100%".to_string()));
    }

    #[tokio::test]
    async fn test_html_content_type_rejected() {
        let client: Arc<dyn HttpClient> = Arc::new(FakeClient::new().with(
            "http://h/file.zip",
            FakeResource::ok(b"<html>blocked</html>".to_vec()).content_type("text/html; charset=utf-8"),
        ));
        let (dir, reporter) = run_env();

        let task = download_one_file(client, DownloadTask::new("http://h/file.zip", dir.path().join("file.zip")), reporter).await;
        assert!(matches!(task.status, TaskStatus::Failed(ref r) if r.contains("text/html")));
    }

    #[tokio::test]
    async fn test_transport_error_fails_task() {
        let client: Arc<dyn HttpClient> = Arc::new(FakeClient::new());
        let (dir, reporter) = run_env();

        let report = download_many(
            client,
            vec![DownloadTask::new("http://unreachable/a", dir.path().join("a"))],
            reporter,
        )
        .await;
        assert_eq!(report.exit_code(), 1);
        assert!(report.tasks[0].status.is_failed());
    }

    #[tokio::test]
    async fn test_unknown_length_reports_mebibytes() {
        let body = vec![5u8; 2 * 1024 * 1024 + 10];
        let mut resource = FakeResource::ok(body.clone());
        resource.advertise_size = false;
        let client: Arc<dyn HttpClient> = Arc::new(FakeClient::new().with("http://h/stream", resource));
        let (dir, reporter) = run_env();
        let out = dir.path().join("stream.bin");

        let task = download_one_file(client, DownloadTask::new("http://h/stream", &out), reporter.clone()).await;
        assert!(task.status.is_completed());
        assert_eq!(task.bytes, body.len() as u64);
        assert_eq!(
            reporter.lines(),
            vec![
                "Downloading http://h/stream: 1 MiB received".to_string(),
                "Downloading http://h/stream: 2 MiB received".to_string(),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_tasks_succeed() {
        let mut client = FakeClient::new();
        let mut tasks = Vec::new();
        let (dir, reporter) = run_env();
        for i in 0..5 {
            let url = format!("http://h/{}.bin", i);
            client = client.with(&url, FakeResource::ok(vec![i as u8; 100 + i]));
            tasks.push(DownloadTask::new(url, dir.path().join(format!("{}.bin", i))));
        }

        let report = download_many(Arc::new(client), tasks, reporter).await;
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.total_bytes(), (0..5).map(|i| 100 + i as u64).sum::<u64>());
        for i in 0..5 {
            assert_eq!(std::fs::read(dir.path().join(format!("{}.bin", i))).unwrap(), vec![i as u8; 100 + i]);
        }
    }
}
