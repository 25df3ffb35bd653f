//! 作业分派：根据解析出的作业选择大文件或多文件模式，输出结果并给出退出码

use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::cli::{job_from_line, Job};
use crate::config::Config;
use crate::core::big_file::{download_big_file, BigFileOptions};
use crate::core::error::DownloadError;
use crate::core::http::HttpClient;
use crate::core::multi_file::{download_many, DownloadTask};
use crate::core::probe::SizeProbe;
use crate::core::progress::ProgressReporter;
use crate::ui;

const INPUT_PROMPT: &str = "Please input addresses (separate by spaces), e.g.:\n  \
    http://127.0.0.1:8000/download/big.iso big.iso\n  \
    http://127.0.0.1:8000/download/a.zip a.zip http://127.0.0.1:8000/download/b.zip b.zip";

/// 执行一个作业，返回进程退出码
pub async fn run(
    job: Job,
    config: &Config,
    client: Arc<dyn HttpClient>,
    reporter: Arc<dyn ProgressReporter>,
) -> i32 {
    match job {
        Job::BigFile { url, output, threads } => {
            let threads = threads.unwrap_or(config.thread_count);
            let options = BigFileOptions::new(threads, reporter)
                .with_probe(SizeProbe::from_resource_root(config.resource_root.as_deref()));
            log::info!("大文件模式: {} -> {} ({} 线程)", url, output.display(), threads);

            match download_big_file(client, &url, &output, &options).await {
                Ok(report) => {
                    ui::print_big_file_report(&report);
                    report.exit_code()
                }
                Err(e) => {
                    log::error!("下载 {} 失败: {}", url, e);
                    ui::print_error(&format!("Failed: {},{}: {}", url, output.display(), e));
                    1
                }
            }
        }
        Job::MultiFile(pairs) => {
            log::info!("多文件模式: {} 个文件", pairs.len());
            let tasks = pairs
                .into_iter()
                .map(|(url, output)| DownloadTask::new(url, output))
                .collect();
            let report = download_many(client, tasks, reporter).await;
            ui::print_multi_file_report(&report);
            report.exit_code()
        }
    }
}

/// 提示用户输入，从 `input` 读取一行并解析成作业
pub fn read_job<R: BufRead, W: Write>(mut input: R, mut prompt: W) -> Result<Job, DownloadError> {
    writeln!(prompt, "{}", INPUT_PROMPT)?;
    prompt.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    job_from_line(&line)
}

pub fn read_job_from_stdin() -> Result<Job, DownloadError> {
    let stdin = std::io::stdin();
    read_job(stdin.lock(), std::io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::fake::{FakeClient, FakeResource};
    use crate::core::progress::testing::CollectingReporter;

    #[test]
    fn test_read_job_prompts_and_parses() {
        let mut prompt = Vec::new();
        let job = read_job(&b"http://h/a a.bin\n"[..], &mut prompt).unwrap();
        assert!(matches!(job, Job::BigFile { .. }));
        assert!(String::from_utf8(prompt).unwrap().starts_with("Please input addresses"));
    }

    #[test]
    fn test_read_job_empty_input() {
        let result = read_job(&b""[..], Vec::new());
        assert!(matches!(result, Err(DownloadError::Usage(_))));
    }

    #[tokio::test]
    async fn test_run_big_file_uses_config_threads() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("big.bin");
        let data: Vec<u8> = (0..200u32).map(|i| (i % 251) as u8).collect();
        let client = Arc::new(FakeClient::new().with("http://h/big", FakeResource::ok(data.clone())));
        let reporter = Arc::new(CollectingReporter::default());

        let config = Config { thread_count: 5, ..Config::default() };
        let job = Job::BigFile { url: "http://h/big".into(), output: output.clone(), threads: None };
        let code = run(job, &config, client, reporter.clone()).await;

        assert_eq!(code, 0);
        assert_eq!(std::fs::read(&output).unwrap(), data);
        assert_eq!(reporter.lines().last().map(String::as_str), Some("Progress: 100%"));
    }

    #[tokio::test]
    async fn test_run_big_file_probe_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing.bin");
        let client = Arc::new(FakeClient::new());
        let reporter = Arc::new(CollectingReporter::default());

        let job = Job::BigFile { url: "http://h/missing".into(), output: output.clone(), threads: Some(2) };
        let code = run(job, &Config::default(), client, reporter).await;

        assert_eq!(code, 1);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_multi_file_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.bin");
        let bad = dir.path().join("bad.bin");
        let client = Arc::new(
            FakeClient::new()
                .with("http://h/good", FakeResource::ok(b"hello".to_vec()))
                .with("http://h/bad", FakeResource::ok(Vec::new()).status(404)),
        );
        let reporter = Arc::new(CollectingReporter::default());

        let job = Job::MultiFile(vec![
            ("http://h/good".to_string(), good.clone()),
            ("http://h/bad".to_string(), bad.clone()),
        ]);
        let code = run(job, &Config::default(), client, reporter).await;

        assert_eq!(code, 1);
        assert_eq!(std::fs::read(&good).unwrap(), b"hello");
        assert_eq!(std::fs::read(&bad).unwrap().len(), 0);
    }
}
