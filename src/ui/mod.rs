mod progress;

use std::fmt;
use std::time::Duration;

pub use progress::ConsoleReporter;

use crate::core::big_file::BigFileReport;
use crate::core::multi_file::MultiFileReport;

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("✗ {}", message);
}

/// 多文件模式的汇总
pub struct DownloadSummary {
    pub total_files: usize,
    pub total_size: u64,
    pub elapsed_time: Duration,
    pub success_count: usize,
    pub failed_count: usize,
}

impl From<&MultiFileReport> for DownloadSummary {
    fn from(report: &MultiFileReport) -> Self {
        Self {
            total_files: report.tasks.len(),
            total_size: report.total_bytes(),
            elapsed_time: report.elapsed,
            success_count: report.succeeded(),
            failed_count: report.failed(),
        }
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "总文件数: {}", self.total_files)?;
        writeln!(f, "总大小: {}", format_size(self.total_size))?;
        writeln!(f, "耗时: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        writeln!(f, "成功: {}", self.success_count)?;
        write!(f, "失败: {}", self.failed_count)
    }
}

/// 逐个输出多文件任务的结果，不论成败
pub fn print_multi_file_report(report: &MultiFileReport) {
    for task in &report.tasks {
        let target = format!("{},{}", task.url, task.output.display());
        match task.status.reason() {
            None => print_success(&format!("Task completed: {}", target)),
            Some(reason) => print_error(&format!("Failed: {}: {}", target, reason)),
        }
    }
    println!("{}", DownloadSummary::from(report));
}

pub fn print_big_file_report(report: &BigFileReport) {
    if report.is_success() {
        print_success(&format!(
            "Download completed: {} ({})",
            report.output.display(),
            format_size(report.total_size)
        ));
        return;
    }
    for chunk in report.failed_chunks() {
        print_error(&format!(
            "Chunk {} ({}-{}) failed: {}",
            chunk.index,
            chunk.range.start,
            chunk.range.end,
            chunk.status.reason().unwrap_or("未完成")
        ));
    }
    if let Some(reason) = &report.sync_error {
        print_error(&format!("Sync failed: {}: {}", report.output.display(), reason));
    }
    print_error(&format!(
        "Download failed: {},{} ({}/{} chunks failed)",
        report.url,
        report.output.display(),
        report.failed_chunks().count(),
        report.chunks.len()
    ));
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
