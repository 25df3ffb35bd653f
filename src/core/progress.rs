//! 进度统计：已下载字节 / 总字节，只在百分比变化时输出一行
//!
//! 一个 [`ProgressTracker`] 对应一次操作（一个大文件的所有块，或多文件模式下的单个文件），
//! 通过 `Arc` 交给各个工作任务。读取、计算、比较、更新和输出在同一把锁内完成，
//! 并发调用时同一个百分比不会输出两次，也不会倒退。

use std::sync::{Arc, Mutex, PoisonError};

const MIB: u64 = 1024 * 1024;

/// 进度行的输出端
pub trait ProgressReporter: Send + Sync {
    fn emit(&self, line: &str);
}

/// 进度行的前缀
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressLabel {
    /// 大文件模式：`Progress: {n}%`
    Overall,
    /// 多文件模式：`Downloading {url}: {n}%`
    File(String),
}

impl ProgressLabel {
    fn prefix(&self) -> String {
        match self {
            ProgressLabel::Overall => "Progress".to_string(),
            ProgressLabel::File(url) => format!("Downloading {}", url),
        }
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    downloaded: u64,
    /// 上次输出的值：总大小已知时是百分比，未知时是 MiB 数
    last_reported: Option<u64>,
}

pub struct ProgressTracker {
    total_size: u64,
    label: ProgressLabel,
    state: Mutex<ProgressState>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ProgressTracker {
    /// `total_size` 为 0 表示大小未知，此时按完整 MiB 输出
    pub fn new(total_size: u64, label: ProgressLabel, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            total_size,
            label,
            state: Mutex::new(ProgressState::default()),
            reporter,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn downloaded(&self) -> u64 {
        self.lock().downloaded
    }

    /// 上次输出的百分比（大小未知时为 MiB 数）
    pub fn last_reported(&self) -> Option<u64> {
        self.lock().last_reported
    }

    /// 累加刚写入的字节数，数值变化时输出一行
    pub fn report(&self, bytes_just_written: u64) {
        let mut state = self.lock();
        state.downloaded = state.downloaded.saturating_add(bytes_just_written);

        let (value, line) = if self.total_size > 0 {
            let percent = percent_of(state.downloaded, self.total_size);
            (percent, format!("{}: {}%", self.label.prefix(), percent))
        } else {
            let mib = state.downloaded / MIB;
            if mib == 0 {
                return;
            }
            (mib, format!("{}: {} MiB received", self.label.prefix(), mib))
        };

        if state.last_reported != Some(value) {
            state.last_reported = Some(value);
            // 持锁输出，保证行的顺序与数值顺序一致
            self.reporter.emit(&line);
        }
    }

    /// 操作结束时补一行 100%（仅在总大小已知且尚未输出时）
    pub fn finish(&self) {
        if self.total_size == 0 {
            return;
        }
        let mut state = self.lock();
        if state.last_reported.map_or(true, |last| last < 100) {
            state.last_reported = Some(100);
            self.reporter.emit(&format!("{}: 100%", self.label.prefix()));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_size", &self.total_size)
            .field("label", &self.label)
            .field("state", &*self.lock())
            .finish()
    }
}

fn percent_of(downloaded: u64, total: u64) -> u64 {
    let percent = (downloaded as u128 * 100) / total as u128;
    percent.min(100) as u64
}


#[cfg(test)]
mod tests {
    use super::testing::CollectingReporter;
    use super::*;
    use std::collections::HashSet;

    fn tracker(total: u64, label: ProgressLabel) -> (Arc<ProgressTracker>, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = Arc::new(ProgressTracker::new(total, label, reporter.clone()));
        (tracker, reporter)
    }

    fn percents(lines: &[String]) -> Vec<u64> {
        lines
            .iter()
            .map(|l| l.trim_start_matches("Progress: ").trim_end_matches('%').parse().unwrap())
            .collect()
    }

    #[test]
    fn test_reports_only_on_change() {
        let (tracker, reporter) = tracker(1000, ProgressLabel::Overall);
        tracker.report(1);
        tracker.report(1);
        tracker.report(8);
        tracker.report(10);
        assert_eq!(reporter.lines(), vec!["Progress: 0%", "Progress: 1%", "Progress: 2%"]);
    }

    #[test]
    fn test_percent_capped_at_100() {
        let (tracker, reporter) = tracker(10, ProgressLabel::Overall);
        tracker.report(25);
        assert_eq!(reporter.lines(), vec!["Progress: 100%"]);
        assert_eq!(tracker.last_reported(), Some(100));
    }

    #[test]
    fn test_finish_emits_missing_100() {
        let (tracker, reporter) = tracker(1000, ProgressLabel::Overall);
        tracker.report(500);
        tracker.finish();
        tracker.finish();
        assert_eq!(reporter.lines(), vec!["Progress: 50%", "Progress: 100%"]);
    }

    #[test]
    fn test_finish_after_100_is_silent() {
        let (tracker, reporter) = tracker(4, ProgressLabel::Overall);
        tracker.report(4);
        tracker.finish();
        assert_eq!(reporter.lines(), vec!["Progress: 100%"]);
    }

    #[test]
    fn test_unknown_size_reports_mebibytes() {
        let (tracker, reporter) = tracker(0, ProgressLabel::File("http://h/a".into()));
        tracker.report(MIB / 2);
        tracker.report(MIB / 2);
        tracker.report(10);
        tracker.report(MIB);
        tracker.finish();
        assert_eq!(
            reporter.lines(),
            vec!["Downloading http://h/a: 1 MiB received", "Downloading http://h/a: 2 MiB received"]
        );
    }

    #[test]
    fn test_file_label_format() {
        let (tracker, reporter) = tracker(200, ProgressLabel::File("http://h/b".into()));
        tracker.report(100);
        assert_eq!(reporter.lines(), vec!["Downloading http://h/b: 50%"]);
    }

    #[test]
    fn test_concurrent_reports_never_duplicate() {
        let total = 100_000u64;
        let (tracker, reporter) = tracker(total, ProgressLabel::Overall);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..(total / 8 / 5) {
                        tracker.report(5);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        tracker.finish();

        let values = percents(&reporter.lines());
        let unique: HashSet<_> = values.iter().collect();
        assert_eq!(unique.len(), values.len(), "duplicate progress line");
        assert!(values.windows(2).all(|w| w[0] < w[1]), "progress went backwards");
        assert_eq!(values.last(), Some(&100));
        assert_eq!(tracker.downloaded(), total);
    }
}
