use std::io::Write;

use crate::core::progress::ProgressReporter;

/// 把进度行打印到标准输出
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        ConsoleReporter
    }
}

impl ProgressReporter for ConsoleReporter {
    fn emit(&self, line: &str) {
        // 锁住 stdout 写整行，多个任务的输出不会交错
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if writeln!(out, "{}", line).is_err() {
            log::debug!("无法输出进度: {}", line);
        }
        log::trace!("{}", line);
    }
}
