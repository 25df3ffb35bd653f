//! parafetch: 分块并发 HTTP 下载器
//!
//! - 单个大文件按字节范围切块，每块一个任务，直接写入输出文件的对应偏移
//! - 多个文件各自一个任务，完整下载后逐个报告结果

pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod ui;
pub mod utils;
