//! Core: 分块下载协调、块写入、进度统计、多文件下载和错误处理

pub mod big_file;
pub mod chunk;
pub mod error;
pub mod http;
pub mod multi_file;
pub mod probe;
pub mod progress;
pub mod state;
pub mod writer;

// 只导出主流程和其它模块实际用到的类型
pub use big_file::{download_big_file, BigFileOptions, BigFileReport, ChunkResult};
pub use chunk::{download_chunk, partition, ChunkSpec};
pub use error::{DownloadError, DownloadResult};
pub use http::{ByteRange, HttpClient, HttpResponse, ReqwestClient};
pub use multi_file::{download_many, download_one_file, DownloadTask, MultiFileReport};
pub use probe::SizeProbe;
pub use progress::{ProgressLabel, ProgressReporter, ProgressTracker};
pub use state::TaskStatus;
