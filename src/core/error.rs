use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// 下载过程中的错误分类
///
/// - 获取文件大小失败、创建/预分配输出文件失败：整个操作立即终止
/// - 网络、状态码、内容类型、本地写入错误：只影响当前块或当前任务，由协调器汇总
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("无法获取文件大小，服务器可能不支持: {0}")]
    SizeUnknown(String),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("无法创建输出文件 {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("网络错误: {0}")]
    Network(String),

    #[error("非预期的HTTP状态码: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("非预期的内容类型: {0}")]
    UnexpectedContentType(String),

    #[error("写入中断: 偏移 {offset} 处写入 0 字节")]
    ShortWrite { offset: u64 },

    #[error("写入越界: 偏移 {offset} 写入 {len} 字节超出块末尾 {end}")]
    RegionOverflow { offset: u64, len: usize, end: u64 },

    #[error("数据不完整: 预期写到 {expected}，实际只到 {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("工作任务异常退出: {0}")]
    TaskJoin(String),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("用法错误: {0}")]
    Usage(String),

    #[error("配置错误: {0}")]
    Config(String),
}

impl DownloadError {
    /// 致命错误会终止整个操作，其余错误只记录到所属块/任务的结果里
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::SizeUnknown(_)
                | DownloadError::Io(_)
                | DownloadError::CreateFile { .. }
                | DownloadError::InvalidUrl(_)
                | DownloadError::Usage(_)
                | DownloadError::Config(_)
        )
    }

    pub fn create_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::CreateFile { path: path.into(), source }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => DownloadError::UnexpectedStatus { status: status.as_u16() },
            None => DownloadError::Network(error.to_string()),
        }
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
