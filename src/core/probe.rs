use std::path::{Path, PathBuf};

use crate::core::error::DownloadError;
use crate::core::http::HttpClient;

const LOCAL_MARKER: &str = "/download/";

/// 获取远程文件大小的方式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SizeProbe {
    /// HEAD 请求（必要时回退到 `bytes=0-0` 范围请求）
    #[default]
    Remote,
    /// 服务端与下载端在同一台机器上：URL 形如 `.../download/<相对路径>`，
    /// 直接读取 `root/<相对路径>` 的文件大小
    LocalResource { root: PathBuf },
}

impl SizeProbe {
    pub fn from_resource_root(root: Option<&str>) -> Self {
        match root {
            Some(root) if !root.is_empty() => SizeProbe::LocalResource { root: PathBuf::from(root) },
            _ => SizeProbe::Remote,
        }
    }

    /// 返回正的文件大小，否则返回 `SizeUnknown`
    pub async fn total_size(&self, client: &dyn HttpClient, url: &str) -> Result<u64, DownloadError> {
        let size = match self {
            SizeProbe::Remote => client.probe_size(url).await.map_err(|e| {
                log::warn!("获取文件大小失败: {} - {}", url, e);
                DownloadError::SizeUnknown(format!("{} ({})", url, e))
            })?,
            SizeProbe::LocalResource { root } => local_size(root, url).await,
        };

        match size {
            Some(size) if size > 0 => Ok(size),
            _ => Err(DownloadError::SizeUnknown(url.to_string())),
        }
    }
}

async fn local_size(root: &Path, url: &str) -> Option<u64> {
    let (_, rel) = url.split_once(LOCAL_MARKER)?;
    let rel = rel.split(['?', '#']).next().unwrap_or_default();
    if rel.is_empty() {
        return None;
    }
    let path = root.join(rel);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        Ok(_) => None,
        Err(e) => {
            log::warn!("无法读取本地资源 {}: {}", path.display(), e);
            None
        }
    }
}
