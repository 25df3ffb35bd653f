//! HTTP 适配层：单次请求（HEAD 或带可选 Range 的 GET），响应体以字节流交给调用方
//!
//! 协调器只依赖 [`HttpClient`] trait；生产环境使用基于 reqwest 的 [`ReqwestClient`]。

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use std::time::Duration;

use crate::config::Config;
use crate::core::error::DownloadError;

/// 响应体字节流
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// 闭区间字节范围，对应 `Range: bytes={start}-{end}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// 一次请求的结果：状态码、内容类型、长度和尚未读取的响应体
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// 查询远程文件大小，未知时返回 `None`
    async fn probe_size(&self, url: &str) -> Result<Option<u64>, DownloadError>;

    /// 发起 GET 请求，自动跟随重定向
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<HttpResponse, DownloadError>;

    async fn get_range(&self, url: &str, start: u64, end: u64) -> Result<HttpResponse, DownloadError> {
        self.get(url, Some(ByteRange::new(start, end))).await
    }

    async fn get_full(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        self.get(url, None).await
    }
}

/// 响应体的接收端，返回实际消费的字节数
#[async_trait]
pub trait BodySink: Send {
    async fn accept(&mut self, data: Bytes) -> Result<usize, DownloadError>;
}

/// 把响应体逐块交给 sink，返回总字节数；sink 少消费任何字节都会中止传输
pub async fn stream_body(mut body: BodyStream, sink: &mut dyn BodySink) -> Result<u64, DownloadError> {
    let mut received = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        let len = chunk.len();
        let written = sink.accept(chunk).await?;
        if written != len {
            return Err(DownloadError::ShortWrite { offset: received + written as u64 });
        }
        received += written as u64;
    }
    Ok(received)
}

/// 基于 reqwest 的客户端
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &Config) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .read_timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| DownloadError::Config(format!("无法创建HTTP客户端: {}", e)))?;
        Ok(Self { client })
    }

    /// HEAD 拿不到长度时，用 `bytes=0-0` 的 GET 从 Content-Range 里读总大小
    async fn probe_by_range(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, ByteRange::new(0, 0).header_value())
            .send()
            .await?;
        if response.status() != reqwest::StatusCode::PARTIAL_CONTENT {
            return Ok(None);
        }
        Ok(response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn probe_size(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        let response = self.client.head(url).send().await?;
        if response.status().is_success() {
            // HEAD 响应体为空，content_length() 不可靠，直接读头
            let size = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&size| size > 0);
            if size.is_some() {
                return Ok(size);
            }
        }
        log::debug!("HEAD 未返回文件大小 (HTTP {})，尝试范围请求: {}", response.status(), url);
        self.probe_by_range(url).await
    }

    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<HttpResponse, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::from))
            .boxed();

        Ok(HttpResponse { status, content_type, content_length, body })
    }
}

/// 解析 `bytes 0-0/1234` 中的总大小，`*` 表示未知
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse::<u64>().ok().filter(|&total| total > 0)
}
