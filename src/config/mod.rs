use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use log::LevelFilter;
use crate::core::error::DownloadError;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 大文件模式的默认线程数（分块数）
    pub thread_count: usize,
    /// 读取超时时间（秒）
    pub timeout: u64,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 最多跟随的重定向次数
    pub max_redirects: usize,
    /// 本地资源目录；设置后，`/download/<路径>` 形式的 URL 直接读取本地文件大小
    pub resource_root: Option<String>,
    /// 日志文件路径，不设置时输出到 stderr
    pub log_file: Option<String>,
    /// 日志级别：error / warn / info / debug / trace
    pub log_level: String,
    /// 日志文件超过该大小（字节）时在启动时轮转
    pub log_max_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_count: 4,
            timeout: 30,
            connect_timeout: 10,
            user_agent: format!("parafetch/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            resource_root: None,
            log_file: None,
            log_level: "info".to_string(),
            log_max_size: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 加载配置文件，文件不存在时使用默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if !Path::new(path).exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| DownloadError::Config(format!("无法读取配置文件 {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| DownloadError::Config(format!("配置文件格式错误 {}: {}", path, e)))
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| DownloadError::Config(format!("无法创建配置目录: {}", e)))?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)
            .map_err(|e| DownloadError::Config(format!("无法保存配置文件: {}", e)))?;
        Ok(())
    }

    /// 生成配置文件教程内容（静态方法）
    fn generate_tutorial_content() -> String {
        r#"# parafetch 配置文件
# ====================
#
# 这是一个 TOML 格式的配置文件。命令行参数会覆盖这里的设置，
# 优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   parafetch https://example.com/big.iso big.iso 8           # 分 8 块下载一个大文件
#   parafetch https://a.com/1.zip 1.zip https://b.com/2.zip 2.zip  # 同时下载多个文件
#   parafetch                                                 # 从标准输入读取一行 "<url> <文件> ..."
#
# ==================== 配置项说明 ====================
#
# thread_count     大文件模式的分块数，实际值不会超过文件字节数
# timeout          读取超时（秒）
# connect_timeout  连接超时（秒）
# user_agent       某些服务器需要特定的 User-Agent
# max_redirects    最多跟随的重定向次数
# resource_root    服务端与下载端在同一台机器时，/download/<路径> 对应的本地目录
# log_file         日志文件路径，不设置时写到 stderr
# log_level        error / warn / info / debug / trace，可被 RUST_LOG 覆盖
# log_max_size     日志文件超过该字节数时，启动时轮转为 <log_file>.backup
#
# 故障排除：
#   出现 "无法获取文件大小" 时，服务器不支持 HEAD 或 Range 请求，大文件模式无法使用。
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.thread_count == 0 {
            return Err(DownloadError::Config("线程数必须大于0".into()));
        }
        if self.timeout == 0 || self.connect_timeout == 0 {
            return Err(DownloadError::Config("超时时间必须大于0".into()));
        }
        if self.max_redirects == 0 {
            return Err(DownloadError::Config("重定向次数必须大于0".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(DownloadError::Config("User-Agent 不能为空".into()));
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, DownloadError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| DownloadError::Config(format!("无效的日志级别: {}", self.log_level)))
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(threads) = args.threads {
            self.thread_count = threads;
        }
        if let Some(user_agent) = &args.user_agent {
            self.user_agent = user_agent.clone();
        }
        if let Some(root) = &args.resource_root {
            self.resource_root = Some(root.clone());
        }
        if let Some(log_file) = &args.log_file {
            self.log_file = Some(log_file.clone());
        }
        if args.verbose {
            self.log_level = "debug".to_string();
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 线程数: {}\n\
            - 超时时间: {} 秒 (连接 {} 秒)\n\
            - User-Agent: {}\n\
            - 最大重定向: {}\n\
            - 本地资源目录: {}\n\
            - 日志: {} ({})",
            self.thread_count,
            self.timeout,
            self.connect_timeout,
            self.user_agent,
            self.max_redirects,
            self.resource_root.as_deref().unwrap_or("未设置"),
            self.log_file.as_deref().unwrap_or("stderr"),
            self.log_level,
        )
    }
}
