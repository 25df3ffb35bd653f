//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的用法
//!
//! - 大文件分块下载：`parafetch <url> <文件> [线程数]`
//! - 多文件并发下载：`parafetch <url1> <文件1> <url2> <文件2> ...`
//! - 交互输入：`parafetch`，从标准输入读取一行 `<url> <文件> ...`
//! - 生成配置：`parafetch --init-config`
//!
//! 一对 url/文件 走大文件模式，两对及以上走多文件模式。

use clap::Parser;
use std::env;
use std::path::PathBuf;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/parafetch/parafetch.toml", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/parafetch/parafetch.toml", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = env::var("XDG_CONFIG_HOME")
            .unwrap_or_else(|_| format!("{}/.config", env::var("HOME").unwrap_or_else(|_| ".".to_string())));
        format!("{}/parafetch/parafetch.toml", base)
    }
}

/// parafetch 命令行参数
///
/// 示例用法：
///   parafetch https://example.com/big.iso big.iso 8
///   parafetch https://a.com/1.zip 1.zip https://b.com/2.zip 2.zip
///   echo "https://example.com/big.iso big.iso" | parafetch
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parafetch",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "一个用 Rust 编写的分块并发下载器",
    long_about = "一对 <url> <文件> 时按字节范围分块并发下载；多对时每个文件一个并发任务。\n不带参数运行时从标准输入读取一行。\n\n示例：\n  parafetch https://example.com/big.iso big.iso 8\n  parafetch https://a.com/1.zip 1.zip https://b.com/2.zip 2.zip\n"
)]
pub struct Args {
    /// `<url> <文件> [线程数]` 或多组 `<url> <文件>`
    #[arg(value_name = "URL FILE", help = "<url> <文件> [线程数]，或多组 <url> <文件>；省略时从标准输入读取。")]
    pub targets: Vec<String>,

    /// 大文件模式的线程数（分块数）
    #[arg(short = 't', long, help = "大文件模式的线程数，覆盖配置文件中的设置。")]
    pub threads: Option<usize>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 把当前配置（含说明）写入配置文件后退出
    #[arg(long = "init-config", help = "把当前配置（含说明）写入配置文件并退出。")]
    pub init_config: bool,

    #[arg(short = 'A', long = "user-agent", help = "请求使用的 User-Agent。")]
    pub user_agent: Option<String>,

    #[arg(long = "resource-root", help = "本地资源目录，用于 /download/<路径> 形式 URL 的大小查询。")]
    pub resource_root: Option<String>,

    #[arg(long = "log-file", help = "日志文件路径，默认输出到 stderr。")]
    pub log_file: Option<String>,

    #[arg(short = 'v', long, help = "输出调试日志。")]
    pub verbose: bool,
}

/// 解析出的下载作业
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    BigFile {
        url: String,
        output: PathBuf,
        threads: Option<usize>,
    },
    MultiFile(Vec<(String, PathBuf)>),
}

impl Args {
    /// 解析命令行参数并加载配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();
        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 读取配置文件（不存在时用默认值），合并命令行参数并校验
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    /// 命令行里给出的作业；没有位置参数时返回 `None`（改从标准输入读取）
    pub fn job(&self) -> Option<Result<Job, DownloadError>> {
        if self.targets.is_empty() {
            return None;
        }
        Some(job_from_args(&self.targets, self.threads))
    }
}

/// 命令行模式：`<url> <文件> [线程数]` 或多组 `<url> <文件>`
pub fn job_from_args(tokens: &[String], threads: Option<usize>) -> Result<Job, DownloadError> {
    if tokens.len() == 3 {
        if let Ok(n) = tokens[2].parse::<usize>() {
            validator::validate_thread_count(n)?;
            return job_from_tokens(&tokens[..2]).map(|job| match job {
                Job::BigFile { url, output, .. } => Job::BigFile { url, output, threads: Some(n) },
                other => other,
            });
        }
    }
    job_from_tokens(tokens).map(|job| match job {
        Job::BigFile { url, output, .. } => Job::BigFile { url, output, threads },
        other => other,
    })
}

/// 交互模式：一行以空白分隔的 url/文件 对
pub fn job_from_line(line: &str) -> Result<Job, DownloadError> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    job_from_tokens(&tokens)
}

fn job_from_tokens(tokens: &[String]) -> Result<Job, DownloadError> {
    if tokens.len() < 2 || tokens.len() % 2 != 0 {
        return Err(DownloadError::Usage(
            "每个 URL 都需要一个对应的输出文件路径: <url1> <文件1> [<url2> <文件2> ...]".to_string(),
        ));
    }

    let pairs = tokens
        .chunks_exact(2)
        .map(|pair| {
            let url = pair[0].clone();
            if !validator::is_valid_url(&url) {
                return Err(DownloadError::InvalidUrl(url));
            }
            validator::validate_output_path(&pair[1])?;
            Ok((url, PathBuf::from(&pair[1])))
        })
        .collect::<Result<Vec<_>, DownloadError>>()?;

    Ok(match <[_; 1]>::try_from(pairs) {
        Ok([(url, output)]) => Job::BigFile { url, output, threads: None },
        Err(pairs) => Job::MultiFile(pairs),
    })
}
