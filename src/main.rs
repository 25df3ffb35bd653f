use std::sync::Arc;

use anyhow::Context;
use parafetch::cli;
use parafetch::core::http::{HttpClient, ReqwestClient};
use parafetch::core::progress::ProgressReporter;
use parafetch::dispatch;
use parafetch::ui::{self, ConsoleReporter};
use parafetch::utils::logger;

const BUILD_TIMESTAMP: Option<&str> = option_env!("VERGEN_BUILD_TIMESTAMP");
const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

#[tokio::main]
async fn main() {
    let code = match try_main().await {
        Ok(code) => code,
        Err(e) => {
            ui::print_error(&format!("{:#}", e));
            1
        }
    };
    log::info!("程序退出，退出码 {}", code);
    std::process::exit(code);
}

async fn try_main() -> anyhow::Result<i32> {
    // 解析参数和配置
    let (args, config) = cli::Args::parse_args().context("参数解析失败")?;

    if args.init_config {
        config
            .save_with_tutorial(&args.config)
            .with_context(|| format!("无法写入配置文件 {}", args.config))?;
        ui::print_success(&format!("配置文件已生成: {}", args.config));
        return Ok(0);
    }

    logger::init(&config).context("日志初始化失败")?;
    log::info!(
        "parafetch {} 启动 (构建时间 {}, git {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_TIMESTAMP.unwrap_or("unknown"),
        GIT_SHA.unwrap_or("unknown")
    );
    log::info!("配置文件路径: {}", args.config);
    log::debug!("{}", config.get_summary());

    // 命令行没有给出地址时从标准输入读取
    let job = match args.job() {
        Some(job) => job,
        None => dispatch::read_job_from_stdin(),
    };
    let job = match job {
        Ok(job) => job,
        Err(e) => {
            log::error!("无效的输入: {}", e);
            ui::print_error(&e.to_string());
            return Ok(1);
        }
    };
    log::info!("下载作业: {:?}", job);

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&config).context("无法创建 HTTP 客户端")?);
    let reporter: Arc<dyn ProgressReporter> = Arc::new(ConsoleReporter::new());

    Ok(dispatch::run(job, &config, client, reporter).await)
}
