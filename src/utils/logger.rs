use chrono::Local; // 用于获取本地时间
use log::LevelFilter; // 用于设置日志级别
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::Config;

/// 日志文件超过 `max_size` 时重命名为 `<file>.backup`
fn rotate_if_needed(file_path: &str, max_size: u64) -> Result<(), std::io::Error> {
    let size = match std::fs::metadata(file_path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()),
    };
    if size > max_size {
        let backup_path = format!("{}.backup", file_path);
        if Path::new(&backup_path).exists() {
            std::fs::remove_file(&backup_path)?;
        }
        std::fs::rename(file_path, &backup_path)?;
    }
    Ok(())
}

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        // RUST_LOG 优先于配置文件
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    builder
}

/// 初始化全局日志：配置了 `log_file` 时写入文件，否则写到 stderr
pub fn init(config: &Config) -> Result<(), std::io::Error> {
    let level = config.log_level_filter().unwrap_or(LevelFilter::Info);
    let mut builder = builder(level);

    if let Some(file_path) = config.log_file.as_deref() {
        // 确保日志目录存在
        if let Some(parent) = Path::new(file_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        rotate_if_needed(file_path, config.log_max_size)?;
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else {
        builder.target(env_logger::Target::Stderr);
    }

    // 重复初始化（例如测试中）不视为错误
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_moves_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let path_str = path.to_str().unwrap();
        std::fs::write(&path, vec![b'x'; 64]).unwrap();

        rotate_if_needed(path_str, 16).unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read(format!("{}.backup", path_str)).unwrap().len(), 64);
    }

    #[test]
    fn test_rotation_keeps_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"short").unwrap();

        rotate_if_needed(path.to_str().unwrap(), 1024).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_with_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.log_file = Some(dir.path().join("logs/parafetch.log").to_str().unwrap().to_string());
        init(&config).unwrap();
        assert!(dir.path().join("logs/parafetch.log").exists());
    }
}
