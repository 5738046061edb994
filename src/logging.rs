use crate::config::{LogRotation, LoggingConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// ログファイル名の接頭辞
pub const LOG_FILE_PREFIX: &str = "privacy-rs.log";

/// ログシステムを初期化
///
/// `RUST_LOG` が設定されていればそれを優先する。Console output goes to
/// stderr so stdout stays free for command output. The returned guard must
/// be held until exit to flush the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file, guard) = match &config.directory {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(dir, config.rotation)?);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::info!(
        level = %config.level,
        json = config.json,
        directory = ?config.directory,
        "📝 ログシステム初期化完了"
    );
    Ok(guard)
}

/// ローテーション設定に応じたファイルアペンダーを作成
fn file_appender(dir: &Path, rotation: LogRotation) -> Result<RollingFileAppender> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }

    Ok(match rotation {
        LogRotation::Daily => rolling::daily(dir, LOG_FILE_PREFIX),
        LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_PREFIX),
        LogRotation::Never => rolling::never(dir, LOG_FILE_PREFIX),
    })
}
