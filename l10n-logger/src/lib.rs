use l10n_core::LogSettings;
use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_FILE_PREFIX: &str = "l10n.log";

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter '{0}': {1}")]
    Filter(String, String),
    #[error("failed to create log file appender: {0}")]
    Appender(String),
    #[error("global subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// 日志配置构建器
///
/// 控制台与按天滚动的文件输出，文件保留数量交给 `tracing-appender` 处理。
pub struct LogConfig {
    /// 过滤指令，例如 `info` 或 `l10n_client=debug,info`
    filter: String,
    time_format: String,
    console: bool,
    file: bool,
    log_dir: PathBuf,
    /// 滚动文件名前缀，实际文件名形如 `l10n.log.2025-01-01`
    file_prefix: String,
    /// 保留的最大日志文件数量
    max_files: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            console: true,
            file: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            max_files: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从客户端配置中的 `log` 段构建
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            filter: settings.level.clone(),
            console: settings.console,
            file: settings.file,
            log_dir: settings.dir.clone(),
            file_prefix: settings.file_prefix.clone(),
            max_files: settings.max_files,
            ..Self::default()
        }
    }

    /// 设置过滤指令（`EnvFilter` 语法）
    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = directives.into();
        self
    }

    /// 格式参考 chrono::format::strftime
    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.console = enable;
        self
    }

    pub fn enable_file(mut self, enable: bool) -> Self {
        self.file = enable;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = Some(count);
        self
    }

    /// 注册全局 subscriber。
    ///
    /// 返回的 `WorkerGuard` 必须持有到程序结束，否则文件日志可能丢失。
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggerError> {
        let (file_layer, guard) = self.build_file_layer()?;

        Registry::default()
            .with(self.build_console_layer()?)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggerError::AlreadyInstalled(e.to_string()))?;

        tracing::debug!(filter = %self.filter, "logger initialized");
        Ok(guard)
    }

    /// 同 [`LogConfig::try_init`]，失败时打印到 stderr 并继续
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("logger init skipped: {e}");
                None
            }
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        EnvFilter::try_new(&self.filter).map_err(|e| LoggerError::Filter(self.filter.clone(), e.to_string()))
    }

    fn build_console_layer<S>(&self) -> Result<Option<impl Layer<S> + use<S>>, LoggerError>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        if !self.console {
            return Ok(None);
        }
        Ok(Some(
            fmt::layer()
                .with_timer(ChronoLocal::new(self.time_format.clone()))
                .with_writer(std::io::stdout)
                .with_filter(self.env_filter()?),
        ))
    }

    fn build_file_layer<S>(&self) -> Result<(Option<impl Layer<S> + use<S>>, Option<WorkerGuard>), LoggerError>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        if !self.file {
            return Ok((None, None));
        }

        let mut builder = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&self.file_prefix);
        if let Some(max) = self.max_files {
            builder = builder.max_log_files(max);
        }
        let appender = builder
            .build(&self.log_dir)
            .map_err(|e| LoggerError::Appender(e.to_string()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_timer(ChronoLocal::new(self.time_format.clone()))
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(self.env_filter()?);

        Ok((Some(layer), Some(guard)))
    }
}
