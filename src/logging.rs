//! 日志配置模块
//!
//! 终端界面占用屏幕期间日志只写入文件。

use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

/// 日志文件前缀
const LOG_FILE_PREFIX: &str = "localchat";

/// 覆盖日志级别的环境变量
pub const LOG_LEVEL_ENV: &str = "LOCALCHAT_LOG";

/// 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("未知的日志级别: {}", other)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志目录
    pub log_dir: PathBuf,
    /// 日志级别
    pub level: LogLevel,
    /// 是否同时输出到控制台
    pub console_output: bool,
    /// 是否使用颜色（仅控制台）
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            level: LogLevel::default(),
            console_output: false,
            ansi: false,
        }
    }
}

impl LoggingConfig {
    /// 创建新的日志配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 默认配置 + `LOCALCHAT_LOG` 覆盖日志级别
    ///
    /// 无法识别的值忽略，保持默认级别。
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(LOG_LEVEL_ENV).ok().map(|v| v.parse::<LogLevel>()) {
            Some(Ok(level)) => config.with_level(level),
            _ => config,
        }
    }

    /// 设置日志目录
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// 设置日志级别
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// 设置是否输出到控制台
    pub fn with_console_output(mut self, output: bool) -> Self {
        self.console_output = output;
        self
    }

    /// 设置是否使用 ANSI 颜色
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// 初始化日志系统
    ///
    /// 只能调用一次。返回的 guard 被丢弃后日志停止写入文件。
    pub fn init(self) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.log_dir)?;

        // 每天一个文件
        let file_appender = rolling::daily(&self.log_dir, LOG_FILE_PREFIX);
        let (non_blocking_file, guard) = non_blocking(file_appender);
        let filter = self.level.to_level_filter();

        let file_layer = fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(filter);

        let subscriber = tracing_subscriber::registry().with(file_layer);

        if self.console_output {
            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(self.ansi)
                .with_target(true)
                .with_filter(filter);

            subscriber.with(console_layer).try_init()?;
        } else {
            subscriber.try_init()?;
        }

        Ok(guard)
    }
}

/// 只写文件的日志初始化（终端界面使用）
pub fn init_file_logging() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    LoggingConfig::from_env().init()
}
