use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::alert::Thresholds;
use crate::utils::retry::RetryPolicy;

pub const CONFIG_ENV: &str = "ETF_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "etf_monitor.toml";

const MA_LONG_WINDOW: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_code")]
    pub code: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_price_change")]
    pub alert_price_change_pct: f64,
    /// 万元；默认 10000 即 1 亿元
    #[serde(default = "default_flow_main")]
    pub alert_flow_main: f64,
    /// 为空时使用 `<code>_history.csv`
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_jitter")]
    pub poll_jitter_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fetch_bars")]
    pub history_fetch_bars: usize,
    #[serde(default = "default_display_bars")]
    pub history_display_bars: usize,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_code() -> String { "512000".to_string() }
fn default_name() -> String { "券商ETF".to_string() }
fn default_price_change() -> f64 { 3.0 }
fn default_flow_main() -> f64 { 10000.0 }
fn default_poll_interval() -> u64 { 30 }
fn default_poll_jitter() -> u64 { 10 }
fn default_retry_attempts() -> u32 { 5 }
fn default_retry_backoff() -> u64 { 3 }
fn default_request_timeout() -> u64 { 10 }
fn default_fetch_bars() -> usize { 30 }
fn default_display_bars() -> usize { 5 }
fn default_log_level() -> String { "info".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            code: default_code(),
            name: default_name(),
            alert_price_change_pct: default_price_change(),
            alert_flow_main: default_flow_main(),
            history_file: None,
            poll_interval_secs: default_poll_interval(),
            poll_jitter_secs: default_poll_jitter(),
            retry_max_attempts: default_retry_attempts(),
            retry_backoff_secs: default_retry_backoff(),
            request_timeout_secs: default_request_timeout(),
            history_fetch_bars: default_fetch_bars(),
            history_display_bars: default_display_bars(),
            accept_invalid_certs: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// 解析配置路径：命令行参数 > 环境变量 > 当前目录默认文件
    pub fn resolve_path(cli_arg: Option<String>) -> PathBuf {
        cli_arg
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|s| !s.is_empty()))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// 文件不存在时使用全部默认值
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            Self::from_toml(&text)
                .with_context(|| format!("配置文件格式错误: {}", path.display()))?
        } else {
            Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.code.is_empty() || !self.code.chars().all(|c| c.is_ascii_digit()) {
            bail!("证券代码无效: '{}'，应为纯数字代码", self.code);
        }
        for (name, value) in [
            ("alert_price_change_pct", self.alert_price_change_pct),
            ("alert_flow_main", self.alert_flow_main),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{} 必须为非负有限数，当前 {}", name, value);
            }
        }
        if self.retry_max_attempts == 0 {
            bail!("retry_max_attempts 必须大于 0");
        }
        if !(1..=30).contains(&self.request_timeout_secs) {
            bail!("request_timeout_secs 必须在 1..=30 之间，当前 {}", self.request_timeout_secs);
        }
        if self.history_display_bars == 0 {
            bail!("history_display_bars 必须大于 0");
        }
        let needed = MA_LONG_WINDOW + self.history_display_bars - 1;
        if self.history_fetch_bars < needed {
            bail!(
                "history_fetch_bars={} 不足以计算最近 {} 根K线的 MA{}，至少需要 {}",
                self.history_fetch_bars,
                self.history_display_bars,
                MA_LONG_WINDOW,
                needed
            );
        }
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_history.csv", self.code)))
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            price_change_pct: self.alert_price_change_pct,
            flow_main: self.alert_flow_main,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.retry_max_attempts, Duration::from_secs(self.retry_backoff_secs))
    }
}
