use crate::error::ProviderError;
use crate::models::stock::{now_timestamp, Quote};
use crate::services::quote_provider::{Instrument, QuoteProvider};
use crate::services::quote_validator::validate_quote;
use crate::utils::retry::{retry_with_policy, RetryPolicy};

/// 单个数据源在本轮中的结局
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStatus {
    Accepted,
    /// 瞬时错误重试次数用尽
    Exhausted(ProviderError),
    /// 解析 / 校验失败，不重试直接切换数据源
    Rejected(ProviderError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReport {
    pub provider: &'static str,
    pub attempts: u32,
    pub status: ProviderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteSource {
    Provider(&'static str),
    Synthetic,
}

/// 一次行情获取的结果：快照、来源以及每个被尝试的数据源的结局
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub quote: Quote,
    pub source: QuoteSource,
    pub reports: Vec<ProviderReport>,
}

impl Acquisition {
    pub fn is_synthetic(&self) -> bool {
        self.source == QuoteSource::Synthetic
    }
}

/// 按优先级依次尝试数据源，每个数据源独立重试，首个通过校验的快照胜出。
pub struct FallbackChain {
    providers: Vec<Box<dyn QuoteProvider>>,
    policy: RetryPolicy,
    instrument: Instrument,
}

impl FallbackChain {
    pub fn new(providers: Vec<Box<dyn QuoteProvider>>, policy: RetryPolicy, instrument: Instrument) -> Self {
        Self { providers, policy, instrument }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 永不失败：全部数据源失败时返回带 synthetic 标记的占位快照
    pub async fn acquire(&self) -> Acquisition {
        let mut reports = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            let retried = retry_with_policy(&self.policy, ProviderError::is_retryable, || {
                attempt_once(provider.as_ref())
            })
            .await;

            match retried.result {
                Ok(quote) => {
                    log::info!("成功通过 {} 获取行情（尝试 {} 次）", name, retried.attempts);
                    reports.push(ProviderReport {
                        provider: name,
                        attempts: retried.attempts,
                        status: ProviderStatus::Accepted,
                    });
                    return Acquisition { quote, source: QuoteSource::Provider(name), reports };
                }
                Err(e) => {
                    let status = if e.is_retryable() {
                        log::warn!("{} 重试 {} 次后仍失败: {}", name, retried.attempts, e);
                        ProviderStatus::Exhausted(e)
                    } else {
                        log::warn!("{} 数据不可用（{}）: {}", name, e.kind(), e);
                        ProviderStatus::Rejected(e)
                    };
                    reports.push(ProviderReport { provider: name, attempts: retried.attempts, status });
                }
            }
        }

        log::error!(
            "所有数据源均失败（{}），使用占位数据，本轮不保存不报警",
            self.provider_names().join(" -> ")
        );
        Acquisition {
            quote: Quote::placeholder(&self.instrument.code, &self.instrument.name, now_timestamp()),
            source: QuoteSource::Synthetic,
            reports,
        }
    }
}

async fn attempt_once(provider: &dyn QuoteProvider) -> Result<Quote, ProviderError> {
    let payload = provider.fetch().await?;
    let quote = provider.parse(&payload)?;
    Ok(validate_quote(quote)?)
}
