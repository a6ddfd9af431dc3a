use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// 重试策略：最多执行 `max_attempts` 次（含首次），两次之间固定等待 `backoff`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(3))
    }
}

/// 重试结果及实际执行次数
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// 按策略重试异步操作。
/// 仅当 `is_retryable` 判定为可重试时继续，其余错误立即返回。
pub async fn retry_with_policy<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    operation: F,
) -> Retried<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(val) => return Retried { result: Ok(val), attempts: attempt },
            Err(e) => {
                if !is_retryable(&e) || attempt >= max_attempts {
                    return Retried { result: Err(e), attempts: attempt };
                }
                log::warn!(
                    "请求失败（第 {}/{} 次），{}s 后重试: {}",
                    attempt,
                    max_attempts,
                    policy.backoff.as_secs(),
                    e
                );
                sleep(policy.backoff).await;
            }
        }
    }
}
