//! 有界重试组合子
//!
//! 把"最多重试 N 次"的控制流从业务代码里拆出来：
//! 调用方提供次数上限和单次操作，拿回成功值或最后一次的错误

use std::future::Future;

use tracing::warn;

use crate::error::{AppError, AppResult};

/// 以固定次数上限重试一个异步操作
///
/// 每次尝试都会拿到从 1 开始的尝试编号，方便操作本身按次数调整行为
/// （例如第二次起先刷新验证码）；全部失败后返回最后一次的错误
pub async fn retry_async<T, F, Fut>(max_attempts: u32, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("⚠️ {} 第 {}/{} 次尝试失败: {}", label, attempt, max_attempts, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| AppError::Other(format!("{} 的重试次数上限配置为 0", label))))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_succeeds_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry_async(3, "测试", |_| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AppError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_before_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry_async(3, "测试", |attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(AppError::Other(format!("第 {} 次失败", attempt)))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: AppResult<()> = retry_async(3, "测试", |attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Other(format!("第 {} 次失败", attempt)))
            }
        })
        .await;

        // 不会超出预算，错误来自最后一次尝试
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("第 3 次失败"));
    }

    #[tokio::test]
    async fn test_attempt_numbers_start_at_one() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let _: AppResult<()> = retry_async(2, "测试", |attempt| {
            let seen = seen_clone.clone();
            async move {
                seen.lock().unwrap().push(attempt);
                Err(AppError::Other("失败".to_string()))
            }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
