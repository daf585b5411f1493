//! 登录认证 - 业务能力层
//!
//! 单次尝试的流程：
//! 1. 填入学号与密码
//! 2. 取验证码图片（优先按 URL 下载，失败回退为元素截图）
//! 3. LLM 识别验证码
//! 4. 逐字符输入验证码并提交
//! 5. 按跳转后的 URL 判定成败
//!
//! 失败在配置的次数预算内重试，每次重试都先刷新验证码拿全新图片；
//! 预算耗尽上抛 RetriesExhausted（致命）

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, Selectors};
use crate::error::{AppError, AppResult, AuthError, CaptchaError};
use crate::infrastructure::js_executor::js_string;
use crate::infrastructure::JsExecutor;
use crate::models::Credentials;
use crate::services::CaptchaSolver;
use crate::utils::retry::retry_async;

/// 提交后 URL 轮询间隔
const URL_POLL_INTERVAL_MS: u64 = 500;

/// 登录认证服务
pub struct AuthService {
    login_url: String,
    login_success_url: String,
    login_failure_url: String,
    wait_timeout_ms: u64,
    max_attempts: u32,
    selectors: Selectors,
    solver: CaptchaSolver,
}

impl AuthService {
    /// 创建新的登录认证服务
    pub fn new(config: &Config, solver: CaptchaSolver) -> Self {
        Self {
            login_url: config.login_url.clone(),
            login_success_url: config.login_success_url.clone(),
            login_failure_url: config.login_failure_url.clone(),
            wait_timeout_ms: config.wait_timeout_ms,
            max_attempts: config.max_login_attempts,
            selectors: config.selectors.clone(),
            solver,
        }
    }

    /// 执行自动登录
    pub async fn login(&self, executor: &JsExecutor, credentials: &Credentials) -> AppResult<()> {
        info!("🔐 正在打开登录页: {}", self.login_url);
        executor.goto(&self.login_url).await?;
        executor
            .wait_for_element(&self.selectors.username_field, self.wait_timeout_ms)
            .await
            .map_err(|_| {
                AppError::Auth(AuthError::FormNotFound {
                    selector: self.selectors.username_field.clone(),
                })
            })?;

        retry_async(self.max_attempts, "登录", |attempt| {
            self.login_attempt(executor, credentials, attempt)
        })
        .await
        .map_err(|e| {
            AppError::Auth(AuthError::RetriesExhausted {
                attempts: self.max_attempts,
                last_error: e.to_string(),
            })
        })?;

        // URL 已经确认跳转成功，控制台标记只做二次确认，不阻塞流程
        if !executor.exists(&self.selectors.dashboard_marker).await {
            debug!("未找到控制台标记元素，以 URL 判定为准");
        }

        info!("✅ 登录成功");
        Ok(())
    }

    /// 单次登录尝试
    async fn login_attempt(
        &self,
        executor: &JsExecutor,
        credentials: &Credentials,
        attempt: u32,
    ) -> AppResult<()> {
        info!("🔑 第 {}/{} 次登录尝试", attempt, self.max_attempts);

        // 重试时先刷新验证码，保证每次尝试都拿到全新图片
        if attempt > 1 {
            self.refresh_captcha(executor).await;
        }

        self.fill_credentials(executor, credentials).await?;
        debug!("✓ 学号与密码已填入");

        let image_bytes = self.fetch_captcha_image(executor).await?;
        debug!("📸 验证码图片 {} 字节", image_bytes.len());

        let answer = self.solver.solve(&image_bytes).await?;

        executor
            .clear_and_type(&self.selectors.captcha_field, &answer)
            .await?;
        debug!("✓ 验证码已逐字符输入");

        executor.click(&self.selectors.login_button).await?;
        debug!("✓ 已点击登录按钮");

        self.wait_for_login_outcome(executor).await
    }

    /// 用 JS 一次性填入学号与密码
    async fn fill_credentials(
        &self,
        executor: &JsExecutor,
        credentials: &Credentials,
    ) -> AppResult<()> {
        let fill_script = format!(
            r#"
            (function() {{
                const userField = document.querySelector({user_sel});
                const passField = document.querySelector({pass_sel});
                if (!userField || !passField) return false;
                userField.value = {user};
                passField.value = {pass};
                userField.dispatchEvent(new Event('input', {{ bubbles: true }}));
                passField.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            user_sel = js_string(&self.selectors.username_field),
            pass_sel = js_string(&self.selectors.password_field),
            user = js_string(&credentials.student_code),
            pass = js_string(&credentials.dob_password),
        );

        let filled: bool = executor.eval_as(fill_script).await?;
        if !filled {
            return Err(AppError::Auth(AuthError::FormNotFound {
                selector: self.selectors.username_field.clone(),
            }));
        }
        Ok(())
    }

    /// 获取验证码图片字节
    ///
    /// 优先按图片的 src 地址直接下载；下载失败回退为对元素截图
    async fn fetch_captcha_image(&self, executor: &JsExecutor) -> AppResult<Vec<u8>> {
        let src = executor
            .attribute(&self.selectors.captcha_image, "src")
            .await?
            .ok_or(AppError::Captcha(CaptchaError::ImageNotFound))?;

        let url = absolutize_url(&self.login_url, &src);
        debug!("验证码图片地址: {}", url);

        match download_image(&url).await {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => {
                warn!("⚠️ 验证码图片下载结果为空，回退为元素截图");
                executor.screenshot_element(&self.selectors.captcha_image).await
            }
            Err(e) => {
                warn!("⚠️ 验证码图片下载失败 ({})，回退为元素截图", e);
                executor.screenshot_element(&self.selectors.captcha_image).await
            }
        }
    }

    /// 提交后轮询 URL 判定登录结果
    async fn wait_for_login_outcome(&self, executor: &JsExecutor) -> AppResult<()> {
        let deadline = Instant::now() + Duration::from_millis(self.wait_timeout_ms);

        loop {
            sleep(Duration::from_millis(URL_POLL_INTERVAL_MS)).await;

            let url = executor.current_url().await?;
            if url == self.login_success_url {
                debug!("📍 已跳转到控制台: {}", url);
                return Ok(());
            }
            if url == self.login_failure_url {
                let message = self
                    .read_error_banner(executor)
                    .await
                    .unwrap_or_else(|| "仍停留在登录页".to_string());
                return Err(AppError::Auth(AuthError::LoginRejected { message }));
            }
            if Instant::now() >= deadline {
                return Err(AppError::Auth(AuthError::UnexpectedUrl { url }));
            }
        }
    }

    /// 读取登录页的错误提示文本
    async fn read_error_banner(&self, executor: &JsExecutor) -> Option<String> {
        let js_code = format!(
            r#"
            (function() {{
                const el = document.querySelector({sel});
                if (!el) return null;
                const text = el.textContent.trim();
                return text.length > 0 ? text : null;
            }})()
            "#,
            sel = js_string(&self.selectors.error_banner),
        );
        executor.eval_as::<Option<String>>(js_code).await.ok().flatten()
    }

    /// 点击刷新验证码（控件缺失时静默跳过）
    async fn refresh_captcha(&self, executor: &JsExecutor) {
        if executor.click(&self.selectors.captcha_refresh).await.is_ok() {
            debug!("🔄 已刷新验证码");
            sleep(Duration::from_millis(URL_POLL_INTERVAL_MS)).await;
        }
    }
}

/// 把验证码图片的相对地址补全为绝对地址
fn absolutize_url(base: &str, src: &str) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }

    let origin = site_origin(base);
    if src.starts_with('/') {
        format!("{}{}", origin, src)
    } else {
        format!("{}/{}", origin, src)
    }
}

/// 取 URL 的 scheme://host 部分
fn site_origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url.trim_end_matches('/');
    };
    let rest = &url[scheme_end + 3..];
    match rest.find('/') {
        Some(path_start) => &url[..scheme_end + 3 + path_start],
        None => url,
    }
}

/// 下载验证码图片
async fn download_image(url: &str) -> AppResult<Vec<u8>> {
    let response = reqwest::get(url).await.map_err(|e| {
        AppError::Captcha(CaptchaError::ImageDownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })
    })?;

    if !response.status().is_success() {
        return Err(AppError::Captcha(CaptchaError::ImageDownloadFailed {
            url: url.to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP 状态码 {}", response.status()),
            )),
        }));
    }

    let bytes = response.bytes().await.map_err(|e| {
        AppError::Captcha(CaptchaError::ImageDownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })
    })?;

    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_url_keeps_absolute() {
        assert_eq!(
            absolutize_url("https://student.example.com", "https://cdn.example.com/c.png"),
            "https://cdn.example.com/c.png"
        );
    }

    #[test]
    fn test_absolutize_url_resolves_relative() {
        assert_eq!(
            absolutize_url("https://student.example.com", "/CaptchaImage.axd?guid=1"),
            "https://student.example.com/CaptchaImage.axd?guid=1"
        );
        assert_eq!(
            absolutize_url("https://student.example.com", "CaptchaImage.axd?guid=1"),
            "https://student.example.com/CaptchaImage.axd?guid=1"
        );
    }

    #[test]
    fn test_site_origin_drops_path() {
        assert_eq!(
            site_origin("https://student.example.com/ui/dashboard/index.aspx"),
            "https://student.example.com"
        );
        assert_eq!(site_origin("https://student.example.com"), "https://student.example.com");
    }
}
