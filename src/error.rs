use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 凭据解析错误
    Credential(CredentialError),
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 验证码识别错误
    Captcha(CaptchaError),
    /// 登录认证错误
    Auth(AuthError),
    /// 考勤抓取错误
    Scrape(ScrapeError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Credential(e) => write!(f, "凭据错误: {}", e),
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Captcha(e) => write!(f, "验证码错误: {}", e),
            AppError::Auth(e) => write!(f, "登录错误: {}", e),
            AppError::Scrape(e) => write!(f, "抓取错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Credential(e) => Some(e),
            AppError::Browser(e) => Some(e),
            AppError::Captcha(e) => Some(e),
            AppError::Auth(e) => Some(e),
            AppError::Scrape(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 凭据解析错误
#[derive(Debug)]
pub enum CredentialError {
    /// 凭据缺失且无法交互式输入
    Missing {
        field: String,
    },
    /// 终端交互输入失败
    PromptFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Missing { field } => {
                write!(f, "缺少凭据 {}（配置与环境变量均未提供，且当前不是交互终端）", field)
            }
            CredentialError::PromptFailed { source } => {
                write!(f, "终端输入失败: {}", source)
            }
        }
    }
}

impl std::error::Error for CredentialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CredentialError::PromptFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 浏览器配置失败
    ConfigurationFailed {
        message: String,
    },
    /// 启动浏览器失败（二进制不可用等，属致命错误，不重试）
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 当前引擎不受 CDP 协议支持
    UnsupportedEngine {
        engine: String,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本返回值反序列化失败
    ResultParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待元素超时
    WaitTimeout {
        selector: String,
        timeout_ms: u64,
    },
    /// 元素不存在
    ElementNotFound {
        selector: String,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            BrowserError::UnsupportedEngine { engine } => {
                write!(f, "chromiumoxide 仅支持 CDP 协议，无法驱动引擎 '{}'", engine)
            }
            BrowserError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ResultParseFailed { source } => {
                write!(f, "脚本返回值解析失败: {}", source)
            }
            BrowserError::WaitTimeout { selector, timeout_ms } => {
                write!(f, "等待元素 '{}' 超时 ({} ms)", selector, timeout_ms)
            }
            BrowserError::ElementNotFound { selector } => {
                write!(f, "未找到元素: {}", selector)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source }
            | BrowserError::ResultParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 验证码识别错误（瞬时，在登录重试预算内恢复）
#[derive(Debug)]
pub enum CaptchaError {
    /// 页面上找不到验证码图片
    ImageNotFound,
    /// 验证码图片下载失败
    ImageDownloadFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// LLM API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// LLM 返回内容为空
    EmptyResponse {
        model: String,
    },
    /// 所有指令轮换后仍未得到合法答案
    SolveFailed {
        attempts: usize,
    },
}

impl fmt::Display for CaptchaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptchaError::ImageNotFound => write!(f, "页面上找不到验证码图片"),
            CaptchaError::ImageDownloadFailed { url, source } => {
                write!(f, "验证码图片下载失败 ({}): {}", url, source)
            }
            CaptchaError::ApiCallFailed { model, source } => {
                write!(f, "LLM API 调用失败 (模型: {}): {}", model, source)
            }
            CaptchaError::EmptyResponse { model } => {
                write!(f, "LLM 返回内容为空 (模型: {})", model)
            }
            CaptchaError::SolveFailed { attempts } => {
                write!(f, "验证码识别失败，已尝试 {} 条指令", attempts)
            }
        }
    }
}

impl std::error::Error for CaptchaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptchaError::ImageDownloadFailed { source, .. }
            | CaptchaError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 登录认证错误
#[derive(Debug)]
pub enum AuthError {
    /// 重试预算耗尽（致命）
    RetriesExhausted {
        attempts: u32,
        last_error: String,
    },
    /// 门户拒绝登录（仍停留在登录页）
    LoginRejected {
        message: String,
    },
    /// 提交后跳转到了意料之外的地址
    UnexpectedUrl {
        url: String,
    },
    /// 会话已过期（被重定向回登录页）
    SessionExpired {
        url: String,
    },
    /// 登录表单缺失
    FormNotFound {
        selector: String,
    },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::RetriesExhausted { attempts, last_error } => {
                write!(f, "登录失败，已重试 {} 次，最后一次错误: {}", attempts, last_error)
            }
            AuthError::LoginRejected { message } => {
                write!(f, "门户拒绝登录: {}", message)
            }
            AuthError::UnexpectedUrl { url } => {
                write!(f, "登录后跳转到意外地址: {}", url)
            }
            AuthError::SessionExpired { url } => {
                write!(f, "会话已过期，被重定向到: {}", url)
            }
            AuthError::FormNotFound { selector } => {
                write!(f, "页面上找不到登录表单: {}", selector)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// 考勤抓取错误
#[derive(Debug)]
pub enum ScrapeError {
    /// 单行数据解析失败（逐行恢复：跳过该行并告警）
    RowParseFailed {
        index: usize,
        reason: String,
    },
    /// 展开科目详情失败
    ExpandFailed {
        index: usize,
    },
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::RowParseFailed { index, reason } => {
                write!(f, "第 {} 个科目行解析失败: {}", index + 1, reason)
            }
            ScrapeError::ExpandFailed { index } => {
                write!(f, "展开第 {} 个科目详情失败", index + 1)
            }
        }
    }
}

impl std::error::Error for ScrapeError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    FileReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 配置值非法
    InvalidValue {
        field: String,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileReadFailed { path, source } => {
                write!(f, "读取配置文件失败 ({}): {}", path, source)
            }
            ConfigError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "配置项 {} 的值非法: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileReadFailed { source, .. }
            | ConfigError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ResultParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(ConfigError::FileReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建凭据缺失错误
    pub fn missing_credential(field: impl Into<String>) -> Self {
        AppError::Credential(CredentialError::Missing { field: field.into() })
    }

    /// 创建浏览器启动失败错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建等待超时错误
    pub fn wait_timeout(selector: impl Into<String>, timeout_ms: u64) -> Self {
        AppError::Browser(BrowserError::WaitTimeout {
            selector: selector.into(),
            timeout_ms,
        })
    }

    /// 创建验证码 API 调用错误
    pub fn captcha_api_failed(model: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Captcha(CaptchaError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建单行解析失败错误
    pub fn row_parse_failed(index: usize, reason: impl Into<String>) -> Self {
        AppError::Scrape(ScrapeError::RowParseFailed {
            index,
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
