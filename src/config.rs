use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult, ConfigError};

/// 浏览器引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    /// Chromium 系（经 CDP 协议驱动）
    Chromium,
    /// Firefox 系
    Firefox,
    /// WebKit 系
    Webkit,
}

impl BrowserEngine {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Webkit => "webkit",
        }
    }

    /// 尝试从字符串解析引擎
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "chromium" | "chrome" | "edge" => Some(BrowserEngine::Chromium),
            "firefox" => Some(BrowserEngine::Firefox),
            "webkit" => Some(BrowserEngine::Webkit),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 页面元素选择器
///
/// 门户改版只需要改配置文件，核心逻辑不关心具体选择器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// 学号输入框
    pub username_field: String,
    /// 密码输入框
    pub password_field: String,
    /// 验证码输入框
    pub captcha_field: String,
    /// 验证码图片
    pub captcha_image: String,
    /// 登录按钮
    pub login_button: String,
    /// 刷新验证码链接
    pub captcha_refresh: String,
    /// 登录失败时的错误提示
    pub error_banner: String,
    /// 登录成功后的控制台标记元素
    pub dashboard_marker: String,
    /// 科目详情展开图标
    pub expand_icon: String,
    /// 开课数文本
    pub conducted_text: String,
    /// 出勤数文本
    pub attended_text: String,
    /// 科目名称所在容器
    pub subject_container: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username_field: "input[name='txtUserName']".to_string(),
            password_field: "input[name='txtPassword']".to_string(),
            captcha_field: "input[name='txtCaptcha']".to_string(),
            captcha_image: "img[src*='CaptchaImage.axd']".to_string(),
            login_button: "input[name='btnLogIn']".to_string(),
            captcha_refresh: "a[id='lnkbtnrefresh']".to_string(),
            error_banner: "#lblValid".to_string(),
            dashboard_marker: ".user-panel, #sidebar-menu".to_string(),
            expand_icon: "i.bx-plus-circle".to_string(),
            conducted_text: "span[id*='lblClsCondID']".to_string(),
            attended_text: "span[id*='lblClsAttID']".to_string(),
            subject_container: ".col-lg-12".to_string(),
        }
    }
}

/// 程序配置
///
/// 加载顺序：内置默认值 → config.toml → 环境变量，加载完成后只读
#[derive(Debug, Clone)]
pub struct Config {
    /// 浏览器引擎
    pub engine: BrowserEngine,
    /// 是否无头模式
    pub headless: bool,
    /// 视口宽度
    pub viewport_width: u32,
    /// 视口高度
    pub viewport_height: u32,
    /// 元素等待 / URL 判定超时（毫秒）
    pub wait_timeout_ms: u64,
    /// 交互间隔（毫秒），逐字符输入与点击之间的延迟
    pub interaction_delay_ms: u64,
    /// 登录页地址
    pub login_url: String,
    /// 考勤页地址
    pub attendance_url: String,
    /// 登录成功后的地址
    pub login_success_url: String,
    /// 登录失败时的地址
    pub login_failure_url: String,
    /// 登录最大尝试次数（每次尝试都取全新验证码）
    pub max_login_attempts: u32,
    // --- LLM 配置 ---
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 验证码识别指令，按序轮换直到得到合法答案
    pub captcha_prompts: Vec<String>,
    // --- 默认凭据（可选；留空则回退到环境变量或交互输入） ---
    pub default_student_code: String,
    pub default_dob_password: String,
    pub default_api_key: String,
    // --- 考勤阈值（百分比） ---
    pub good_threshold: f64,
    pub warning_threshold: f64,
    // --- 页面选择器 ---
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Chromium,
            headless: true,
            viewport_width: 1320,
            viewport_height: 720,
            wait_timeout_ms: 15_000,
            interaction_delay_ms: 200,
            login_url: "https://student.jgianveshana.com".to_string(),
            attendance_url:
                "https://student.jgianveshana.com/ui/Academics/js_Class_Attendance_for_a_Week.aspx"
                    .to_string(),
            login_success_url: "https://student.jgianveshana.com/ui/dashboard/index.aspx"
                .to_string(),
            login_failure_url: "https://student.jgianveshana.com/".to_string(),
            max_login_attempts: 3,
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            captcha_prompts: vec![
                "Extract only the alphanumeric text from this captcha image. Return just the characters with no explanations, no prefixes, no quotes - only the pure text characters.".to_string(),
                "What text is shown in this captcha image? Reply with only the text characters.".to_string(),
                "Read the captcha code from this image. Output only the code.".to_string(),
                "OCR this captcha image. Return only the alphanumeric characters.".to_string(),
            ],
            default_student_code: String::new(),
            default_dob_password: String::new(),
            default_api_key: String::new(),
            good_threshold: 75.0,
            warning_threshold: 65.0,
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// 默认值 → `config.toml`（存在时，路径可由 `CONFIG_FILE` 覆盖）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        if Path::new(&path).exists() {
            debug!("加载配置文件: {}", path);
            config.apply_toml_file(&path)?;
        }

        config.apply_env();
        Ok(config)
    }

    /// 用 TOML 配置文件中出现的字段覆盖当前值
    fn apply_toml_file(&mut self, path: &str) -> AppResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(ConfigError::FileReadFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;

        let overlay: ConfigOverlay = toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;

        overlay.apply(self)
    }

    /// 用环境变量覆盖当前值
    fn apply_env(&mut self) {
        self.engine = std::env::var("BROWSER_ENGINE")
            .ok()
            .and_then(|v| BrowserEngine::parse(&v))
            .unwrap_or(self.engine);
        self.headless = std::env::var("HEADLESS")
            .ok()
            .and_then(|v| v.to_lowercase().parse().ok())
            .unwrap_or(self.headless);
        self.viewport_width = std::env::var("VIEWPORT_WIDTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.viewport_width);
        self.viewport_height = std::env::var("VIEWPORT_HEIGHT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.viewport_height);
        self.wait_timeout_ms = std::env::var("WAIT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.wait_timeout_ms);
        self.interaction_delay_ms = std::env::var("INTERACTION_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.interaction_delay_ms);
        self.login_url = std::env::var("LOGIN_URL").unwrap_or_else(|_| self.login_url.clone());
        self.attendance_url =
            std::env::var("ATTENDANCE_URL").unwrap_or_else(|_| self.attendance_url.clone());
        self.login_success_url = std::env::var("LOGIN_SUCCESS_URL")
            .unwrap_or_else(|_| self.login_success_url.clone());
        self.login_failure_url = std::env::var("LOGIN_FAILURE_URL")
            .unwrap_or_else(|_| self.login_failure_url.clone());
        self.max_login_attempts = std::env::var("MAX_LOGIN_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.max_login_attempts);
        self.llm_api_base_url =
            std::env::var("LLM_API_BASE_URL").unwrap_or_else(|_| self.llm_api_base_url.clone());
        self.llm_model_name =
            std::env::var("LLM_MODEL_NAME").unwrap_or_else(|_| self.llm_model_name.clone());
        self.good_threshold = std::env::var("GOOD_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.good_threshold);
        self.warning_threshold = std::env::var("WARNING_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.warning_threshold);
    }
}

/// TOML 配置文件的部分覆盖结构
///
/// 所有字段可选，缺省字段保持原值
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    engine: Option<String>,
    headless: Option<bool>,
    viewport_width: Option<u32>,
    viewport_height: Option<u32>,
    wait_timeout_ms: Option<u64>,
    interaction_delay_ms: Option<u64>,
    login_url: Option<String>,
    attendance_url: Option<String>,
    login_success_url: Option<String>,
    login_failure_url: Option<String>,
    max_login_attempts: Option<u32>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    captcha_prompts: Option<Vec<String>>,
    student_code: Option<String>,
    dob_password: Option<String>,
    llm_api_key: Option<String>,
    good_threshold: Option<f64>,
    warning_threshold: Option<f64>,
    selectors: Option<Selectors>,
}

impl ConfigOverlay {
    fn apply(self, config: &mut Config) -> AppResult<()> {
        if let Some(engine) = self.engine {
            config.engine = BrowserEngine::parse(&engine).ok_or_else(|| {
                AppError::Config(ConfigError::InvalidValue {
                    field: "engine".to_string(),
                    value: engine,
                })
            })?;
        }
        if let Some(v) = self.headless {
            config.headless = v;
        }
        if let Some(v) = self.viewport_width {
            config.viewport_width = v;
        }
        if let Some(v) = self.viewport_height {
            config.viewport_height = v;
        }
        if let Some(v) = self.wait_timeout_ms {
            config.wait_timeout_ms = v;
        }
        if let Some(v) = self.interaction_delay_ms {
            config.interaction_delay_ms = v;
        }
        if let Some(v) = self.login_url {
            config.login_url = v;
        }
        if let Some(v) = self.attendance_url {
            config.attendance_url = v;
        }
        if let Some(v) = self.login_success_url {
            config.login_success_url = v;
        }
        if let Some(v) = self.login_failure_url {
            config.login_failure_url = v;
        }
        if let Some(v) = self.max_login_attempts {
            config.max_login_attempts = v;
        }
        if let Some(v) = self.llm_api_base_url {
            config.llm_api_base_url = v;
        }
        if let Some(v) = self.llm_model_name {
            config.llm_model_name = v;
        }
        if let Some(v) = self.captcha_prompts {
            if !v.is_empty() {
                config.captcha_prompts = v;
            }
        }
        if let Some(v) = self.student_code {
            config.default_student_code = v;
        }
        if let Some(v) = self.dob_password {
            config.default_dob_password = v;
        }
        if let Some(v) = self.llm_api_key {
            config.default_api_key = v;
        }
        if let Some(v) = self.good_threshold {
            config.good_threshold = v;
        }
        if let Some(v) = self.warning_threshold {
            config.warning_threshold = v;
        }
        if let Some(v) = self.selectors {
            config.selectors = v;
        }
        Ok(())
    }
}
