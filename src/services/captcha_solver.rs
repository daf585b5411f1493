//! 验证码识别 - 业务能力层
//!
//! 只负责"给图出字"：拿到验证码图片字节，通过 OpenAI 兼容接口的
//! Vision 能力识别出文本，清洗后返回
//!
//! 单次识别内部会按配置的指令列表轮换提示词，直到得到合法答案；
//! 全部轮换失败算一次验证码识别失败，由登录层的重试预算兜底

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use base64::Engine as _;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, CaptchaError};
use crate::models::Credentials;
use crate::utils::logging::truncate_text;

/// 验证码答案的合法长度范围
const MIN_ANSWER_LEN: usize = 4;
const MAX_ANSWER_LEN: usize = 8;

/// 验证码识别服务
pub struct CaptchaSolver {
    client: Client<OpenAIConfig>,
    model_name: String,
    prompts: Vec<String>,
}

impl CaptchaSolver {
    /// 创建新的验证码识别服务
    pub fn new(config: &Config, credentials: &Credentials) -> Self {
        // 配置 OpenAI 兼容客户端（Gemini 的 openai 兼容端点同样适用）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&credentials.api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            prompts: config.captcha_prompts.clone(),
        }
    }

    /// 识别验证码图片
    ///
    /// 依次尝试每条指令，返回第一个通过校验的答案
    pub async fn solve(&self, image_bytes: &[u8]) -> AppResult<String> {
        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image_bytes)
        );

        for (i, instruction) in self.prompts.iter().enumerate() {
            debug!("🎯 验证码识别尝试 {}/{}", i + 1, self.prompts.len());

            match self.send_vision_request(instruction, &data_url).await {
                Ok(raw) => {
                    debug!("🤖 LLM 原始响应: '{}'", truncate_text(&raw, 80));
                    if let Some(answer) = clean_captcha_response(&raw) {
                        info!("✅ 验证码识别成功: '{}'", answer);
                        return Ok(answer);
                    }
                    warn!("⚠️ 响应清洗后不合法，换下一条指令重试");
                }
                Err(e) => {
                    warn!("⚠️ 验证码识别调用失败: {}", e);
                }
            }
        }

        Err(AppError::Captcha(CaptchaError::SolveFailed {
            attempts: self.prompts.len(),
        }))
    }

    /// 发送单次 Vision 请求，返回去除首尾空白的响应文本
    async fn send_vision_request(&self, instruction: &str, data_url: &str) -> AppResult<String> {
        // 构建包含文本和图片的内容
        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: instruction.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: data_url.to_string(),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(|e| AppError::captcha_api_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.0)
            .max_tokens(32u32)
            .build()
            .map_err(|e| AppError::captcha_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::captcha_api_failed(&self.model_name, e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Captcha(CaptchaError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}

/// 清洗 LLM 返回的验证码文本
///
/// 处理顺序：去空白转大写 → 去掉模型爱加的前缀 → 提取典型长度的
/// 字母数字串 → 去引号标点 → 长度校验；清洗后不合法返回 None
pub fn clean_captcha_response(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let mut cleaned = text.trim().to_uppercase();

    const UNWANTED_PREFIXES: [&str; 12] = [
        "THE TEXT IS:",
        "THE ANSWER IS:",
        "THE CAPTCHA IS:",
        "THE CODE IS:",
        "THE IMAGE SHOWS:",
        "IMAGE CONTAINS:",
        "I SEE:",
        "CAPTCHA:",
        "ANSWER:",
        "RESULT:",
        "TEXT:",
        "CODE:",
    ];
    for prefix in UNWANTED_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim().to_string();
            break;
        }
    }

    // 响应可能夹带解释文字，提取典型长度的字母数字串；
    // 验证码几乎都含数字，带数字的串优先于纯字母单词
    if let Ok(re) = Regex::new(r"[A-Z0-9]{3,8}") {
        let mut candidate: Option<String> = None;
        for found in re.find_iter(&cleaned) {
            let run = found.as_str();
            if candidate.is_none() {
                candidate = Some(run.to_string());
            }
            if run.chars().any(|c| c.is_ascii_digit()) {
                candidate = Some(run.to_string());
                break;
            }
        }
        if let Some(found) = candidate {
            cleaned = found;
        }
    }

    let cleaned = cleaned.trim_matches(|c: char| "'\".,!?-_()[]{}:;".contains(c));
    let cleaned: String = cleaned.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    if cleaned.len() > MAX_ANSWER_LEN {
        // 过长说明混入了别的内容，截取头部最可能是验证码的部分
        return Some(cleaned.chars().take(6).collect());
    }
    if cleaned.len() >= MIN_ANSWER_LEN {
        return Some(cleaned);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_answer() {
        assert_eq!(clean_captcha_response("AB3X9"), Some("AB3X9".to_string()));
        assert_eq!(clean_captcha_response("  ab3x9  \n"), Some("AB3X9".to_string()));
    }

    #[test]
    fn test_clean_strips_known_prefixes() {
        assert_eq!(
            clean_captcha_response("The text is: AB3X9"),
            Some("AB3X9".to_string())
        );
        assert_eq!(
            clean_captcha_response("CAPTCHA: 7K2MQ"),
            Some("7K2MQ".to_string())
        );
        assert_eq!(
            clean_captcha_response("The answer is: \"W8PL4\""),
            Some("W8PL4".to_string())
        );
    }

    #[test]
    fn test_clean_extracts_code_from_explanation() {
        assert_eq!(
            clean_captcha_response("The image shows the characters K7QX2 in distorted form."),
            Some("K7QX2".to_string())
        );
    }

    #[test]
    fn test_clean_strips_quotes_and_punctuation() {
        assert_eq!(clean_captcha_response("'AB3X9'"), Some("AB3X9".to_string()));
        assert_eq!(clean_captcha_response("\"AB3X9\"."), Some("AB3X9".to_string()));
    }

    #[test]
    fn test_clean_rejects_too_short() {
        assert_eq!(clean_captcha_response("AB"), None);
        assert_eq!(clean_captcha_response(""), None);
        assert_eq!(clean_captcha_response("   "), None);
        assert_eq!(clean_captcha_response("???"), None);
    }

    #[test]
    fn test_clean_long_runs_capped_at_typical_length() {
        // 连续超长串按典型长度截取
        assert_eq!(
            clean_captcha_response("ABCDEFGHIJKLMNOP"),
            Some("ABCDEFGH".to_string())
        );
    }

    #[test]
    fn test_clean_truncates_when_no_run_found() {
        // 没有可提取的连续串时，过长结果截取头部
        assert_eq!(
            clean_captcha_response("A B C D E F G H I J"),
            Some("ABCDEF".to_string())
        );
    }

    /// 测试真实的 Vision 识别（需要有效的 API Key）
    ///
    /// 运行方式：
    /// ```bash
    /// cargo test test_solve_real_captcha -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_solve_real_captcha() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::default();
        let credentials = Credentials {
            student_code: String::new(),
            dob_password: String::new(),
            api_key: std::env::var("LLM_API_KEY").expect("需要设置 LLM_API_KEY"),
        };
        let solver = CaptchaSolver::new(&config, &credentials);

        let image_bytes =
            std::fs::read("tests/fixtures/captcha_sample.png").expect("需要样例验证码图片");

        let answer = solver.solve(&image_bytes).await.expect("识别失败");
        println!("识别结果: {}", answer);
        assert!(answer.len() >= 4);
    }
}
