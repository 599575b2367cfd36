//! Synthesis Request - 合成请求值对象

/// 数值控制项的请求级覆盖，未设置的项取页面默认值
#[derive(Debug, Clone, Default)]
pub struct ControlOverrides {
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub temperature: Option<f32>,
    pub speed: Option<f32>,
    pub seed: Option<i64>,
}

/// 一次语音合成请求
///
/// 值对象，跨调用无身份。文本非空由边界层保证。
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub page: String,
    /// 部署固定语言标签
    pub text_lang: String,
    pub overrides: ControlOverrides,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: page.into(),
            text_lang: "zh".to_string(),
            overrides: ControlOverrides::default(),
        }
    }
}
