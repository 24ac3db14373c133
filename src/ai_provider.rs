use clap::ValueEnum;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AiProvider {
    /// Gemini 画像生成API
    Gemini,
    /// 元画像をそのまま返す（オフライン確認用）
    Echo,
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::Echo => "echo",
        }
    }
}
