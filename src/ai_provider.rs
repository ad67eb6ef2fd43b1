use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AiProvider {
    #[default]
    Gemini,
    Claude,
}

impl AiProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "Gemini API",
            AiProvider::Claude => "Claude CLI",
        }
    }

    /// APIキーが必要か
    pub fn needs_api_key(&self) -> bool {
        matches!(self, AiProvider::Gemini)
    }
}
