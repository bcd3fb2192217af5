//! Process configuration. Every option can also come from the environment.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pagesmith-server",
    about = "Build static web apps from task briefs and publish them to GitHub Pages"
)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "PAGESMITH_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// Shared secret every task request must carry
    #[arg(long, env = "SECRET_KEY", default_value = "", hide_env_values = true)]
    pub secret: String,

    /// GitHub token used to create repositories and push files
    #[arg(long, env = "GITHUB_TOKEN", default_value = "", hide_env_values = true)]
    pub github_token: String,

    /// Account that owns the created repositories
    #[arg(long, env = "GITHUB_OWNER", default_value = "")]
    pub github_owner: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = pagesmith_core::github::DEFAULT_API_URL)]
    pub github_api_url: String,

    #[arg(long, env = "GITHUB_WEB_URL", default_value = pagesmith_core::github::DEFAULT_WEB_URL)]
    pub github_web_url: String,

    /// Branch files are pushed to and Pages serves from
    #[arg(long, env = "GITHUB_BRANCH", default_value = "main")]
    pub github_branch: String,

    /// API key for the chat-completions endpoint
    #[arg(long, env = "AIAPI_KEY", default_value = "", hide_env_values = true)]
    pub llm_api_key: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "LLM_API_URL", default_value = pagesmith_core::llm::DEFAULT_API_URL)]
    pub llm_api_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = pagesmith_core::llm::DEFAULT_MODEL)]
    pub llm_model: String,

    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 1000)]
    pub llm_max_tokens: u32,

    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.7)]
    pub llm_temperature: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            secret: String::new(),
            github_token: String::new(),
            github_owner: String::new(),
            github_api_url: pagesmith_core::github::DEFAULT_API_URL.to_string(),
            github_web_url: pagesmith_core::github::DEFAULT_WEB_URL.to_string(),
            github_branch: "main".to_string(),
            llm_api_key: String::new(),
            llm_api_url: pagesmith_core::llm::DEFAULT_API_URL.to_string(),
            llm_model: pagesmith_core::llm::DEFAULT_MODEL.to_string(),
            llm_max_tokens: 1000,
            llm_temperature: 0.7,
        }
    }
}
