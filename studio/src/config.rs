use crate::{Error, Result};
use clap::{ArgAction, Parser, ValueEnum};

pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct";
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Research a topic and turn it into a blog post with a two-agent crew.
#[derive(Debug, Parser)]
#[command(name = "studio", version)]
pub struct Cli {
    /// Address the web UI listens on
    #[arg(long, env = "STUDIO_ADDR", default_value = "127.0.0.1:8501")]
    pub addr: String,

    /// Model identifier on the OpenAI-compatible endpoint
    #[arg(long, env = "STUDIO_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "OPENROUTER_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "SERPER_API_KEY", hide_env_values = true)]
    pub serper_api_key: Option<String>,

    /// Web results returned per search query
    #[arg(long, env = "STUDIO_SEARCH_RESULTS", default_value_t = 10)]
    pub search_results: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Everything the content pipeline needs, resolved before any network call.
#[derive(Clone)]
pub struct Config {
    pub addr: String,
    pub model: String,
    pub api_base: String,
    pub openrouter_api_key: String,
    pub serper_api_key: String,
    pub search_results: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("openrouter_api_key", &"<redacted>")
            .field("serper_api_key", &"<redacted>")
            .field("search_results", &self.search_results)
            .finish()
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Error::MissingKey(name)),
    }
}

impl TryFrom<&Cli> for Config {
    type Error = Error;

    fn try_from(cli: &Cli) -> Result<Self> {
        if cli.search_results == 0 {
            return Err(Error::InvalidConfig(
                "search results must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            addr: cli.addr.clone(),
            model: cli.model.clone(),
            api_base: cli.api_base.trim_end_matches('/').to_string(),
            openrouter_api_key: required(&cli.openrouter_api_key, "OPENROUTER_API_KEY")?,
            serper_api_key: required(&cli.serper_api_key, "SERPER_API_KEY")?,
            search_results: cli.search_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Config, DEFAULT_API_BASE, DEFAULT_MODEL, LogFormat};
    use crate::Error;
    use clap::Parser;

    fn cli() -> Cli {
        Cli {
            addr: "127.0.0.1:8501".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: format!("{}/", DEFAULT_API_BASE),
            openrouter_api_key: Some("or-key".to_string()),
            serper_api_key: Some("serper-key".to_string()),
            search_results: 10,
            log_format: LogFormat::Text,
            verbose: 0,
        }
    }

    #[test]
    fn test_config_from_cli() -> crate::Result<()> {
        let config = Config::try_from(&cli())?;

        assert_eq!(config.model, "mistralai/mistral-7b-instruct");
        assert_eq!(config.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(config.openrouter_api_key, "or-key");
        assert_eq!(config.serper_api_key, "serper-key");
        assert_eq!(config.search_results, 10);

        let debug = format!("{:?}", config);
        assert!(!debug.contains("or-key"));
        assert!(!debug.contains("serper-key"));

        Ok(())
    }

    #[test]
    fn test_missing_keys() {
        let mut missing_openrouter = cli();
        missing_openrouter.openrouter_api_key = None;
        assert!(matches!(
            Config::try_from(&missing_openrouter),
            Err(Error::MissingKey("OPENROUTER_API_KEY"))
        ));

        let mut blank_serper = cli();
        blank_serper.serper_api_key = Some("   ".to_string());
        assert!(matches!(
            Config::try_from(&blank_serper),
            Err(Error::MissingKey("SERPER_API_KEY"))
        ));
    }

    #[test]
    fn test_zero_search_results() {
        let mut cli = cli();
        cli.search_results = 0;
        assert!(matches!(
            Config::try_from(&cli),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cli_flags() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "studio",
            "--addr",
            "0.0.0.0:9000",
            "--openrouter-api-key",
            "flag-key",
            "--log-format",
            "json",
            "-vv",
        ])?;

        assert_eq!(cli.addr, "0.0.0.0:9000");
        assert_eq!(cli.openrouter_api_key.as_deref(), Some("flag-key"));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.verbose, 2);

        Ok(())
    }
}
