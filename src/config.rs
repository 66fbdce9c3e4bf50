//! コマンドライン設定とログ初期化。
//!
//! ログは `tracing` で stderr に出す。既定では何も出さず、
//! `--log` または `SMALLSH_LOG`（例: `smallsh=debug`）で有効にする。

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::mode::MAX_PROMPT_LENGTH;

/// 既定のプロンプト。
pub const DEFAULT_PROMPT: &str = ": ";

#[derive(Parser, Debug)]
#[command(name = "smallsh")]
#[command(version, about = "A small interactive shell with foreground/background process control")]
pub struct Cli {
    /// Prompt printed before each command line (at most 128 bytes)
    #[arg(long, default_value = DEFAULT_PROMPT, value_parser = parse_prompt)]
    pub prompt: String,

    /// Do not print the startup banner
    #[arg(short, long)]
    pub quiet: bool,

    /// Log filter directive, e.g. `smallsh=debug`
    #[arg(long, env = "SMALLSH_LOG")]
    pub log: Option<String>,
}

/// 起動後は変更されない設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub banner: bool,
    pub log_filter: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            prompt: cli.prompt,
            banner: !cli.quiet,
            log_filter: cli.log.unwrap_or_else(|| "off".to_string()),
        }
    }
}

fn parse_prompt(s: &str) -> Result<String, String> {
    if s.len() > MAX_PROMPT_LENGTH {
        return Err(format!("prompt is {} bytes, max {MAX_PROMPT_LENGTH}", s.len()));
    }
    Ok(s.to_string())
}

/// stderr 向けの `tracing` サブスクライバを登録する。
pub fn init_logging(filter: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter `{filter}`"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialise logging")
}
