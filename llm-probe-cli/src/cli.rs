use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use llm_probe_core::{FileConfig, Overrides, ProbeConfig, ProbeResult, config, report, run_probe};
use tracing::debug;

/// Top-level CLI struct.
///
/// Invoked without a subcommand it runs the probe once.
#[derive(Debug, Parser)]
#[command(name = "llm-probe", version, about = "Connectivity probe for Claude API proxies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Proxy base URL, e.g. "https://example.test/claude" (overrides ANTHROPIC_BASE_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides LLM_PROBE_TIMEOUT).
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Model identifier to request (overrides LLM_PROBE_MODEL).
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one test request and print a diagnostic report (default).
    Check,

    /// Store base URL, API key and timeout in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let overrides = Overrides {
            base_url: self.base_url,
            timeout_secs: self.timeout,
            model: self.model,
        };

        match self.command.unwrap_or(Command::Check) {
            Command::Check => check(overrides).await,
            Command::Configure => {
                configure()?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

async fn check(overrides: Overrides) -> anyhow::Result<ExitCode> {
    let config = ProbeConfig::load(overrides)?;
    debug!(base_url = %config.base_url, timeout = ?config.timeout, "resolved configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = run_probe(&config, &mut out).await.context("Failed to write report")?;
    let status = finish(&result, &config, &mut out)?;

    Ok(ExitCode::from(status))
}

/// Append the alternatives block after a failed run and pick the exit status.
fn finish(result: &ProbeResult, config: &ProbeConfig, out: &mut impl Write) -> anyhow::Result<u8> {
    if !result.success {
        report::alternatives(out, &config.base_url).context("Failed to write report")?;
    }
    out.flush().context("Failed to flush report")?;

    Ok(result.exit_status())
}

fn configure() -> anyhow::Result<()> {
    let mut file = FileConfig::load()?;

    let current_url = file.base_url.clone().unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string());
    let base_url = Text::new("代理 Base URL:").with_default(&current_url).prompt()?;

    let api_key = Password::new("API 密钥:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("留空则保留当前密钥")
        .prompt()?;

    let timeout_secs = CustomType::<f64>::new("超时时间 (秒):")
        .with_default(file.timeout_secs.unwrap_or(config::DEFAULT_TIMEOUT_SECS))
        .with_error_message("请输入数字，例如 60")
        .prompt()?;

    file.base_url = Some(base_url.trim().to_string());
    file.timeout_secs = Some(timeout_secs);
    if !api_key.trim().is_empty() {
        file.api_key = Some(api_key.trim().to_string());
    }

    // Reject values the probe would refuse before they hit the disk.
    ProbeConfig::resolve(file.clone(), |_| None, Overrides::default())?;

    let path = file.save()?;
    println!("配置已保存: {}", path.display());

    Ok(())
}
