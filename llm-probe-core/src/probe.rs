use std::io::{self, Write};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    ProbeConfig, ProbeResult,
    client::{CompletionClient, client_from_config},
    model::MessageRequest,
    report,
};

/// Build the HTTP client from `config`, send one request and report on it.
///
/// Request failures never escape: they are rendered as advice and reflected
/// in [`ProbeResult::success`]. Only errors writing to `out` are returned.
pub async fn run_probe(config: &ProbeConfig, out: &mut impl Write) -> io::Result<ProbeResult> {
    let started_at = Utc::now();
    report::header(out, config, started_at)?;
    report::step(out, 1, "创建API客户端")?;

    match client_from_config(config) {
        Ok(client) => {
            writeln!(out, "✓ 客户端创建成功")?;
            send_and_report(client.as_ref(), config, started_at, out).await
        }
        Err(err) => {
            warn!(error = %err, "failed to construct client");
            report::failure(out, &err, config)?;
            Ok(ProbeResult {
                success: false,
                started_at,
                elapsed: Duration::ZERO,
                response_text: String::new(),
                error_kind: Some(err.kind()),
            })
        }
    }
}

/// Same as [`run_probe`] but with a caller-provided client.
pub async fn run_probe_with(
    client: &dyn CompletionClient,
    config: &ProbeConfig,
    out: &mut impl Write,
) -> io::Result<ProbeResult> {
    let started_at = Utc::now();
    report::header(out, config, started_at)?;
    report::step(out, 1, "创建API客户端")?;
    writeln!(out, "✓ 客户端创建成功")?;
    send_and_report(client, config, started_at, out).await
}

async fn send_and_report(
    client: &dyn CompletionClient,
    config: &ProbeConfig,
    started_at: chrono::DateTime<Utc>,
    out: &mut impl Write,
) -> io::Result<ProbeResult> {
    report::step(out, 2, "发送测试请求")?;
    let request = MessageRequest::user(&config.model, config.max_tokens, &config.prompt);

    let start = Instant::now();
    let outcome = client.create_message(&request).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(message) => {
            writeln!(out, "✓ 请求成功 (耗时: {:.2}秒)", elapsed.as_secs_f64())?;
            info!(?elapsed, "probe succeeded");

            report::step(out, 3, "解析响应")?;
            let text = message.first_text().unwrap_or_default().to_string();
            report::success(out, elapsed, &text, message.usage)?;

            Ok(ProbeResult {
                success: true,
                started_at,
                elapsed,
                response_text: text,
                error_kind: None,
            })
        }
        Err(err) => {
            warn!(error = %err, kind = ?err.kind(), "probe failed");
            report::failure(out, &err, config)?;

            Ok(ProbeResult {
                success: false,
                started_at,
                elapsed,
                response_text: String::new(),
                error_kind: Some(err.kind()),
            })
        }
    }
}
