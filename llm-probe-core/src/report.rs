//! Console report for a probe run.
//!
//! Everything here writes to a caller-supplied [`Write`] so the probe can be
//! rendered to stdout or captured in tests.

use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};

use crate::{
    ApiError, ProbeConfig,
    error::{ApiFault, ErrorKind},
    model::Usage,
};

const WIDTH: usize = 60;

fn rule(out: &mut impl Write, ch: char) -> io::Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(WIDTH))
}

fn advice(out: &mut impl Write, lines: &[&str]) -> io::Result<()> {
    writeln!(out, "\n建议:")?;
    for line in lines {
        writeln!(out, "  - {line}")?;
    }
    Ok(())
}

pub fn header(out: &mut impl Write, config: &ProbeConfig, started_at: DateTime<Utc>) -> io::Result<()> {
    rule(out, '=')?;
    writeln!(out, "Claude API 连接测试")?;
    rule(out, '=')?;
    writeln!(out, "API端点: {}", config.base_url)?;
    writeln!(out, "超时设置: {:.1}秒", config.timeout.as_secs_f64())?;
    writeln!(out, "API密钥: {}", config.masked_api_key())?;
    writeln!(out, "模型: {}", config.model)?;
    writeln!(
        out,
        "开始时间: {}",
        started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )?;
    rule(out, '-')
}

pub fn step(out: &mut impl Write, n: u8, label: &str) -> io::Result<()> {
    writeln!(out, "\n[{n}/3] {label}...")
}

pub fn success(
    out: &mut impl Write,
    elapsed: Duration,
    text: &str,
    usage: Option<Usage>,
) -> io::Result<()> {
    writeln!(out, "✓ 响应内容: {text}")?;
    if let Some(usage) = usage {
        writeln!(out, "✓ Token 用量: 输入 {} / 输出 {}", usage.input_tokens, usage.output_tokens)?;
    }

    writeln!(out)?;
    rule(out, '=')?;
    writeln!(out, "✅ API连接测试通过！")?;
    rule(out, '=')?;
    let latency = format!("平均响应时间: {:.2}秒", elapsed.as_secs_f64());
    advice(out, &["API服务正常，可以继续使用", latency.as_str()])
}

/// Category-specific diagnosis and advice for a failed request.
pub fn failure(out: &mut impl Write, err: &ApiError, config: &ProbeConfig) -> io::Result<()> {
    let kind = err.kind();
    let title = match kind {
        ErrorKind::RateLimited => "速率限制错误",
        ErrorKind::TimedOut => "请求超时",
        ErrorKind::ConnectionFailed => "连接错误",
        ErrorKind::Api(_) => "API错误",
        ErrorKind::Unknown => "未知错误",
    };
    writeln!(out, "\n❌ {title}:")?;
    writeln!(out, "   {err}")?;

    match kind {
        ErrorKind::RateLimited => advice(out, &["等待一段时间后重试", "检查API配额是否用完"]),
        ErrorKind::TimedOut => {
            advice(out, &["增加超时时间设置", "检查网络连接", "检查代理服务器状态"])
        }
        ErrorKind::ConnectionFailed => {
            let visit = format!("尝试访问: {}", config.base_url);
            advice(out, &["检查网络连接", "检查代理服务器地址是否正确", visit.as_str(), "检查防火墙设置"])
        }
        ErrorKind::Api(fault) => api_fault(out, fault),
        ErrorKind::Unknown => {
            writeln!(out, "   类型: {}", err.type_name())?;
            advice(out, &["检查所有配置", "查看完整错误堆栈"])
        }
    }
}

fn api_fault(out: &mut impl Write, fault: ApiFault) -> io::Result<()> {
    match fault {
        ApiFault::ServerError => {
            writeln!(out, "\n这是服务器内部错误 (500)，可能的原因:")?;
            writeln!(out, "  1. 代理服务器出现故障")?;
            writeln!(out, "  2. API密钥无效或格式错误")?;
            writeln!(out, "  3. 代理服务器配置问题")?;
            advice(
                out,
                &["检查API密钥是否有效", "联系代理服务提供商", "考虑使用官方Anthropic API端点"],
            )
        }
        ApiFault::Unauthorized => {
            writeln!(out, "\n这是认证错误 (401):")?;
            writeln!(out, "  - API密钥无效或已过期")?;
            advice(out, &["检查API密钥是否正确", "重新获取API密钥"])
        }
        ApiFault::Forbidden => {
            writeln!(out, "\n这是权限错误 (403):")?;
            writeln!(out, "  - 没有访问权限")?;
            advice(out, &["检查API密钥权限", "联系服务提供商"])
        }
        ApiFault::Other => advice(out, &["查看详细错误信息", "联系技术支持"]),
    }
}

/// Fixed remediation block printed after any failure.
pub fn alternatives(out: &mut impl Write, base_url: &str) -> io::Result<()> {
    writeln!(out)?;
    rule(out, '=')?;
    writeln!(out, "替代方案:")?;
    rule(out, '=')?;
    writeln!(out, "\n1. 使用官方Anthropic API:")?;
    writeln!(out, "   - 注册账号: https://console.anthropic.com/")?;
    writeln!(out, "   - 获取API密钥 (格式: sk-ant-...)")?;
    writeln!(out, "   - 将 ANTHROPIC_BASE_URL 设置为 https://api.anthropic.com")?;
    writeln!(out, "\n2. 检查代理服务器:")?;
    writeln!(out, "   - 确认 {base_url} 是否可访问")?;
    writeln!(out, "   - 联系代理服务提供商")?;
    writeln!(out, "\n3. 临时跳过API验证:")?;
    writeln!(out, "   - 在产品分类模块中设置 SAMPLE_MODE = true")?;
    writeln!(out, "   - 先处理其他数据分析任务")
}
