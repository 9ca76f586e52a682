use std::io::IsTerminal;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Instant;

use crate::types::{
    LiteStatsCounters, MiningOverview, NodeStatusCard, Requirements, TaskStats, WalletBalances,
};
use crate::watch::coordinator::{FetchKind, FetchPayload};
use crate::watch::status::FetchStatus;

const FRAME_INNER_WIDTH: usize = 72;
const KEY_WIDTH: usize = 16;

static COLOR_ENABLED: OnceLock<bool> = OnceLock::new();
static LOG_START: OnceLock<Instant> = OnceLock::new();
static OUTPUT_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

#[derive(Clone, Copy)]
enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERR",
        }
    }

    fn level_style(self) -> &'static str {
        match self {
            Self::Info => "48;5;31;1;97",
            Self::Success => "48;5;28;1;97",
            Self::Warn => "48;5;214;1;30",
            Self::Error => "48;5;160;1;97",
        }
    }

    fn body_style(self) -> &'static str {
        match self {
            Self::Info => "38;5;153",
            Self::Success => "38;5;120",
            Self::Warn => "38;5;223",
            Self::Error => "38;5;217",
        }
    }

    fn use_stderr(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}

pub(super) fn startup_banner(lines: &[(&str, String)]) {
    let colors = use_color();
    println!();
    frame_top(colors);
    frame_center("N E T W A T C H", "1;97", colors);
    frame_center("Netrum compute-node dashboard", "38;5;117", colors);
    frame_rule("runtime", colors);
    for (key, value) in lines {
        frame_kv(key, value, colors);
    }
    frame_bottom(colors);
    println!();
}

pub(super) fn info(tag: &str, message: impl AsRef<str>) {
    log(Level::Info, tag, message.as_ref());
}

pub(super) fn success(tag: &str, message: impl AsRef<str>) {
    log(Level::Success, tag, message.as_ref());
}

pub(super) fn warn(tag: &str, message: impl AsRef<str>) {
    log(Level::Warn, tag, message.as_ref());
}

pub(super) fn error(tag: &str, message: impl AsRef<str>) {
    log(Level::Error, tag, message.as_ref());
}

/// The log line for one committed lane result.
pub(super) fn card_line(kind: FetchKind, status: &FetchStatus<FetchPayload>) -> String {
    match status {
        FetchStatus::Ok(payload) => payload_line(payload),
        FetchStatus::Empty => format!("{} | no data for this node", kind.as_str()),
        FetchStatus::Cooldown { next_allowed_in_ms } => format!(
            "{} | cooldown, retry in {}s",
            kind.as_str(),
            next_allowed_in_ms.div_ceil(1000)
        ),
        FetchStatus::Error(message) => format!("{} | {message}", kind.as_str()),
    }
}

fn payload_line(payload: &FetchPayload) -> String {
    match payload {
        FetchPayload::Metrics(card) => status_card_line(card),
        FetchPayload::Mining(overview) => mining_line(overview),
        FetchPayload::Balances(balances) => balances_line(balances),
        FetchPayload::TaskStats(stats) => task_stats_line(stats),
    }
}

pub(super) fn status_card_line(card: &NodeStatusCard) -> String {
    format!(
        "metrics | type={} status={} sync={} requirements={} cpu={} ram={} disk={} down={} up={}",
        opt_str(card.node_type.as_deref()),
        opt_str(card.status.as_deref()),
        opt_str(card.sync_status.as_deref()),
        opt_bool(card.meets_requirements, "met", "unmet"),
        opt_u64(card.cpu_cores),
        opt_gb(card.ram_gb),
        opt_gb(card.disk_gb),
        opt_mbps(card.download_mbps),
        opt_mbps(card.upload_mbps),
    )
}

pub(super) fn mining_line(overview: &MiningOverview) -> String {
    format!(
        "mining | active={} started={} mined={} claimable={} last_claim={} duration={} remaining={} speed={} complete={}",
        opt_bool(overview.can_start_mining.map(|can| !can), "yes", "no"),
        opt_str(overview.last_mining_start.as_deref()),
        opt_f64(overview.mined_tokens, 4),
        opt_bool(overview.can_claim, "yes", "no"),
        opt_str(overview.last_claim_time.as_deref()),
        opt_str(overview.mining_duration.as_deref()),
        opt_str(overview.remaining_time.as_deref()),
        opt_f64(overview.speed_per_sec, 6),
        overview
            .percent_complete
            .map(|pct| format!("{pct:.1}%"))
            .unwrap_or_else(|| "-".to_string()),
    )
}

pub(super) fn balances_line(balances: &WalletBalances) -> String {
    format!(
        "balances | eth={:.6} npt={:.4} usd={:.2}",
        balances.eth, balances.npt, balances.usd
    )
}

pub(super) fn task_stats_line(stats: &TaskStats) -> String {
    format!(
        "tasks | count={} power={} ram={} last_polled={} last_completed={} last_assigned={}",
        opt_u64(stats.task_count),
        opt_str(stats.tts_power_status.as_deref()),
        opt_gb(stats.available_ram),
        opt_str(stats.last_polled_at.as_deref()),
        opt_str(stats.last_task_completed.as_deref()),
        opt_str(stats.last_task_assigned.as_deref()),
    )
}

pub(super) fn network_line(counters: &LiteStatsCounters) -> String {
    format!(
        "network | nodes={} active={} inactive={} tasks={}",
        counters.total_nodes, counters.active_nodes, counters.inactive_nodes, counters.total_tasks
    )
}

pub(super) fn requirements_line(requirements: &Requirements) -> String {
    format!(
        "requirements | cores={} ram={} storage={} down={} up={}",
        opt_u64(requirements.cores),
        opt_gb(requirements.ram_gb),
        opt_gb(requirements.storage_gb),
        opt_mbps(requirements.download_mbps),
        opt_mbps(requirements.upload_mbps),
    )
}

fn opt_str(value: Option<&str>) -> String {
    value.filter(|text| !text.is_empty()).unwrap_or("-").to_string()
}

fn opt_bool(value: Option<bool>, yes: &str, no: &str) -> String {
    match value {
        Some(true) => yes.to_string(),
        Some(false) => no.to_string(),
        None => "-".to_string(),
    }
}

fn opt_u64(value: Option<u64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

fn opt_f64(value: Option<f64>, precision: usize) -> String {
    value
        .map(|n| format!("{n:.precision$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn opt_gb(value: Option<f64>) -> String {
    value
        .map(|n| format!("{n:.1}GB"))
        .unwrap_or_else(|| "-".to_string())
}

fn opt_mbps(value: Option<f64>) -> String {
    value
        .map(|n| format!("{n:.1}Mbps"))
        .unwrap_or_else(|| "-".to_string())
}

fn log(level: Level, tag: &str, message: &str) {
    let elapsed_secs = log_elapsed().as_secs_f64();
    let colors = use_color();
    let time_plain = format!("{:>7.1}s", elapsed_secs);
    let level_plain = format!(" {:^4} ", level.label());
    let tag_plain = format!(" {:<8} ", tag);
    let prefix = format!(
        "{} {} {}",
        paint(&time_plain, "2;37", colors),
        paint(&level_plain, level.level_style(), colors),
        paint(&tag_plain, "48;5;236;1;250", colors),
    );
    let body = paint(message, level.body_style(), colors);

    let _out_guard = lock(output_lock());
    if level.use_stderr() {
        eprintln!("{prefix} {body}");
    } else {
        println!("{prefix} {body}");
    }
}

fn frame_top(colors: bool) {
    println!(
        "{}{}{}",
        paint("╭", "1;34", colors),
        paint(&"─".repeat(FRAME_INNER_WIDTH), "1;34", colors),
        paint("╮", "1;34", colors),
    );
}

fn frame_bottom(colors: bool) {
    println!(
        "{}{}{}",
        paint("╰", "1;34", colors),
        paint(&"─".repeat(FRAME_INNER_WIDTH), "1;34", colors),
        paint("╯", "1;34", colors),
    );
}

fn frame_rule(label: &str, colors: bool) {
    let label = format!(" {} ", label.to_ascii_uppercase());
    let side = FRAME_INNER_WIDTH.saturating_sub(label.chars().count()) / 2;
    let right = FRAME_INNER_WIDTH
        .saturating_sub(label.chars().count())
        .saturating_sub(side);
    frame_row(
        &format!("{}{}{}", "─".repeat(side), label, "─".repeat(right)),
        "38;5;75",
        colors,
    );
}

fn frame_center(text: &str, style: &str, colors: bool) {
    let clipped = clip(text, FRAME_INNER_WIDTH);
    frame_row(
        &format!("{:^width$}", clipped, width = FRAME_INNER_WIDTH),
        style,
        colors,
    );
}

fn frame_kv(key: &str, value: &str, colors: bool) {
    let key_text = format!("{:<width$}", format!("{key}:"), width = KEY_WIDTH);
    let max_value = FRAME_INNER_WIDTH.saturating_sub(2 + KEY_WIDTH + 1);
    let value_text = clip(value, max_value);
    let used = 2 + key_text.chars().count() + 1 + value_text.chars().count();
    let padding = " ".repeat(FRAME_INNER_WIDTH.saturating_sub(used));

    println!(
        "{}  {} {}{}{}",
        paint("│", "1;34", colors),
        paint(&key_text, "1;96", colors),
        paint(&value_text, "1;97", colors),
        padding,
        paint("│", "1;34", colors),
    );
}

fn frame_row(text: &str, style: &str, colors: bool) {
    let row = format!(
        "{:<width$}",
        clip(text, FRAME_INNER_WIDTH),
        width = FRAME_INNER_WIDTH
    );
    println!(
        "{}{}{}",
        paint("│", "1;34", colors),
        paint(&row, style, colors),
        paint("│", "1;34", colors),
    );
}

fn clip(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    text.chars().take(max_width).collect()
}

fn log_elapsed() -> std::time::Duration {
    LOG_START.get_or_init(Instant::now).elapsed()
}

fn use_color() -> bool {
    *COLOR_ENABLED.get_or_init(|| {
        if let Some(force) = std::env::var_os("CLICOLOR_FORCE") {
            if force.to_string_lossy() != "0" {
                return true;
            }
        }
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if let Some(choice) = std::env::var_os("CLICOLOR") {
            if choice.to_string_lossy() == "0" {
                return false;
            }
        }
        if std::env::var("TERM")
            .map(|term| term.eq_ignore_ascii_case("dumb"))
            .unwrap_or(false)
        {
            return false;
        }
        std::io::stdout().is_terminal() || std::io::stderr().is_terminal()
    })
}

fn paint(text: &str, style: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{style}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn output_lock() -> &'static Mutex<()> {
    OUTPUT_LOCK.get_or_init(|| Mutex::new(()))
}

fn lock<T>(mutex: &'static Mutex<T>) -> MutexGuard<'static, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_render_as_dashes() {
        let line = status_card_line(&NodeStatusCard::default());
        assert!(line.starts_with("metrics | type=- status=-"));
        assert!(line.contains("cpu=-"));
    }

    #[test]
    fn cooldown_status_renders_rounded_up_seconds() {
        let status: FetchStatus<FetchPayload> = FetchStatus::Cooldown {
            next_allowed_in_ms: 24_300,
        };
        assert_eq!(
            card_line(FetchKind::Mining, &status),
            "mining | cooldown, retry in 25s"
        );
    }

    #[test]
    fn balances_line_uses_fixed_precision() {
        let line = balances_line(&WalletBalances {
            eth: 1.5,
            npt: 12.25,
            usd: 3000.0,
        });
        assert_eq!(line, "balances | eth=1.500000 npt=12.2500 usd=3000.00");
    }

    #[test]
    fn mining_active_is_inverse_of_can_start() {
        let overview = MiningOverview {
            can_start_mining: Some(false),
            ..Default::default()
        };
        assert!(mining_line(&overview).contains("active=yes"));
    }
}
