use chrono::{DateTime, Utc};
use deck_core::catalog::Template;
use deck_core::script::{LogEntry, Script};
use deck_core::stats::Stats;

pub fn date(t: Option<DateTime<Utc>>) -> String {
    match t {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => "Never".to_string(),
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{head}...")
}

pub fn script_row(s: &Script) -> String {
    format!(
        "{:<32}  {:<9}  {:<18}  {:<16}  {}",
        s.id,
        s.status,
        s.kind.display_name(),
        date(s.last_run),
        truncate(&s.name, 40),
    )
}

pub fn script_table(scripts: &[Script]) -> String {
    let mut out = format!(
        "{:<32}  {:<9}  {:<18}  {:<16}  {}\n",
        "ID", "STATUS", "TYPE", "LAST RUN", "NAME"
    );
    for s in scripts {
        out.push_str(&script_row(s));
        out.push('\n');
    }
    out
}

pub fn script_detail(s: &Script, logs: &[LogEntry]) -> String {
    let schedule = s
        .schedule
        .as_ref()
        .map(|sc| sc.describe())
        .unwrap_or_else(|| "none".to_string());
    let mut out = format!(
        "id:          {}\nname:        {}\ntype:        {} ({})\nstatus:      {}\ncreated:     {}\nlast run:    {}\nschedule:    {}\ndescription: {}\nlogs:        {}\n",
        s.id,
        s.name,
        s.kind.display_name(),
        s.kind,
        s.status,
        date(Some(s.created_at)),
        date(s.last_run),
        schedule,
        s.description,
        logs.len(),
    );
    out.push_str("---\n");
    out.push_str(&s.code);
    if !s.code.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn log_line(e: &LogEntry) -> String {
    format!("{}  {:<7}  {}", e.timestamp.format("%Y-%m-%d %H:%M:%S"), e.kind.as_str(), e.message)
}

pub fn template_row(t: &Template) -> String {
    format!(
        "{:<10}  {:<14}  {:<18}  [{}]  {}",
        t.id,
        t.name,
        t.kind.display_name(),
        t.tags.join(", "),
        t.description
    )
}

pub fn stats(stats: &Stats, recent: &[&Script]) -> String {
    let mut out = format!(
        "total:       {}\nrunning:     {}\nscheduled:   {}\nlast 7 days: {}\n",
        stats.total, stats.running, stats.scheduled, stats.run_last_7_days
    );
    if !recent.is_empty() {
        out.push_str("recent runs:\n");
        for s in recent {
            out.push_str(&format!("  {}  {:<9}  {}\n", date(s.last_run), s.status, s.name));
        }
    }
    out
}
