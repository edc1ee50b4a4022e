//! Output formatting for CLI

use cinestream_core::{ContentRecord, PlaybackState, Quality, Recovery, Rendition};
use console::style;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Serialize as pretty JSON
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    content_type: String,
    #[tabled(rename = "Genre")]
    genre: String,
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Premium")]
    premium: &'static str,
}

impl From<&ContentRecord> for RecordRow {
    fn from(r: &ContentRecord) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            content_type: r.content_type.to_string(),
            genre: r.genre.clone(),
            language: r.language.clone(),
            duration: r.duration.clone(),
            premium: if r.is_premium { "yes" } else { "" },
        }
    }
}

/// Print catalog records in the selected format
pub fn print_records(records: &[ContentRecord], format: &str) {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&records)),
        OutputFormat::Table => {
            let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        OutputFormat::Text => {
            for r in records {
                let badge = if r.is_premium {
                    format!(" {}", style("PREMIUM").yellow().bold())
                } else {
                    String::new()
                };
                println!("  {:>3}. {}{}", r.id, style(&r.title).bold(), badge);
                println!("       {}", style(r.metadata_line()).dim());
            }
        }
    }
}

/// Print one record in full
pub fn print_details(r: &ContentRecord) {
    println!("{}", style(&r.title).bold().underlined());
    if r.is_live() {
        println!("{}", style("● LIVE").red().bold());
    }
    println!("{}", r.description);
    println!();
    println!("  Type:      {}", r.content_type);
    println!("  Genre:     {}", r.genre);
    println!("  Language:  {}", r.language);
    println!("  Rating:    {}", r.rating);
    println!("  Duration:  {}", r.duration);
    println!("  Released:  {}", r.release_date);
    println!("  Premium:   {}", if r.is_premium { "yes" } else { "no" });
    println!("  Stream:    {}", r.url);
}

#[derive(Tabled, Serialize)]
struct QualityRow {
    #[tabled(rename = "Quality")]
    label: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Bitrate")]
    bitrate: String,
    #[tabled(rename = "Selectable")]
    selectable: bool,
}

/// Print a stream's renditions and the resulting ladder
pub fn print_qualities(url: &str, renditions: &[Rendition], ladder: &[Quality], format: &str) {
    let rows: Vec<QualityRow> = renditions
        .iter()
        .map(|r| {
            let quality = r.quality();
            QualityRow {
                label: quality.to_string(),
                name: quality.display_name(),
                resolution: match (r.width, r.height) {
                    (_, 0) => "unknown".to_string(),
                    (Some(w), h) => format!("{}x{}", w, h),
                    (None, h) => format!("?x{}", h),
                },
                bitrate: format_bitrate(r.bitrate),
                selectable: ladder.contains(&quality),
            }
        })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "url": url,
                "qualities": ladder,
                "renditions": rows,
            });
            println!("{}", to_json(&report));
        }
        OutputFormat::Table => {
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        OutputFormat::Text => {
            println!("Stream: {}", url);
            let names: Vec<String> = ladder.iter().map(Quality::display_name).collect();
            println!("Qualities: {}", names.join(" · "));
            println!("\nRenditions:");
            for (i, row) in rows.iter().enumerate() {
                let marker = if row.selectable { style("✓").green() } else { style("✗").dim() };
                println!(
                    "  {} {}. {} ({}) - {}",
                    marker,
                    i + 1,
                    row.label,
                    row.resolution,
                    row.bitrate
                );
            }
        }
    }
}

/// Print the final state of a playback session
pub fn print_session(url: &str, state: &PlaybackState, format: &str) {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let report = serde_json::json!({ "url": url, "state": state });
            println!("{}", to_json(&report));
        }
        OutputFormat::Table | OutputFormat::Text => {
            println!("Session: {}", url);
            println!(
                "  Position:  {} / {}",
                format_time(state.position),
                state.duration.map(format_time).unwrap_or_else(|| "live".into())
            );
            println!("  Quality:   {}", state.active_quality.display_name());
            println!("  Muted:     {}", state.muted);
            let names: Vec<String> = state.available_qualities.iter().map(Quality::to_string).collect();
            println!("  Offered:   {}", names.join(", "));
        }
    }
}

/// Print an error with the recovery hint the UI would offer
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", style("error:").red().bold(), err);

    let hint = err
        .downcast_ref::<cinestream_core::Error>()
        .map(|e| e.recovery())
        .and_then(|recovery| match recovery {
            Recovery::GoHome => Some("Run `cinestream-cli home` to browse available titles"),
            Recovery::Retry => Some("Check your connection and try again"),
            Recovery::DegradedNotice => Some("This stream cannot be played on this device"),
            Recovery::Silent => None,
        });

    if let Some(hint) = hint {
        eprintln!("{} {}", style("hint:").cyan(), hint);
    }
}

/// `m:ss` or `h:mm:ss`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn format_bitrate(bps: u64) -> String {
    match bps {
        0 => "unknown".to_string(),
        b if b >= 1_000_000 => format!("{:.1} Mbps", b as f64 / 1_000_000.0),
        b => format!("{} kbps", b / 1_000),
    }
}
