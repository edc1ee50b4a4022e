//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use cinestream_core::{
    group_by_type, AppConfig, ContentCatalog, ContentRecord, ContentType, Error, HeadlessSurface,
    HlsEngineFactory, MockCatalog, PlaybackController, PlaybackObserver, Quality,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use url::Url;

/// Simulated clock step of a playback session
const TICK: Duration = Duration::from_millis(250);

/// List catalog titles
pub async fn list(catalog: &MockCatalog, content_type: Option<&str>, format: &str) -> anyhow::Result<()> {
    let filter = content_type.map(parse_content_type).transpose()?;

    let records: Vec<ContentRecord> = catalog
        .fetch_all()
        .await?
        .into_iter()
        .filter(|r| filter.map_or(true, |t| r.content_type == t))
        .collect();

    output::print_records(&records, format);
    Ok(())
}

/// Show the home screen
pub async fn home(catalog: &MockCatalog, format: &str) -> anyhow::Result<()> {
    let featured = catalog.fetch_featured().await?;
    let sections = group_by_type(&catalog.fetch_all().await?);

    if OutputFormat::from(format) == OutputFormat::Json {
        let home = serde_json::json!({
            "featured": featured,
            "sections": sections,
        });
        println!("{}", serde_json::to_string_pretty(&home)?);
        return Ok(());
    }

    println!("{}", style("Featured").bold());
    for record in &featured {
        println!("  {} {}", style("▶").magenta(), record.title);
    }

    for section in &sections {
        println!("\n{}", style(section.title).bold());
        output::print_records(&section.records, format);
    }
    Ok(())
}

/// Show one title and what is related to it
pub async fn show(catalog: &MockCatalog, id: u64, format: &str) -> anyhow::Result<()> {
    let record = catalog.fetch_by_id(id).await?;
    let related = catalog.related(id).await?;

    if OutputFormat::from(format) == OutputFormat::Json {
        let details = serde_json::json!({
            "content": record,
            "related": related,
        });
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    output::print_details(&record);
    if !related.is_empty() {
        println!("\n{}", style("More Like This").bold());
        output::print_records(&related, format);
    }
    Ok(())
}

/// Search the catalog
pub async fn search(catalog: &MockCatalog, query: &str, format: &str) -> anyhow::Result<()> {
    let records = catalog.search(query).await?;
    if records.is_empty() && OutputFormat::from(format) != OutputFormat::Json {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    output::print_records(&records, format);
    Ok(())
}

/// Load a stream and print its quality ladder
pub async fn qualities(
    catalog: &MockCatalog,
    config: &AppConfig,
    target: &str,
    timeout: u64,
    format: &str,
) -> anyhow::Result<()> {
    let url = resolve_target(catalog, target).await?;
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();

    let mut player = PlaybackController::new(
        HeadlessSurface::new(),
        HlsEngineFactory::new(),
        config.player.clone(),
    )
    .with_observer(PlaybackObserver::new().on_error(move |e| sink.borrow_mut().push(e.to_string())));

    player.mount(&url)?;

    let deadline = Instant::now() + Duration::from_secs(timeout);
    while player.renditions().is_empty() {
        if let Some(err) = errors.borrow().first() {
            bail!("{}", err);
        }
        if Instant::now() >= deadline {
            bail!("Timed out waiting for the manifest of {}", url);
        }
        tokio::time::sleep(TICK).await;
        player.pump();
    }

    output::print_qualities(&url, player.renditions(), &player.state().available_qualities, format);
    Ok(())
}

/// Options of the `play` command
pub struct PlayOptions {
    pub quality: String,
    pub muted: bool,
    pub seconds: u64,
}

/// Run a simulated playback session
pub async fn play(
    catalog: &MockCatalog,
    config: &AppConfig,
    target: &str,
    options: PlayOptions,
    format: &str,
) -> anyhow::Result<()> {
    let url = resolve_target(catalog, target).await?;
    let quality: Quality = options
        .quality
        .parse()
        .with_context(|| format!("Unknown quality '{}'", options.quality))?;

    let bar = ProgressBar::new(options.seconds * 1000);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.magenta} [{bar:40.magenta/blue}] {msg}")?
            .progress_chars("█▓░"),
    );

    let log = bar.clone();
    let fatal = Rc::new(RefCell::new(None));
    let sink = fatal.clone();
    let observer = PlaybackObserver::new()
        .on_quality_levels(move |levels| {
            let names: Vec<String> = levels.iter().map(Quality::to_string).collect();
            log.println(format!("{} {}", style("qualities").cyan(), names.join(", ")));
        })
        .on_error(move |e| match playback_failure(e) {
            Some(failure) => *sink.borrow_mut() = Some(failure),
            None => tracing::warn!(error = %e, "Playback issue"),
        });

    let mut player = PlaybackController::new(
        HeadlessSurface::new(),
        HlsEngineFactory::new(),
        config.player.clone(),
    )
    .with_observer(observer);

    player.set_muted(options.muted);
    player.set_desired_quality(quality)?;
    player.set_playing(true)?;
    player.mount(&url)?;

    let mut ticker = tokio::time::interval(TICK);
    let session = Duration::from_secs(options.seconds);
    let started = Instant::now();

    while started.elapsed() < session {
        ticker.tick().await;
        player.surface_mut().advance(TICK.as_secs_f64());
        player.pump();

        if let Some(err) = fatal.borrow_mut().take() {
            bar.abandon_with_message(format!("{}", style(&err).red()));
            return Err(err.into());
        }

        let state = player.state();
        bar.set_position(started.elapsed().as_millis() as u64);
        bar.set_message(format!(
            "{} / {}  {}  {}{}",
            output::format_time(state.position),
            state.duration.map(output::format_time).unwrap_or_else(|| "--:--".into()),
            state.active_quality.display_name(),
            if state.playing { "playing" } else { "paused" },
            if state.muted { "  muted" } else { "" },
        ));
    }

    player.set_playing(false)?;
    player.pump();
    bar.finish_and_clear();

    output::print_session(&url, player.state(), format);
    player.unmount();
    Ok(())
}

/// Errors that end a playback session, copied out of the observer
fn playback_failure(err: &Error) -> Option<Error> {
    match err {
        Error::ManifestLoadFailed { url, reason } => Some(Error::manifest_load(url.clone(), reason.clone())),
        Error::StreamUnsupported { url } => Some(Error::StreamUnsupported { url: url.clone() }),
        Error::Engine(details) => Some(Error::Engine(details.clone())),
        _ => None,
    }
}

/// Catalog id or stream URL to a stream URL
async fn resolve_target(catalog: &MockCatalog, target: &str) -> anyhow::Result<String> {
    if let Ok(id) = target.parse::<u64>() {
        let record = catalog.fetch_by_id(id).await?;
        tracing::info!(id, title = %record.title, "Resolved catalog title");
        return Ok(record.url);
    }

    let url = Url::parse(target).with_context(|| format!("'{}' is neither a catalog id nor a URL", target))?;
    Ok(url.to_string())
}

fn parse_content_type(value: &str) -> anyhow::Result<ContentType> {
    ContentType::ALL
        .iter()
        .copied()
        .find(|t| t.to_string().eq_ignore_ascii_case(value))
        .with_context(|| format!("Unknown content type '{}' (expected movies, shows or sports)", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinestream_core::Recovery;

    #[test]
    fn test_playback_failure_ends_session() {
        let err = playback_failure(&Error::manifest_load("https://x/a.m3u8", "404")).unwrap();
        assert_eq!(err.recovery(), Recovery::Retry);

        let err = playback_failure(&Error::StreamUnsupported { url: "https://x/a.m3u8".into() }).unwrap();
        assert_eq!(err.recovery(), Recovery::DegradedNotice);

        assert!(playback_failure(&Error::UnknownQuality("1080p".into())).is_none());
        assert!(playback_failure(&Error::PlaybackRejected("no gesture".into())).is_none());
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(parse_content_type("Movies").unwrap(), ContentType::Movies);
        assert!(parse_content_type("anime").is_err());
    }
}
