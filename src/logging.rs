use crate::utils::truncate_str;
use crate::Preview;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CARD_WIDTH: usize = 72;

#[derive(Debug)]
pub struct LogConfig {
    /// Directory for the daily rolling `link-unfurl.log`. `None` disables file output.
    pub log_dir: Option<PathBuf>,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub console_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "link_unfurl=info".into(),
            console_output: true,
        }
    }
}

/// Install the global subscriber. Does nothing if one is already set.
pub fn setup_logging(config: LogConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console = config
        .console_output
        .then(|| fmt::layer().with_target(true).compact());

    let file = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "link-unfurl.log");
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
    Ok(())
}

fn card_line(label: &str, value: &str) -> String {
    let width = CARD_WIDTH.saturating_sub(label.len() + 4);
    format!("│ {label}: {}", truncate_str(value, width))
}

/// Log a one-glance summary of a resolved preview.
pub fn log_preview_card(preview: &Preview, url: &str) {
    let rule = "─".repeat(CARD_WIDTH);
    let mut lines = vec![
        card_line("URL", url),
        card_line("Type", preview.type_tag().as_deref().unwrap_or("opengraph")),
        card_line("Title", preview.title().unwrap_or("-")),
    ];

    match preview {
        Preview::Embed(embed) => {
            lines.push(card_line("Provider", embed.provider_name.as_deref().unwrap_or("-")));
            if let (Some(w), Some(h)) = (embed.width, embed.height) {
                lines.push(card_line("Size", &format!("{w}x{h}")));
            }
        }
        _ => {
            if let Some(metadata) = preview.metadata() {
                lines.push(card_line("Desc", metadata.description.as_deref().unwrap_or("-")));
                if let Some(image) = &metadata.image {
                    lines.push(card_line("Image", image));
                }
                if let Some(d) = metadata.dimensions {
                    lines.push(card_line("Size", &format!("{}x{}", d.width, d.height)));
                }
            }
        }
    }

    info!("\n┌{rule}\n{}\n└{rule}", lines.join("\n"));
}

/// Log a failed lookup together with the error's cause, if any.
pub fn log_error_card(url: &str, err: &(dyn std::error::Error + 'static)) {
    let detail = match err.source() {
        Some(cause) => format!("{err} (cause: {cause})"),
        None => err.to_string(),
    };
    error!(
        "\n{}\n{}\n{}",
        card_line("URL", url),
        card_line("Error", &detail),
        "═".repeat(CARD_WIDTH)
    );
}
