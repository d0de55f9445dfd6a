use clap::{Arg, Command};
use colored::Colorize;
use link_unfurl::{Fetcher, PreviewResolver, ProviderRegistry, ResolverConfig};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("Link Unfurl CLI")
        .version("0.3")
        .about("Resolve URLs to link previews via oEmbed, microformats2 and OpenGraph")
        .arg(
            Arg::new("urls")
                .help("URLs to preview")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new("noembed")
                .long("noembed")
                .help("Route embeds through noembed.com's provider list")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scrape")
                .long("scrape")
                .help("Fall back to <title> and meta description when OpenGraph is missing")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("min-width")
                .short('w')
                .long("min-width")
                .help("Image width a source must exceed to win (default: 300)")
                .value_name("PIXELS")
                .value_parser(clap::value_parser!(u32)),
        )
        .get_matches();

    #[cfg(feature = "logging")]
    link_unfurl::setup_logging(link_unfurl::LogConfig::default())?;

    let fetcher = Fetcher::new();
    let providers = if matches.get_flag("noembed") {
        match ProviderRegistry::bootstrap_noembed(&fetcher).await {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!("{}: {}", "noembed unavailable".yellow(), e);
                ProviderRegistry::with_defaults(&fetcher)
            }
        }
    } else {
        ProviderRegistry::with_defaults(&fetcher)
    };

    let mut config = ResolverConfig {
        fetcher: Some(fetcher),
        providers: Some(providers),
        scrape_fallback: matches.get_flag("scrape"),
        ..Default::default()
    };
    if let Some(width) = matches.get_one::<u32>("min-width") {
        config.image_width_threshold = *width;
    }
    let resolver = PreviewResolver::new_with_config(config);

    println!("{}", "Link Unfurl".bold().green());
    println!("{}", "===========".green());

    for url in matches.get_many::<String>("urls").into_iter().flatten() {
        println!("\n{}: {}", "URL".bold(), url);
        match resolver.preview(url).await {
            Ok(Some(preview)) => {
                let source = match preview.type_tag() {
                    Some(tag) => tag,
                    None => "opengraph".to_string(),
                };
                println!("{}: {}", "Source".bold(), source.cyan());
                println!("{}", serde_json::to_string_pretty(&preview)?);
                #[cfg(feature = "logging")]
                link_unfurl::log_preview_card(&preview, url);
            }
            Ok(None) => println!("{}", "No preview available".yellow()),
            Err(e) => {
                #[cfg(feature = "logging")]
                link_unfurl::log_error_card(url, &e);
                eprintln!("{}: {}", "Error".bold().red(), e);
            }
        }
    }

    Ok(())
}
