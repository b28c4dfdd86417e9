use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, Command};
use tracing::{error, info};
use url::Url;

mod fetch;
mod pdf;
mod session;
mod snapshot;
mod verify;

use fetch::DocumentFetcher;
use session::{Cookie, HttpSession};

#[tokio::main]
async fn main() {
    let matches = Command::new("factsheet-verify")
        .version("0.1.0")
        .about("Fetches an energy plan fact-sheet PDF and verifies its content")
        .long_about(
            "Retrieves the fact-sheet document behind a pricing-page plan link through a \
            cascade of fetch strategies (direct, referrer+cookies, ambient credentials), \
            extracts its text page by page, and checks for a required content marker.",
        )
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("Fact-sheet document URL (must end in .pdf)")
                .required(true),
        )
        .arg(
            Arg::new("referer")
                .long("referer")
                .value_name("URL")
                .help("Workflow origin URL sent as the Referer on the contextual attempt")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("cookie")
                .long("cookie")
                .value_name("NAME=VALUE")
                .help("Session cookie captured by the navigation layer (repeatable)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("marker")
                .long("marker")
                .value_name("TEXT")
                .help("Required case-insensitive content marker")
                .default_value(verify::GAS_PLAN_MARKER),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_name("SECS")
                .help("Per-attempt network timeout in seconds")
                .default_value("60"),
        )
        .arg(
            Arg::new("downloads-dir")
                .long("downloads-dir")
                .value_name("DIR")
                .help("Directory for diagnostic copies of retrieved documents")
                .default_value("downloads"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize tracing to stderr; RUST_LOG wins when set
    let log_level = if std::env::var("RUST_LOG").is_ok() {
        None
    } else if matches.get_flag("quiet") {
        Some("error")
    } else {
        Some("info")
    };
    if let Some(level) = log_level {
        std::env::set_var("RUST_LOG", level);
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    if let Err(e) = run(&matches).await {
        error!("verification failed: {:#}", e);
        process::exit(1);
    }
}

async fn run(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let raw_url = matches.get_one::<String>("url").expect("required");
    let document_url = Url::parse(raw_url).context("invalid document URL")?;
    if !verify::is_pdf_url(&document_url) {
        anyhow::bail!("document URL does not point at a PDF: {document_url}");
    }

    let origin_url = match matches.get_one::<String>("referer") {
        Some(raw) => Url::parse(raw).context("invalid referer URL")?,
        None => {
            let mut origin = document_url.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin
        }
    };

    let cookies = match matches.get_many::<String>("cookie") {
        Some(values) => values
            .map(|raw| raw.parse::<Cookie>())
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let timeout_secs: u64 = matches
        .get_one::<String>("timeout-secs")
        .expect("defaulted")
        .parse()
        .context("--timeout-secs must be an integer")?;
    let marker = matches.get_one::<String>("marker").expect("defaulted");
    let downloads_dir = matches
        .get_one::<String>("downloads-dir")
        .expect("defaulted");

    let session = HttpSession::new(
        document_url,
        origin_url,
        cookies,
        Duration::from_secs(timeout_secs),
    );
    let fetcher = DocumentFetcher::new(downloads_dir);

    let text = fetcher.fetch_document_text(&session).await;
    info!(chars = text.len(), "document text extracted");

    verify::verify_contains_marker(&text, marker)?;
    info!(marker = %marker, "fact sheet verified");
    Ok(())
}
