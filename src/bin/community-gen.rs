//! CLI binary for community-gen.
//!
//! A thin shim over the library crate that maps CLI flags onto a
//! `Session`, runs the upload and generation, and prints the rendered copy.

use anyhow::{Context, Result};
use clap::Parser;
use community_gen::{
    render, to_html, to_terminal, ClientConfig, CommunityGenError, HttpBackend, Language, Notice,
    SelectedApi, Session, SessionObserver, TargetAudience, WritingStyle,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while a request is in flight, one log line
/// per finished step, and notices printed in red.
struct CliObserver {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn start(&self, prefix: &'static str, msg: String) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.reset_elapsed();
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn stop(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

impl SessionObserver for CliObserver {
    fn on_upload_start(&self, file_name: &str, size_bytes: usize) {
        self.start("Uploading", format!("{file_name} ({size_bytes} bytes)…"));
    }

    fn on_entities_extracted(&self, count: usize) {
        let elapsed = self.elapsed();
        self.stop();
        eprintln!(
            "  {} Extracted {} entities  {}",
            green("✓"),
            bold(&count.to_string()),
            elapsed
        );
    }

    fn on_upload_failed(&self, _error: &CommunityGenError) {
        self.stop();
    }

    fn on_generation_start(&self) {
        self.start("Generating", "waiting for the model…".to_string());
    }

    fn on_generation_complete(&self, success: bool) {
        let elapsed = self.elapsed();
        self.stop();
        if success {
            eprintln!("  {} Content generated  {}", green("✓"), elapsed);
        }
    }

    fn on_notice(&self, notice: &Notice) {
        self.bar.suspend(|| eprintln!("  {} {}", red("✗"), red(&notice.message())));
    }
}

/// Observer for `--no-progress`: notices only.
struct PlainObserver;

impl SessionObserver for PlainObserver {
    fn on_notice(&self, notice: &Notice) {
        eprintln!("{}", notice.message());
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract entities and generate copy (terminal output)
  community-gen brochure.pdf --name "Vista Azul" --location "Cancún" \
      --audience families --style narrative --language english

  # Several writing styles, Claude, HTML to a file
  community-gen brochure.pdf --name "Vista Azul" --location "Cancún" \
      --audience investors --style seo-friendly --style persuasive \
      --language spanish --api anthropic --html -o vista-azul.html

  # Only run the extraction and print the entities
  community-gen --extract-only brochure.pdf

  # Check that the backend is reachable
  community-gen --check-backend

  # JSON output (raw content plus rendered blocks)
  community-gen brochure.pdf ... --json > content.json

TARGET AUDIENCES:
  young-professionals, couples, families, investors, retirees, expats

WRITING STYLES:
  seo-friendly, descriptive, narrative, persuasive, informative,
  testimonial, educational

MODELS (--api):
  openai      ChatGPT 3.5 (default)
  anthropic   Claude 3
  gemini      Gemini Pro

LIMITS:
  The backend rejects documents larger than 5 MB.

ENVIRONMENT VARIABLES:
  COMMUNITY_GEN_BACKEND_URL  Backend origin (default http://localhost:8000)
  COMMUNITY_GEN_TIMEOUT      Request timeout in seconds (default: none)
  RUST_LOG                   Override log filter (e.g. community_gen=debug)
"#;

/// Generate real-estate community copy from a brochure.
#[derive(Parser, Debug)]
#[command(
    name = "community-gen",
    version,
    about = "Generate real-estate community copy from a brochure",
    long_about = "Upload a community brochure or fact sheet for entity extraction, then ask \
the content backend to write marketing copy for a chosen audience, writing style, language \
and model (ChatGPT, Claude or Gemini).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to extract entities from (PDF).
    #[arg(required_unless_present = "check_backend")]
    file: Option<PathBuf>,

    /// Community name.
    #[arg(long, env = "COMMUNITY_GEN_NAME")]
    name: Option<String>,

    /// Community location.
    #[arg(long, env = "COMMUNITY_GEN_LOCATION")]
    location: Option<String>,

    /// Target audience.
    #[arg(long, value_enum, env = "COMMUNITY_GEN_AUDIENCE")]
    audience: Option<AudienceArg>,

    /// Writing style; repeat for several.
    #[arg(long = "style", value_enum, env = "COMMUNITY_GEN_STYLE", value_delimiter = ',')]
    styles: Vec<StyleArg>,

    /// Output language.
    #[arg(long, value_enum, env = "COMMUNITY_GEN_LANGUAGE")]
    language: Option<LanguageArg>,

    /// Model vendor the backend should use.
    #[arg(long, value_enum, env = "COMMUNITY_GEN_API", default_value = "openai")]
    api: ApiArg,

    /// Backend origin.
    #[arg(long, env = "COMMUNITY_GEN_BACKEND_URL", default_value = community_gen::config::DEFAULT_BASE_URL)]
    backend_url: String,

    /// Per-request timeout in seconds (default: none).
    #[arg(long, env = "COMMUNITY_GEN_TIMEOUT")]
    timeout: Option<u64>,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "COMMUNITY_GEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Output an HTML fragment instead of terminal text.
    #[arg(long, conflicts_with = "json")]
    html: bool,

    /// Output JSON (raw content plus rendered blocks).
    #[arg(long)]
    json: bool,

    /// Upload the document and print the extracted entities only.
    #[arg(long)]
    extract_only: bool,

    /// Print the backend version and exit.
    #[arg(long)]
    check_backend: bool,

    /// Disable the spinner.
    #[arg(long, env = "COMMUNITY_GEN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COMMUNITY_GEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "COMMUNITY_GEN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AudienceArg {
    YoungProfessionals,
    Couples,
    Families,
    Investors,
    Retirees,
    Expats,
}

impl From<AudienceArg> for TargetAudience {
    fn from(v: AudienceArg) -> Self {
        match v {
            AudienceArg::YoungProfessionals => TargetAudience::YoungProfessionals,
            AudienceArg::Couples => TargetAudience::Couples,
            AudienceArg::Families => TargetAudience::Families,
            AudienceArg::Investors => TargetAudience::Investors,
            AudienceArg::Retirees => TargetAudience::Retirees,
            AudienceArg::Expats => TargetAudience::Expats,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    SeoFriendly,
    Descriptive,
    Narrative,
    Persuasive,
    Informative,
    Testimonial,
    Educational,
}

impl From<StyleArg> for WritingStyle {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::SeoFriendly => WritingStyle::SeoFriendly,
            StyleArg::Descriptive => WritingStyle::Descriptive,
            StyleArg::Narrative => WritingStyle::Narrative,
            StyleArg::Persuasive => WritingStyle::Persuasive,
            StyleArg::Informative => WritingStyle::Informative,
            StyleArg::Testimonial => WritingStyle::Testimonial,
            StyleArg::Educational => WritingStyle::Educational,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    English,
    Spanish,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::English => Language::English,
            LanguageArg::Spanish => Language::Spanish,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ApiArg {
    Openai,
    Anthropic,
    Gemini,
}

impl From<ApiArg> for SelectedApi {
    fn from(v: ApiArg) -> Self {
        match v {
            ApiArg::Openai => SelectedApi::OpenAi,
            ApiArg::Anthropic => SelectedApi::Anthropic,
            ApiArg::Gemini => SelectedApi::Gemini,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let backend = Arc::new(HttpBackend::new(config).context("Failed to create HTTP client")?);

    // ── Check-backend mode ───────────────────────────────────────────────
    if cli.check_backend {
        let version = backend
            .version()
            .await
            .with_context(|| format!("Backend at {} is not reachable", cli.backend_url))?;
        if cli.json {
            println!("{}", serde_json::json!({ "backend_url": cli.backend_url, "version": version }));
        } else {
            println!("{} {}  version {}", green("✔"), cli.backend_url, bold(&version));
        }
        return Ok(());
    }

    let file = cli
        .file
        .clone()
        .context("A document is required unless --check-backend is given")?;

    let observer: Arc<dyn SessionObserver> = if show_progress {
        CliObserver::new()
    } else {
        Arc::new(PlainObserver)
    };
    let mut session = Session::new(backend).with_observer(observer);

    // ── Upload ───────────────────────────────────────────────────────────
    session
        .upload_file(&file)
        .await
        .with_context(|| format!("Failed to extract entities from {}", file.display()))?;

    if cli.extract_only {
        let json = serde_json::to_string_pretty(&session.form().entities)
            .context("Failed to serialise entities")?;
        return emit(&cli, &json);
    }

    // ── Form ─────────────────────────────────────────────────────────────
    apply_form(&cli, &mut session);

    // ── Generate ─────────────────────────────────────────────────────────
    let content = session.generate().await.context("Content generation failed")?.clone();
    let blocks = render(Some(&content));

    let rendered = if cli.json {
        let doc = serde_json::json!({
            "generated_text": content,
            "blocks": blocks,
        });
        serde_json::to_string_pretty(&doc).context("Failed to serialise output")?
    } else if cli.html {
        to_html(&blocks)
    } else {
        let color = cli.output.is_none() && io::stdout().is_terminal();
        to_terminal(&blocks, color)
    };

    emit(&cli, &rendered)?;

    if !cli.quiet && !show_progress {
        eprintln!("Rendered {} blocks", blocks.len());
    }
    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().base_url(cli.backend_url.clone());
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

/// Copy the form flags onto the session. Missing flags stay empty and are
/// reported by `generate()`.
fn apply_form(cli: &Cli, session: &mut Session) {
    if let Some(ref name) = cli.name {
        session.set_community_name(name.clone());
    }
    if let Some(ref location) = cli.location {
        session.set_location(location.clone());
    }
    if let Some(audience) = cli.audience {
        session.set_target_audience(audience.into());
    }
    session.set_writing_style(cli.styles.iter().copied().map(WritingStyle::from));
    if let Some(language) = cli.language {
        session.set_language(language.into());
    }
    session.set_selected_api(cli.api.into());
}

/// Print to stdout, or write to `--output`.
fn emit(cli: &Cli, text: &str) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            write_atomic(path, text)?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, text)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            tmp_path.display(),
            cyan(&path.display().to_string())
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_full_form() {
        let cli = Cli::try_parse_from([
            "community-gen",
            "brochure.pdf",
            "--name",
            "Vista Azul",
            "--location",
            "Cancún",
            "--audience",
            "young-professionals",
            "--style",
            "seo-friendly",
            "--style",
            "narrative",
            "--language",
            "spanish",
            "--api",
            "gemini",
        ])
        .unwrap();
        assert_eq!(cli.styles.len(), 2);
        assert!(matches!(cli.audience, Some(AudienceArg::YoungProfessionals)));
        assert_eq!(SelectedApi::from(cli.api), SelectedApi::Gemini);
    }

    #[test]
    fn check_backend_needs_no_file() {
        let cli = Cli::try_parse_from(["community-gen", "--check-backend"]).unwrap();
        assert!(cli.file.is_none());
    }

    #[test]
    fn html_conflicts_with_json() {
        assert!(Cli::try_parse_from(["community-gen", "a.pdf", "--html", "--json"]).is_err());
    }

    #[test]
    fn atomic_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/content.html");
        write_atomic(&path, "<p>one</p>").unwrap();
        write_atomic(&path, "<p>two</p>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>two</p>");
        assert!(!dir.path().join("out/content.html.tmp").exists());
    }
}
