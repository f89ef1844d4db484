//! CLI binary for conteur.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerateConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use conteur::{
    collect_template_variables, extract_variables, generate, EditorElement, GenerateConfig,
    GenerateRequest, GenerationObserver, Template,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal progress observer: renders a live progress bar and per-page log
/// lines using [indicatif]. Works correctly when pages complete out-of-order
/// (concurrent painting).
struct CliObserver {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliObserver {
    /// Create an observer whose progress-bar length is set dynamically by
    /// `on_generation_start` (called before any pages are painted).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_generation_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening template PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Painting");
        self.bar.reset_eta();
    }
}

impl GenerationObserver for CliObserver {
    fn on_generation_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Painting {total_pages} page previews…"))
        ));
    }

    fn on_page_start(&self, page: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page, Instant::now());
        self.bar.set_message(format!("page {}", page + 1));
    }

    fn on_page_complete(&self, page: usize, total: usize, preview_bytes: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page + 1,
            total,
            dim(&format!("{:>6} bytes", preview_bytes)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page + 1,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages painted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages painted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a personalized story from a template manifest
  conteur book.json --var nom=Alice --var age=7

  # Write preview PNGs to a directory
  conteur book.json --var nom=Alice -o previews/

  # JSON output (histoire + stats) for scripting
  conteur book.json --var nom=Alice --json > histoire.json

  # List the variables a manifest's elements reference
  conteur book.json --list-vars

  # Inspect a template PDF (page count + native page sizes)
  conteur --inspect-only foret.pdf

  # Template PDF behind a URL
  conteur --inspect-only https://cdn.example.com/templates/foret.pdf

TEMPLATE MANIFEST:
  A JSON file with the template record and its editor elements:

    {
      "template": { "id": "...", "title": "...", "pdf_path": "...", ... },
      "elements": [ { "id": "...", "kind": "text", "content": "Bonjour (nom)", ... } ]
    }

  Text element content may embed (variable) tokens. A token resolves to the
  --var value if one is given and non-empty, else to the element's own
  default, else to the empty string.

ENVIRONMENT VARIABLES:
  CONTEUR_OUTPUT             Default output directory
  CONTEUR_CONCURRENCY        Concurrent page paints
  CONTEUR_MAX_PIXELS         Longest-edge pixel cap for previews
  CONTEUR_DOWNLOAD_TIMEOUT   HTTP download timeout in seconds
  PDFIUM_LIB_PATH            Path to an existing libpdfium build
"#;

/// Generate personalized children's books from PDF templates.
#[derive(Parser, Debug)]
#[command(
    name = "conteur",
    version,
    about = "Generate personalized children's books from PDF templates",
    long_about = "Resolve (variable) tokens in a template's text elements against user-supplied \
values and paint per-page PNG previews of the template PDF (local file or URL).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Template manifest (JSON) — or a bare PDF with --inspect-only.
    input: String,

    /// Variable value, repeatable: --var nom=Alice --var age=7.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// User id recorded on the generated histoire.
    #[arg(long, default_value = "cli")]
    user: String,

    /// Write per-page preview PNGs into this directory.
    #[arg(short, long, env = "CONTEUR_OUTPUT")]
    output: Option<PathBuf>,

    /// Longest-edge pixel cap for rendered previews.
    #[arg(long, env = "CONTEUR_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(16..=8192))]
    max_pixels: u32,

    /// Number of pages painted concurrently.
    #[arg(short, long, env = "CONTEUR_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CONTEUR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (histoire + resolved elements + stats).
    #[arg(long)]
    json: bool,

    /// Print the variables referenced by the manifest's elements, then exit.
    #[arg(long)]
    list_vars: bool,

    /// Print PDF page count and sizes only, no generation.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "CONTEUR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CONTEUR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CONTEUR_QUIET")]
    quiet: bool,
}

/// On-disk template manifest: the template record plus its elements.
#[derive(Debug, Deserialize)]
struct Manifest {
    template: Template,
    #[serde(default)]
    elements: Vec<EditorElement>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let source =
            conteur::pipeline::render::PdfiumSource::resolve(&cli.input, cli.download_timeout)
                .await
                .context("Failed to inspect PDF")?;
        let info = source.info();

        if cli.json {
            #[derive(serde::Serialize)]
            struct Page {
                width_pts: f32,
                height_pts: f32,
            }
            #[derive(serde::Serialize)]
            struct Inspection {
                page_count: usize,
                pages: Vec<Page>,
            }
            let out = Inspection {
                page_count: info.page_count,
                pages: info
                    .page_sizes
                    .iter()
                    .map(|s| Page {
                        width_pts: s.width_pts,
                        height_pts: s.height_pts,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("File:    {}", cli.input);
            println!("Pages:   {}", info.page_count);
            for (i, size) in info.page_sizes.iter().enumerate() {
                println!(
                    "  page {:>3}: {:.1} x {:.1} pts",
                    i + 1,
                    size.width_pts,
                    size.height_pts
                );
            }
        }
        return Ok(());
    }

    // ── Load the manifest ────────────────────────────────────────────────
    let manifest_json = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("Failed to read manifest {}", cli.input))?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_json).context("Invalid template manifest")?;

    // ── List-vars mode ───────────────────────────────────────────────────
    if cli.list_vars {
        let names = collect_template_variables(&manifest.elements);
        if names.is_empty() {
            eprintln!("no variables referenced");
        }
        for name in names {
            // Show where the name comes from for authoring sanity.
            let in_content = manifest
                .elements
                .iter()
                .any(|el| extract_variables(&el.content).iter().any(|v| v == &name));
            println!(
                "{}  {}",
                name,
                dim(if in_content { "(content)" } else { "(binding)" })
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = GenerateConfig::builder()
        .max_rendered_pixels(cli.max_pixels)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if show_progress {
        builder = builder.observer(CliObserver::new_dynamic() as Arc<dyn GenerationObserver>);
    }
    let config = builder.build().context("Invalid configuration")?;

    let request = GenerateRequest {
        template_id: manifest.template.id.clone(),
        variables: parse_vars(&cli.vars)?,
    };

    // ── Run generation ───────────────────────────────────────────────────
    let output = generate(
        &manifest.template,
        &manifest.elements,
        &cli.user,
        &request,
        &config,
    )
    .await
    .context("Generation failed")?;

    // ── Emit results ─────────────────────────────────────────────────────
    if let Some(ref dir) = cli.output {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let mut written = 0usize;
        for page in &output.pages {
            if let Some(ref uri) = page.preview_uri {
                let path = dir.join(format!("page-{:03}.png", page.page + 1));
                tokio::fs::write(&path, decode_png_data_uri(uri)?)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
        }
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {}ms  →  {}",
                if output.stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                written,
                output.stats.total_pages,
                output.stats.total_duration_ms,
                bold(&dir.display().to_string()),
            );
        }
    }

    if cli.json {
        #[derive(serde::Serialize)]
        struct JsonOut<'a> {
            histoire: &'a conteur::Histoire,
            resolved: Vec<&'a str>,
            stats: &'a conteur::GenerationStats,
        }
        let out = JsonOut {
            histoire: &output.histoire,
            resolved: output
                .resolved_elements
                .iter()
                .map(|r| r.text.as_str())
                .collect(),
            stats: &output.stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if cli.output.is_none() {
        // No output dir: print the resolved texts, which is the part a
        // template author iterates on.
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for resolved in &output.resolved_elements {
            writeln!(handle, "{}", resolved.text).context("Failed to write to stdout")?;
        }
        if !cli.quiet && !show_progress {
            eprintln!(
                "Painted {}/{} pages in {}ms",
                output.stats.processed_pages,
                output.stats.total_pages,
                output.stats.total_duration_ms
            );
            if output.stats.failed_pages > 0 {
                eprintln!("  {} pages failed", output.stats.failed_pages);
            }
        }
    }

    Ok(())
}

/// Parse repeated `--var NAME=VALUE` flags into the variable map.
fn parse_vars(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid --var '{pair}': expected NAME=VALUE"))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Invalid --var '{pair}': empty variable name");
        }
        map.insert(name.to_string(), value.to_string());
    }
    Ok(map)
}

/// Strip the `data:image/png;base64,` header and decode the payload.
fn decode_png_data_uri(uri: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let payload = uri
        .strip_prefix("data:image/png;base64,")
        .context("Preview is not a PNG data URI")?;
    STANDARD
        .decode(payload)
        .context("Preview data URI payload is not valid base64")
}
