use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::sync::Arc;
use wordbloom_core::{AnalysisRequest, AnalysisResult, Error, GenerationType};
use wordbloom_local::{samples, Analyzer, AnalyzerConfig, HttpFetcher};

#[derive(Parser, Debug)]
#[command(name = "wordbloom")]
#[command(about = "Word-start statistics and tiny generated poems", long_about = None)]
struct Cli {
    /// Log more (repeatable). `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count words (and words starting with a character) and generate a haiku/riddle/poem.
    ///
    /// If the first line of the input is an http(s) URL, that page is fetched and analyzed
    /// instead; the remaining lines are ignored.
    Analyze(AnalyzeCmd),
    /// Replace the input with a random sample: a stock text when empty, else one of its lines
    /// (fetched when it is a URL).
    Sample(SampleCmd),
    /// Run the fallback generation endpoint (`POST /api/generate`).
    Serve(ServeCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Input text (or a URL on the first line).
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,
    /// Read input from a file. With neither --text nor --file, stdin is read.
    #[arg(long)]
    file: Option<std::path::PathBuf>,
}

impl InputArgs {
    fn read(&self) -> Result<String> {
        if let Some(t) = &self.text {
            return Ok(t.clone());
        }
        if let Some(p) = &self.file {
            return Ok(std::fs::read_to_string(p)?);
        }
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        Ok(s)
    }
}

#[derive(clap::Args, Debug)]
struct EndpointArgs {
    /// Fallback generation endpoint, e.g. http://127.0.0.1:8787/api/generate
    #[arg(long, env = "WORDBLOOM_SERVER_ENDPOINT")]
    server: Option<String>,
    /// Bound on fetched text, in characters.
    #[arg(long, env = "WORDBLOOM_MAX_CHARS")]
    max_chars: Option<usize>,
    /// Overall timeout per outbound request, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl EndpointArgs {
    fn apply(&self, cfg: &mut AnalyzerConfig) {
        if let Some(s) = &self.server {
            cfg.server_endpoint = Some(s.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(n) = self.max_chars {
            cfg.max_text_chars = n.max(1);
        }
        if let Some(ms) = self.timeout_ms {
            cfg.request_timeout_ms = ms.max(1);
        }
    }
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    #[command(flatten)]
    input: InputArgs,
    /// The character to count word starts for (exactly one).
    #[arg(long = "char", short = 'c')]
    target_char: String,
    /// What to generate. Allowed: haiku, riddle, poem
    #[arg(long = "type", short = 't', default_value = "haiku")]
    generation_type: String,
    #[command(flatten)]
    endpoints: EndpointArgs,
    /// Call the model directly from this process (needs WORDBLOOM_GEMINI_API_KEY).
    ///
    /// Not recommended for shared machines: prefer --server, which keeps the key server-side.
    #[arg(long)]
    model_direct: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SampleCmd {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    endpoints: EndpointArgs,
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8787")]
    addr: std::net::SocketAddr,
    #[command(flatten)]
    endpoints: EndpointArgs,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    // Logs go to stderr; stdout carries the result payload.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn analysis_json(r: &AnalysisResult) -> serde_json::Value {
    serde_json::json!({
        "schema_version": 1,
        "kind": "analysis",
        "ok": true,
        "total_words": r.total_words,
        "starts_with_count": r.starts_with_count,
        "creative": r.creative_text,
        "creative_source": r.creative_source.map(|k| k.as_str()),
        "path": r.path,
        "notes": r.notes,
    })
}

fn error_json(e: &Error) -> serde_json::Value {
    serde_json::json!({
        "schema_version": 1,
        "kind": "analysis",
        "ok": false,
        "error": { "code": e.code(), "message": e.to_string() },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => {
            let mut cfg = AnalyzerConfig::from_env();
            args.endpoints.apply(&mut cfg);
            if args.model_direct {
                cfg.model_direct_enabled = true;
            }
            let text_output = args.output.eq_ignore_ascii_case("text");

            let req = match args.generation_type.parse::<GenerationType>() {
                Ok(kind) => AnalysisRequest::new(args.input.read()?, args.target_char, kind),
                Err(e) => {
                    report_failure(&e, text_output);
                    std::process::exit(2);
                }
            };
            let analyzer = Analyzer::new(&cfg)?;
            match analyzer.analyze(&req).await {
                Ok(r) if text_output => {
                    println!("Total words: {}", r.total_words);
                    println!(
                        "Words starting with {:?}: {}",
                        req.target_char.trim(),
                        r.starts_with_count
                    );
                    println!();
                    println!("{}", r.creative_text.as_deref().unwrap_or("(nothing yet)"));
                }
                Ok(r) => println!("{}", analysis_json(&r)),
                Err(e) => {
                    report_failure(&e, text_output);
                    std::process::exit(2);
                }
            }
        }
        Commands::Sample(args) => {
            let mut cfg = AnalyzerConfig::from_env();
            args.endpoints.apply(&mut cfg);
            // No stdin here: an absent input means "give me a stock sample".
            let input = match (&args.input.text, &args.input.file) {
                (None, None) => String::new(),
                _ => args.input.read()?,
            };
            let pick = samples::pick_random(&input);
            let fetcher = HttpFetcher::from_config(cfg.http_client()?, &cfg);
            println!("{}", samples::resolve(&fetcher, pick).await);
        }
        Commands::Serve(args) => {
            let mut cfg = AnalyzerConfig::from_env();
            args.endpoints.apply(&mut cfg);
            let state = wordbloom_cli::serve::ServeState::from_config(&cfg)?;
            wordbloom_cli::serve::serve(args.addr, Arc::new(state)).await?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "wordbloom",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("wordbloom {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}

fn report_failure(e: &Error, text_output: bool) {
    if text_output {
        eprintln!("{e}");
    } else {
        println!("{}", error_json(e));
    }
}
