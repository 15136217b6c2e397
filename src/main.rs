use anyhow::{Context, Result, bail};
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use kakari::analyzer::{DependencyAnalyzer, PatternAnalyzer, ensure_known_keyword};
use kakari::backend::{CabochaCommand, MecabCommand};
use kakari::corpus::{CorpusStore, corpus_lines, expand_inputs};
use kakari::error::ExtractError;
use kakari::lattice::LatticeReader;
use kakari::pipeline::{CorpusScanPipeline, ScanSummary};
use kakari::progress::scan_progress_bar;
use kakari::{
    Config, CsvSink, ExtractRequest, KeywordFilter, LineMatcher, LiteralMode, ResolvePolicy, extract,
    extract_parsed, parse_conditions,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Dependency-relation extraction and pattern scanning for Japanese text
#[derive(Debug, ClapParser)]
#[command(name = "kakari", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true, env = "KAKARI_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress and log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Words depending on a target word in one sentence
    Deps(DepsArgs),

    /// Verbs and adjectives around a keyword across a corpus
    DepsScan(DepsScanArgs),

    /// Condition-sequence matches across a corpus
    MatchScan(MatchScanArgs),

    /// Split text into one sentence per line
    Split {
        input: PathBuf,
        output: PathBuf,
    },

    /// Look up an article in the corpus tables
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
struct DepsArgs {
    /// Sentence to parse
    #[arg(required_unless_present = "lattice", conflicts_with = "lattice")]
    sentence: Option<String>,

    /// Word whose dependents are reported
    #[arg(short, long)]
    target: String,

    /// Which occurrences of the target to use
    #[arg(short, long, value_enum, default_value = "first")]
    policy: PolicyArg,

    /// Read pre-parsed CaboCha lattice output instead of running the parser
    #[arg(long, value_name = "FILE")]
    lattice: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Input files or glob patterns (.gz is decompressed)
    #[arg(value_name = "FILE/PATTERN", required = true)]
    inputs: Vec<String>,

    /// Output CSV file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Worker threads (default from config)
    #[arg(short = 'j', long)]
    workers: Option<usize>,
}

#[derive(Debug, Args)]
struct DepsScanArgs {
    /// Keyword to find dependency relations for
    #[arg(short, long)]
    keyword: String,

    /// Skip the dictionary check on the keyword
    #[arg(long)]
    no_keyword_check: bool,

    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(Debug, Args)]
struct MatchScanArgs {
    /// Condition sequence, e.g. '"横断歩道" [助詞]' (default from config)
    #[arg(short = 'C', long)]
    conditions: Option<String>,

    /// How literal conditions are tested (default from config)
    #[arg(long, value_enum)]
    literal_mode: Option<LiteralModeArg>,

    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(Debug, Args)]
struct LookupArgs {
    /// Article title, or id with --id
    key: String,

    /// Treat the key as an article id
    #[arg(long)]
    id: bool,

    /// Index table (title,id)
    #[arg(long, value_name = "FILE", requires = "data")]
    index: Option<PathBuf>,

    /// Data table (id,text)
    #[arg(long, value_name = "FILE", requires = "index")]
    data: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    First,
    Last,
    All,
}

impl From<PolicyArg> for ResolvePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::First => ResolvePolicy::First,
            PolicyArg::Last => ResolvePolicy::Last,
            PolicyArg::All => ResolvePolicy::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LiteralModeArg {
    Exact,
    LineFallback,
}

impl From<LiteralModeArg> for LiteralMode {
    fn from(arg: LiteralModeArg) -> Self {
        match arg {
            LiteralModeArg::Exact => LiteralMode::Exact,
            LiteralModeArg::LineFallback => LiteralMode::LineFallback,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    log::debug!("configuration: {:?}", config);

    match &cli.command {
        Command::Deps(args) => run_deps(args, &config),
        Command::DepsScan(args) => run_deps_scan(args, &config, cli.quiet),
        Command::MatchScan(args) => run_match_scan(args, &config, cli.quiet),
        Command::Split { input, output } => {
            let count = kakari::split::split_file(input, output)
                .with_context(|| format!("Failed to split {}", input.display()))?;
            log::info!("wrote {} sentences to {}", count, output.display());
            Ok(())
        }
        Command::Lookup(args) => run_lookup(args, &config),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    if !quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    }
}

fn run_deps(args: &DepsArgs, config: &Config) -> Result<()> {
    let policy = ResolvePolicy::from(args.policy);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(path) = &args.lattice {
        let reader = LatticeReader::from_file(path).with_context(|| format!("Failed to open {}", path.display()))?;
        for (index, sentence) in reader.enumerate() {
            let sentence = match sentence {
                Ok(sentence) => sentence,
                Err(e) => {
                    log::warn!("{}: {}", path.display(), e);
                    continue;
                }
            };
            match extract_parsed(&sentence, &args.target, policy) {
                Ok(dependents) => {
                    let text = sentence.text.clone().unwrap_or_else(|| sentence.surface_text());
                    writeln!(out, "{}\t{}\t{}", index + 1, text, dependents.join(" "))?;
                }
                Err(ExtractError::TargetNotFound(_)) => {}
                Err(e) => log::warn!("sentence {}: {}", index + 1, e),
            }
        }
        return Ok(());
    }

    let Some(sentence) = &args.sentence else {
        bail!("No sentence given");
    };
    let mut parser = CabochaCommand::spawn(config.parser_spec()).context("Failed to start the parser")?;
    let request = ExtractRequest::new(sentence, &args.target).with_policy(policy);
    for word in extract(&mut parser, &request)? {
        writeln!(out, "{}", word)?;
    }
    Ok(())
}

fn run_deps_scan(args: &DepsScanArgs, config: &Config, quiet: bool) -> Result<()> {
    let keyword = args.keyword.trim();
    if keyword.is_empty() {
        bail!("Keyword must not be empty");
    }
    if config.scan.keyword_check && !args.no_keyword_check {
        let mut tagger = MecabCommand::spawn(config.tagger_spec()).context("Failed to start the tagger")?;
        ensure_known_keyword(&mut tagger, keyword)?;
    }

    let keyword: Arc<str> = Arc::from(keyword);
    let filter = KeywordFilter::new([&*keyword]);
    let spec = config.parser_spec();
    run_scan(&args.scan, config, quiet, &filter, |_| {
        let parser = CabochaCommand::spawn(spec.clone())?;
        Ok(DependencyAnalyzer::new(parser, Arc::clone(&keyword)))
    })
}

fn run_match_scan(args: &MatchScanArgs, config: &Config, quiet: bool) -> Result<()> {
    let conditions = match &args.conditions {
        Some(text) => parse_conditions(text)?,
        None => config.conditions(),
    };
    if conditions.is_empty() {
        bail!("No conditions given (use --conditions or [scan] conditions in the config file)");
    }

    let mode = args
        .literal_mode
        .map(LiteralMode::from)
        .unwrap_or(config.scan.literal_mode);
    let matcher = Arc::new(LineMatcher::new(conditions).with_mode(mode));
    let filter = KeywordFilter::new(matcher.keywords());
    if filter.is_noop() {
        log::info!("no literal conditions; every line will be tagged");
    }

    let spec = config.tagger_spec();
    run_scan(&args.scan, config, quiet, &filter, |_| {
        let tagger = MecabCommand::spawn(spec.clone())?;
        Ok(PatternAnalyzer::new(tagger, Arc::clone(&matcher)))
    })
}

fn run_scan<A, F>(args: &ScanArgs, config: &Config, quiet: bool, filter: &KeywordFilter, make_analyzer: F) -> Result<()>
where
    A: kakari::LineAnalyzer,
    F: FnMut(usize) -> Result<A, kakari::ConfigError>,
{
    let inputs = expand_inputs(&args.inputs)?;
    log::info!("{} input files", inputs.len());

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))
            .context("Failed to install the interrupt handler")?;
    }

    let pipeline = CorpusScanPipeline::new(args.workers.unwrap_or(config.scan.workers))
        .with_cancel_flag(cancel)
        .with_progress(scan_progress_bar(quiet));

    let summary = match &args.output {
        Some(path) => {
            let mut sink = CsvSink::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            pipeline.scan(corpus_lines(inputs), filter, make_analyzer, &mut sink)?
        }
        None => {
            let stdout = io::stdout();
            let mut sink = CsvSink::new(stdout.lock())?;
            pipeline.scan(corpus_lines(inputs), filter, make_analyzer, &mut sink)?
        }
    };

    report(&summary, args.output.as_deref(), quiet);
    if summary.cancelled {
        bail!("Interrupted");
    }
    Ok(())
}

fn report(summary: &ScanSummary, output: Option<&Path>, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!(
        "{} rows from {} of {} lines ({} failed){}",
        summary.rows_written,
        summary.lines_processed,
        summary.lines_read,
        summary.lines_failed,
        output.map(|p| format!(" -> {}", p.display())).unwrap_or_default()
    );
}

fn run_lookup(args: &LookupArgs, config: &Config) -> Result<()> {
    let (index, data) = match (&args.index, &args.data, &config.corpus) {
        (Some(index), Some(data), _) => (index.clone(), data.clone()),
        (_, _, Some(corpus)) => (corpus.index.clone(), corpus.data.clone()),
        _ => bail!("No corpus tables given (use --index/--data or [corpus] in the config file)"),
    };
    let store = CorpusStore::open(index, data)?;

    let text = if args.id {
        store.lookup_by_id(&args.key)?
    } else {
        store.text_for_title(&args.key)?
    };
    match text {
        Some(text) => {
            println!("{}", text);
            Ok(())
        }
        None => bail!("No article found for {}", args.key),
    }
}
