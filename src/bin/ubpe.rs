use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use ubpe::corpus::{load_corpus, CorpusOptions, DocumentMode};
use ubpe::serialization::{load_model, save_model, ModelFile, Variant};
use ubpe::{
    Encoding, FitOptions, NoopSink, ProgressSink, RoundMetrics, TokenId, Ubpe, UbpeClassic,
};

const DEFAULT_OUTPUT: &str = "model.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Universal BPE toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a tokenizer from text or binary inputs
    Train(TrainArgs),
    /// Encode a file with a trained tokenizer
    Encode(EncodeArgs),
    /// Decode token ids back into bytes
    Decode(DecodeArgs),
    /// Inspect model metadata
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path for the model
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Target vocabulary size including the 256 byte tokens
    #[arg(long, value_name = "SIZE", default_value_t = 512)]
    vocab_size: u32,

    /// Merge candidates examined per round
    #[arg(long, value_name = "COUNT", default_value_t = 50)]
    candidates: u32,

    /// Encoder variant to train
    #[arg(long, value_enum, default_value_t = VariantArg::Universal)]
    variant: VariantArg,

    /// Keep learned ids in creation order instead of weight order
    #[arg(long)]
    no_rearrange: bool,

    /// Document granularity for input files
    #[arg(long, value_enum, default_value_t = DocModeArg::Lines)]
    doc_mode: DocModeArg,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during discovery
    #[arg(long)]
    follow_symlinks: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Trained model path
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,

    /// File to encode
    input: PathBuf,

    /// Number of candidate encodings to return
    #[arg(long, value_name = "N", default_value_t = 1)]
    top_n: usize,

    /// Output path; stdout when omitted
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Trained model path
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,

    /// JSON file holding an array of token ids
    input: PathBuf,

    /// Output path; stdout when omitted
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Trained model path
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    model: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Classic,
    Universal,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DocModeArg {
    File,
    Lines,
}

impl From<DocModeArg> for DocumentMode {
    fn from(mode: DocModeArg) -> Self {
        match mode {
            DocModeArg::File => DocumentMode::WholeFile,
            DocModeArg::Lines => DocumentMode::Lines,
        }
    }
}

/// Either tokenizer variant over byte documents.
enum Model {
    Classic(UbpeClassic<Vec<u8>>),
    Universal(Ubpe<Vec<u8>>),
}

impl Model {
    fn from_file(file: ModelFile<u8>) -> Result<Self> {
        Ok(match file.variant {
            Variant::Classic => Model::Classic(UbpeClassic::from_state(file.state)?),
            Variant::Universal => Model::Universal(Ubpe::from_state(file.state)?),
        })
    }

    fn to_file(&self) -> ModelFile<u8> {
        match self {
            Model::Classic(tokenizer) => ModelFile {
                variant: Variant::Classic,
                state: tokenizer.state(),
            },
            Model::Universal(tokenizer) => ModelFile {
                variant: Variant::Universal,
                state: tokenizer.state(),
            },
        }
    }

    fn encode(&self, doc: &Vec<u8>, top_n: usize) -> ubpe::Result<Vec<Encoding>> {
        match self {
            Model::Classic(tokenizer) => tokenizer.encode(doc, top_n),
            Model::Universal(tokenizer) => tokenizer.encode(doc, top_n),
        }
    }

    fn decode(&self, ids: &[TokenId]) -> ubpe::Result<Vec<u8>> {
        match self {
            Model::Classic(tokenizer) => tokenizer.decode(ids),
            Model::Universal(tokenizer) => tokenizer.decode(ids),
        }
    }
}

/// Renders training progress on an indicatif bar.
struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarSink {
    fn on_round(&mut self, stats: &RoundMetrics) {
        self.bar.set_message(format!(
            "round {} best_freq {}",
            stats.round, stats.best_frequency
        ));
    }

    fn on_progress(&mut self, done: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-1 => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.command {
        Commands::Train(args) => train(args),
        Commands::Encode(args) => encode(args),
        Commands::Decode(args) => decode(args),
        Commands::Info(args) => info_command(args),
    }
}

fn train(args: TrainArgs) -> Result<()> {
    let corpus_opts = CorpusOptions {
        mode: args.doc_mode.into(),
        recursive: !args.no_recursive,
        follow_symlinks: args.follow_symlinks,
    };
    let corpus = load_corpus(&args.inputs, &corpus_opts).context("loading corpus")?;
    info!("loaded {} documents", corpus.len());

    let options = FitOptions::builder()
        .n_candidates(args.candidates)
        .rearrange_tokens(!args.no_rearrange)
        .show_progress(!args.no_progress)
        .build()
        .context("invalid training options")?;

    let mut bar_sink = if args.no_progress {
        None
    } else {
        Some(BarSink::new())
    };
    let mut noop_sink = NoopSink;
    let sink: &mut dyn ProgressSink = match bar_sink.as_mut() {
        Some(bar) => bar,
        None => &mut noop_sink,
    };

    let model = match args.variant {
        VariantArg::Classic => {
            let mut tokenizer = UbpeClassic::<Vec<u8>>::new(args.vocab_size, 256)
                .context("building tokenizer")?;
            let metrics = tokenizer
                .fit_with_sink(&corpus, &options, sink)
                .context("training failed")?;
            info!(
                "trained classic model in {} rounds ({:?}), stop: {:?}",
                metrics.rounds.len(),
                metrics.total_duration,
                metrics.stop_reason
            );
            Model::Classic(tokenizer)
        }
        VariantArg::Universal => {
            let mut tokenizer =
                Ubpe::<Vec<u8>>::new(args.vocab_size, 256).context("building tokenizer")?;
            let metrics = tokenizer
                .fit_with_sink(&corpus, &options, sink)
                .context("training failed")?;
            info!(
                "trained universal model in {} rounds ({:?}), stop: {:?}",
                metrics.rounds.len(),
                metrics.total_duration,
                metrics.stop_reason
            );
            Model::Universal(tokenizer)
        }
    };
    if let Some(bar) = &bar_sink {
        bar.finish();
    }

    save_model(&model.to_file(), &args.output, args.pretty).context("writing model")?;
    info!("model written to {:?}", args.output);
    Ok(())
}

fn encode(args: EncodeArgs) -> Result<()> {
    let model = Model::from_file(load_model(&args.model).context("loading model")?)?;
    let doc = fs::read(&args.input)
        .with_context(|| format!("reading input {:?}", args.input))?;
    let candidates = model.encode(&doc, args.top_n).context("encoding failed")?;

    let rendered: Vec<serde_json::Value> = candidates
        .iter()
        .map(|candidate| {
            serde_json::json!({
                "ids": candidate.ids,
                "weight": candidate.weight,
            })
        })
        .collect();
    let json = if args.pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {path:?}"))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn decode(args: DecodeArgs) -> Result<()> {
    let model = Model::from_file(load_model(&args.model).context("loading model")?)?;
    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("reading input {:?}", args.input))?;
    let ids: Vec<TokenId> =
        serde_json::from_str(&json).context("input must be a JSON array of token ids")?;
    let bytes = model.decode(&ids).context("decoding failed")?;
    match &args.output {
        Some(path) => fs::write(path, bytes).with_context(|| format!("writing {path:?}"))?,
        None => io::stdout().write_all(&bytes).context("writing stdout")?,
    }
    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let file: ModelFile<u8> = load_model(&args.model).context("loading model")?;
    let variant = match file.variant {
        Variant::Classic => "classic",
        Variant::Universal => "universal",
    };
    let learned = file.state.backward_mapper.len();
    println!("variant:        {variant}");
    println!("alphabet size:  {}", file.state.alphabet_size);
    println!("target vocab:   {}", file.state.n_tokens);
    println!("learned tokens: {learned}");

    let mut heaviest = file.state.token_weights.clone();
    heaviest.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (id, weight) in heaviest.into_iter().take(5) {
        let expansion_len = file
            .state
            .backward_mapper
            .iter()
            .find(|(token, _)| *token == id)
            .map_or(0, |(_, seq)| seq.len());
        println!("  token {id:>6}  weight {weight:>10.6}  components {expansion_len}");
    }
    Ok(())
}
