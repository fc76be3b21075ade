//! Comm-word kernel command line interface
//!
//! Computes spectrum kernel matrices, scores sequences through the linear
//! dictionary fast path, and saves or restores diagonal init data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use commword::api::LinearScorer;
use commword::core::{KernelConfig, KernelError, NormalizationType, Result, WordFeatures};
use commword::data::{Alphabet, WordStringFeatures};
use commword::kernel::{CommWordKernel, Kernel};
use commword::persistence::DictionarySnapshot;
use env_logger::Env;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "commword")]
#[command(about = "Comm-word (spectrum) string kernel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "commword contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the kernel matrix between two sequence files
    Matrix(MatrixArgs),
    /// Score test sequences against labeled training sequences
    Score(ScoreArgs),
    /// Save or restore diagonal init data
    Diag(DiagArgs),
    /// Export the optimization dictionary built from labeled training sequences
    Dictionary(DictionaryArgs),
}

#[derive(Args)]
struct KernelArgs {
    /// Sequence alphabet
    #[arg(short, long, default_value = "dna")]
    alphabet: CliAlphabet,

    /// K-mer length
    #[arg(short = 'k', long, default_value = "3")]
    order: usize,

    /// JSON kernel configuration; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Normalization applied to kernel values
    #[arg(short, long)]
    normalization: Option<CliNormalization>,

    /// Presence kernel: count shared words instead of multiplying counts
    #[arg(long)]
    use_sign: bool,

    /// Kernel value cache size in MB
    #[arg(long)]
    cache_size: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliAlphabet {
    Dna,
    Rna,
    Protein,
}

impl From<CliAlphabet> for Alphabet {
    fn from(cli_alphabet: CliAlphabet) -> Self {
        match cli_alphabet {
            CliAlphabet::Dna => Alphabet::Dna,
            CliAlphabet::Rna => Alphabet::Rna,
            CliAlphabet::Protein => Alphabet::Protein,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliNormalization {
    /// Raw kernel value
    None,
    /// Divide by the root of the stored diagonal
    Sqrt,
    /// Divide by the self-similarity of the lhs vector
    Full,
    /// Divide by the fourth root of the vector length
    #[value(name = "sqrtlen")]
    SqrtLen,
    /// Divide by the square root of the vector length
    Len,
    /// Divide by the vector length
    #[value(name = "sqlen")]
    SqLen,
}

impl From<CliNormalization> for NormalizationType {
    fn from(cli_normalization: CliNormalization) -> Self {
        match cli_normalization {
            CliNormalization::None => NormalizationType::None,
            CliNormalization::Sqrt => NormalizationType::Sqrt,
            CliNormalization::Full => NormalizationType::Full,
            CliNormalization::SqrtLen => NormalizationType::SqrtLen,
            CliNormalization::Len => NormalizationType::Len,
            CliNormalization::SqLen => NormalizationType::SqLen,
        }
    }
}

impl KernelArgs {
    fn kernel_config(&self) -> Result<KernelConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading kernel configuration from: {path:?}");
                KernelConfig::from_file(path)?
            }
            None => KernelConfig::default(),
        };

        if let Some(normalization) = self.normalization {
            config.normalization = normalization.into();
        }
        if self.use_sign {
            config.use_sign = true;
        }
        if let Some(cache_size) = self.cache_size {
            config.cache_size = cache_size;
        }
        config.validate()?;
        Ok(config)
    }

    fn load(&self, path: &Path) -> Result<Arc<WordStringFeatures>> {
        info!("Loading sequences from: {path:?}");
        let features = WordStringFeatures::from_file(path, self.alphabet.into(), self.order)?;
        info!(
            "Loaded {} sequences ({} words of order {})",
            features.num_vectors(),
            features.num_symbols(),
            self.order
        );
        Ok(Arc::new(features))
    }
}

#[derive(Args)]
struct MatrixArgs {
    /// Left-hand sequence file
    #[arg(long)]
    lhs: PathBuf,

    /// Right-hand sequence file (defaults to the left-hand file)
    #[arg(long)]
    rhs: Option<PathBuf>,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    kernel: KernelArgs,
}

#[derive(Args)]
struct ScoreArgs {
    /// Labeled training sequences; labels are used as weights
    #[arg(long)]
    train: PathBuf,

    /// Sequences to score
    #[arg(long)]
    test: PathBuf,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    kernel: KernelArgs,
}

#[derive(Args)]
struct DiagArgs {
    /// Left-hand sequence file
    #[arg(long)]
    lhs: PathBuf,

    /// Right-hand sequence file (defaults to the left-hand file)
    #[arg(long)]
    rhs: Option<PathBuf>,

    /// Write the computed diagonal to this file
    #[arg(long, conflicts_with = "load")]
    save: Option<PathBuf>,

    /// Restore the diagonal from this file instead of computing it
    #[arg(long)]
    load: Option<PathBuf>,

    #[command(flatten)]
    kernel: KernelArgs,
}

#[derive(Args)]
struct DictionaryArgs {
    /// Labeled training sequences; labels are used as weights
    #[arg(long)]
    train: PathBuf,

    /// Output JSON file
    #[arg(short, long)]
    output: PathBuf,

    /// Number of heaviest words to log
    #[arg(long, default_value = "10")]
    top: usize,

    #[command(flatten)]
    kernel: KernelArgs,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Matrix(args) => matrix_command(args),
        Commands::Score(args) => score_command(args),
        Commands::Diag(args) => diag_command(args),
        Commands::Dictionary(args) => dictionary_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn matrix_command(args: MatrixArgs) -> Result<()> {
    let config = args.kernel.kernel_config()?;
    let lhs = args.kernel.load(&args.lhs)?;
    let rhs = match &args.rhs {
        Some(path) => args.kernel.load(path)?,
        None => Arc::clone(&lhs),
    };

    let mut kernel = CommWordKernel::with_config(config);
    kernel.init(lhs, rhs, true)?;
    info!(
        "Computing {}x{} kernel matrix ({} normalization)",
        kernel.num_lhs(),
        kernel.num_rhs(),
        kernel.config().normalization
    );

    let mut matrix = Vec::with_capacity(kernel.num_lhs());
    for a in 0..kernel.num_lhs() {
        let row = (0..kernel.num_rhs())
            .map(|b| kernel.kernel(a, b))
            .collect::<Result<Vec<f64>>>()?;
        matrix.push(row);
    }
    if let Some(stats) = kernel.cache_stats() {
        debug!(
            "Kernel cache: {} of {} entries used, hit rate {:.2}%",
            stats.size,
            stats.capacity,
            stats.hit_rate() * 100.0
        );
    }

    let rows = matrix.iter().map(|row| {
        row.iter()
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join("\t")
    });
    write_lines(args.output.as_deref(), rows)
}

fn score_command(args: ScoreArgs) -> Result<()> {
    let config = args.kernel.kernel_config()?;
    let train = args.kernel.load(&args.train)?;
    let test = args.kernel.load(&args.test)?;

    let (indices, weights) = label_weights(&train)?;
    let mut scorer = LinearScorer::new(config);
    scorer.fit(train, Arc::clone(&test), &indices, &weights)?;

    let scores = scorer.score_all()?;
    let labels = test.labels();
    if let Some(labels) = labels {
        let correct = scores
            .iter()
            .zip(labels)
            .filter(|(score, label)| (**score > 0.0) == (**label > 0.0))
            .count();
        info!(
            "Sign agreement with test labels: {:.2}%",
            correct as f64 / labels.len() as f64 * 100.0
        );
    }

    let lines = scores.iter().map(|s| format!("{s:.6}"));
    write_lines(args.output.as_deref(), lines)
}

fn diag_command(args: DiagArgs) -> Result<()> {
    let config = args.kernel.kernel_config()?;
    let lhs = args.kernel.load(&args.lhs)?;
    let rhs = match &args.rhs {
        Some(path) => args.kernel.load(path)?,
        None => Arc::clone(&lhs),
    };

    let mut kernel = CommWordKernel::with_config(config);

    match (&args.save, &args.load) {
        (Some(path), None) => {
            kernel.init(lhs, rhs, true)?;
            let writer = BufWriter::new(File::create(path)?);
            kernel.save_init(writer)?;
            info!("Init data saved to: {path:?}");
        }
        (None, Some(path)) => {
            kernel.init(lhs, rhs, true)?;
            let reader = BufReader::new(File::open(path)?);
            kernel.load_init(reader)?;
            info!("Init data restored from: {path:?}");
        }
        _ => {
            return Err(KernelError::InvalidParameter(
                "exactly one of --save or --load is required".to_string(),
            ));
        }
    }

    let lines = kernel
        .sqrtdiag_lhs()
        .unwrap_or_default()
        .iter()
        .map(|d| format!("{d:.6}"));
    write_lines(None, lines)
}

fn dictionary_command(args: DictionaryArgs) -> Result<()> {
    let config = args.kernel.kernel_config()?;
    let train = args.kernel.load(&args.train)?;
    let (indices, weights) = label_weights(&train)?;

    let mut scorer = LinearScorer::new(config);
    scorer.fit(Arc::clone(&train), train, &indices, &weights)?;
    let kernel = scorer.into_kernel();

    let snapshot = DictionarySnapshot::from_kernel(&kernel)?;
    snapshot.save_to_file(&args.output)?;
    info!(
        "Dictionary of {} words saved to: {:?}",
        snapshot.size, args.output
    );

    for (word, weight) in snapshot.top_words(args.top) {
        info!("  word {word}: {weight:.6}");
    }
    info!("Kernel: {}", kernel.name());
    Ok(())
}

/// Training indices and label weights of a labeled feature set
fn label_weights(features: &WordStringFeatures) -> Result<(Vec<usize>, Vec<f64>)> {
    let labels = features.labels().ok_or_else(|| {
        KernelError::InvalidParameter("training file must carry a label on every line".to_string())
    })?;

    if labels.iter().all(|&l| l == 0.0) {
        warn!("All training labels are zero; every score will be zero");
    }
    Ok(((0..labels.len()).collect(), labels.to_vec()))
}

fn write_lines<I>(output: Option<&Path>, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            for line in lines {
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
            info!("Output saved to: {path:?}");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for line in lines {
                writeln!(handle, "{line}")?;
            }
        }
    }
    Ok(())
}

