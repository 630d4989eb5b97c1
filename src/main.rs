use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process,
};

use clap::{Args, Parser, Subcommand};
use hmm_tagger::{
    hmm::dict::filter_ambiguity_classes, Error, EventCounts, Hmm2, OutputFlags, Result, TaggerConfig, TaggerData,
    TaggerSpec, TextWordStream,
};

#[derive(Debug, Parser)]
#[command(version, about = "Trigram HMM part-of-speech tagger")]
#[command(propagate_version = true)]
struct Argv {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Report zero-probability paths and ambiguity classes unseen in training
    #[arg(short, long, global = true)]
    debug: bool,
    /// JSON file with tagger settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct TrainOpts {
    /// Baum-Welch iterations
    #[arg(short = 'n', long, default_value_t = 0)]
    iterations: usize,
    /// Stop each pass at the first sentence end after this many words
    #[arg(long)]
    corpus_length: Option<usize>,
    /// Write the raw counts of the last estimation step to this file
    #[arg(long)]
    save_counts: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a model from a dictionary, initialize it heuristically and train it
    Train {
        /// Tag set and rules (JSON)
        #[arg(long)]
        spec: PathBuf,
        #[arg(long)]
        dict: PathBuf,
        /// Untagged training corpus
        #[arg(long)]
        corpus: PathBuf,
        #[arg(short, long)]
        model: PathBuf,
        #[command(flatten)]
        opts: TrainOpts,
    },
    /// Build a model initialized from a hand-tagged corpus
    Supervised {
        #[arg(long)]
        spec: PathBuf,
        #[arg(long)]
        dict: PathBuf,
        /// Hand-tagged corpus
        #[arg(long)]
        tagged: PathBuf,
        /// The same corpus with every candidate analysis
        #[arg(long)]
        untagged: PathBuf,
        /// Untagged corpus for the Baum-Welch iterations
        #[arg(long)]
        corpus: Option<PathBuf>,
        #[arg(short, long)]
        model: PathBuf,
        #[command(flatten)]
        opts: TrainOpts,
    },
    /// Run more Baum-Welch iterations on an existing model
    Retrain {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(short, long)]
        model: PathBuf,
        #[command(flatten)]
        opts: TrainOpts,
    },
    /// Re-estimate a model from saved counts
    Estimate {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(required = true)]
        counts: Vec<PathBuf>,
        /// Where to write the model, defaults to overwriting it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Tag a text
    Tag {
        #[arg(short, long)]
        model: PathBuf,
        /// Print every analysis with the chosen one first
        #[arg(short, long)]
        first: bool,
        /// Print the surface form too
        #[arg(short = 'p', long)]
        show_superficial: bool,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    },
    /// Tag a text and score it against a hand-tagged version
    Eval {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(long)]
        gold: PathBuf,
        input: PathBuf,
    },
    /// Print the ambiguity classes and probabilities of a model
    Dump {
        #[arg(short, long)]
        model: PathBuf,
    },
    /// Print the first word of each ambiguity class found in a text
    FilterClasses {
        #[arg(long)]
        spec: PathBuf,
        input: Option<PathBuf>,
    },
}

fn words<P: AsRef<Path>>(path: P, td: &TaggerData) -> Result<TextWordStream<BufReader<File>>> {
    Ok(TextWordStream::new(BufReader::new(File::open(path)?), td))
}

fn input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn load_config(argv: &Argv) -> Result<TaggerConfig> {
    let mut config = match &argv.config {
        Some(path) => TaggerConfig::from_path(path)?,
        None => TaggerConfig::default(),
    };
    config.debug |= argv.debug;
    Ok(config)
}

/// Baum-Welch iterations, each followed by the rules; saves the counts of the
/// last step when asked. `counts` are those of the initialization, if any.
fn train_iterations(hmm: &mut Hmm2, corpus: &Path, opts: &TrainOpts, counts: Option<EventCounts>) -> Result<()> {
    if opts.save_counts.is_some() && opts.iterations == 0 && counts.is_none() {
        return Err(Error::InvalidConfig("--save-counts needs at least one training iteration here".to_string()));
    }
    let mut counts = counts.unwrap_or_default();
    for i in 0..opts.iterations {
        let corpus = words(corpus, hmm.data())?;
        let (c, stats) = hmm.train(corpus)?;
        hmm.apply_rules();
        log::info!("iteration {}: log-likelihood {}", i + 1, stats.log_likelihood);
        counts = c;
    }
    if let Some(path) = &opts.save_counts {
        counts.save_path(path)?;
        log::info!("counts saved to {}", path.display());
    }
    Ok(())
}

fn run(argv: Argv) -> Result<()> {
    let mut config = load_config(&argv)?;
    match argv.command {
        Command::Train { spec, dict, corpus, model, opts } => {
            config.corpus_length = opts.corpus_length.or(config.corpus_length);
            let mut hmm = Hmm2::new(TaggerSpec::from_path(spec)?.build()?, config)?;
            let dictionary = words(&dict, hmm.data())?;
            hmm.read_dictionary(dictionary)?;
            let (counts, _) = hmm.init_probabilities_kupiec(words(&corpus, hmm.data())?)?;
            hmm.apply_rules();
            train_iterations(&mut hmm, &corpus, &opts, Some(counts))?;
            hmm.data().to_path(&model)?;
            log::info!("write model to {}", model.display());
        }
        Command::Supervised { spec, dict, tagged, untagged, corpus, model, opts } => {
            config.corpus_length = opts.corpus_length.or(config.corpus_length);
            let mut hmm = Hmm2::new(TaggerSpec::from_path(spec)?.build()?, config)?;
            let dictionary = words(&dict, hmm.data())?;
            hmm.read_dictionary(dictionary)?;
            let tagged = words(&tagged, hmm.data())?;
            let raw = words(&untagged, hmm.data())?;
            let (counts, stats) = hmm.init_probabilities_from_tagged_text(tagged, raw)?;
            if stats.ambiguous_gold_tags > 0 {
                log::warn!("{} ambiguous words in the tagged corpus", stats.ambiguous_gold_tags);
            }
            hmm.apply_rules();
            train_iterations(&mut hmm, corpus.as_deref().unwrap_or(&untagged), &opts, Some(counts))?;
            hmm.data().to_path(&model)?;
            log::info!("write model to {}", model.display());
        }
        Command::Retrain { corpus, model, opts } => {
            config.corpus_length = opts.corpus_length.or(config.corpus_length);
            let mut hmm = Hmm2::new(TaggerData::from_path(&model)?, config)?;
            train_iterations(&mut hmm, &corpus, &opts, None)?;
            hmm.data().to_path(&model)?;
            log::info!("write model to {}", model.display());
        }
        Command::Estimate { model, counts, output } => {
            let mut hmm = Hmm2::new(TaggerData::from_path(&model)?, config)?;
            let mut merged = EventCounts::new();
            for path in &counts {
                merged.merge(&EventCounts::load_path(path)?);
            }
            hmm.estimate(&merged)?;
            hmm.apply_rules();
            let path = output.unwrap_or(model);
            hmm.data().to_path(&path)?;
            log::info!("write model to {}", path.display());
        }
        Command::Tag { model, first, show_superficial, input: src, output: dst } => {
            let hmm = Hmm2::new(TaggerData::from_path(&model)?, config)?;
            let mut flags = OutputFlags::empty();
            flags.set(OutputFlags::ALL_GOOD_FIRST, first);
            flags.set(OutputFlags::SHOW_SUPERFICIAL, show_superficial);
            let source = TextWordStream::new(input(src.as_ref())?, hmm.data());
            let stats = hmm.tag(source, output(dst.as_ref())?, flags)?;
            log::info!("{} words tagged, {} unknown", stats.words, stats.unknown_words);
        }
        Command::Eval { model, gold, input: src } => {
            let hmm = Hmm2::new(TaggerData::from_path(&model)?, config)?;
            let (eval, _) = hmm.evaluate(words(&src, hmm.data())?, words(&gold, hmm.data())?)?;
            print!("{eval}");
        }
        Command::Dump { model } => {
            let td = TaggerData::from_path(&model)?;
            let mut out = output(None)?;
            td.dump(&mut out)?;
            out.flush()?;
        }
        Command::FilterClasses { spec, input: src } => {
            let td = TaggerSpec::from_path(spec)?.build()?;
            let mut out = output(None)?;
            for word in filter_ambiguity_classes(TextWordStream::new(input(src.as_ref())?, &td))? {
                let first = word.analyses.first().map_or(0, |a| a.tag);
                writeln!(out, "{}", word.lexical_form(first, &td, OutputFlags::all()))?;
            }
            out.flush()?;
        }
    }
    Ok(())
}

fn main() {
    let argv = Argv::parse();
    let level = if argv.debug || argv.verbose > 1 {
        "debug"
    } else if argv.verbose == 1 {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("argv: {:?}", argv);

    if let Err(e) = run(argv) {
        log::error!("{e}");
        process::exit(1);
    }
}
