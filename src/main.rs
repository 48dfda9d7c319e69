use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use naivetrack::{
    Attribute, ChromosomeList, EntryFilter, Field, MergeConfig, SampleFilter, SummarizeEntries,
    TrackEntry, TrackError, TrackParser,
};

const FORWARD_QUALITY: &str = "quality_forward";
const FORWARD_DEPTH: &str = "depth_forward";
const STDIN_PATH: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "naivetrack", about = "Merge, filter and summarize variant tracks")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge sorted track files into one track.
    Merge {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Report per-sample quality and depth for every alternate allele.
    Summarize {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also report totals restricted to the forward strand.
        #[arg(long)]
        forward_strand: bool,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Sorted track file, or `-` for stdin; repeat for every source.
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,
    /// Chromosome order shared by all inputs, comma separated.
    ///
    /// Without an explicit order chromosomes are ordered by first appearance,
    /// which fails when the inputs do not start on the same chromosome.
    #[arg(long, value_delimiter = ',', conflicts_with = "chromosome_order")]
    chromosomes: Vec<String>,
    /// File listing the chromosome order, one per line (a .fai works).
    #[arg(long)]
    chromosome_order: Option<PathBuf>,
    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Largest expected chromosome size.
    #[arg(long, default_value_t = 3_000_000_000)]
    maximum_chromosome_size: u64,
    /// Coordinates per merge window.
    #[arg(long, default_value_t = naivetrack::track::DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Quality an alternate allele must exceed in at least one sample.
    #[arg(long)]
    minimum_quality: Option<f64>,
    /// Quality an alternate allele must stay below in at least one sample.
    #[arg(long)]
    maximum_quality: Option<f64>,
    /// Minimum quality fraction of the sample total.
    #[arg(long)]
    minimum_quality_frequency: Option<f64>,
    /// Maximum quality fraction of the sample total.
    #[arg(long)]
    maximum_quality_frequency: Option<f64>,
    /// Depth an alternate allele must exceed in at least one sample.
    #[arg(long)]
    minimum_depth: Option<f64>,
    /// Depth an alternate allele must stay below in at least one sample.
    #[arg(long)]
    maximum_depth: Option<f64>,
    /// Minimum depth fraction of the sample total.
    #[arg(long)]
    minimum_depth_frequency: Option<f64>,
    /// Maximum depth fraction of the sample total.
    #[arg(long)]
    maximum_depth_frequency: Option<f64>,
    /// Remove alternate alleles containing N.
    #[arg(long)]
    remove_n: bool,
    /// Drop positions left with reference alleles only.
    #[arg(long)]
    no_reference: bool,
}

impl FilterArgs {
    fn build(&self) -> Result<Option<SampleFilter>> {
        let mut filter = SampleFilter::new();
        let value_bounds = [
            (Field::Quality, self.minimum_quality, self.maximum_quality),
            (Field::Depth, self.minimum_depth, self.maximum_depth),
        ];
        for (field, lower, upper) in value_bounds {
            if lower.is_some() || upper.is_some() {
                filter.add_value_filter(field, lower, upper)?;
            }
        }
        let frequency_bounds = [
            (
                Field::Quality,
                self.minimum_quality_frequency,
                self.maximum_quality_frequency,
            ),
            (
                Field::Depth,
                self.minimum_depth_frequency,
                self.maximum_depth_frequency,
            ),
        ];
        for (field, lower, upper) in frequency_bounds {
            if lower.is_some() || upper.is_some() {
                filter.add_frequency_filter(field, lower, upper)?;
            }
        }
        filter.remove_n_alleles = self.remove_n;
        filter.remove_all_reference = self.no_reference;

        Ok((filter.n_filters_defined() > 0).then_some(filter))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Merge { input, filter } => run_merge(&input, &filter)?,
        Commands::Summarize {
            input,
            filter,
            forward_strand,
        } => run_summarize(&input, &filter, forward_strand)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn chromosome_list(input: &InputArgs) -> Result<ChromosomeList> {
    if let Some(path) = &input.chromosome_order {
        let file = File::open(path)
            .with_context(|| format!("failed to open chromosome order {}", path.display()))?;
        return ChromosomeList::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read chromosome order {}", path.display()));
    }
    Ok(ChromosomeList::from_names(&input.chromosomes))
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN_PATH
}

fn open_parser(input: &InputArgs) -> Result<TrackParser> {
    let config = MergeConfig::default()
        .with_chunk_size(input.chunk_size)
        .with_maximum_chromosome_size(input.maximum_chromosome_size);
    let chromosomes = chromosome_list(input)?;
    debug!(chromosomes = chromosomes.len(), "seeded chromosome order");
    if input.inputs.iter().filter(|path| is_stdin(path)).count() > 1 {
        bail!("stdin ('{STDIN_PATH}') can only be read by one input");
    }

    let mut parser: TrackParser = TrackParser::with_chromosomes(config, chromosomes)
        .context("invalid merge configuration")?;
    for path in &input.inputs {
        if is_stdin(path) {
            parser.register(Box::new(io::stdin().lock()));
        } else {
            parser
                .register_path(path)
                .with_context(|| format!("failed to open track {}", path.display()))?;
        }
    }
    info!(sources = parser.n_sources(), "registered track sources");
    Ok(parser)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Next merged entry that survives `filter`.
///
/// Filtering runs per entry so the parser stays available for chromosome
/// name lookups between entries.
fn next_filtered(
    parser: &mut TrackParser,
    filter: Option<&SampleFilter>,
) -> Result<Option<TrackEntry>> {
    loop {
        let entry = match parser.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err @ TrackError::OutOfOrder { .. }) => {
                return Err(err).context(
                    "merging tracks failed; inputs must be sorted, and inputs that do not \
                     start on the same chromosome need --chromosomes or --chromosome-order",
                );
            }
            Err(err) => return Err(err).context("merging tracks failed"),
        };
        let entry = match filter {
            Some(filter) => match filter.apply(entry) {
                Some(entry) => entry,
                None => continue,
            },
            None => entry,
        };
        if entry.statistics().number_of_alleles > 0 {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

fn run_merge(input: &InputArgs, filter: &FilterArgs) -> Result<()> {
    let mut parser = open_parser(input)?;
    let filter = filter.build()?;
    let mut out = open_output(input.output.as_deref())?;

    let mut written = 0usize;
    while let Some(entry) = next_filtered(&mut parser, filter.as_ref())? {
        writeln!(out, "{}", entry.display(parser.chromosomes()))?;
        written += 1;
    }
    out.flush()?;
    info!(entries = written, "merge finished");
    Ok(())
}

fn run_summarize(input: &InputArgs, filter: &FilterArgs, forward_strand: bool) -> Result<()> {
    let mut parser = open_parser(input)?;
    let filter = filter.build()?;
    let mut out = open_output(input.output.as_deref())?;

    let mut summarize = SummarizeEntries::new();
    if forward_strand {
        summarize.add_criterion(Attribute::STRAND, "forward", FORWARD_QUALITY, FORWARD_DEPTH);
    }

    write!(out, "chromosome\tcoordinate\treference\talternate\tsample\tquality\tdepth")?;
    if forward_strand {
        write!(out, "\t{FORWARD_QUALITY}\t{FORWARD_DEPTH}")?;
    }
    writeln!(out)?;

    let mut rows = 0usize;
    while let Some(entry) = next_filtered(&mut parser, filter.as_ref())? {
        let position = &entry.position;
        let chromosome = parser.chromosomes().name(position.chromosome).unwrap_or("?");
        for (sequence, samples) in summarize.summarize(&entry) {
            if sequence == position.sequence {
                continue;
            }
            for (sample, values) in samples {
                write!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    chromosome,
                    position.coordinate,
                    position.sequence,
                    sequence,
                    sample,
                    values.quality,
                    values.depth
                )?;
                if forward_strand {
                    let labelled = |label: &str| values.labelled.get(label).copied().unwrap_or(0);
                    write!(out, "\t{}\t{}", labelled(FORWARD_QUALITY), labelled(FORWARD_DEPTH))?;
                }
                writeln!(out)?;
                rows += 1;
            }
        }
    }
    out.flush()?;
    info!(rows, "summary finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_args(args: &[&str]) -> InputArgs {
        let argv = ["naivetrack", "merge"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Merge { input, .. } => input,
            Commands::Summarize { .. } => unreachable!(),
        }
    }

    #[test]
    fn chromosome_order_comes_from_the_command_line() {
        let input = input_args(&["-i", "a.var", "--chromosomes", "chr1,chr2,chrX"]);
        let chromosomes = chromosome_list(&input).unwrap();
        assert_eq!(chromosomes.names().collect::<Vec<_>>(), ["chr1", "chr2", "chrX"]);

        let unseeded = chromosome_list(&input_args(&["-i", "a.var"])).unwrap();
        assert!(unseeded.is_empty());
    }

    #[test]
    fn chromosome_sources_are_exclusive() {
        let argv = [
            "naivetrack",
            "merge",
            "-i",
            "a.var",
            "--chromosomes",
            "chr1",
            "--chromosome-order",
            "ref.fa.fai",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn stdin_is_read_once_at_most() {
        let input = input_args(&["-i", "-", "-i", "b.var", "-i", "-"]);
        assert!(is_stdin(&input.inputs[0]));
        assert!(!is_stdin(&input.inputs[1]));
        let err = open_parser(&input).err().expect("two stdin inputs are rejected");
        assert!(err.to_string().contains("stdin"));
    }
}
