use clap::Parser;
use std::path::PathBuf;
use wavsk::actions::ACTION_NAMES;
use wavsk::{create_action, process_file, CacheConfig, SearchParams};

#[derive(Debug, Parser)]
#[command(
    name = "wavsk",
    version,
    about = "Streaming WAV toolkit: silence removal, cutting, noise gating",
    after_help = "Action options go after `--`, e.g.\n  wavsk --input in.wav --output out.wav --action silence-remover -- --silencethreshold 100"
)]
struct Cli {
    /// Input WAV file.
    #[arg(short, long)]
    input: PathBuf,

    /// Output WAV file; must not exist yet.
    #[arg(short, long)]
    output: PathBuf,

    /// Action to run.
    #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(ACTION_NAMES))]
    action: String,

    /// Log at debug level.
    #[arg(short, long)]
    debug: bool,

    /// Probe windows per second used by spectral refinement.
    #[arg(long, default_value_t = 10)]
    probe_frequency: u32,

    /// Allowed drift of the average probe distance, in percent.
    #[arg(long, default_value_t = 0.0)]
    average_tolerance: f64,

    /// Allowed drift of the largest probe distance, in percent.
    #[arg(long, default_value_t = 20.0)]
    max_tolerance: f64,

    /// Options for the action.
    #[arg(last = true)]
    action_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> wavsk::Result<()> {
    if !cli.input.exists() {
        return Err(wavsk::WskError::InvalidArgument(format!(
            "input file {} does not exist",
            cli.input.display()
        )));
    }
    let params = SearchParams::new()
        .with_probe_frequency(cli.probe_frequency)
        .with_tolerances(cli.average_tolerance, cli.max_tolerance);
    params.validate()?;

    let mut action = create_action(&cli.action, &cli.action_args, &params)?;
    let written = process_file(&cli.input, &cli.output, action.as_mut(), &CacheConfig::new())?;
    log::info!("Wrote {} frames to {}", written, cli.output.display());
    Ok(())
}
