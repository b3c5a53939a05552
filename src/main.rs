use anyhow::Result;
use callsig::catalog::SignatureCatalog;
use callsig::cli::{Cli, OutputFormat};
use callsig::config::Config;
use callsig::csv_output::CsvOutput;
use callsig::json_output::JsonOutput;
use callsig::matcher::Matcher;
use callsig::program::ProgramDump;
use callsig::report::MatchList;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG or warn
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge command line overrides into the file configuration
fn resolve_config(args: &Cli) -> Result<Config> {
    let mut config = Config::discover(args.config.as_deref())?;

    if let Some(dir) = &args.signatures {
        config.signatures_dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    config.sort |= args.sort;
    if args.include_library {
        config.skip_library = false;
    }
    if args.include_thunks {
        config.skip_thunk = false;
    }

    Ok(config)
}

fn print_signatures(catalog: &SignatureCatalog) {
    for signature in catalog {
        println!("[{}] {}", signature.filename(), signature);
        if !signature.description.is_empty() {
            println!("    {}", signature.description);
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = resolve_config(&args)?;

    let load = SignatureCatalog::load(&config.signatures_dir, &config.extensions)?;
    if args.fail_on_load_error && !load.failures.is_empty() {
        anyhow::bail!(
            "{} signature file(s) failed to load from {}",
            load.failures.len(),
            config.signatures_dir.display()
        );
    }

    let catalog = load.catalog;
    tracing::info!("Loaded {} signatures", catalog.len());

    if args.list {
        print_signatures(&catalog);
        return Ok(());
    }

    let Some(program_path) = &args.program else {
        anyhow::bail!("Missing PROGRAM: a program dump is required unless --list is given");
    };
    let program = ProgramDump::from_file(program_path)?;

    let mut matches = MatchList::new();
    let summary = Matcher::with_options(&catalog, config.scan_options()).scan(&program, &mut matches)?;
    if config.sort {
        matches.sort_by_address();
    }

    tracing::info!(
        "Scanned {} functions ({} skipped, {} failed), {} calls, {} matches",
        summary.functions_scanned,
        summary.functions_skipped,
        summary.functions_failed,
        summary.calls,
        summary.matches
    );

    match config.format {
        OutputFormat::Text => print!("{}", matches.to_text()),
        OutputFormat::Json => {
            let output = JsonOutput::new(matches.records(), catalog.len(), load.failures.len(), summary);
            println!("{}", output.to_json()?);
        }
        OutputFormat::Csv => {
            let output: CsvOutput = matches.records().iter().collect();
            print!("{}", output.format());
        }
    }

    Ok(())
}
