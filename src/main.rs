use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tabplot::{
    load_all, AppConfig, Args, ChartKind, ChartSettings, ConfigManager, PresetStore, RowWindow,
    Session, APP_NAME,
};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Preset maintenance flags; these exit without loading data.
fn handle_early_exit_flags(args: &Args, presets: &mut PresetStore) -> Result<Option<()>> {
    let kind = ChartKind::from(args.chart);

    if args.remove_presets {
        presets.remove_all()?;
        println!("All presets removed");
        return Ok(Some(()));
    }

    if args.list_presets {
        let names = presets.names(kind);
        if names.is_empty() {
            println!("No {} presets in {}", kind, presets.path().display());
        }
        for name in names {
            println!("{}", name);
        }
        return Ok(Some(()));
    }

    if let Some(name) = &args.delete_preset {
        if !presets.delete(kind, name)? {
            return Err(eyre!("No {} preset named '{}'", kind, name));
        }
        println!("Deleted {} preset '{}'", kind, name);
        return Ok(Some(()));
    }

    Ok(None)
}

fn run(args: &Args) -> Result<()> {
    let config_manager = ConfigManager::new(APP_NAME)?;
    if args.generate_config {
        let path = config_manager.write_default_config(args.force)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = AppConfig::load(&config_manager)?;
    config.apply_args(args);
    config.validate()?;

    let presets_path = args
        .presets_file
        .clone()
        .unwrap_or_else(|| config_manager.presets_path(&config.presets));
    let mut presets = PresetStore::open(presets_path)?;

    if let Some(()) = handle_early_exit_flags(args, &mut presets)? {
        return Ok(());
    }

    let kind = ChartKind::from(args.chart);
    let mut settings = match &args.preset {
        Some(name) => presets.load(kind, name)?,
        None => ChartSettings::default_for(kind),
    };
    settings.apply_overrides(&args.set)?;

    let mut options = config.load_options();
    options.format = args.format;
    let report = load_all(&args.paths, &options);
    if report.tables.is_empty() {
        return Err(eyre!("None of the given files could be loaded"));
    }

    let mut session = Session::new(report.tables, settings);
    session.window = RowWindow::new(args.row_start.unwrap_or(0), args.row_end);
    session.style = config.figure_style().with_labels(args);

    if let Some(name) = &args.save_preset {
        presets.save(name, &session.settings)?;
        println!("Saved {} preset '{}'", kind, name.trim());
    }

    let outcome = if args.check {
        session.render()?
    } else {
        session.render_to(&args.output)?
    };
    for warning in &outcome.warnings {
        log::warn!("{}", warning);
    }
    if outcome.chart.is_some() && !args.check {
        println!("Wrote {}", args.output.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
