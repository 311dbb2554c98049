use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stash_renamer_core::{
    app_paths, load_config, load_config_from, render_names, run_hook, save_config, stash_roots,
    target_directory, JsonSceneDirectory, RenamerConfig, RescanQueue, ResultJournal, SceneMetadata,
    SceneReport,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stash-renamer")]
#[command(about = "Renames and relocates stash scene files from metadata templates")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Handle a stash hook payload read from stdin
    Hook(HookArgs),
    /// Show the names a scene would get without touching files
    Preview(PreviewArgs),
    /// Print and clear the directories queued for a library scan
    Rescan,
    /// Show the most recent relocations
    History(HistoryArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct HookArgs {
    #[arg(long)]
    scenes_dir: PathBuf,
    #[arg(long)]
    payload_file: Option<PathBuf>,
    #[arg(long, default_value_t = false, conflicts_with = "dry_run")]
    apply: bool,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct PreviewArgs {
    #[arg(long)]
    scene: PathBuf,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default configuration if none exists yet
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Hook(args) => cmd_hook(args, config_path),
        Commands::Preview(args) => cmd_preview(args, config_path),
        Commands::Rescan => cmd_rescan(config_path),
        Commands::History(args) => cmd_history(args, config_path),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(config_path),
            ConfigAction::Init => cmd_config_init(config_path),
        },
    }
}

/// `--config` when given, the per-user config file otherwise.
fn load_settings(config_path: Option<&Path>) -> Result<RenamerConfig> {
    match config_path {
        Some(path) => Ok(load_config_from(path)?),
        None => load_config(),
    }
}

fn config_file(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(app_paths()?.config_path),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level: {level}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("could not install logger: {err}"))?;
    Ok(())
}

fn cmd_hook(args: HookArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_settings(config_path)?;
    if args.apply {
        config.dry_run = false;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    let payload = match &args.payload_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("could not read payload: {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("could not read payload from stdin")?;
            raw
        }
    };

    let source = JsonSceneDirectory::new(&args.scenes_dir);
    let roots = stash_roots(&config);
    let report = match run_hook(&payload, &source, &config, &roots) {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, fatal = err.is_fatal(), "hook aborted before touching files");
            return Err(err.into());
        }
    };

    if !config.dry_run {
        let journal = ResultJournal::new(journal_path(&config)?);
        journal.append(&report.results)?;
        let touched = report.touched_directories();
        RescanQueue::new(rescan_queue_path(&config)?).push(&touched)?;
        info!(
            journal = %journal.path().display(),
            queued = touched.len(),
            "recorded relocations"
        );
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&report),
    }

    if config.dry_run {
        eprintln!("dry run: no files were changed. Pass --apply or set dry_run = false to apply.");
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_settings(config_path)?;
    let raw = fs::read_to_string(&args.scene)
        .with_context(|| format!("could not read scene: {}", args.scene.display()))?;
    let scene: SceneMetadata =
        serde_json::from_str(&raw).context("scene file is not a valid scene record")?;

    let names = render_names(&scene, &config);
    println!("filename:   {}", names.filename);
    println!("foldername: {}", names.foldername);
    if names.studio_template {
        println!("(studio template)");
    }

    let roots = stash_roots(&config);
    if config.move_files {
        if let Some(root) = roots.first() {
            let dir = target_directory(&scene, root, &names.foldername, &config);
            println!("directory:  {}", dir.display());
        }
    }
    Ok(())
}

fn cmd_rescan(config_path: Option<&Path>) -> Result<()> {
    let config = load_settings(config_path)?;
    let paths = RescanQueue::new(rescan_queue_path(&config)?).drain()?;
    println!("{}", serde_json::to_string_pretty(&paths)?);
    Ok(())
}

fn cmd_history(args: HistoryArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_settings(config_path)?;
    let journal = ResultJournal::new(journal_path(&config)?);
    for entry in journal.tail(args.limit)? {
        println!(
            "[scene {}] {:?}: {} -> {}",
            entry.scene_id,
            entry.action,
            entry.original_path.display(),
            entry.final_path.display()
        );
    }
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_settings(config_path)?;
    println!("config file: {}", config_file(config_path)?.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = config_file(config_path)?;
    if path.exists() {
        anyhow::bail!("config already exists: {}", path.display());
    }
    save_config(&RenamerConfig::default(), &path)?;
    println!("wrote default config: {}", path.display());
    Ok(())
}

fn journal_path(config: &RenamerConfig) -> Result<PathBuf> {
    match &config.journal_path {
        Some(path) => Ok(path.clone()),
        None => Ok(app_paths()?.journal_path),
    }
}

fn rescan_queue_path(config: &RenamerConfig) -> Result<PathBuf> {
    match &config.rescan_queue_path {
        Some(path) => Ok(path.clone()),
        None => Ok(app_paths()?.rescan_queue_path),
    }
}

fn print_table(report: &SceneReport) {
    println!("scene {}: original -> new (action)", report.scene_id);
    for result in &report.results {
        println!(
            "{} -> {} ({:?})",
            result.original_path.display(),
            result.final_path.display(),
            result.action
        );
        for companion in &result.companions {
            println!(
                "  {} -> {} ({:?})",
                companion.from.display(),
                companion.to.display(),
                companion.kind
            );
        }
        for failure in &result.companion_failures {
            println!("  failed: {failure}");
        }
    }
    for skipped in &report.skipped {
        match &skipped.path {
            Some(path) => println!("skipped {}: {}", path.display(), skipped.reason),
            None => println!("skipped: {}", skipped.reason),
        }
    }

    println!(
        "\nsummary: relocated={} skipped={}",
        report.results.len(),
        report.skipped.len()
    );
}
