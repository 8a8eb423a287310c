use clap::{Parser, Subcommand};
use mongo_datasource::cli as prog_cli;
use mongo_datasource::logger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AppConfig {
    settings: Option<PathBuf>,
    fixtures: Option<PathBuf>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

impl AppConfig {
    fn merge(&mut self, other: AppConfig) {
        if other.settings.is_some() { self.settings = other.settings; }
        if other.fixtures.is_some() { self.fixtures = other.fixtures; }
        if other.log_level.is_some() { self.log_level = other.log_level; }
        if other.log_dir.is_some() { self.log_dir = other.log_dir; }
    }
}

fn find_config_paths(cli_cfg: &Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = cli_cfg { paths.push(p.clone()); }
    if let Ok(p) = std::env::var("MONGO_DS_CONFIG") { paths.push(PathBuf::from(p)); }
    if let Ok(cur) = std::env::current_dir() { paths.push(cur.join("mongo-ds.toml")); }
    if let Some(dir) = dirs_next::config_dir() { paths.push(dir.join("mongo-ds.toml")); }
    paths
}

fn load_config(cli_cfg: &Option<PathBuf>) -> AppConfig {
    // Precedence: CLI > env > first config file found > defaults
    let mut cfg = AppConfig::default();
    for p in find_config_paths(cli_cfg) {
        if !p.exists() { continue; }
        match std::fs::read_to_string(&p).map_err(|e| e.to_string()).and_then(|s| toml::from_str::<AppConfig>(&s).map_err(|e| e.to_string())) {
            Ok(file_cfg) => { cfg.merge(file_cfg); break; }
            Err(e) => eprintln!("warning: ignoring config {}: {e}", p.display()),
        }
    }
    cfg.merge(AppConfig {
        settings: std::env::var("MONGO_DS_SETTINGS").ok().map(PathBuf::from),
        fixtures: std::env::var("MONGO_DS_FIXTURES").ok().map(PathBuf::from),
        log_level: std::env::var("MONGO_DS_LOG_LEVEL").ok(),
        log_dir: std::env::var("MONGO_DS_LOG_DIR").ok().map(PathBuf::from),
    });
    cfg
}

#[derive(Parser, Debug)]
#[command(name = "mongo-ds", version, about = "MongoDB aggregation datasource tools", long_about=None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, defaults are used.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Data-source settings JSON (mongodb_url, mongodb_db, stages). Takes precedence over config/env.")]
    settings: Option<PathBuf>,
    #[arg(long, help = "Directory of <collection>.ndjson fixtures. Takes precedence over config/env.")]
    fixtures: Option<PathBuf>,
    #[arg(long, help = "Log level: error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[arg(long, help = "Pretty-print output")]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Compile a query target and print the pipeline as extended JSON")]
    Compile {
        #[arg(long, help = "Target text, either db.<collection>.aggregate([...]) or a stage array; @path reads a file")]
        target: String,
        #[arg(long, help = "Collection for array targets")]
        collection: Option<String>,
        #[arg(long, help = "Result kind: timeserie|table")]
        kind: Option<String>,
        #[arg(long, default_value = "0", help = "Range start, epoch milliseconds or RFC 3339")]
        from: String,
        #[arg(long, default_value = "0", help = "Range end, epoch milliseconds or RFC 3339")]
        to: String,
        #[arg(long, default_value_t = 1, help = "Sample budget substituted for $maxDataPoints")]
        max_data_points: i64,
    },
    #[command(about = "Decode NDJSON documents into a series or table result")]
    Map {
        #[arg(long, help = "Result kind: timeserie|table")]
        kind: Option<String>,
        #[arg(long, help = "NDJSON file of extended-JSON documents")]
        input: PathBuf,
        #[arg(long, default_value = "A", help = "Reference id of the result")]
        ref_id: String,
    },
    #[command(about = "Run a datasource request (JSON file) against fixture collections")]
    Query {
        #[arg(long, help = "Request JSON file")]
        request: PathBuf,
    },
    #[command(name = "test-connection", about = "Connect, ping and disconnect")]
    TestConnection,
}

fn main() {
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config);
    cfg.merge(AppConfig {
        settings: cli.settings.clone(),
        fixtures: cli.fixtures.clone(),
        log_level: cli.log_level.clone(),
        log_dir: None,
    });
    let level = cfg.log_level.clone().unwrap_or_else(|| "warn".into());
    let log_dir = cfg.log_dir.clone().or_else(|| dirs_next::data_local_dir().map(|d| d.join("mongo-ds")));
    if let Err(e) = logger::configure_logging(log_dir.as_deref(), Some(&level), None) {
        eprintln!("warning: logging disabled: {e}");
    }

    let cmd = match cli.command {
        Commands::Compile { target, collection, kind, from, to, max_data_points } => {
            let parsed = prog_cli::parse_kind_input(&kind).and_then(|kind| {
                Ok((kind, prog_cli::parse_time_input(&from)?, prog_cli::parse_time_input(&to)?))
            });
            parsed.map(|(kind, from_ms, to_ms)| prog_cli::Command::Compile {
                target,
                collection,
                kind,
                from_ms,
                to_ms,
                max_data_points,
                settings: cfg.settings.clone(),
            })
        }
        Commands::Map { kind, input, ref_id } => {
            prog_cli::parse_kind_input(&kind).map(|kind| prog_cli::Command::Map { kind, input, ref_id })
        }
        Commands::Query { request } => Ok(prog_cli::Command::Query { request, fixtures: cfg.fixtures.clone() }),
        Commands::TestConnection => Ok(prog_cli::Command::TestConnection {
            settings: cfg.settings.clone(),
            fixtures: cfg.fixtures.clone(),
        }),
    };
    let mode = if cli.pretty { prog_cli::OutputMode::Human } else { prog_cli::OutputMode::Json };
    let mut stdout = std::io::stdout().lock();
    let r = cmd.and_then(|cmd| prog_cli::run_with_format(cmd, mode, &mut stdout));
    if let Err(e) = r { eprintln!("error: {}", e); std::process::exit(1); }
}
