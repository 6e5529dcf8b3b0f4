//! Autarch CLI entry point.

use autarch_runtime::{DEFAULT_CONFIG_PATH, EngineConfig, explain, load_from_file, load_rule_set};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// What to do.
#[derive(Debug)]
enum Command {
    Check { rules: PathBuf },
    Explain { rules: PathBuf, snapshot: PathBuf },
}

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    command: Option<Command>,
    config_path: Option<PathBuf>,
    show_help: bool,
    show_version: bool,
    only_blocked: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "--blocked" => config.only_blocked = true,
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path".into());
                }
                config.config_path = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    if config.show_help || config.show_version {
        return Ok(config);
    }

    config.command = match positional.as_slice() {
        [cmd, rules] if cmd == "check" => Some(Command::Check {
            rules: PathBuf::from(rules),
        }),
        [cmd, rules, snapshot] if cmd == "explain" => Some(Command::Explain {
            rules: PathBuf::from(rules),
            snapshot: PathBuf::from(snapshot),
        }),
        [cmd, ..] if cmd == "check" => return Err("usage: autarch check <rules.toml>".into()),
        [cmd, ..] if cmd == "explain" => {
            return Err("usage: autarch explain <rules.toml> <snapshot.msgpack>".into());
        }
        [cmd, ..] => return Err(format!("unknown command: {cmd}").into()),
        [] => None,
    };

    Ok(config)
}

fn init_logging(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_args(args)?;

    if cli.show_help {
        print_help();
        return Ok(());
    }

    if cli.show_version {
        println!("autarch {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let engine_config = match &cli.config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    init_logging(&engine_config.log_filter);

    let Some(command) = cli.command else {
        print_help();
        return Ok(());
    };

    match command {
        Command::Check { rules } => {
            let goals = load_rule_set(&rules).inspect_err(|e| {
                tracing::error!(path = %rules.display(), error = %e, "rule set rejected");
            })?;
            let rule_count: usize = goals.iter().map(|g| g.rules.len()).sum();
            println!(
                "\x1b[32m{}: {} goals, {rule_count} rules OK\x1b[0m",
                rules.display(),
                goals.len()
            );
            for goal in &goals {
                println!("  {}", goal.name);
                for rule in &goal.rules {
                    println!("    {} (priority {}, station {})", rule.name, rule.priority, rule.station);
                }
            }
        }
        Command::Explain { rules, snapshot } => {
            let goals = load_rule_set(&rules).inspect_err(|e| {
                tracing::error!(path = %rules.display(), error = %e, "rule set rejected");
            })?;
            let snapshot = load_from_file(&snapshot)?;
            println!(
                "\x1b[1;36m=== Snapshot {} (tick {}) ===\x1b[0m",
                snapshot.version(),
                snapshot.tick()
            );
            for explanation in explain(&goals, &snapshot) {
                if cli.only_blocked && explanation.admissible {
                    continue;
                }
                print!("{explanation}");
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        "\x1b[1mAutarch\x1b[0m - Autonomous decision engine

\x1b[1mUSAGE:\x1b[0m
    autarch [OPTIONS] <COMMAND>

\x1b[1mCOMMANDS:\x1b[0m
    check <rules.toml>                       Validate a rule set
    explain <rules.toml> <snapshot.msgpack>  Explain every rule against a snapshot

\x1b[1mOPTIONS:\x1b[0m
    -h, --help           Print help information
    -V, --version        Print version information
    -c, --config PATH    Engine configuration (default: {DEFAULT_CONFIG_PATH})
    --blocked            With explain, only print rules that cannot start

\x1b[1mENVIRONMENT:\x1b[0m
    RUST_LOG             Log filter, overrides the configured log_filter

\x1b[1mEXAMPLES:\x1b[0m
    autarch check rules.toml
    autarch explain rules.toml capture.msgpack
    RUST_LOG=debug autarch --blocked explain rules.toml capture.msgpack"
    );
}
