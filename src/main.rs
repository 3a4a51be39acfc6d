//! wasmcell CLI entry point.
//!
//! A thin driver over the host crate: spins up a fresh runtime instance,
//! registers built-in or file-based modules, and invokes a single export
//! with typed textual arguments.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wasmcell_common::ConfigFile;
use wasmcell_core::{ArgType, BuiltinCatalog, FunctionCall, WasmArg, WasmHost};

#[derive(Parser)]
#[command(name = "wasmcell", version, about = "Multi-tenant WebAssembly execution host")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true, env = "WASMCELL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in modules embedded in this binary.
    Builtins,

    /// Execute one export of a module in a fresh runtime instance.
    Run {
        /// Built-in module to register, by name.
        #[arg(long, conflicts_with = "module")]
        builtin: Option<String>,

        /// Path to a Wasm bytecode file to register.
        #[arg(long)]
        module: Option<PathBuf>,

        /// Export to invoke.
        #[arg(long)]
        function: String,

        /// Typed argument as TYPE:VALUE (e.g. `i32:10`); repeatable.
        #[arg(long = "arg")]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wasmcell=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_file = match &cli.config {
        Some(path) => {
            ConfigFile::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => ConfigFile::default(),
    };

    match cli.command {
        Command::Builtins => list_builtins(),
        Command::Run {
            builtin,
            module,
            function,
            args,
        } => run(&config_file, builtin, module, &function, &args).await?,
    }

    Ok(())
}

fn list_builtins() {
    for entry in BuiltinCatalog::global().iter() {
        println!("{}  ({} bytes)", entry.name, entry.bytes.len());
    }
}

async fn run(
    config_file: &ConfigFile,
    builtin: Option<String>,
    module: Option<PathBuf>,
    function: &str,
    raw_args: &[String],
) -> anyhow::Result<()> {
    let host = WasmHost::new(&config_file.host).context("initializing host")?;
    let handle = host.initialize_runtime();
    info!(%handle, "Runtime instance created");

    // Modules listed in the config file are registered first.
    for entry in &config_file.modules {
        let bytes = std::fs::read(&entry.path).with_context(|| format!("reading {}", entry.path))?;
        host.register_module(handle, &entry.name, &bytes)?;
    }

    let target = match (builtin, module) {
        (Some(name), None) => {
            let entry = BuiltinCatalog::global()
                .get_by_name(&name)
                .with_context(|| format!("no built-in module named '{name}'"))?;
            host.register_builtin(handle, entry.builtin, None)?
        }
        (None, Some(path)) => {
            let name = module_name_from_path(&path)?;
            let bytes =
                std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            host.register_module(handle, &name, &bytes)?
        }
        (None, None) => match config_file.modules.first() {
            Some(entry) => entry.name.clone(),
            None => bail!("no module given: pass --builtin, --module, or a config file"),
        },
        (Some(_), Some(_)) => unreachable!("clap rejects --builtin with --module"),
    };

    let args = raw_args
        .iter()
        .map(|raw| parse_typed_arg(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let call = FunctionCall::new(function, args);
    let result = host.execute(handle, &target, &call).await?;

    println!("{result}");
    Ok(())
}

fn module_name_from_path(path: &std::path::Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(ToString::to_string)
        .with_context(|| format!("cannot derive a module name from {}", path.display()))
}

/// Parse a `TYPE:VALUE` pair into a typed argument.
fn parse_typed_arg(raw: &str) -> anyhow::Result<WasmArg> {
    let Some((type_name, value)) = raw.split_once(':') else {
        bail!("malformed argument '{raw}': expected TYPE:VALUE (e.g. i32:10)");
    };

    let arg_type = match type_name {
        "i32" => ArgType::I32,
        "i64" => ArgType::I64,
        "f32" => ArgType::F32,
        "f64" => ArgType::F64,
        "v128" => ArgType::V128,
        "externref" => ArgType::ExternRef,
        "funcref" => ArgType::FuncRef,
        other => bail!("unknown argument type '{other}'"),
    };

    Ok(WasmArg::new(value, arg_type))
}
