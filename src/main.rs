/// kc-v2c - V2C license checker
///
/// Command-line front end over the license engine:
/// 1. Signature and node-lock validation
/// 2. Feature consumption (perpetual / time-window / expiration)
/// 3. License introspection, as text or JSON
/// 4. Host device fingerprint for node-locked license generation
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kc_v2c::config::{load_config, ConfigError, ToolConfig};
use kc_v2c::{
    version, AlgorithmGuid, FitError, FixedClock, HostDeviceId, KeyArray, LicenseEngine, RamSource,
    StaticDeviceId,
};

#[derive(Parser, Debug)]
#[command(name = "kc-v2c", version, about = "V2C license validation engine")]
struct Cli {
    /// Path to configuration file (default: <executable>.config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// V2C license file, overriding license_path from the config
    #[arg(long, short, global = true)]
    license: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify the license signature and node lock.
    Validate,

    /// Verify the license and check that a feature may be used.
    Consume {
        feature_id: u32,

        /// Unix time to decide at instead of the system clock
        #[arg(long)]
        now: Option<u32>,
    },

    /// Print the license contents.
    Info {
        #[arg(long)]
        json: bool,
    },

    /// Print the fingerprint of this device.
    Fingerprint,

    /// Print the core version.
    Version,
}

/// Key files loaded from the config, kept alive while a `KeyArray` borrows them.
struct LoadedKeys {
    material: Vec<Vec<u8>>,
    algorithms: Vec<Vec<AlgorithmGuid>>,
}

impl LoadedKeys {
    fn load(config: &ToolConfig) -> Result<Self, String> {
        let mut material = Vec::new();
        let mut algorithms = Vec::new();
        for key in &config.keys {
            let bytes =
                fs::read(&key.path).map_err(|e| format!("Failed to read key {}: {}", key.path, e))?;
            material.push(bytes);
            algorithms.push(key.algorithms.iter().map(|a| a.guid()).collect());
        }
        Ok(Self {
            material,
            algorithms,
        })
    }

    fn array(&self) -> KeyArray<'_> {
        let mut keys = KeyArray::new();
        for (material, algorithms) in self.material.iter().zip(&self.algorithms) {
            keys.push(material, algorithms);
        }
        keys
    }
}

fn load_tool_config(cli: &Cli) -> Result<ToolConfig, ConfigError> {
    match load_config(cli.config.as_deref()) {
        Ok(config) => Ok(config),
        // No adjacent .config file: run on defaults
        Err(ConfigError::Read { path, .. }) if cli.config.is_none() => {
            eprintln!("ℹ️  No config at {}, using defaults", path);
            Ok(ToolConfig::default())
        }
        Err(e) => Err(e),
    }
}

fn read_license(cli: &Cli, config: &ToolConfig) -> Result<Vec<u8>, String> {
    let path = cli
        .license
        .clone()
        .or_else(|| config.license_path.as_ref().map(PathBuf::from))
        .ok_or_else(|| "No license file given (use --license or license_path)".to_string())?;
    fs::read(&path).map_err(|e| format!("Failed to read license {}: {}", path.display(), e))
}

fn build_engine(config: &ToolConfig, now: Option<u32>) -> Result<LicenseEngine, String> {
    let mut engine = LicenseEngine::new(config.engine.clone());
    engine = match config.device_id_bytes()? {
        Some(id) => engine.with_device_id(StaticDeviceId::new(id)),
        None => engine.with_device_id(HostDeviceId),
    };
    if let Some(now) = now {
        engine = engine.with_clock(FixedClock(now));
    }
    Ok(engine)
}

fn license_failure(e: FitError) -> ExitCode {
    eprintln!("❌ {} (status {})", e, e.code());
    ExitCode::from(e.code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_tool_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.engine.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let now = match &cli.command {
        Commands::Consume { now, .. } => *now,
        _ => None,
    };
    let mut engine = match build_engine(&config, now) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    match &cli.command {
        Commands::Version => {
            let v = version();
            println!("kc-v2c {} (core {}.{}.{})", env!("CARGO_PKG_VERSION"), v.major, v.minor, v.revision);
            return ExitCode::SUCCESS;
        }
        Commands::Fingerprint => {
            return match engine.device_fingerprint() {
                Ok(fp) => {
                    println!("{}", hex::encode(fp.to_bytes()));
                    ExitCode::SUCCESS
                }
                Err(e) => license_failure(e),
            };
        }
        _ => {}
    }

    let license = match read_license(&cli, &config) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(2);
        }
    };
    let source = RamSource::new(&license);

    if let Commands::Info { json } = &cli.command {
        return match engine.license_info(&source) {
            Ok(info) if *json => match serde_json::to_string_pretty(&info) {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Failed to serialise license info: {}", e);
                    ExitCode::from(2)
                }
            },
            Ok(info) => {
                print!("{}", info);
                ExitCode::SUCCESS
            }
            Err(e) => license_failure(e),
        };
    }

    let loaded = match LoadedKeys::load(&config) {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(2);
        }
    };
    let keys = loaded.array();

    match &cli.command {
        Commands::Validate => {
            eprintln!("🔍 Validating license...");
            match engine.validate_license(&source, &keys) {
                Ok(()) => {
                    eprintln!("✅ License signature verified");
                    ExitCode::SUCCESS
                }
                Err(e) => license_failure(e),
            }
        }
        Commands::Consume { feature_id, .. } => {
            eprintln!("🔍 Consuming feature {}...", feature_id);
            match engine.consume_license(&source, *feature_id, &keys) {
                Ok(model) if model.is_perpetual => {
                    eprintln!("✅ Feature {} granted (perpetual)", feature_id);
                    ExitCode::SUCCESS
                }
                Ok(model) => {
                    eprintln!(
                        "✅ Feature {} granted until {}",
                        feature_id,
                        kc_v2c::info::format_date(model.end_date)
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => license_failure(e),
            }
        }
        _ => ExitCode::SUCCESS,
    }
}
