//! CLI entry point for the signing oracle daemon.

use clap::{Parser, ValueEnum};
use signing_oracle_lib::encoding;
use signing_oracle_lib::custodian::{Custodian, KmsClient, KmsCustodian, MemoryCustodian};
use signing_oracle_lib::filter::{OperationFilter, OperationFilterConfig};
use signing_oracle_lib::http::build_router;
use signing_oracle_lib::orchestrator::SigningOrchestrator;
use signing_oracle_lib::wallet::KeyRegistry;
use signing_oracle_lib::watermark::{
    FileWatermark, IgnoreWatermark, RemoteTable, RemoteWatermark, SessionWatermark, WatermarkError,
    WatermarkStore,
};
use signing_oracle_lib::custodian::CustodianError;
use num_bigint::BigUint;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "signing-oracle")]
#[command(about = "Remote signing oracle for a Tezos-like chain", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP listener on.
    #[arg(long, default_value = "127.0.0.1:7732")]
    bind: SocketAddr,

    /// Path to the key roster (YAML).
    #[arg(long)]
    key_file: PathBuf,

    /// Signing backend.
    #[arg(long, value_enum, default_value = "memory")]
    custodian: CustodianKind,

    /// Path to the vendor PKCS#11 library, required when --custodian pkcs11.
    #[arg(long)]
    hsm_lib: Option<String>,

    /// Inline HSM PIN. Mutually exclusive with --hsm-pin-file.
    #[arg(long)]
    hsm_pin: Option<String>,

    /// Path to a file containing the HSM PIN. Mutually exclusive with --hsm-pin.
    #[arg(long)]
    hsm_pin_file: Option<PathBuf>,

    /// Cloud KMS resource name, required when --custodian kms.
    #[arg(long)]
    kms_resource: Option<String>,

    /// Anti-replay watermark backend.
    #[arg(long, value_enum, default_value = "session")]
    watermark: WatermarkKind,

    /// Path to the watermark file, required when --watermark file.
    #[arg(long)]
    watermark_file: Option<PathBuf>,

    /// Remote watermark table name, required when --watermark remote.
    #[arg(long)]
    watermark_table: Option<String>,

    /// Allow all generic operations regardless of kind.
    #[arg(long)]
    enable_generic: bool,

    /// Allow transaction operations (subject to whitelist and daily cap).
    #[arg(long)]
    enable_tx: bool,

    /// Allow ballot and proposal operations.
    #[arg(long)]
    enable_voting: bool,

    /// Comma-separated list of whitelisted transaction destination addresses
    /// (base58check pkh, e.g. tz1.../tz2.../tz3...).
    #[arg(long, value_delimiter = ',')]
    tx_whitelist: Vec<String>,

    /// Daily transaction value cap, in whole units (multiplied by 10^6 internally).
    #[arg(long, default_value_t = 0)]
    tx_daily_max: u64,

    /// Raise the log level to debug regardless of RUST_LOG.
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CustodianKind {
    Pkcs11,
    Kms,
    Memory,
}

#[derive(Clone, Copy, ValueEnum)]
enum WatermarkKind {
    Ignore,
    Session,
    File,
    Remote,
}

struct UnimplementedRemoteTable;

impl RemoteTable for UnimplementedRemoteTable {
    fn get_current_level(&self, _row_key: &str) -> Result<Option<BigUint>, WatermarkError> {
        Err(WatermarkError::Poisoned)
    }

    fn put_if_absent(&self, _row_key: &str, _level: &BigUint) -> Result<bool, WatermarkError> {
        Err(WatermarkError::Poisoned)
    }

    fn update_if(
        &self,
        _row_key: &str,
        _current_level: &BigUint,
        _new_level: &BigUint,
    ) -> Result<bool, WatermarkError> {
        Err(WatermarkError::Poisoned)
    }
}

struct UnimplementedKms;

impl KmsClient for UnimplementedKms {
    fn asymmetric_sign(&self, _resource_name: &str, _digest: &[u8; 32]) -> Result<Vec<u8>, CustodianError> {
        Err(CustodianError::Kms("no kms client wired into this binary".into()))
    }
}

fn build_custodian(cli: &Cli) -> Result<Box<dyn Custodian>, String> {
    match cli.custodian {
        CustodianKind::Memory => {
            log::warn!("using insecure in-memory custodian: do not use in production");
            Ok(Box::new(MemoryCustodian::new(
                ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]),
            )))
        }
        CustodianKind::Kms => {
            if cli.kms_resource.is_none() {
                log::warn!("--custodian kms given without --kms-resource; relying on per-key KmsResource fields");
            }
            Ok(Box::new(KmsCustodian::new(UnimplementedKms)))
        }
        CustodianKind::Pkcs11 => {
            if cli.hsm_pin.is_some() && cli.hsm_pin_file.is_some() {
                return Err("--hsm-pin and --hsm-pin-file are mutually exclusive".to_string());
            }
            let lib = cli
                .hsm_lib
                .as_deref()
                .ok_or("--custodian pkcs11 requires --hsm-lib")?;
            Err(format!(
                "pkcs11 custodian requires a vendor library binding for '{lib}' not bundled with this binary"
            ))
        }
    }
}

fn build_watermark(cli: &Cli) -> Result<Box<dyn WatermarkStore>, String> {
    match cli.watermark {
        WatermarkKind::Ignore => Ok(Box::new(IgnoreWatermark)),
        WatermarkKind::Session => Ok(Box::new(SessionWatermark::new())),
        WatermarkKind::File => {
            let path = cli
                .watermark_file
                .clone()
                .ok_or("--watermark file requires --watermark-file")?;
            FileWatermark::open(path).map(|w| Box::new(w) as Box<dyn WatermarkStore>)
                .map_err(|e| format!("failed to open watermark file: {e}"))
        }
        WatermarkKind::Remote => {
            let _table = cli
                .watermark_table
                .clone()
                .ok_or("--watermark remote requires --watermark-table")?;
            Ok(Box::new(RemoteWatermark::new(UnimplementedRemoteTable)))
        }
    }
}

fn parse_whitelist(entries: &[String]) -> Result<Vec<[u8; 20]>, String> {
    entries
        .iter()
        .map(|entry| {
            encoding::pubkey_hash_to_bytes(entry.trim())
                .map_err(|e| format!("invalid whitelist address '{entry}': {e}"))
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(message) = run(cli).await {
        log::error!("{message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let keys = KeyRegistry::load(&cli.key_file)
        .map_err(|e| format!("failed to load key file {}: {e}", cli.key_file.display()))?;
    log::info!("loaded {} key(s) from {}", keys.len(), cli.key_file.display());

    let custodian = build_custodian(&cli)?;
    let watermark = build_watermark(&cli)?;

    let tx_whitelist = parse_whitelist(&cli.tx_whitelist)?;
    let filter = OperationFilter::new(OperationFilterConfig {
        enable_generic: cli.enable_generic,
        enable_tx: cli.enable_tx,
        enable_voting: cli.enable_voting,
        tx_whitelist,
        tx_daily_max: BigUint::from(cli.tx_daily_max) * BigUint::from(1_000_000u32),
    });

    let orchestrator = Arc::new(SigningOrchestrator::new(keys, custodian, watermark, filter));
    let router = build_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cli.bind))?;
    log::info!("ready, listening on {}", cli.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;

    log::info!("shutdown signal received, exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
