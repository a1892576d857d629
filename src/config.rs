use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::pool::PoolConfig;

/// Command line and environment settings for the server.
///
/// Every flag can also be set through the environment variable named next to
/// it, or from a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tts-pool-server",
    version,
    about = "A TTS server backed by an elastic pool of Piper pipelines"
)]
pub struct CliArgs {
    /// Interface to bind.
    ///
    /// Environment variable: `HOST`
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Environment variable: `PORT`
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory holding `<voice>.onnx` and `<voice>.onnx.json` files.
    ///
    /// Environment variable: `VOICES_DIR`
    #[arg(long, env = "VOICES_DIR", default_value = "./voices")]
    pub voices_dir: PathBuf,

    /// Voice model every pooled pipeline is built for.
    ///
    /// Fixed for the life of the process.
    ///
    /// Environment variable: `VOICE`
    #[arg(long, env = "VOICE", default_value = "en_US-lessac-medium")]
    pub voice: String,

    /// Pipelines built before the server accepts requests.
    ///
    /// Environment variable: `INITIAL_POOL_SIZE`
    #[arg(long, env = "INITIAL_POOL_SIZE", default_value_t = 10)]
    pub initial_pool_size: usize,

    /// Grow the pool when fewer than this many pipelines would stay idle.
    ///
    /// Environment variable: `MIN_SPARE`
    #[arg(long, env = "MIN_SPARE", default_value_t = 2)]
    pub min_spare: usize,

    /// Upper bound on pipelines ever alive at once.
    ///
    /// Environment variable: `MAX_POOL_SIZE`
    #[arg(long, env = "MAX_POOL_SIZE", default_value_t = 20)]
    pub max_pool_size: usize,

    /// Seconds a request waits for a free pipeline before getting a 503.
    ///
    /// Environment variable: `ACQUIRE_TIMEOUT_SECS`
    #[arg(long, env = "ACQUIRE_TIMEOUT_SECS", default_value_t = 10)]
    pub acquire_timeout_secs: u64,

    /// ONNX Runtime intra-op threads per pipeline.
    ///
    /// Environment variable: `INTRA_THREADS`
    #[arg(long, env = "INTRA_THREADS", default_value_t = 1)]
    pub intra_threads: usize,

    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `LOG_LEVEL`
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub voices_dir: PathBuf,
    pub voice: String,
    pub intra_threads: usize,
    pub log_level: String,
    pub pool: PoolConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let addr: SocketAddr = format!("{}:{}", args.host, args.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

        if args.voice.trim().is_empty() {
            anyhow::bail!("VOICE must not be empty");
        }

        let pool = PoolConfig {
            initial_size: args.initial_pool_size,
            min_spare: args.min_spare,
            max_size: args.max_pool_size,
            acquire_timeout: Duration::from_secs(args.acquire_timeout_secs),
        };
        pool.validate()?;

        Ok(Self {
            addr,
            voices_dir: args.voices_dir,
            voice: args.voice,
            intra_threads: args.intra_threads,
            log_level: args.log_level,
            pool,
        })
    }
}
