use anyhow::{Context, bail};
use clap::Parser;
use core::{num::NonZeroUsize, time::Duration};
use snowmint::{DEFAULT_EPOCH_FORMAT, RetryBudget, SnowflakeId, parse_epoch};
use std::net::{IpAddr, SocketAddr};

/// Runtime configuration for the `snowmint-server` binary.
///
/// Every setting can be given as a flag or through its environment variable
/// (a `.env` file in the working directory is loaded first). The identity
/// pair must be unique across every instance sharing an ID namespace.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowmint-server",
    version,
    about = "An HTTP service issuing Snowflake-style IDs"
)]
pub struct CliArgs {
    /// IP address to bind.
    ///
    /// Environment variable: `IP_ADDR`
    #[arg(short = 'a', long = "addr", env = "IP_ADDR", default_value = "127.0.0.1")]
    pub addr: IpAddr,

    /// TCP port to listen on.
    ///
    /// Environment variable: `PORT`
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Epoch all ID timestamps are measured from.
    ///
    /// Must not lie in the future. Changing it on a running deployment can
    /// reissue IDs, so treat it as fixed once chosen.
    ///
    /// Environment variable: `START_TIME`
    #[arg(
        short = 's',
        long,
        env = "START_TIME",
        default_value = "2016-01-01 00:00:00 +0000"
    )]
    pub start_time: String,

    /// strftime-style layout used to parse `--start-time`.
    ///
    /// Environment variable: `START_TIME_FORMAT`
    #[arg(long, env = "START_TIME_FORMAT", default_value = DEFAULT_EPOCH_FORMAT)]
    pub start_time_format: String,

    /// Datacenter ID encoded into every ID (0-31).
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(short, long, env = "DATACENTER_ID", default_value_t = 1)]
    pub datacenter_id: u64,

    /// Worker ID encoded into every ID (0-31).
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(short, long, env = "WORKER_ID", default_value_t = 1)]
    pub worker_id: u64,

    /// Attempts per ID before a request fails with 500.
    ///
    /// Environment variable: `RETRY`
    #[arg(short, long, env = "RETRY", default_value_t = 5)]
    pub retry: usize,

    /// Largest `limit` accepted by `/ids`.
    ///
    /// Environment variable: `MAX_BATCH`
    #[arg(long, env = "MAX_BATCH", default_value_t = 4096)]
    pub max_batch: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub epoch: Duration,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub retry: RetryBudget,
    pub max_batch: NonZeroUsize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.datacenter_id > SnowflakeId::MAX_DATACENTER_ID {
            bail!(
                "DATACENTER_ID ({}) exceeds the datacenter ID space (max = {})",
                args.datacenter_id,
                SnowflakeId::MAX_DATACENTER_ID
            );
        }

        if args.worker_id > SnowflakeId::MAX_WORKER_ID {
            bail!(
                "WORKER_ID ({}) exceeds the worker ID space (max = {})",
                args.worker_id,
                SnowflakeId::MAX_WORKER_ID
            );
        }

        if args.retry == 0 {
            bail!("RETRY must be greater than 0");
        }

        let max_batch = NonZeroUsize::new(args.max_batch)
            .ok_or_else(|| anyhow::anyhow!("MAX_BATCH must be greater than 0"))?;

        let epoch = parse_epoch(&args.start_time, &args.start_time_format)
            .context("START_TIME could not be parsed")?;

        Ok(Self {
            server_addr: SocketAddr::new(args.addr, args.port),
            epoch,
            datacenter_id: args.datacenter_id,
            worker_id: args.worker_id,
            retry: RetryBudget::new(args.retry),
            max_batch,
        })
    }
}
