use anyhow::{Context, bail};
use clap::Parser;
use snowdrift::NodeIdentity;

/// Runtime configuration for the `snowdrift-server` binary.
///
/// The node identity is the operationally critical part: every deployment
/// must assign a distinct `(datacenter_id, worker_id)` pair per process, or
/// uniqueness across the fleet is lost. All values are parsed from CLI
/// arguments or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowdrift-server",
    version,
    about = "An HTTP service generating unique, time-ordered 64-bit IDs"
)]
pub struct CliArgs {
    /// Datacenter number assigned to this process, in [1, 1024].
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", default_value_t = 1)]
    pub datacenter_id: u64,

    /// Worker number assigned to this process, in [1, 1024].
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = 1)]
    pub worker_id: u64,

    /// Reject requests whose User-Agent header is missing or malformed.
    ///
    /// Environment variable: `VALIDATE_CALLER_IDENTITY`
    #[arg(long, env = "VALIDATE_CALLER_IDENTITY", default_value_t = false)]
    pub validate_caller_identity: bool,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Maximum number of IDs returned per protobuf batch response. Larger
    /// `count` values are clamped, not rejected.
    ///
    /// Environment variable: `MAX_BATCH_SIZE`
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = 65_536)]
    pub max_batch_size: usize,
}

/// Validated configuration handed to the router.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node: NodeIdentity,
    pub validate_caller_identity: bool,
    pub server_addr: String,
    pub max_batch_size: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    /// Fails if the node identity is out of range. This happens before the
    /// listener binds: a misconfigured process must never become ready.
    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let node = NodeIdentity::new(args.datacenter_id, args.worker_id)
            .context("node identity rejected; check DATACENTER_ID and WORKER_ID")?;

        if args.max_batch_size == 0 {
            bail!("MAX_BATCH_SIZE must be greater than 0");
        }

        Ok(Self {
            node,
            validate_caller_identity: args.validate_caller_identity,
            server_addr: args.server_addr,
            max_batch_size: args.max_batch_size,
        })
    }
}
