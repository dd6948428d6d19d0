//! `lxcdrv run`: Launch a container and wait for it to exit.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;
use lxcdrv_common::types::{ContainerId, ContainerSpec, MountSpec, NetworkConfig, ResourceLimits};
use lxcdrv_runtime::driver::Driver;
use lxcdrv_runtime::launch::IoStreams;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Container ID. A random one is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Root filesystem of the container.
    #[arg(long)]
    pub rootfs: PathBuf,

    /// Init stage executable inside the container.
    #[arg(long, default_value = "/.dockerinit")]
    pub init: PathBuf,

    /// Hostname inside the container. Defaults to the ID.
    #[arg(long, default_value = "")]
    pub hostname: String,

    /// Working directory inside the container.
    #[arg(short = 'w', long, default_value = "")]
    pub workdir: String,

    /// User to run the entrypoint as.
    #[arg(short, long, default_value = "")]
    pub user: String,

    /// Run the container privileged.
    #[arg(long)]
    pub privileged: bool,

    /// Allocate a terminal.
    #[arg(short, long)]
    pub tty: bool,

    /// Container address in CIDR notation, e.g. `172.17.0.2/16`.
    #[arg(long, requires = "gateway")]
    pub ip: Option<String>,

    /// Default gateway inside the container.
    #[arg(long, requires = "ip")]
    pub gateway: Option<String>,

    /// Interface MTU.
    #[arg(long, default_value_t = 1500)]
    pub mtu: u32,

    /// Host bridge for the container interface.
    #[arg(long, default_value = "lxcbr0")]
    pub bridge: String,

    /// Bind mount as `SRC:DST[:ro|rw]`. Repeatable.
    #[arg(short = 'v', long = "mount")]
    pub mounts: Vec<String>,

    /// Environment variable as `KEY=VALUE`. Repeatable.
    #[arg(short, long)]
    pub env: Vec<String>,

    /// CPU shares.
    #[arg(long)]
    pub cpu_shares: Option<u64>,

    /// Memory limit in bytes.
    #[arg(long)]
    pub memory: Option<u64>,

    /// Memory plus swap limit in bytes.
    #[arg(long)]
    pub memory_swap: Option<u64>,

    /// Entrypoint followed by its arguments.
    #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

/// Executes the `run` command and exits with the container's exit code.
///
/// # Errors
///
/// Returns an error if the arguments are malformed or the launch fails.
pub fn execute(driver: &Driver, args: RunArgs) -> anyhow::Result<()> {
    let spec = build_spec(args)?;
    let code = driver
        .run(&spec, IoStreams::inherit(), |started| {
            tracing::info!(id = %started.id, pid = started.pid, at = %started.started_at, "container started");
        })
        .with_context(|| format!("running container {}", spec.id))?;

    tracing::info!(id = %spec.id, code, "container finished");
    std::process::exit(code);
}

fn build_spec(args: RunArgs) -> anyhow::Result<ContainerSpec> {
    let Some((entrypoint, arguments)) = args.command.split_first() else {
        bail!("an entrypoint is required");
    };
    let id = args
        .id
        .map_or_else(ContainerId::generate, ContainerId::new);

    let mut spec = ContainerSpec::new(id, args.rootfs, args.init, entrypoint.clone());
    spec.arguments = arguments.to_vec();
    spec.hostname = args.hostname;
    spec.working_dir = args.workdir;
    spec.user = args.user;
    spec.privileged = args.privileged;
    spec.tty = args.tty;
    spec.resources = ResourceLimits {
        cpu_shares: args.cpu_shares,
        memory_bytes: args.memory,
        memory_swap_bytes: args.memory_swap,
    };

    if let (Some(ip), Some(gateway)) = (args.ip, args.gateway) {
        let (ip_address, ip_prefix_len) = parse_cidr(&ip)?;
        spec.network = Some(NetworkConfig {
            gateway,
            ip_address,
            ip_prefix_len,
            mtu: args.mtu,
            bridge: args.bridge,
        });
    }

    spec.mounts = args
        .mounts
        .iter()
        .map(|m| parse_mount(m))
        .collect::<anyhow::Result<_>>()?;
    spec.env = args
        .env
        .iter()
        .map(|e| parse_env(e))
        .collect::<anyhow::Result<_>>()?;
    Ok(spec)
}

/// Splits `ADDR/PREFIX` into its parts.
fn parse_cidr(value: &str) -> anyhow::Result<(String, u8)> {
    let Some((addr, prefix)) = value.split_once('/') else {
        bail!("address {value:?} is missing a /prefix");
    };
    let prefix: u8 = prefix
        .parse()
        .with_context(|| format!("invalid prefix length in {value:?}"))?;
    if addr.is_empty() || prefix > 128 {
        bail!("invalid address {value:?}");
    }
    Ok((addr.to_string(), prefix))
}

/// Parses `SRC:DST[:ro|rw]`.
fn parse_mount(value: &str) -> anyhow::Result<MountSpec> {
    let parts: Vec<&str> = value.split(':').collect();
    let (source, destination, writable) = match parts.as_slice() {
        [src, dst] | [src, dst, "rw"] => (*src, *dst, true),
        [src, dst, "ro"] => (*src, *dst, false),
        _ => bail!("invalid mount {value:?}, expected SRC:DST[:ro|rw]"),
    };
    if source.is_empty() || destination.is_empty() {
        bail!("invalid mount {value:?}, source and destination are required");
    }
    Ok(MountSpec {
        source: PathBuf::from(source),
        destination: PathBuf::from(destination),
        writable,
    })
}

/// Parses `KEY=VALUE`.
fn parse_env(value: &str) -> anyhow::Result<(String, String)> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => bail!("invalid environment entry {value:?}, expected KEY=VALUE"),
    }
}
