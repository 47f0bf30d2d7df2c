use std::time::Duration;

use clap::{Parser, Subcommand};
use ros_z_param::prelude::*;

#[derive(Debug, Parser)]
struct Args {
    /// Name of the node whose parameters are accessed
    #[arg(short, long, default_value = "talker")]
    node: String,

    #[arg(short, long, default_value = "0", help = "ROS domain id")]
    domain: usize,

    /// Zenoh endpoints to connect to, e.g. tcp/127.0.0.1:7447
    #[arg(short, long)]
    endpoint: Vec<String>,

    #[arg(short, long, default_value = "5", help = "Seconds to wait for a reply")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the value of each parameter
    Get { names: Vec<String> },
    /// Set one parameter. The value is read as a bool, integer, double or
    /// string, in that order
    Set {
        name: String,
        value: String,
        /// Use the atomic service
        #[arg(long)]
        atomic: bool,
    },
    /// List parameter names under the given prefixes
    List {
        prefixes: Vec<String>,
        #[arg(long, default_value = "0", help = "0 means unlimited")]
        depth: u64,
    },
    /// Print the descriptor of each parameter
    Describe { names: Vec<String> },
}

fn parse_value(raw: &str) -> ParameterValue {
    if let Ok(v) = raw.parse::<bool>() {
        ParameterValue::Bool(v)
    } else if let Ok(v) = raw.parse::<i64>() {
        ParameterValue::Integer(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        ParameterValue::Double(v)
    } else {
        ParameterValue::String(raw.to_string())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut builder = ZContextBuilder::default().with_domain_id(args.domain);
    if !args.endpoint.is_empty() {
        builder = builder.with_connect_endpoints(args.endpoint.clone());
    }
    let ctx = builder.build()?;
    let node = ctx.create_node("z_param").build()?;
    let client = SyncParameterClientBuilder::new(&node)
        .with_remote_node(&args.node)
        .with_timeout(Duration::from_secs(args.timeout))
        .build()?;

    match args.command {
        Command::Get { names } => {
            for parameter in client.get_parameters(names)? {
                println!("{}: {}", parameter.name, parameter.value);
            }
        }
        Command::Set {
            name,
            value,
            atomic,
        } => {
            let parameter = ParameterVariant::new(name, parse_value(&value));
            let result = if atomic {
                client.set_parameters_atomically([parameter])?
            } else {
                client
                    .set_parameters([parameter])?
                    .into_iter()
                    .next()
                    .unwrap_or_default()
            };
            if result.successful {
                println!("Set parameter successful");
            } else {
                println!("Setting parameter failed: {}", result.reason);
            }
        }
        Command::List { prefixes, depth } => {
            let listed = client.list_parameters(prefixes, depth)?;
            for name in listed.names {
                println!("  {name}");
            }
        }
        Command::Describe { names } => {
            for d in client.describe_parameters(names)? {
                println!("Parameter name: {}", d.name);
                println!("  Type: {}", d.type_);
                if !d.description.is_empty() {
                    println!("  Description: {}", d.description);
                }
                println!("  Read only: {}", d.read_only);
                if let Some(range) = &d.integer_range {
                    println!(
                        "  Integer range: [{}, {}] step {}",
                        range.from_value, range.to_value, range.step
                    );
                }
                if let Some(range) = &d.floating_point_range {
                    println!(
                        "  Floating point range: [{}, {}] step {}",
                        range.from_value, range.to_value, range.step
                    );
                }
            }
        }
    }

    ctx.shutdown()
}
