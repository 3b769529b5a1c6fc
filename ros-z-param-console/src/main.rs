use std::path::PathBuf;
use std::time::Duration;

mod logger;

use clap::{Parser, Subcommand};
use ros_z_param::parameter::type_name;
use ros_z_param::{
    ClientConfig, CoercionMode, CommitReport, ParameterClient, ZenohTransport,
    ZenohTransportBuilder,
};
use serde_json::json;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "ros-z-param-console")]
#[command(about = "ROS2 Parameter Inspector & Editor")]
struct Cli {
    /// Zenoh router address
    #[arg(long, default_value = "tcp/127.0.0.1:7447")]
    router: String,

    /// Key expression prefix in front of every service name
    #[arg(long)]
    key_prefix: Option<String>,

    /// Service enumerating nodes (overrides ROSZ_PARAM_NODES_SERVICE)
    #[arg(long)]
    nodes_service: Option<String>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Coerce unparseable text the permissive way instead of rejecting it
    #[arg(long)]
    lenient: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List reachable nodes
    Nodes,
    /// Show the parameters of a node
    Get {
        node: String,
        /// Only show these parameters
        names: Vec<String>,
    },
    /// Set parameters from `name=value` pairs
    Set {
        node: String,
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
    /// Apply a parameter file to a node
    Load { node: String, file: PathBuf },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, found '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    // Initialize logger
    logger::init_logger(cli.json, cli.debug, cli.log_file.as_deref());

    let mut config = ClientConfig::from_env()?;
    if let Some(service) = &cli.nodes_service {
        config = config.with_nodes_service(service.clone());
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_call_timeout(Duration::from_millis(ms));
    }
    if cli.lenient {
        config = config.with_coercion(CoercionMode::Lenient);
    }

    let mut builder = ZenohTransportBuilder::default()
        .with_mode("client")
        .with_connect_endpoints([cli.router.as_str()])
        .with_query_timeout(config.call_timeout);
    if let Some(prefix) = &cli.key_prefix {
        builder = builder.with_key_prefix(prefix.as_str());
    }
    let transport = builder.build()?;
    tracing::info!(router = cli.router, "Connected to Zenoh router");

    let client = ParameterClient::new(transport, config);
    let result = run(&client, &cli).await;
    if let Err(e) = client.transport().shutdown() {
        tracing::warn!(error = %e, "Failed to close session");
    }
    result
}

async fn run(client: &ParameterClient<ZenohTransport>, cli: &Cli) -> Result<(), BoxError> {
    match &cli.command {
        Command::Nodes => {
            let nodes = client.list_nodes().await?;
            if cli.json {
                println!("{}", json!({ "nodes": nodes }));
            } else {
                nodes.iter().for_each(|node| println!("{node}"));
            }
        }
        Command::Get { node, names } => {
            client.select_node(node).await?;
            print_parameters(client, names, cli.json);
        }
        Command::Set { node, assignments } => {
            client.select_node(node).await?;
            for (name, text) in assignments {
                client.stage_text(name, text)?;
            }
            let report = client.commit().await?;
            print_commit(&report, cli.json)?;
        }
        Command::Load { node, file } => {
            client.select_node(node).await?;
            let outcome = client.load_file(file).await?;
            for name in &outcome.report.skipped {
                tracing::warn!(node = %node, name = %name, "Parameter not on node, skipped");
            }
            print_commit(&outcome.commit, cli.json)?;
        }
    }
    Ok(())
}

fn print_parameters(client: &ParameterClient<ZenohTransport>, names: &[String], json_mode: bool) {
    let parameters = client.parameters();
    let selected: Vec<&str> = if names.is_empty() {
        parameters.names().collect()
    } else {
        names.iter().map(String::as_str).collect()
    };

    if json_mode {
        let entries: serde_json::Map<String, serde_json::Value> = selected
            .iter()
            .map(|name| {
                let entry = json!({
                    "type": type_name(parameters.value(name)),
                    "value": client.display_value(name),
                });
                (name.to_string(), entry)
            })
            .collect();
        println!("{}", serde_json::Value::Object(entries));
        return;
    }

    let width = selected.iter().map(|n| n.len()).max().unwrap_or(0);
    for name in selected {
        println!(
            "{name:<width$}  {:<13}  {}",
            type_name(parameters.value(name)),
            client.display_value(name)
        );
    }
}

fn print_commit(report: &CommitReport, json_mode: bool) -> Result<(), BoxError> {
    let divergent = report.divergent();

    if json_mode {
        let divergent: Vec<_> = divergent
            .iter()
            .map(|(p, _)| p.name.as_str())
            .collect();
        println!(
            "{}",
            json!({
                "sent": report.attempted.iter().map(|p| &p.name).collect::<Vec<_>>(),
                "acknowledged": report.acknowledged(),
                "refreshed": report.refresh.is_ok(),
                "divergent": divergent,
            })
        );
    } else {
        println!("Sent {} parameter(s)", report.attempted.len());
        for (parameter, read_back) in &divergent {
            println!(
                "{}: node reports {} after commit",
                parameter.name,
                ros_z_param::parameter::decode_for_display(*read_back)
            );
        }
    }

    if let Err(e) = &report.send {
        return Err(format!("commit failed: {e}").into());
    }
    if let Err(e) = &report.refresh {
        tracing::warn!(error = %e, "Refresh after commit failed");
    }
    Ok(())
}
