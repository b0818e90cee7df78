use anyhow::Result;
use clap::{Parser, Subcommand};
use stream_operator::telemetry::LogFormat;
use stream_operator::{controller, server, telemetry};
use tracing::error;

#[derive(Parser)]
#[command(
    name = "stream-operator",
    about = "Stream Operator: reconciles Stream resources against a managed stream service"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Port serving /metrics, /healthz and /readyz.
    #[arg(long, default_value_t = 8080)]
    metrics_port: u16,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Stream CRD YAML to stdout.
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    if let Some(Commands::Crd) = cli.command {
        return controller::print_crd();
    }

    let state = server::ServerState::new();

    // Run the metrics/health server and the controller concurrently.
    // If either exits, shut down.
    tokio::select! {
        res = server::run(cli.metrics_port, state.clone()) => {
            error!("metrics server exited: {res:?}");
            res
        }
        res = controller::run(state) => {
            res
        }
    }
}
