//! `provflow-cli`: operador del orquestador.
//!
//! ```text
//! provflow-cli run --user <name> [--location <region>]
//! provflow-cli status --instance <uuid>
//! provflow-cli result --instance <uuid>
//! provflow-cli resume --instance <uuid>
//! provflow-cli list
//! ```
//!
//! `run` usa la front door síncrona (store durable si hay `DATABASE_URL`,
//! en memoria si no). El resto opera sobre el store durable.
//!
//! Códigos de salida: 0 éxito, 3 resultado fallido, 4 instancia desconocida
//! o sin backend persistente, 5 error de infraestructura.
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::warn;
use prov_adapters::{ProvisioningClient, ProvisioningRequest, SimulatedControlPlane};
use prov_core::{InMemoryInstanceStore, InstanceStore, OrchestrationResult, ResultPoll, StatusLabel};
use prov_persistence::{build_pool, PgInstanceStore};
use provflow::{init_tracing, AppConfig, AppError, ProvisioningService};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "provflow-cli", version, about = "Durable tenant provisioning orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aprovisiona un tenant y espera el resultado.
    Run {
        #[arg(long)]
        user: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Etiqueta de estado actual de una instancia.
    Status {
        #[arg(long)]
        instance: Uuid,
    },
    /// Resultado terminal de una instancia.
    Result {
        #[arg(long)]
        instance: Uuid,
    },
    /// Reanuda una instancia interrumpida y espera su resultado.
    Resume {
        #[arg(long)]
        instance: Uuid,
    },
    /// Instancias conocidas con su estado.
    List,
}

const EXIT_FAILED: u8 = 3;
const EXIT_UNKNOWN: u8 = 4;
const EXIT_INFRA: u8 = 5;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[provflow] {e}");
            return ExitCode::from(EXIT_INFRA);
        }
    };
    let client: Arc<dyn ProvisioningClient> = Arc::new(SimulatedControlPlane::new());

    let outcome = match config.database.clone() {
        Some(db) => {
            let pool = match tokio::task::spawn_blocking(move || {
                                                 build_pool(&db.url, db.min_connections, db.max_connections)
                                             }).await
            {
                Ok(Ok(pool)) => pool,
                Ok(Err(e)) => {
                    eprintln!("[provflow] pool error: {e}");
                    return ExitCode::from(EXIT_INFRA);
                }
                Err(e) => {
                    eprintln!("[provflow] pool setup task failed: {e}");
                    return ExitCode::from(EXIT_INFRA);
                }
            };
            dispatch(cli.command, config, client, Arc::new(PgInstanceStore::from_pool(pool)), true).await
        }
        None => dispatch(cli.command, config, client, Arc::new(InMemoryInstanceStore::new()), false).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[provflow] {e}");
            match e.validation() {
                Some(_) => ExitCode::from(EXIT_FAILED),
                None => ExitCode::from(EXIT_INFRA),
            }
        }
    }
}

async fn dispatch<S>(command: Command,
                     config: AppConfig,
                     client: Arc<dyn ProvisioningClient>,
                     store: Arc<S>,
                     durable: bool)
                     -> Result<ExitCode, AppError>
    where S: InstanceStore + 'static
{
    let service = ProvisioningService::new(config, client, store)?;
    if !durable && !matches!(command, Command::Run { .. }) {
        eprintln!("[provflow] this command requires DATABASE_URL to reach the durable store");
        return Ok(ExitCode::from(EXIT_UNKNOWN));
    }
    if !durable {
        warn!("DATABASE_URL is not set; the run will not be resumable");
    }

    match command {
        Command::Run { user, location } => {
            let request = ProvisioningRequest::new(user, location);
            if let Err(e) = request.validate() {
                eprintln!("[provflow] {e}");
                return Ok(ExitCode::from(EXIT_FAILED));
            }
            let (id, result) = service.run_sync(&request).await?;
            println!("instance: {id}");
            Ok(print_result(&result))
        }
        Command::Status { instance } => match service.status(instance).await? {
            StatusLabel::Unknown => Ok(unknown(instance)),
            status => {
                println!("{status}");
                Ok(ExitCode::SUCCESS)
            }
        },
        Command::Result { instance } => match service.result(instance).await? {
            ResultPoll::Unknown => Ok(unknown(instance)),
            ResultPoll::Pending(status) => {
                println!("pending: {status}");
                Ok(ExitCode::SUCCESS)
            }
            ResultPoll::Ready(result) => Ok(print_result(&result)),
        },
        Command::Resume { instance } => {
            if service.status(instance).await? == StatusLabel::Unknown {
                return Ok(unknown(instance));
            }
            warn!("resuming against the in-process simulated control plane: resources created by an earlier \
                   process are not visible, so steps past CreateResourceGroup will fail with ResourceGroupMissing");
            let result = service.resume(instance).await?;
            Ok(print_result(&result))
        }
        Command::List => {
            for (id, status) in service.list().await? {
                println!("{id}\t{status}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn unknown(instance: Uuid) -> ExitCode {
    eprintln!("[provflow] unknown orchestration instance {instance}");
    ExitCode::from(EXIT_UNKNOWN)
}

fn print_result(result: &OrchestrationResult) -> ExitCode {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("[provflow] could not render result: {e}"),
    }
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}
