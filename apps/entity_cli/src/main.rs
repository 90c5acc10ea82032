use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, ApiConnector, ControllerSingleton, Entity, HttpApiConnector, QueryParameters,
    Session,
};
use models::{Account, JournalStatus, SalesInvoice, SalesInvoiceLine};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured API root.
    #[arg(long)]
    base_url: Option<String>,
    /// Division the requests run against; defaults to the configured one.
    #[arg(long, default_value = "")]
    division: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Get {
        entity: EntityKind,
        #[command(flatten)]
        query: QueryArgs,
    },
    GetEntity {
        entity: EntityKind,
        identifier: String,
        #[arg(long)]
        select: Vec<String>,
    },
    Count {
        entity: EntityKind,
        #[command(flatten)]
        query: QueryArgs,
    },
    Delete {
        entity: EntityKind,
        identifier: String,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    filter: Option<String>,
    #[arg(long)]
    select: Vec<String>,
    #[arg(long)]
    expand: Option<String>,
    #[arg(long)]
    top: Option<u32>,
}

impl QueryArgs {
    fn to_parameters(&self) -> String {
        let mut query = QueryParameters::new();
        if let Some(filter) = &self.filter {
            query = query.filter(filter.as_str());
        }
        if !self.select.is_empty() {
            query = query.select(self.select.iter().map(String::as_str));
        }
        if let Some(expand) = &self.expand {
            query = query.expand(expand.as_str());
        }
        if let Some(top) = self.top {
            query = query.top(top);
        }
        query.to_query_string()
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EntityKind {
    Account,
    SalesInvoice,
    SalesInvoiceLine,
    JournalStatus,
}

async fn run<T: Entity>(session: &Session, command: Command) -> Result<()> {
    let controller = session.get_controller::<T>()?;
    match command {
        Command::Get { query, .. } => {
            let page = controller.get_page(&query.to_parameters()).await?;
            println!("{}", serde_json::to_string_pretty(&page.items)?);
            if let Some(next) = page.next {
                info!(%next, "more results available");
            }
        }
        Command::GetEntity {
            identifier, select, ..
        } => {
            let parameters = if select.is_empty() {
                String::new()
            } else {
                QueryParameters::new()
                    .select(select.iter().map(String::as_str))
                    .to_query_string()
            };
            let entity = controller.get_entity(&identifier, &parameters).await?;
            println!("{}", serde_json::to_string_pretty(&entity)?);
        }
        Command::Count { query, .. } => {
            let count = controller.count(&query.to_parameters()).await?;
            println!("{count}");
        }
        Command::Delete { identifier, .. } => {
            let entity = controller.get_entity(&identifier, "").await?;
            let deleted = controller.delete(Some(&entity)).await?;
            println!("{}", serde_json::json!({ "deleted": deleted, "identifier": identifier }));
        }
    }
    Ok(())
}

fn entity_kind(command: &Command) -> EntityKind {
    match command {
        Command::Get { entity, .. }
        | Command::GetEntity { entity, .. }
        | Command::Count { entity, .. }
        | Command::Delete { entity, .. } => *entity,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let connector: Arc<dyn ApiConnector> = Arc::new(HttpApiConnector::new(settings)?);
    let session = ControllerSingleton::global().get_instance(connector, &cli.division);

    match entity_kind(&cli.command) {
        EntityKind::Account => run::<Account>(&session, cli.command).await,
        EntityKind::SalesInvoice => run::<SalesInvoice>(&session, cli.command).await,
        EntityKind::SalesInvoiceLine => run::<SalesInvoiceLine>(&session, cli.command).await,
        EntityKind::JournalStatus => run::<JournalStatus>(&session, cli.command).await,
    }
}
