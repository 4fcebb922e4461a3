use aether::{
    AetherClient, CallArg, CallOptions, CancelSignal, DatabaseSchema, Dialect, RetryOptions,
    TableMethod,
};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "aether")]
#[command(about = "Query a PostgREST/pREST gateway from the command line", long_about = None)]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "AETHER_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Bearer token sent as Authorization header
    #[arg(long, env = "AETHER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Query dialect: postgrest or prest
    #[arg(long, env = "AETHER_DIALECT", default_value = "postgrest")]
    dialect: Dialect,

    /// Extra header, e.g. -H "X-Tenant: acme"
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Schema description (JSON) used to check tables before calling
    #[arg(long)]
    schema_file: Option<String>,

    /// Retries for transient failures
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List rows matching a query
    FindMany(ReadArgs),
    /// Fetch the first row matching a query
    FindOne(ReadArgs),
    /// Insert one row or an array of rows
    Create {
        #[command(flatten)]
        target: Target,
        /// Row data as JSON
        #[arg(long)]
        data: String,
    },
    /// Update rows matching a filter
    Update {
        #[command(flatten)]
        target: Target,
        /// Filter as JSON, required
        #[arg(long = "where")]
        filter: String,
        /// Changes as JSON
        #[arg(long)]
        data: String,
    },
    /// Delete rows matching a filter
    Delete {
        #[command(flatten)]
        target: Target,
        /// Filter as JSON, required
        #[arg(long = "where")]
        filter: String,
    },
    /// Call a plugin function
    Rpc {
        namespace: String,
        function: String,
        /// Payload as JSON
        #[arg(long)]
        payload: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Table name
    table: String,

    /// Database schema
    #[arg(long, default_value = "public")]
    schema: String,
}

#[derive(Args, Debug)]
struct ReadArgs {
    #[command(flatten)]
    target: Target,

    /// Comma-separated projection
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,

    /// Filter as JSON, e.g. '{"age": {"$gt": 18}}'
    #[arg(long = "where")]
    filter: Option<String>,

    /// Order terms, e.g. --order age.desc
    #[arg(long)]
    order: Vec<String>,

    #[arg(long)]
    limit: Option<u64>,

    #[arg(long)]
    offset: Option<u64>,
}

impl ReadArgs {
    fn to_options(&self) -> anyhow::Result<Value> {
        let mut options = json!({});
        if !self.select.is_empty() {
            options["select"] = json!(self.select);
        }
        if let Some(filter) = &self.filter {
            options["where"] = parse_json("--where", filter)?;
        }
        if !self.order.is_empty() {
            options["order"] = json!(self.order);
        }
        if let Some(limit) = self.limit {
            options["limit"] = json!(limit);
        }
        if let Some(offset) = self.offset {
            options["offset"] = json!(offset);
        }
        Ok(options)
    }
}

fn parse_json(flag: &str, text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", flag))
}

fn parse_header(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("Invalid header '{}', expected 'Name: value'", raw),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aether=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut builder = AetherClient::builder(&cli.url)
        .dialect(cli.dialect.clone())
        .retry(RetryOptions {
            max_retries: cli.retries,
            ..RetryOptions::default()
        })
        .timeout_ms(cli.timeout_ms);
    if let Some(token) = &cli.token {
        builder = builder.bearer_token(token);
    }
    for raw in &cli.headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }
    let client = builder.build()?;

    let schema = match &cli.schema_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema file {}", path))?;
            Some(DatabaseSchema::from_json(&text)?)
        }
        None => None,
    };

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });
    let options = CallOptions::new().cancel_on(cancel);

    let (path, args): (Vec<String>, Vec<CallArg>) = match &cli.command {
        Command::FindMany(read) | Command::FindOne(read) => {
            let method = match &cli.command {
                Command::FindMany(_) => TableMethod::FindMany,
                _ => TableMethod::FindOne,
            };
            (
                table_path(schema.as_ref(), &read.target, method)?,
                vec![read.to_options()?.into()],
            )
        }
        Command::Create { target, data } => (
            table_path(schema.as_ref(), target, TableMethod::Create)?,
            vec![parse_json("--data", data)?.into()],
        ),
        Command::Update {
            target,
            filter,
            data,
        } => (
            table_path(schema.as_ref(), target, TableMethod::Update)?,
            vec![
                parse_json("--where", filter)?.into(),
                parse_json("--data", data)?.into(),
            ],
        ),
        Command::Delete { target, filter } => (
            table_path(schema.as_ref(), target, TableMethod::Delete)?,
            vec![parse_json("--where", filter)?.into()],
        ),
        Command::Rpc {
            namespace,
            function,
            payload,
        } => {
            let args = match payload {
                Some(payload) => vec![parse_json("--payload", payload)?.into()],
                None => Vec::new(),
            };
            (
                vec![
                    aether::PLUGIN_NAMESPACE.to_string(),
                    namespace.clone(),
                    function.clone(),
                ],
                args,
            )
        }
    };

    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    let result = client.call_with(&path, args, &options).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn table_path(
    schema: Option<&DatabaseSchema>,
    target: &Target,
    method: TableMethod,
) -> anyhow::Result<Vec<String>> {
    if let Some(schema) = schema {
        schema.check_operation(&target.schema, &target.table, method)?;
    }
    Ok(vec![
        target.schema.clone(),
        target.table.clone(),
        method.as_str().to_string(),
    ])
}
