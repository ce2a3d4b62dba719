use anyhow::Result;
use clap::{Parser, ValueEnum};
use mcps::{
    AgentError, ChatOptions, ConfigSource, GeminiAdapter, McpChatClient, McpClient, ModelAdapter,
    OpenAiAdapter, Settings,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    Openai,
    Gemini,
}

#[derive(Parser, Debug)]
#[clap(
    name = "mcps",
    version,
    about = "Chat with an LLM that can call tools on your MCP servers"
)]
struct Args {
    /// Server configuration: a JSON/TOML file or inline JSON
    /// (defaults to MCP_SERVERS_PATH, then mcp-servers.json)
    #[clap(short, long)]
    config: Option<String>,

    /// Model provider
    #[clap(short, long, value_enum, default_value = "openai")]
    provider: Provider,

    /// Model name (provider default when omitted)
    #[clap(short, long)]
    model: Option<String>,

    /// Maximum tool rounds per answer
    #[clap(long, default_value_t = mcps::agent::DEFAULT_MAX_TURNS)]
    max_turns: usize,

    /// Print the merged tool catalog and exit
    #[clap(long)]
    list_tools: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Question to ask
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let settings = Settings::from_env();
    let source = match &args.config {
        Some(config) => ConfigSource::infer(config),
        None => ConfigSource::FilePath(settings.mcp_servers_path.clone()),
    };

    let prompt = match (&args.prompt, args.list_tools) {
        (Some(prompt), false) => prompt.clone(),
        _ => return list_tools(source).await,
    };

    let options = ChatOptions::new().with_max_turns(args.max_turns);
    let answer = match args.provider {
        Provider::Openai => {
            let mut adapter = OpenAiAdapter::from_settings(&settings)?;
            if let Some(model) = &args.model {
                adapter = adapter.with_model(model.clone());
            }
            chat(adapter, source, options, prompt).await?
        }
        Provider::Gemini => {
            let mut adapter = GeminiAdapter::from_settings(&settings)?;
            if let Some(model) = &args.model {
                adapter = adapter.with_model(model.clone());
            }
            chat(adapter, source, options, prompt).await?
        }
    };

    println!("{}", answer);
    Ok(())
}

async fn list_tools(source: ConfigSource) -> Result<()> {
    let mut client = McpClient::with_rmcp();
    let loaded = client.load(source).await;

    if let Ok(report) = &loaded {
        for (server, e) in &report.connect.failed {
            eprintln!("warning: {} unavailable: {}", server, e);
        }
        for tool in client.all_tools() {
            println!("{} [{}]: {}", tool.name, tool.server, tool.description);
        }
    }

    client.close().await;
    loaded?;
    Ok(())
}

async fn chat<A>(adapter: A, source: ConfigSource, options: ChatOptions, prompt: String) -> Result<String>
where
    A: ModelAdapter + 'static,
{
    info!("Using {} ({})", adapter.name(), adapter.model());

    let answer = McpChatClient::open(adapter)
        .with_options(options)
        .run(|client| {
            Box::pin(async move {
                let report = client.load(source).await?;
                if report.connect.connected.is_empty() && report.servers > 0 {
                    warn!("No MCP server connected; answering without tools");
                }

                tokio::select! {
                    answer = client.chat(&prompt) => answer,
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Interrupted, closing sessions");
                        Err(AgentError::Cancelled)
                    }
                }
            })
        })
        .await?;

    Ok(answer)
}
