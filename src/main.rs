use anyhow::{Context, Result, bail};
use clap::Parser;
use log::debug;
use paywire::http::{CallContext, ContentType, HttpClient, HttpRequest, with_retries};
use paywire::ClientConfig;
use std::io::Write;
use std::time::Duration;

/// paywire - outbound API calls for payment integrations
///
/// Sends one request through the paywire pipeline and prints the raw body of
/// a 200 response. Any other outcome is reported as a classified error.
///
/// Examples:
///   paywire call POST https://api.example.com/charges --data '{"amount":100}' --bearer sk_test
#[derive(Parser, Debug)]
#[command(author, version = env!("PAYWIRE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Default request timeout in seconds (also via PAYWIRE_TIMEOUT)
    #[arg(long, env = "PAYWIRE_TIMEOUT", value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Connection timeout in seconds
    #[arg(long = "connect-timeout", value_name = "SECS", global = true)]
    connect_timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a single request
    Call(CallArgs),
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    /// HTTP method, e.g. GET or POST
    #[arg(value_name = "METHOD")]
    method: String,

    /// Endpoint URL
    #[arg(value_name = "URL")]
    url: String,

    /// Request body as JSON
    #[arg(long, short = 'd', value_name = "JSON")]
    data: Option<String>,

    /// Send the body as application/x-www-form-urlencoded
    #[arg(long, requires = "data")]
    form: bool,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    query: Vec<(String, String)>,

    /// Extra header, repeatable
    #[arg(long = "header", short = 'H', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    headers: Vec<(String, String)>,

    /// Bearer token (also via PAYWIRE_BEARER_TOKEN)
    #[arg(long, env = "PAYWIRE_BEARER_TOKEN", conflicts_with = "basic", hide_env_values = true)]
    bearer: Option<String>,

    /// Basic credentials
    #[arg(long, value_name = "USER:PASS")]
    basic: Option<String>,

    /// Override the Host header
    #[arg(long)]
    host: Option<String>,

    /// Additional attempts on network or status failures
    #[arg(long, default_value_t = 0)]
    retries: usize,
}

impl CallArgs {
    fn to_request(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(&self.url, self.method.to_uppercase())
            .with_query_params(self.query.clone())
            .with_headers(self.headers.clone());

        if let Some(data) = &self.data {
            let body: serde_json::Value =
                serde_json::from_str(data).context("--data is not valid JSON")?;
            request = request.with_body(body);
        }

        if self.form {
            request = request.with_content_type(ContentType::FormUrlEncoded);
        }

        if let Some(token) = &self.bearer {
            request = request.with_bearer_auth(token);
        }

        if let Some(basic) = &self.basic {
            let Some((username, password)) = basic.split_once(':') else {
                bail!("--basic expects USER:PASS");
            };
            request = request.with_basic_auth(username, password);
        }

        if let Some(host) = &self.host {
            request = request.with_host(host);
        }

        Ok(request)
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))
}

fn client_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(secs) = cli.timeout {
        config = config.default_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.connect_timeout {
        config = config.connect_timeout(Duration::from_secs(secs));
    }
    config
}

async fn call(client: &HttpClient, args: &CallArgs) -> Result<()> {
    let request = args.to_request()?;
    debug!("Sending {:?}", request);

    let (ctx, cancel) = CallContext::with_cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let (ctx, request) = (&ctx, &request);
    let result = with_retries(ctx, "call", args.retries, move || {
        client.execute_raw(ctx, request)
    })
    .await;

    match result {
        Ok(body) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body).context("Failed to write response")?;
            stdout.flush().context("Failed to write response")?;
            Ok(())
        }
        Err(err) => {
            for (key, value) in err.params() {
                eprintln!("{}: {}", key, value);
            }
            Err(err.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let client = client_config(&cli).build()?;

    match &cli.command {
        Commands::Call(args) => call(&client, args).await?,
    }
    Ok(())
}
