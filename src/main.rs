use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use tracing::{info, warn};

use hiweb::logging::{init_logging_with_config, LogConfig};
use hiweb::security::token;
use hiweb::server::HttpServer;
use hiweb::session;
use hiweb::{Claims, Dispatcher, ParamSpec, RequestContext, WebConfig};

/// Demo service exposing token issuance, an authenticated endpoint and
/// session round trips.
#[derive(Parser)]
#[command(name = "hiweb-demo", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,
    /// Port to bind
    #[arg(long, default_value_t = 8111)]
    port: u16,
    /// Optional YAML configuration file
    #[arg(long, env = "HIWEB_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging_with_config(&LogConfig::from_env())?;

    let config = match &cli.config {
        Some(path) => WebConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WebConfig::default(),
    }
    .apply_env_overrides()
    .context("applying HIWEB_* environment overrides")?;
    if config.uses_default_secret() {
        warn!("secret_key is the development default; set HIWEB_SECRET_KEY before deploying");
    }
    session::init_session_with(config.session_ttl(), config.session_sweep_interval());

    let dispatcher = build_dispatcher(Arc::new(config))?;
    let handle = HttpServer::new(dispatcher)
        .start((cli.ip.as_str(), cli.port))
        .with_context(|| format!("binding {}:{}", cli.ip, cli.port))?;
    info!(addr = %handle.local_addr(), "hiweb-demo started");

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let trigger = handle.shutdown_trigger();
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!(signal = sig, "shutdown requested");
                trigger.shutdown();
            }
        });
    }

    if handle.join().is_err() {
        anyhow::bail!("http worker panicked");
    }
    info!("hiweb-demo stopped");
    Ok(())
}

fn build_dispatcher(config: Arc<WebConfig>) -> anyhow::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new(config);

    dispatcher.route(
        "/token/gen",
        "POST",
        vec![ParamSpec::string("name"), ParamSpec::string("password")],
        false,
        gen_token,
    )?;
    dispatcher.route("/user/get", "POST", vec![], true, get_user)?;
    dispatcher.route(
        "/session/new",
        "POST",
        vec![ParamSpec::string("name")],
        false,
        new_session,
    )?;
    dispatcher.route(
        "/session/get/",
        "GET",
        vec![ParamSpec::string("sid")],
        false,
        get_session,
    )?;

    Ok(dispatcher)
}

fn gen_token(ctx: &mut RequestContext, name: String, password: String) -> anyhow::Result<()> {
    if name != "admin" || password != "admin" {
        ctx.serve_json(403, &json!({ "error": "bad credentials" }))?;
        return Ok(());
    }
    let mut claims = Claims::new();
    claims.insert("name".into(), Value::String(name));
    let token = token::issue(claims, &ctx.config().secret_key, Duration::from_secs(3600))?;
    ctx.serve_json(200, &json!({ "token": token }))?;
    Ok(())
}

fn get_user(ctx: &mut RequestContext) -> anyhow::Result<()> {
    let name = ctx.claim("name").cloned().unwrap_or(Value::Null);
    ctx.serve_json(200, &json!({ "name": name }))?;
    Ok(())
}

fn new_session(ctx: &mut RequestContext, name: String) -> anyhow::Result<()> {
    let mut claims = Claims::new();
    claims.insert("name".into(), Value::String(name));
    let sid = session::session_token(claims)?;
    ctx.serve_json(200, &json!({ "sid": sid }))?;
    Ok(())
}

fn get_session(ctx: &mut RequestContext, sid: String) -> anyhow::Result<()> {
    match session::session_get_val(&sid) {
        Some(claims) => ctx.serve_json(200, &claims)?,
        None => ctx.serve_json(404, &json!({ "error": "session not found" }))?,
    }
    Ok(())
}
