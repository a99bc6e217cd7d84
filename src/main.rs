use std::{io::stderr, net::SocketAddr};

use clap::Parser;
use hiredesk::{
    api::{start_api, ApiContext},
    mail::default::{DefaultMailSender, DefaultMailSenderArgs},
};
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter,
};

// Main

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter)?;
    let ctx = ApiContext {
        mail_sender: DefaultMailSender::new(args.mail)?,
    };
    start_api(args.bind_addr, ctx).await
}

// Args

#[derive(Clone, Debug, Eq, Parser, PartialEq)]
#[command(version)]
struct Args {
    #[arg(
        long,
        env,
        default_value = "0.0.0.0:8080",
        long_help = "Address on which listen requests"
    )]
    bind_addr: SocketAddr,
    #[arg(
        long,
        env,
        default_value = "hiredesk=info,warn",
        long_help = "Log filter (https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)"
    )]
    log_filter: String,
    #[command(flatten)]
    mail: DefaultMailSenderArgs,
}

// Functions

fn init_tracing(log_filter: String) -> anyhow::Result<()> {
    let filter = EnvFilter::builder().parse(log_filter)?;
    let sub = layer().with_writer(stderr);
    registry().with(filter).with(sub).try_init()?;
    Ok(())
}
