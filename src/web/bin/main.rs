use clap::Parser;
use daylight::config::{Config, DEFAULT_CONFIG_FILE};
use daylight::home::{self, SharedView};
use daylight::view::ScheduleView;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short = 'p', long, help = "TCP port")]
    pub port: Option<u16>,
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE, help = "configuration file")]
    pub config: PathBuf,
    #[arg(short = 't', long, help = "add a toddler bedtime")]
    pub toddler: bool,
    #[arg(short = 'v', long, help = "verbose mode")]
    pub verbose: bool,
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub async fn webserver(port: u16, view: SharedView) -> Result<(), String> {
    let app = home::router(view);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", port);
    axum::Server::try_bind(&addr)
        .map_err(|why| why.to_string())?
        .serve(app.into_make_service())
        .await
        .map_err(|why| why.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = match Config::read(&cli.config) {
        Ok(c) => c,
        Err(why) => {
            eprintln!("{}", why);
            std::process::exit(1);
        }
    };
    config.toddler |= cli.toddler;
    let services = match config.services(true) {
        Ok(s) => s,
        Err(why) => {
            eprintln!("{}", why);
            std::process::exit(1);
        }
    };
    let view: SharedView = Arc::new(Mutex::new(ScheduleView::new(services, config.variant())));

    // first cycle runs in the background, the page shows loading meanwhile
    let first = view.clone();
    tokio::spawn(async move {
        let phase = first.lock().await.start().await;
        info!("startup finished: {:?}", phase);
    });

    if let Err(why) = webserver(cli.port.unwrap_or(config.port), view).await {
        eprintln!("{}", why);
        std::process::exit(1);
    }
}
