use chrono::Local;
use clap::Parser;
use daylight::config::{Config, DEFAULT_CONFIG_FILE};
use daylight::location::PostalCode;
use daylight::schedule::Schedule;
use daylight::utils::{clock, ALL_DAY, FOOTNOTES};
use daylight::view::{Phase, ScheduleView};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::exit;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short = 'z', long, help = "5-digit ZIP code")]
    pub zip: Option<PostalCode>,
    #[arg(
        short = 'r',
        long,
        conflicts_with = "zip",
        help = "forget the saved ZIP code and use the current location"
    )]
    pub reset: bool,
    #[arg(short = 't', long, help = "add a toddler bedtime")]
    pub toddler: bool,
    #[arg(long, help = "print the schedule as JSON")]
    pub json: bool,
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE, help = "configuration file")]
    pub config: PathBuf,
    #[arg(long, help = "ZIP code preference file")]
    pub preference_file: Option<PathBuf>,
    #[arg(long, help = "do not remember the ZIP code")]
    pub no_save: bool,
    #[arg(short = 'v', long, help = "verbose mode")]
    pub verbose: bool,
}

impl Cli {
    fn verbose(&self, message: impl AsRef<str>) {
        if self.verbose {
            println!("{}", message.as_ref());
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Ask for a ZIP code until a schedule is ready or input ends
async fn manual_entry(view: &mut ScheduleView) {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return;
    }
    if let Some(message) = view.state().error_message() {
        println!("{}", message);
    }
    while view.phase() == Phase::NeedsManualEntry {
        print!("ZIP code: ");
        if io::stdout().flush().is_err() {
            return;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => (),
        }
        if !view.can_submit(&line) {
            println!("  enter exactly 5 digits");
            continue;
        }
        match line.parse::<PostalCode>() {
            Ok(code) => {
                if view.submit_postal_code(&code).await == Phase::NeedsManualEntry {
                    if let Some(message) = view.state().error_message() {
                        println!("{}", message);
                    }
                }
            }
            Err(why) => println!("  {}", why),
        }
    }
}

fn print_schedule(label: &str, schedule: &Schedule) {
    let tz = Local;
    println!("[{}]", label);
    for (point, t) in schedule.entries() {
        println!(
            "  {:<26} {}",
            point.label(),
            clock(&t, &schedule.sunrise, &tz)
        );
    }
    for part in ALL_DAY {
        let (begin, end) = schedule.walk(part);
        println!(
            "  {:<26} {} - {}",
            part.label(),
            clock(&begin, &schedule.sunrise, &tz),
            clock(&end, &schedule.sunrise, &tz)
        );
    }
    println!();
    for note in FOOTNOTES {
        println!("* {}", note);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // read configuration
    let mut config = match Config::read(&cli.config) {
        Ok(c) => c,
        Err(why) => {
            eprintln!("{}", why);
            exit(1);
        }
    };
    config.toddler |= cli.toddler;
    if let Some(file) = &cli.preference_file {
        config.preference_file = file.clone();
    }

    let services = match config.services(!cli.no_save) {
        Ok(s) => s,
        Err(why) => {
            eprintln!("{}", why);
            exit(1);
        }
    };
    let mut view = ScheduleView::new(services, config.variant());

    let phase = if cli.reset {
        cli.verbose("Resetting saved ZIP code");
        view.reset().await
    } else if let Some(code) = &cli.zip {
        cli.verbose(format!("ZIP code {}", code));
        view.submit_postal_code(code).await
    } else {
        view.start().await
    };
    if phase == Phase::NeedsManualEntry {
        manual_entry(&mut view).await;
    }

    if let Some(s) = view.schedule() {
        if cli.json {
            match serde_json::to_string_pretty(s) {
                Ok(json) => println!("{}", json),
                Err(why) => eprintln!("{}", why),
            }
        } else {
            let label = view.state().location_label.clone().unwrap_or_default();
            print_schedule(&label, s);
        }
    }

    if let Some(message) = view.state().error_message() {
        eprintln!("{}", message);
    }
    if view.phase() != Phase::Ready {
        exit(1);
    }
}
