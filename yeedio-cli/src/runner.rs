use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;
use log::{info, warn};
use serde::Serialize;
use yeedio_lib::control::{ControlClient, Status};
use yeedio_lib::prefs::{self, JsonFileStore, PreferenceStore};
use yeedio_lib::scenario::{Scenario, SimPage};

use crate::cli::values::option_value;
use crate::logging::LogBuffer;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Reply to `yeedio state`.
#[derive(Debug, Serialize)]
struct StateLine {
    speed: f64,
    volume: u16,
    status: String,
}

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32> {
    info!("Starting Yeedio CLI");
    let prefs_path = args
        .get_one::<String>("prefs")
        .ok_or("missing preferences path")?;
    let store: Arc<dyn PreferenceStore> = Arc::new(JsonFileStore::new(prefs_path));

    match args.subcommand() {
        Some(("run", sub)) => run_page(args, sub, store, &log_buffer),
        Some(("set", sub)) => run_set(args, sub, store),
        Some(("state", _)) => run_state(args, store),
        Some(("defaults", sub)) => run_defaults(sub, store),
        _ => Err("no command given; see --help".into()),
    }
}

fn load_page(args: &ArgMatches) -> Result<SimPage> {
    let path = args
        .get_one::<String>("scenario")
        .ok_or("a scenario file is required (--scenario)")?;
    let page = Scenario::load(path)?.build()?;
    info!("loaded scenario {} with {} frame(s)", path, page.tab.frames().len());
    Ok(page)
}

fn advance(page: &SimPage, ms: u64, realtime: bool) {
    let span = Duration::from_millis(ms);
    if realtime {
        page.scheduler.run_for(span);
    } else {
        page.scheduler.advance(span);
    }
}

fn run_page(
    args: &ArgMatches,
    sub: &ArgMatches,
    store: Arc<dyn PreferenceStore>,
    log_buffer: &LogBuffer,
) -> Result<i32> {
    let page = load_page(args)?;
    if let Err(err) = page.tab.ensure_injected(store.as_ref()) {
        warn!("{}", err);
        println!("{}", Status::CannotAccess);
        return Ok(1);
    }

    let for_ms = sub.get_one::<u64>("for-ms").copied().unwrap_or(0);
    advance(&page, for_ms, sub.get_flag("realtime"));

    for notification in page.port.take() {
        println!("{}", serde_json::to_string(&notification)?);
    }
    for report in page.report() {
        println!("{}", serde_json::to_string(&report)?);
    }

    if sub.get_flag("show-log") {
        for line in log_buffer.snapshot() {
            println!("{}", line);
        }
    }
    Ok(0)
}

fn run_set(args: &ArgMatches, sub: &ArgMatches, store: Arc<dyn PreferenceStore>) -> Result<i32> {
    let page = load_page(args)?;
    let mut client = ControlClient::new(page.tab.clone(), store);
    let mut status = client.open();

    if let Some(speed) = sub.get_one::<String>("speed") {
        status = client.sync_speed(speed);
    }
    if let Some(delta) = sub.get_one::<f64>("step") {
        status = client.step_speed(*delta);
    }
    if sub.get_flag("reset-speed") {
        status = client.reset_speed();
    }
    if let Some(volume) = sub.get_one::<String>("volume") {
        status = client.sync_volume(volume);
    }
    if sub.get_flag("reset-volume") {
        status = client.reset_volume();
    }

    let for_ms = sub.get_one::<u64>("for-ms").copied().unwrap_or(0);
    advance(&page, for_ms, false);
    for notification in page.port.take() {
        status = client.on_notification(&notification);
    }

    println!("speed {} volume {}%", client.speed(), client.volume());
    println!("{}", status);
    Ok(0)
}

fn run_state(args: &ArgMatches, store: Arc<dyn PreferenceStore>) -> Result<i32> {
    let page = load_page(args)?;
    let mut client = ControlClient::new(page.tab.clone(), store);
    let status = client.open();

    let line = StateLine {
        speed: client.speed(),
        volume: client.volume(),
        status: status.to_string(),
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(0)
}

fn run_defaults(sub: &ArgMatches, store: Arc<dyn PreferenceStore>) -> Result<i32> {
    let speed = sub.get_one::<String>("speed").ok_or("missing --speed")?;
    let volume = sub.get_one::<String>("volume").ok_or("missing --volume")?;

    let written = prefs::save_defaults(
        store.as_ref(),
        option_value(speed, yeedio_lib::constants::MIN_SPEED),
        option_value(volume, f64::from(yeedio_lib::constants::MIN_VOLUME_PERCENT)),
    )?;
    info!("saved defaults {:?}", written);
    println!("{}", serde_json::to_string(&written)?);
    Ok(0)
}
