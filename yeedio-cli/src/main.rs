//! # Yeedio
//!
//! Command-line driver for the Yeedio speed and gain agent. It loads a
//! scripted page, injects agents into its frames and plays the popup and
//! options page against it.

use log::error;

mod cli;
mod logging;
mod runner;

fn main() {
    dotenv::dotenv().ok();
    let log_buffer = logging::init();
    let args = cli::args::build_cli().get_matches();

    let code = match runner::run(&args, log_buffer) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            eprintln!("error: {}", err);
            -1
        }
    };

    std::process::exit(code)
}
