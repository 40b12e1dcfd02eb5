//! CLI argument definitions for `yeedio`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("Yeedio")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Drive the Yeedio speed and gain agent against a simulated page")
        .arg_required_else_help(true)
        .arg(
            Arg::new("prefs")
                .long("prefs")
                .short('p')
                .value_name("PATH")
                .global(true)
                .default_value("yeedio-prefs.json")
                .help("JSON file holding the stored preferences"),
        )
        .arg(
            Arg::new("scenario")
                .long("scenario")
                .short('s')
                .value_name("PATH")
                .global(true)
                .help("JSON scenario describing the page"),
        )
        .subcommand(
            Command::new("run")
                .about("Inject agents, replay the scenario and print what happened")
                .arg(
                    Arg::new("for-ms")
                        .long("for-ms")
                        .value_name("MS")
                        .default_value("5000")
                        .value_parser(value_parser!(u64))
                        .help("How long to run the page for"),
                )
                .arg(
                    Arg::new("realtime")
                        .long("realtime")
                        .action(ArgAction::SetTrue)
                        .help("Pace timers against the wall clock instead of virtual time"),
                )
                .arg(
                    Arg::new("show-log")
                        .long("show-log")
                        .action(ArgAction::SetTrue)
                        .help("Print the captured log after the run"),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Change speed or volume the way the popup does")
                .arg(
                    Arg::new("speed")
                        .long("speed")
                        .value_name("SPEED")
                        .help("Playback speed, 0.25 to 16"),
                )
                .arg(
                    Arg::new("volume")
                        .long("volume")
                        .value_name("PERCENT")
                        .help("Volume percentage, 0 to 600"),
                )
                .arg(
                    Arg::new("step")
                        .long("step")
                        .value_name("DELTA")
                        .allow_hyphen_values(true)
                        .value_parser(value_parser!(f64))
                        .help("Nudge the speed by DELTA (the popup buttons use 0.25)"),
                )
                .arg(
                    Arg::new("reset-speed")
                        .long("reset-speed")
                        .action(ArgAction::SetTrue)
                        .help("Return the speed to the global default"),
                )
                .arg(
                    Arg::new("reset-volume")
                        .long("reset-volume")
                        .action(ArgAction::SetTrue)
                        .help("Return the volume to the global default"),
                )
                .arg(
                    Arg::new("for-ms")
                        .long("for-ms")
                        .value_name("MS")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Let the page run this long before reporting"),
                ),
        )
        .subcommand(
            Command::new("state").about("Ask the page for its enforced speed and volume"),
        )
        .subcommand(
            Command::new("defaults")
                .about("Store global default speed and volume, as the options page does")
                .arg(
                    Arg::new("speed")
                        .long("speed")
                        .value_name("SPEED")
                        .required(true)
                        .help("Default playback speed"),
                )
                .arg(
                    Arg::new("volume")
                        .long("volume")
                        .value_name("PERCENT")
                        .required(true)
                        .help("Default volume percentage"),
                ),
        )
}
