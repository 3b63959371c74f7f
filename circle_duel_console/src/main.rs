// Legend for various fix-this comments:
//   * "TODO" - bug or missing crucial feature.
//   * "Improvement potential" - missing nice-to-have feature or an opportunity
//       to make code better or faster.

#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod network;

mod check_display_name;
mod prod_server_helpers;
mod server_config;
mod server_main;
mod stress_test;

use anyhow::Context;
use clap::{Command, arg};
use server_config::ServerConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .filter_module("tide", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let matches = Command::new("Circle Duel")
        .version(clap::crate_version!())
        .about("Circle Duel relay server and console utilities")
        .subcommand_required(true)
        .subcommand(Command::new("server").about("Run the relay server").arg(
            arg!(<config_file> "Path to the configuration file: yaml-serialized ServerConfig."),
        ))
        .subcommand(
            Command::new("stress-test")
                .about(concat!(
                    "Stress test the game model or the relay with random input. ",
                    "Can be used for testing or benchmarking."
                ))
                .arg(arg!(<target> "Internal class to test").value_parser(["board", "relay"])),
        )
        .subcommand(
            Command::new("check-name")
                .about("Verifies whether a display name would be accepted by the relay.")
                .arg(arg!(<display_name> "Display name to check")),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("server", sub_matches)) => {
            let config_file = sub_matches.get_one::<String>("config_file").unwrap();
            server_main::run(read_config_file(config_file)?)
        }
        Some(("stress-test", sub_matches)) => {
            Ok(stress_test::run(stress_test::StressTestConfig {
                target: sub_matches.get_one::<String>("target").unwrap().clone(),
            })?)
        }
        Some(("check-name", sub_matches)) => Ok(check_display_name::run(
            sub_matches.get_one::<String>("display_name").unwrap(),
        )?),
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }
}

fn read_config_file(filename: &str) -> anyhow::Result<ServerConfig> {
    let contents = std::fs::read_to_string(filename)
        .with_context(|| format!("Reading config file {filename}"))?;
    ServerConfig::from_yaml(&contents).with_context(|| format!("Parsing config file {filename}"))
}
