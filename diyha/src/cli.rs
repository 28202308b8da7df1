use clap::{Parser, Subcommand};
use std::num::ParseIntError;
use std::time::Duration;

use crate::remote::{Category, StatePayload};
use crate::util::http::Url;
use crate::util::types::Hostname;

fn parse_duration(s: &str) -> Result<Duration, ParseIntError> {
    let millis: u64 = s.parse()?;
    Ok(Duration::from_millis(millis))
}

fn parse_payload(s: &str) -> Result<StatePayload, serde_json::Error> {
    serde_json::from_str(s)
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)] // read from Cargo.toml
pub struct Cli {
    /// Inventory server address, eg. "http://192.168.1.10:8000"
    #[arg(env = "DIYHA_SERVER_ADDRESS", long = "server-address", value_name = "uri")]
    pub server_address: Url,

    /// Name this node is listed under on the server, defaults to the hostname
    #[arg(env = "DIYHA_HOSTNAME", long = "hostname", value_name = "name")]
    pub hostname: Option<Hostname>,

    /// Server request timeout in milliseconds
    #[arg(
        env = "DIYHA_REQUEST_TIMEOUT_MS",
        long = "request-timeout-ms",
        value_name = "ms",
        value_parser = parse_duration
    )]
    pub request_timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Resolve this node in every category and print the resulting endpoints
    Resolve,

    /// Resolve one category and publish a JSON object to it
    Publish {
        /// One of status, asset, environment, motion, control
        #[arg(long, value_name = "category")]
        category: Category,

        /// State to publish, eg. '{"cpu": 12.5}'
        #[arg(long, value_name = "json", value_parser = parse_payload)]
        payload: StatePayload,
    },
}

pub fn parse() -> Cli {
    Parser::parse()
}
