//! Command-line flags. Resolved once into a [`Role`] and session settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use wirecheck_core::{Role, Seed, SessionSettings, WirecheckConfig};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Duplex stream integrity probe between two peers",
    long_about = None
)]
#[command(group(ArgGroup::new("role").args(["server", "connect"])))]
pub struct Cli {
    /// Run as the server: listen and wait for one peer
    #[arg(short = 's', long = "server")]
    pub server: bool,

    /// Run as the client: connect to the server at HOST:PORT
    #[arg(short = 'c', long = "connect", value_name = "HOST:PORT")]
    pub connect: Option<String>,

    /// The seed for the stream, must match on server and client
    #[arg(long, env = "WIRECHECK_SEED", allow_hyphen_values = true)]
    pub seed: Option<Seed>,

    /// Address to listen on when running as the server
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Pause after each verified chunk, in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    pub pause_ms: Option<u64>,

    /// Send and verify this many bytes, then exit successfully
    #[arg(long, value_name = "BYTES")]
    pub limit: Option<u64>,

    /// Config file to load instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the default config file if missing, then exit
    #[arg(long, conflicts_with = "role")]
    pub write_config: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The role this process plays. `None` only when no role flag was given.
    pub fn role(&self, config: &WirecheckConfig) -> Option<Role> {
        if self.server {
            let listen = self
                .listen
                .clone()
                .unwrap_or_else(|| config.network.listen_addr.clone());
            return Some(Role::Server { listen });
        }
        self.connect.clone().map(|connect| Role::Client { connect })
    }

    /// Config-file settings with command-line flags applied on top.
    pub fn session_settings(&self, config: &WirecheckConfig) -> SessionSettings {
        let mut settings = config.session_settings();
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(ms) = self.pause_ms {
            settings.pause = Duration::from_millis(ms);
        }
        if let Some(limit) = self.limit {
            settings.limit = (limit > 0).then_some(limit);
        }
        settings
    }
}
