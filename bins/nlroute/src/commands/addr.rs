//! nlroute addr command.

use clap::{Args, Subcommand};
use nlroute::{Connection, Result};
use tracing::info;

use super::{Prefix, interface, parse_prefix};

#[derive(Args)]
pub struct AddrCmd {
    #[command(subcommand)]
    action: AddrAction,
}

#[derive(Subcommand)]
enum AddrAction {
    /// Add an address, replacing an identical one.
    Add {
        /// Address with prefix length (e.g. 5.0.2.4/32).
        #[arg(value_parser = parse_prefix)]
        address: Prefix,

        /// Interface name or index.
        #[arg(long, short)]
        dev: String,
    },

    /// Delete an address.
    Del {
        /// Address with prefix length.
        #[arg(value_parser = parse_prefix)]
        address: Prefix,

        /// Interface name or index.
        #[arg(long, short)]
        dev: String,
    },
}

impl AddrCmd {
    pub async fn run(self, conn: &Connection) -> Result<()> {
        match self.action {
            AddrAction::Add { address, dev } => {
                conn.add_address(interface(&dev), address.addr, address.len)
                    .await?;
                info!(%dev, address = %address.addr, prefix = address.len, "address added");
            }
            AddrAction::Del { address, dev } => {
                conn.del_address(interface(&dev), address.addr, address.len)
                    .await?;
                info!(%dev, address = %address.addr, prefix = address.len, "address deleted");
            }
        }
        Ok(())
    }
}
