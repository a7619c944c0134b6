//! Print link and address changes as they happen.
//!
//! Run with: cargo run -p nlroute --example monitor

use nlroute::netlink::events::Change;
use nlroute::netlink::{AddressRecord, EventHandler, EventListener, LinkRecord, ListenerConfig};

struct Printer;

impl EventHandler for Printer {
    fn on_link(&mut self, change: Change, link: &LinkRecord) {
        println!(
            "{:?} link {} ({}) up={}",
            change,
            link.index,
            link.name_or("?"),
            link.is_up()
        );
    }

    fn on_address(&mut self, change: Change, addr: &AddressRecord) {
        if let Some(ip) = addr.primary() {
            println!("{:?} address {}/{} on {}", change, ip, addr.prefix_len, addr.index);
        }
    }
}

#[tokio::main]
async fn main() -> nlroute::Result<()> {
    let config = ListenerConfig::new().routes(false);
    let handle = EventListener::spawn(config, Printer)?;

    println!("Monitoring links and addresses (Ctrl+C to stop)...");
    tokio::signal::ctrl_c().await?;

    handle.stop().await;
    Ok(())
}
