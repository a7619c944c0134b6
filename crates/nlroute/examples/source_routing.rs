//! Install a source-routed path and ask which source and next hop the
//! kernel would pick.
//!
//! Requires root (or run inside a throwaway network namespace):
//!
//!   sudo cargo run -p nlroute --example source_routing -- 10.8.0.0/16 5.0.2.4 lo 100

use std::env;

use nlroute::netlink::route::SourceRoute;
use nlroute::netlink::rule::RuleBuilder;
use nlroute::netlink::Connection;
use nlroute::util::{parse_addr, parse_prefix};
use nlroute::{Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        eprintln!("usage: source_routing <dst/prefix> <src> <dev> <table>");
        return Ok(());
    }

    let (dst, prefix) = parse_prefix(&args[1]).map_err(|e| Error::InvalidMessage(e.to_string()))?;
    let src = parse_addr(&args[2]).map_err(|e| Error::InvalidMessage(e.to_string()))?;
    let dev = args[3].as_str();
    let table: u32 = args[4]
        .parse()
        .map_err(|_| Error::InvalidMessage(format!("invalid table: {}", args[4])))?;

    let conn = Connection::new()?;

    // Own the source address, then route the prefix through a dedicated table.
    conn.add_address(dev, src, if src.is_ipv4() { 32 } else { 128 })
        .await?;
    let rule = if src.is_ipv4() {
        RuleBuilder::v4(table)
    } else {
        RuleBuilder::v6(table)
    };
    match conn.add_rule(rule.priority(1000)).await {
        Err(e) if e.is_already_exists() => println!("rule for table {} already present", table),
        other => other?,
    }

    let route = SourceRoute::new(dst, prefix, src).dev(dev).table(table);
    conn.add_source_route(&route).await?;
    println!("installed {}/{} src {} dev {} table {}", dst, prefix, src, dev, table);

    match conn.get_source_addr(dst, Some(src)).await {
        Ok(chosen) => println!("source for {}: {}", dst, chosen),
        Err(e) => println!("source for {}: {}", dst, e),
    }
    match conn.get_next_hop(dst, None, Some(src)).await {
        Ok(hop) => println!("next hop for {}: {}", dst, hop),
        Err(e) => println!("next hop for {}: {}", dst, e),
    }

    Ok(())
}
