//! nlroute rule command.

use clap::{Args, Subcommand};
use nlroute::netlink::rule::RuleBuilder;
use nlroute::{Connection, Result};

#[derive(Args)]
pub struct RuleCmd {
    #[command(subcommand)]
    action: RuleAction,
}

#[derive(Args)]
struct RuleArgs {
    /// Lookup table.
    #[arg(long, short)]
    table: u32,

    /// Rule priority.
    #[arg(long, default_value_t = 0)]
    priority: u32,

    /// Install an IPv6 rule.
    #[arg(short = '6')]
    ipv6: bool,
}

impl RuleArgs {
    fn build(&self) -> RuleBuilder {
        let rule = if self.ipv6 {
            RuleBuilder::v6(self.table)
        } else {
            RuleBuilder::v4(self.table)
        };
        rule.priority(self.priority)
    }
}

#[derive(Subcommand)]
enum RuleAction {
    /// Add a rule sending all traffic to a table.
    Add(RuleArgs),
    /// Delete a rule.
    Del(RuleArgs),
}

impl RuleCmd {
    pub async fn run(self, conn: &Connection) -> Result<()> {
        match self.action {
            RuleAction::Add(args) => conn.add_rule(args.build()).await,
            RuleAction::Del(args) => conn.del_rule(args.build()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_args() {
        let args = RuleArgs {
            table: 300,
            priority: 10,
            ipv6: true,
        };
        let rule = args.build();
        assert_eq!(rule.table(), 300);
        assert_eq!(rule.get_priority(), 10);
    }
}
