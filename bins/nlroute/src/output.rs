//! Text and JSON rendering for command results.

use std::io::{self, Write};
use std::time::SystemTime;

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Pretty print (for JSON).
    pub pretty: bool,
    /// Prefix monitor lines with a timestamp.
    pub timestamp: bool,
}

/// Types that can be printed as a line of text or as JSON.
pub trait Printable: Serialize {
    /// Print as plain text.
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()>;

    /// Print in the specified format.
    fn print<W: Write>(&self, w: &mut W, format: OutputFormat, opts: &OutputOptions) -> io::Result<()> {
        match format {
            OutputFormat::Text => self.print_text(w),
            OutputFormat::Json => write_json(w, self, opts),
        }
    }
}

/// Print a list: one text line per item, or a single JSON array.
pub fn print_all<W: Write, T: Printable>(
    w: &mut W,
    items: &[T],
    format: OutputFormat,
    opts: &OutputOptions,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for item in items {
                item.print_text(w)?;
            }
            Ok(())
        }
        OutputFormat::Json => write_json(w, &items, opts),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T, opts: &OutputOptions) -> io::Result<()> {
    if opts.pretty {
        serde_json::to_writer_pretty(&mut *w, value)?;
    } else {
        serde_json::to_writer(&mut *w, value)?;
    }
    writeln!(w)
}

/// Write a timestamp prefix to the output if enabled.
///
/// Format: `[seconds.milliseconds] `
pub fn write_timestamp<W: Write>(w: &mut W, opts: &OutputOptions) -> io::Result<()> {
    if opts.timestamp {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        write!(w, "[{}.{:03}] ", now.as_secs(), now.subsec_millis())?;
    }
    Ok(())
}

/// Render interface flags the way `ip link` does.
pub fn format_flags(flags: u32) -> String {
    use nlroute::netlink::types::link::iff;

    let mut names = Vec::new();
    if flags & iff::LOOPBACK != 0 {
        names.push("LOOPBACK");
    }
    if flags & iff::UP != 0 {
        names.push("UP");
    }
    if flags & iff::RUNNING != 0 {
        names.push("RUNNING");
    }
    if flags & iff::LOWER_UP != 0 {
        names.push("LOWER_UP");
    }
    format!("<{}>", names.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Item {
        n: u32,
    }

    impl Printable for Item {
        fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
            writeln!(w, "item {}", self.n)
        }
    }

    #[test]
    fn test_text_and_json() {
        let items = [Item { n: 1 }, Item { n: 2 }];
        let opts = OutputOptions::default();

        let mut text = Vec::new();
        print_all(&mut text, &items, OutputFormat::Text, &opts).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "item 1\nitem 2\n");

        let mut json = Vec::new();
        print_all(&mut json, &items, OutputFormat::Json, &opts).unwrap();
        assert_eq!(String::from_utf8(json).unwrap(), "[{\"n\":1},{\"n\":2}]\n");
    }

    #[test]
    fn test_format_flags() {
        use nlroute::netlink::types::link::iff;

        assert_eq!(format_flags(iff::UP | iff::LOOPBACK), "<LOOPBACK,UP>");
        assert_eq!(format_flags(0), "<>");
    }
}
