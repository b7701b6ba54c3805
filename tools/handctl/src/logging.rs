//! Console logging for handctl
//!
//! Output format: `HH:MM:SS.mmm [LEVEL] message`

use tracing::Level;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    EnvFilter,
};

/// Level tag and its ANSI color code; trace shares the debug tag
fn level_tag(level: Level) -> (&'static str, &'static str) {
    if level == Level::ERROR {
        ("[ERROR]", "31")
    } else if level == Level::WARN {
        ("[WARN]", "33")
    } else if level == Level::INFO {
        ("[INFO]", "32")
    } else {
        ("[DEBUG]", "34")
    }
}

struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let (tag, color) = level_tag(*event.metadata().level());
        let time = chrono::Local::now().format("%H:%M:%S%.3f");

        if writer.has_ansi_escapes() {
            write!(writer, "{} \x1b[{}m{}\x1b[0m ", time, color, tag)?;
        } else {
            write!(writer, "{} {} ", time, tag)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber on stderr
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies.
pub fn init(default_level: &str, ansi: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .event_format(ConsoleFormat)
        .init();
}
