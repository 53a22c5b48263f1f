use owo_colors::OwoColorize as _;
use std::fmt;
use tracing_core::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Prints log events as `Level: message`, the way the CLI talks to users
pub struct MyFormatter;

impl<S, N> FormatEvent<S, N> for MyFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        match *event.metadata().level() {
            Level::ERROR => write!(writer, "{} ", "Error:".red().bold())?,
            Level::WARN => write!(writer, "{} ", "Warning:".yellow().bold())?,
            Level::INFO => write!(writer, "{} ", "Info:".blue().bold())?,
            Level::DEBUG => write!(writer, "{} ", "Debug:".magenta())?,
            Level::TRACE => write!(writer, "{} ", "Trace:".dimmed())?,
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
