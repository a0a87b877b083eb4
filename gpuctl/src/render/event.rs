use crate::error::CtlError;
use crate::render::rule;
use crate::utils::{id_to_str, timestamp_to_string};
use model::event::Event;
use std::io::Write;

pub fn event(out: &mut dyn Write, event: &Event) -> Result<(), CtlError> {
    writeln!(out, "{:<20} : {}", "Event Id", event.id)?;
    writeln!(out, "{:<20} : {}", "GPU Id", id_to_str(&event.gpu))?;
    writeln!(out, "{:<20} : {}", "Severity", event.severity)?;
    writeln!(out, "{:<20} : {}", "Timestamp", timestamp_to_string(&event.time))?;
    writeln!(out, "{:<20} : {}", "Description", event.description)?;
    writeln!(out, "{}", rule(62))?;
    Ok(())
}

pub fn summary(out: &mut dyn Write, count: usize) -> Result<(), CtlError> {
    writeln!(out, "Number of events: {}", count)?;
    Ok(())
}
