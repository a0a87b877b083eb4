use crate::error::CtlError;
use model::trace::TraceGetResponse;
use std::io::Write;

pub fn trace_level(out: &mut dyn Write, resp: &TraceGetResponse) -> Result<(), CtlError> {
    writeln!(out, "{:<15} : {}", "Trace level", resp.trace_level)?;
    writeln!(out, "{:<15} : {}", "Trace file", resp.trace_file)?;
    Ok(())
}
