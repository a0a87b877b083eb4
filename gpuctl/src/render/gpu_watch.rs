use crate::error::CtlError;
use crate::render::rule;
use crate::utils::id_to_str;
use model::gpu_watch::{GpuWatch, GpuWatchAttr, WatchAttrValue};
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::style::Style;

const ATTRS_PER_LINE: usize = 3;

fn close(out: &mut dyn Write) -> Result<(), CtlError> {
    writeln!(out, "\n{}", rule(60))?;
    Ok(())
}

pub fn summary(out: &mut dyn Write, count: usize) -> Result<(), CtlError> {
    writeln!(out, "\nNo. of GPU watch objects : {}\n", count)?;
    Ok(())
}

pub fn spec(out: &mut dyn Write, watch: &GpuWatch, spec_only: bool) -> Result<(), CtlError> {
    let spec = &watch.spec;
    writeln!(out, "\n{:<23} : {}", "GPU watch id", id_to_str(&spec.id))?;
    for (i, gpu) in spec.gpu.iter().enumerate() {
        if i == 0 {
            writeln!(out, "{:<23} : {}", "GPUs", id_to_str(gpu))?;
        } else {
            writeln!(out, "{:<26}{}", "", id_to_str(gpu))?;
        }
    }
    for (i, attr) in spec.attribute.iter().enumerate() {
        if i == 0 {
            write!(out, "{:<23} : {}", "Attributes", attr)?;
        } else if i % ATTRS_PER_LINE == 0 {
            write!(out, "\n{:<26}{}", "", attr)?;
        } else {
            write!(out, ", {}", attr)?;
        }
    }
    writeln!(out)?;
    if spec_only {
        close(out)?;
    }
    Ok(())
}

pub fn status(out: &mut dyn Write, watch: &GpuWatch, status_only: bool) -> Result<(), CtlError> {
    let indent = if status_only {
        writeln!(out, "\n{:<21} : {}", "GPU watch id", id_to_str(&watch.spec.id))?;
        ""
    } else {
        writeln!(out, "\nStatus :\n")?;
        "  "
    };
    writeln!(
        out,
        "{}{:<21} : {}",
        indent, "Number of subscribers", watch.status.num_subscribers
    )?;
    if status_only {
        close(out)?;
    }
    Ok(())
}

fn attr_value(attr: &GpuWatchAttr) -> String {
    let units = &attr.value.units;
    match &attr.value.value {
        WatchAttrValue::LongVal(v) => format!("{} {}", v, units).trim_end().to_string(),
        WatchAttrValue::FloatVal(v) => format!("{} {}", v, units).trim_end().to_string(),
        WatchAttrValue::StringVal(v) => v.clone(),
    }
}

pub fn stats(out: &mut dyn Write, watch: &GpuWatch, stats_only: bool) -> Result<(), CtlError> {
    if stats_only {
        writeln!(out, "\nGPU watch id : {}", id_to_str(&watch.spec.id))?;
    } else {
        writeln!(out, "\nStatistics :")?;
    }
    for gpu in &watch.stats.gpu_watch_attr {
        writeln!(out, "\n  GPU : {}", id_to_str(&gpu.gpu))?;
        if gpu.attr.is_empty() {
            continue;
        }
        let mut builder = Builder::new();
        builder.set_header(["Attribute", "Value"]);
        for attr in &gpu.attr {
            builder.push_record([attr.id.to_string(), attr_value(attr)]);
        }
        writeln!(out, "{}", builder.build().with(Style::ascii()))?;
    }
    close(out)
}

pub fn all(out: &mut dyn Write, watch: &GpuWatch) -> Result<(), CtlError> {
    spec(out, watch, false)?;
    status(out, watch, false)?;
    stats(out, watch, false)
}
