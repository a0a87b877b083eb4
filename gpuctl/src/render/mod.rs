pub mod event;
pub mod gpu;
pub mod gpu_watch;
pub mod topo;
pub mod trace;

use crate::error::CtlError;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// `--yaml` wins when both machine formats are requested.
    pub fn from_flags(json: bool, yaml: bool) -> Self {
        if yaml {
            OutputFormat::Yaml
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<(), CtlError> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn write_yaml<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<(), CtlError> {
    out.write_all(serde_yaml::to_string(value)?.as_bytes())?;
    Ok(())
}

/// Writes `value` in a machine format; `Text` is left to the caller.
pub fn write_encoded<T: Serialize + ?Sized>(
    out: &mut dyn Write,
    format: OutputFormat,
    value: &T,
) -> Result<bool, CtlError> {
    match format {
        OutputFormat::Json => write_json(out, value).map(|_| true),
        OutputFormat::Yaml => write_yaml(out, value).map(|_| true),
        OutputFormat::Text => Ok(false),
    }
}

pub fn rule(width: usize) -> String {
    "-".repeat(width)
}

/// Closes one object block in the detailed views.
pub fn separator(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "\n{}", rule(80))
}

/// `label : value` lines of one object, optionally indented as a nested
/// block. Labels are padded to `width`, nested lines to `width - 2`.
pub struct Block<'w> {
    out: &'w mut dyn Write,
    indent: &'static str,
    width: usize,
}

impl<'w> Block<'w> {
    pub fn new(out: &'w mut dyn Write, indent: &'static str) -> Self {
        Self::with_width(out, indent, 38)
    }

    pub fn with_width(out: &'w mut dyn Write, indent: &'static str, width: usize) -> Self {
        Self { out, indent, width }
    }

    pub fn line(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "{}{:<w$} : {}", self.indent, label, value, w = self.width)
    }

    /// Line nested under the previous one.
    pub fn sub(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        writeln!(
            self.out,
            "{}  {:<w$} : {}",
            self.indent,
            label,
            value,
            w = self.width - 2
        )
    }

    pub fn text(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "{}{}", self.indent, text)
    }

    /// Nested group whose header is only written once it gets a line.
    pub fn section(&mut self, header: &'static str) -> Section<'_, 'w> {
        Section {
            block: self,
            header,
            open: false,
        }
    }
}

pub struct Section<'b, 'w> {
    block: &'b mut Block<'w>,
    header: &'static str,
    open: bool,
}

impl<'b, 'w> Section<'b, 'w> {
    fn open(&mut self) -> io::Result<()> {
        if !self.open {
            self.open = true;
            self.block.text(self.header)?;
        }
        Ok(())
    }

    pub fn line(&mut self, label: &str, value: impl Display) -> io::Result<()> {
        self.open()?;
        self.block.sub(label, value)
    }

    /// Writes `label` only when `value` is present.
    pub fn opt(&mut self, label: &str, value: Option<impl Display>) -> io::Result<()> {
        match value {
            Some(v) => self.line(label, v),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_wins_over_json() {
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Text);
    }

    #[test]
    fn section_header_is_lazy() {
        let mut out = Vec::new();
        {
            let mut block = Block::new(&mut out, "  ");
            let mut empty = block.section("Nothing:");
            empty.opt("never", None::<u32>).unwrap();
            assert!(!empty.is_open());
            let mut some = block.section("Something:");
            some.opt("a", Some(1)).unwrap();
            some.line("b", 2).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Nothing:"));
        assert_eq!(text.matches("Something:").count(), 1);
        assert!(text.contains(&format!("    {:<36} : 1\n", "a")));
    }

    #[test]
    fn encoded_text_is_left_to_caller() {
        let mut out = Vec::new();
        assert!(!write_encoded(&mut out, OutputFormat::Text, &[1]).unwrap());
        assert!(out.is_empty());
        assert!(write_encoded(&mut out, OutputFormat::Json, &[1]).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "[\n  1\n]\n");
    }
}
