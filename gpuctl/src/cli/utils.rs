use crate::error::CtlError;
use clap::ArgMatches;
use model::event::{EventCategory, EventId, EventSeverity};
use model::gpu::{GpuClockFrequencyRange, GpuClockType};
use std::any::Any;
use std::str::FromStr;
use uuid::Uuid;

/// Value of `id`, or `None` when it was not given or the command does not define it.
pub fn opt_value<'m, T>(m: &'m ArgMatches, id: &str) -> Option<&'m T>
where
    T: Any + Clone + Send + Sync + 'static,
{
    m.try_get_one::<T>(id).ok().flatten()
}

/// State of a `SetTrue` switch.
pub fn flag(m: &ArgMatches, id: &str) -> bool {
    opt_value::<bool>(m, id).copied().unwrap_or(false)
}

pub fn opt_str<'m>(m: &'m ArgMatches, id: &str) -> Option<&'m str> {
    opt_value::<String>(m, id).map(String::as_str)
}

pub fn parse_uuid(value: &str) -> Result<Uuid, CtlError> {
    Uuid::parse_str(value.trim()).map_err(|_| CtlError::validation(format!("Incorrect id {}", value)))
}

/// Comma separated ids, each of which must be a well formed UUID.
pub fn parse_uuid_list(value: &str) -> Result<Vec<Uuid>, CtlError> {
    value.split(',').map(parse_uuid).collect()
}

/// Optional single id flag, turned into the id list of a get request.
pub fn id_filter(m: &ArgMatches, id: &str) -> Result<Vec<Uuid>, CtlError> {
    match opt_str(m, id) {
        Some(value) => Ok(vec![parse_uuid(value)?]),
        None => Ok(vec![]),
    }
}

pub fn parse_event_ids(value: &str) -> Result<Vec<EventId>, CtlError> {
    value
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<i32>()
                .ok()
                .and_then(|n| EventId::try_from(n).ok())
                .ok_or_else(|| CtlError::validation(format!("Invalid event id {} in the event list", item)))
        })
        .collect()
}

pub fn parse_severity(value: &str) -> Result<EventSeverity, CtlError> {
    match EventSeverity::from_name(value) {
        Some(EventSeverity::None) | None => Err(CtlError::validation(
            "Invalid event \"severity\" level, refer to help string",
        )),
        Some(severity) => Ok(severity),
    }
}

pub fn parse_category(value: u32) -> Result<EventCategory, CtlError> {
    match value {
        0 => Ok(EventCategory::None),
        255 => Ok(EventCategory::Other),
        _ => Err(CtlError::validation("Invalid event \"category\"")),
    }
}

pub fn enable_disable_to_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "enable" => Some(true),
        "disable" => Some(false),
        _ => None,
    }
}

/// Parses an enumerator by name, accepting only the listed choices.
pub fn parse_choice<T>(flag: &str, value: &str, allowed: &[T]) -> Result<T, CtlError>
where
    T: FromStr + PartialEq + Copy,
{
    value
        .parse::<T>()
        .ok()
        .filter(|v| allowed.contains(v))
        .ok_or_else(|| CtlError::validation(format!("Invalid argument for \"{}\", please refer help", flag)))
}

/// `LO-HI` in MHz for one of the clocks that can be pinned.
pub fn parse_clock_range(clock_type: &str, range: &str) -> Result<GpuClockFrequencyRange, CtlError> {
    const SETTABLE: &[GpuClockType] = &[
        GpuClockType::Memory,
        GpuClockType::System,
        GpuClockType::Video,
        GpuClockType::Data,
    ];
    let clock_type = parse_choice("clock-type", clock_type, SETTABLE)
        .map_err(|_| CtlError::validation("Invalid \"clock-type\" specified, please refer help"))?;

    let invalid = || CtlError::validation("Invalid range for \"clock-frequency\", please refer help");
    let (lo, hi) = range.split_once('-').ok_or_else(invalid)?;
    let low_frequency = lo.trim().parse::<u32>().map_err(|_| invalid())?;
    let high_frequency = hi.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok(GpuClockFrequencyRange {
        clock_type,
        low_frequency,
        high_frequency,
    })
}
