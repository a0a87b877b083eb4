use anyhow::anyhow;
use chrono::{Local, LocalResult, TimeZone};
use model::Timestamp;
use std::fmt::Display;
use uuid::Uuid;

pub trait IntoAnyhow<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E> IntoAnyhow<T> for Result<T, E>
where
    E: Display,
{
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow!(e.to_string()))
    }
}

pub fn timestamp_to_string(tm: &Timestamp) -> String {
    let nanos = u32::try_from(tm.nanos).unwrap_or(0);
    match Local.timestamp_opt(tm.seconds, nanos) {
        LocalResult::None => "".to_string(),
        LocalResult::Single(v) => v.to_string(),
        LocalResult::Ambiguous(v1, v2) => format!("{}, {}", v1, v2),
    }
}

/// Object id as shown to the operator; the nil id reads as `-`.
pub fn id_to_str(id: &Uuid) -> String {
    if id.is_nil() {
        "-".to_string()
    } else {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_id_is_dash() {
        assert_eq!(id_to_str(&Uuid::nil()), "-");
        let id = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        assert_eq!(id_to_str(&id), "6ba7b810-9dad-11d1-80b4-00c04fd430c8");
    }

    #[test]
    fn timestamp_renders() {
        let text = timestamp_to_string(&Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        });
        assert!(text.contains("2023"));
    }

    #[test]
    fn anyhow_keeps_message() {
        let res: Result<(), String> = Err("boom".to_string());
        assert_eq!(res.anyhow().unwrap_err().to_string(), "boom");
    }
}
