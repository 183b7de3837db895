// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const INVALID_DATE_LABEL: &str = "Fecha inválida";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {0:?}; pick a date from the calendar")]
pub struct DateError(pub String);

/// How dates received from the service are shown to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayLocale {
    /// `D/M/YYYY`
    #[default]
    Es,
    /// `M/D/YYYY`
    EnUs,
    /// `YYYY-MM-DD`
    Iso,
}

impl DisplayLocale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::EnUs => "en-us",
            Self::Iso => "iso",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "es" | "es-es" => Some(Self::Es),
            "en-us" | "en" => Some(Self::EnUs),
            "iso" => Some(Self::Iso),
            _ => None,
        }
    }

    pub fn render(self, date: Date) -> String {
        let day = date.day();
        let month = u8::from(date.month());
        let year = date.year();
        match self {
            Self::Es => format!("{day}/{month}/{year}"),
            Self::EnUs => format!("{month}/{day}/{year}"),
            Self::Iso => format_picker_date(date),
        }
    }
}

/// Parses the calendar-picker representation, `YYYY-MM-DD`.
pub fn parse_picker_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), &format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_picker_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_transmitted_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), &format_description!("[day]/[month]/[year]")).ok()
}

pub fn format_transmitted_date(date: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

/// Converts a picker value to the `DD/MM/YYYY` form the service expects.
/// Blank input stays blank.
pub fn to_transmission_date(picker_value: &str) -> Result<String, DateError> {
    if picker_value.trim().is_empty() {
        return Ok(String::new());
    }
    parse_picker_date(picker_value)
        .map(format_transmitted_date)
        .ok_or_else(|| DateError(picker_value.to_owned()))
}

/// Maps a stored date (as the service echoes it) back into picker form so an
/// edit form can be pre-filled. Unrecognized values yield an empty field.
pub fn picker_value_from_service(raw: &str) -> String {
    let trimmed = raw.trim();
    parse_transmitted_date(trimmed)
        .or_else(|| parse_picker_date(trimmed))
        .or_else(|| parse_timestamp(trimmed, viewer_offset()))
        .map(format_picker_date)
        .unwrap_or_default()
}

/// The viewer's UTC offset. Falls back to UTC where the platform cannot
/// report it safely, e.g. once other threads are running.
pub fn viewer_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Accepts RFC 3339, ISO 8601 local date-times, plain ISO dates, and epoch
/// milliseconds. Instants are read as calendar days at `offset`; local
/// date-times and plain dates are taken as written.
pub fn parse_timestamp(raw: &str, offset: UtcOffset) -> Option<Date> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(parsed.to_offset(offset).date());
    }
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Iso8601::DEFAULT) {
        return Some(parsed.to_offset(offset).date());
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, &Iso8601::DEFAULT) {
        return Some(parsed.date());
    }
    if let Some(date) = parse_picker_date(trimmed) {
        return Some(date);
    }
    if trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        let millis: i128 = trimmed.parse().ok()?;
        return OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?)
            .ok()
            .map(|instant| instant.to_offset(offset).date());
    }
    None
}

pub fn render_timestamp(raw: &str, locale: DisplayLocale, offset: UtcOffset) -> String {
    parse_timestamp(raw, offset)
        .map(|date| locale.render(date))
        .unwrap_or_else(|| INVALID_DATE_LABEL.to_owned())
}
