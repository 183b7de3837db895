// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const PHONE_DIGITS: usize = 10;

/// Per-keystroke normalization applied to a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Uppercase, `A-Z` only.
    UpperLetters,
    /// Uppercase, `A-Z` and spaces.
    UpperWords,
    /// Uppercase, anything else kept.
    Upper,
    /// Uppercase, `A-Z`, `0-9` and spaces.
    UpperAlnumWords,
    /// Digits only, truncated to `max` when set.
    Digits { max: Option<usize> },
    /// Non-digit keystrokes are refused rather than filtered.
    DigitKeys,
    /// Calendar date held as `YYYY-MM-DD`; only set through a picker.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Accepted,
    Rejected,
}

impl FieldPolicy {
    /// Normalizes a whole candidate value, the way a text change is filtered.
    pub fn apply(self, raw: &str) -> String {
        match self {
            Self::UpperLetters => upper_filtered(raw, |ch| ch.is_ascii_uppercase()),
            Self::UpperWords => upper_filtered(raw, |ch| ch.is_ascii_uppercase() || ch == ' '),
            Self::Upper => raw.to_uppercase(),
            Self::UpperAlnumWords => upper_filtered(raw, |ch| {
                ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == ' '
            }),
            Self::Digits { max } => {
                let digits = raw.chars().filter(char::is_ascii_digit);
                match max {
                    Some(max) => digits.take(max).collect(),
                    None => digits.collect(),
                }
            }
            Self::DigitKeys => raw.chars().filter(char::is_ascii_digit).collect(),
            Self::Date => raw.trim().to_owned(),
        }
    }

    /// Gate for a single typed character, before any filtering.
    pub fn accepts_key(self, ch: char) -> bool {
        match self {
            Self::DigitKeys => ch.is_ascii_digit(),
            Self::Date => false,
            _ => !ch.is_control(),
        }
    }

    /// Applies one keystroke to `value`.
    pub fn push_key(self, value: &mut String, ch: char) -> KeyOutcome {
        if !self.accepts_key(ch) {
            return KeyOutcome::Rejected;
        }
        let mut candidate = value.clone();
        candidate.push(ch);
        let normalized = self.apply(&candidate);
        if normalized == *value {
            return KeyOutcome::Rejected;
        }
        *value = normalized;
        KeyOutcome::Accepted
    }

    pub const fn is_date(self) -> bool {
        matches!(self, Self::Date)
    }
}

fn upper_filtered(raw: &str, keep: impl Fn(char) -> bool) -> String {
    raw.to_uppercase().chars().filter(|ch| keep(*ch)).collect()
}

/// Warning shown while a phone number is partially typed.
pub fn phone_length_warning(phone: &str) -> Option<&'static str> {
    let len = phone.chars().count();
    if len > 0 && len != PHONE_DIGITS {
        Some("El teléfono debe tener 10 dígitos.")
    } else {
        None
    }
}
