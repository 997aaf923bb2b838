//! Postal address value object and Indian address validation rules.

use serde::{Deserialize, Serialize};

use crate::shared::error::FieldError;

/// Only domestic addresses are shippable.
pub const DEFAULT_COUNTRY: &str = "IN";

const MAX_LINE_LEN: usize = 200;

/// A shipping or billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Address {
    /// Validate every field and collect all failures.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("name", &self.name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "is required"));
            }
        }

        if self.line1.trim().chars().count() > MAX_LINE_LEN {
            errors.push(FieldError::new(
                "line1",
                format!("must be at most {} characters", MAX_LINE_LEN),
            ));
        }
        if let Some(line2) = &self.line2 {
            if line2.trim().chars().count() > MAX_LINE_LEN {
                errors.push(FieldError::new(
                    "line2",
                    format!("must be at most {} characters", MAX_LINE_LEN),
                ));
            }
        }

        if !is_valid_pincode(&self.pincode) {
            errors.push(FieldError::new(
                "pincode",
                "must be 6 digits and not start with 0",
            ));
        }

        if normalize_phone(&self.phone).is_none() {
            errors.push(FieldError::new(
                "phone",
                "must be a 10 digit mobile number starting with 6-9",
            ));
        }

        let country = self.country.trim();
        if !country.is_empty() && !country.eq_ignore_ascii_case(DEFAULT_COUNTRY) {
            errors.push(FieldError::new("country", "only IN addresses are supported"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Trim fields and canonicalize phone, state and country.
    ///
    /// The phone is left untouched when it cannot be normalized so that
    /// `validate` still reports it.
    pub fn normalize(self) -> Self {
        let phone = normalize_phone(&self.phone).unwrap_or_else(|| self.phone.trim().to_string());
        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY.to_string(),
            c => c.to_uppercase(),
        };
        Self {
            name: collapse_spaces(&self.name),
            phone,
            line1: collapse_spaces(&self.line1),
            line2: self
                .line2
                .map(|l| collapse_spaces(&l))
                .filter(|l| !l.is_empty()),
            city: collapse_spaces(&self.city),
            state: normalize_state(&self.state),
            pincode: self.pincode.trim().to_string(),
            country,
        }
    }

    /// First three digits of the pincode (the sorting district).
    pub fn pincode_prefix(&self) -> &str {
        self.pincode.get(..3).unwrap_or("")
    }
}

/// Six ASCII digits, first digit 1-9.
pub fn is_valid_pincode(pincode: &str) -> bool {
    let p = pincode.trim();
    p.len() == 6
        && p.bytes().all(|b| b.is_ascii_digit())
        && p.as_bytes()[0] != b'0'
}

/// Reduce a phone number to its 10-digit national form.
///
/// Accepts `+91`/`91` prefixes on 12-digit input and a trunk `0` on
/// 11-digit input. Spaces, dashes and parentheses are ignored.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for (i, c) in raw.trim().chars().enumerate() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' => {}
            '+' if i == 0 => {}
            _ => return None,
        }
    }

    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return None,
    };

    match national.as_bytes()[0] {
        b'6'..=b'9' => Some(national.to_string()),
        _ => None,
    }
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Two-letter state codes are upper-cased, names are title-cased.
fn normalize_state(s: &str) -> String {
    let s = collapse_spaces(s);
    if s.len() == 2 {
        return s.to_uppercase();
    }
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
