//! How the consignee pays for an order.

use serde::{Deserialize, Serialize};

/// Payment mode stored as TEXT (`prepaid` / `cod`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Prepaid,
    Cod,
}

impl PaymentMode {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "cod" => Self::Cod,
            _ => Self::Prepaid,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepaid => "prepaid",
            Self::Cod => "cod",
        }
    }

    pub fn is_cod(&self) -> bool {
        matches!(self, Self::Cod)
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
