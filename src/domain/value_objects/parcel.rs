//! Physical parcel measurements used for rating.

use serde::{Deserialize, Serialize};

/// Weight and box dimensions of a consignment.
///
/// Dimensions are optional; without them only dead weight is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parcel {
    pub weight_grams: i32,
    #[serde(default)]
    pub length_cm: Option<i32>,
    #[serde(default)]
    pub breadth_cm: Option<i32>,
    #[serde(default)]
    pub height_cm: Option<i32>,
}

impl Parcel {
    pub fn new(weight_grams: i32) -> Self {
        Self {
            weight_grams,
            ..Default::default()
        }
    }

    pub fn with_dimensions(mut self, length_cm: i32, breadth_cm: i32, height_cm: i32) -> Self {
        self.length_cm = Some(length_cm);
        self.breadth_cm = Some(breadth_cm);
        self.height_cm = Some(height_cm);
        self
    }

    /// Volume in cubic centimetres when all three dimensions are known.
    ///
    /// Saturates at `i64::MAX` rather than wrapping.
    pub fn volume_cm3(&self) -> Option<i64> {
        match (self.length_cm, self.breadth_cm, self.height_cm) {
            (Some(l), Some(b), Some(h)) if l > 0 && b > 0 && h > 0 => {
                Some((l as i64 * b as i64).saturating_mul(h as i64))
            }
            _ => None,
        }
    }
}
