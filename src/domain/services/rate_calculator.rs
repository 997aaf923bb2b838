//! Freight and COD charge calculation domain service.

use serde::Serialize;

use crate::domain::entities::Courier;
use crate::domain::value_objects::{Parcel, PaymentMode};

/// Weight slab size in grams.
pub const SLAB_GRAMS: i32 = 500;

/// Breakdown of what a courier charges for one consignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateQuote {
    pub actual_weight_grams: i32,
    pub volumetric_weight_grams: i32,
    /// Greater of actual and volumetric, rounded up to a full slab.
    pub chargeable_weight_grams: i32,
    pub slabs: i32,
    pub freight_charge: i64,
    pub cod_charge: i64,
    pub total: i64,
}

/// Domain service for courier tariff calculation.
pub struct RateCalculator;

impl RateCalculator {
    /// Volumetric weight in grams: `ceil(l*b*h / divisor * 1000)`.
    ///
    /// Zero when dimensions are missing or the divisor is not positive.
    pub fn volumetric_weight_grams(parcel: &Parcel, divisor: i32) -> i32 {
        match parcel.volume_cm3() {
            Some(volume) if divisor > 0 => {
                let divisor = divisor as i128;
                let grams = (volume as i128 * 1000 + divisor - 1) / divisor;
                grams.min(i32::MAX as i128) as i32
            }
            _ => 0,
        }
    }

    /// Number of 500 g slabs for a weight; never less than one.
    pub fn slabs(weight_grams: i32) -> i32 {
        let w = weight_grams.max(1);
        w / SLAB_GRAMS + i32::from(w % SLAB_GRAMS != 0)
    }

    /// COD handling fee: `max(cod_min, amount * bp / 10000)`.
    pub fn cod_charge(courier: &Courier, cod_amount: i64) -> i64 {
        let percent = cod_amount.max(0) as i128 * courier.cod_charge_percent as i128 / 10_000;
        (percent.min(i64::MAX as i128) as i64).max(courier.cod_min_charge)
    }

    /// Full quote for a parcel on a courier.
    pub fn quote(
        courier: &Courier,
        parcel: &Parcel,
        payment_mode: PaymentMode,
        cod_amount: i64,
    ) -> RateQuote {
        let volumetric = Self::volumetric_weight_grams(parcel, courier.volumetric_divisor);
        let charged = parcel.weight_grams.max(volumetric);
        let slabs = Self::slabs(charged);

        let freight_charge = courier
            .base_rate
            .saturating_add((slabs as i64 - 1).saturating_mul(courier.additional_rate));
        let cod_charge = if payment_mode.is_cod() {
            Self::cod_charge(courier, cod_amount)
        } else {
            0
        };

        RateQuote {
            actual_weight_grams: parcel.weight_grams,
            volumetric_weight_grams: volumetric,
            chargeable_weight_grams: slabs.saturating_mul(SLAB_GRAMS),
            slabs,
            freight_charge,
            cod_charge,
            total: freight_charge.saturating_add(cod_charge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::sample_courier;
    use test_case::test_case;

    #[test_case(1 => 1)]
    #[test_case(500 => 1)]
    #[test_case(501 => 2)]
    #[test_case(1500 => 3)]
    #[test_case(0 => 1)]
    fn slab_rounding(weight: i32) -> i32 {
        RateCalculator::slabs(weight)
    }

    #[test]
    fn volumetric_rounds_up() {
        // 10 * 10 * 10 / 5000 kg = 200 g
        let parcel = Parcel::new(100).with_dimensions(10, 10, 10);
        assert_eq!(RateCalculator::volumetric_weight_grams(&parcel, 5000), 200);

        // 7 * 7 * 7 = 343 cm3 -> 68.6 g -> 69 g
        let parcel = Parcel::new(100).with_dimensions(7, 7, 7);
        assert_eq!(RateCalculator::volumetric_weight_grams(&parcel, 5000), 69);

        assert_eq!(RateCalculator::volumetric_weight_grams(&Parcel::new(100), 5000), 0);
    }

    #[test]
    fn oversized_values_saturate() {
        let parcel = Parcel::new(i32::MAX).with_dimensions(i32::MAX, i32::MAX, 2);
        assert_eq!(RateCalculator::volumetric_weight_grams(&parcel, 5000), i32::MAX);
        assert_eq!(RateCalculator::slabs(i32::MAX), i32::MAX / SLAB_GRAMS + 1);

        let courier = sample_courier();
        let quote = RateCalculator::quote(&courier, &parcel, PaymentMode::Cod, i64::MAX);
        assert!(quote.freight_charge > courier.base_rate);
        assert!(quote.cod_charge > courier.cod_min_charge);
        assert!(quote.total >= quote.freight_charge);
    }

    #[test]
    fn prepaid_quote_uses_heavier_weight() {
        let courier = sample_courier();
        // 40 * 30 * 20 / 5000 = 4.8 kg volumetric vs 1.2 kg actual
        let parcel = Parcel::new(1200).with_dimensions(40, 30, 20);
        let quote = RateCalculator::quote(&courier, &parcel, PaymentMode::Prepaid, 0);

        assert_eq!(quote.volumetric_weight_grams, 4800);
        assert_eq!(quote.slabs, 10);
        assert_eq!(quote.chargeable_weight_grams, 5000);
        assert_eq!(quote.freight_charge, 4_000 + 9 * 3_000);
        assert_eq!(quote.cod_charge, 0);
        assert_eq!(quote.total, quote.freight_charge);
    }

    #[test]
    fn cod_charge_has_floor() {
        let courier = sample_courier();
        // 2% of 1000.00 = 20.00, below the 35.00 minimum
        assert_eq!(RateCalculator::cod_charge(&courier, 100_000), 3_500);
        // 2% of 5000.00 = 100.00
        assert_eq!(RateCalculator::cod_charge(&courier, 500_000), 10_000);

        let quote = RateCalculator::quote(&courier, &Parcel::new(400), PaymentMode::Cod, 500_000);
        assert_eq!(quote.total, 4_000 + 10_000);
    }
}
