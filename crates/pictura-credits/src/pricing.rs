// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between money, credits, and generation cost.

use pictura_config::model::CreditsConfig;
use pictura_core::PicturaError;

/// Pricing rules derived from `[credits]` and `[payment].packages`.
#[derive(Debug, Clone)]
pub struct Pricing {
    credits_per_major_unit: i64,
    minor_units_per_major_unit: i64,
    cost_per_output: i64,
    packages: Vec<i64>,
}

impl Pricing {
    pub fn new(credits: &CreditsConfig, packages: &[i64]) -> Self {
        Self {
            credits_per_major_unit: credits.credits_per_major_unit,
            minor_units_per_major_unit: credits.minor_units_per_major_unit,
            cost_per_output: credits.cost_per_output,
            packages: packages.to_vec(),
        }
    }

    /// Credits bought by a payment of `minor` currency units.
    ///
    /// Fractional credits are floored away: 505 cents buys 50 credits.
    pub fn credits_for_amount(&self, minor: i64) -> Result<i64, PicturaError> {
        minor
            .checked_mul(self.credits_per_major_unit)
            .map(|scaled| scaled.div_euclid(self.minor_units_per_major_unit))
            .ok_or_else(|| {
                PicturaError::Internal(format!("credit conversion overflow for amount {minor}"))
            })
    }

    /// Credits charged for a generation producing `num_outputs` images.
    pub fn generation_cost(&self, num_outputs: u8) -> Result<i64, PicturaError> {
        self.cost_per_output
            .checked_mul(i64::from(num_outputs))
            .ok_or_else(|| {
                PicturaError::Internal(format!("generation cost overflow for {num_outputs} outputs"))
            })
    }

    /// Price in minor units of the package worth `major` whole currency units.
    ///
    /// Only configured packages can be bought.
    pub fn package_amount_minor(&self, major: i64) -> Result<i64, PicturaError> {
        if !self.packages.contains(&major) {
            return Err(PicturaError::InvalidRequest(format!(
                "amount {major} is not an available package (choose one of {})",
                self.packages
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        major
            .checked_mul(self.minor_units_per_major_unit)
            .ok_or_else(|| PicturaError::Internal(format!("package amount overflow for {major}")))
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(&CreditsConfig::default(), &[5, 10, 20, 25])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_dollars_buys_fifty_credits() {
        assert_eq!(Pricing::default().credits_for_amount(500).unwrap(), 50);
    }

    #[test]
    fn fractional_credits_are_floored() {
        let pricing = Pricing::default();
        assert_eq!(pricing.credits_for_amount(505).unwrap(), 50);
        assert_eq!(pricing.credits_for_amount(9).unwrap(), 0);
    }

    #[test]
    fn negative_amounts_never_round_up_to_a_grant() {
        assert!(Pricing::default().credits_for_amount(-5).unwrap() < 0);
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(matches!(
            Pricing::default().credits_for_amount(i64::MAX),
            Err(PicturaError::Internal(_))
        ));
    }

    #[test]
    fn each_output_costs_two_credits() {
        let pricing = Pricing::default();
        assert_eq!(pricing.generation_cost(1).unwrap(), 2);
        assert_eq!(pricing.generation_cost(4).unwrap(), 8);
    }

    #[test]
    fn oversized_cost_per_output_is_an_error() {
        let credits = CreditsConfig {
            cost_per_output: i64::MAX,
            ..CreditsConfig::default()
        };
        let pricing = Pricing::new(&credits, &[5]);
        assert_eq!(pricing.generation_cost(1).unwrap(), i64::MAX);
        assert!(matches!(
            pricing.generation_cost(2),
            Err(PicturaError::Internal(_))
        ));
    }

    #[test]
    fn packages_price_in_cents() {
        let pricing = Pricing::default();
        assert_eq!(pricing.package_amount_minor(5).unwrap(), 500);
        assert_eq!(pricing.package_amount_minor(25).unwrap(), 2500);
        let err = pricing.package_amount_minor(7).unwrap_err();
        assert!(matches!(err, PicturaError::InvalidRequest(msg) if msg.contains("5, 10, 20, 25")));
    }

    #[test]
    fn custom_rates_apply() {
        let credits = CreditsConfig {
            credits_per_major_unit: 20,
            cost_per_output: 3,
            ..CreditsConfig::default()
        };
        let pricing = Pricing::new(&credits, &[1]);
        assert_eq!(pricing.credits_for_amount(100).unwrap(), 20);
        assert_eq!(pricing.generation_cost(2).unwrap(), 6);
    }
}
