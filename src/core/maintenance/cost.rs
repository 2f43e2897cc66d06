//! Cost breakdown of a repair ticket.

use crate::{
    core::PaymentStatus,
    entities::maintenance_request,
    errors::Result,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Fees that make up the price of a repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub diagnostic_fee: f64,
    pub parts_cost: f64,
    pub labor_cost: f64,
    pub priority_fee: f64,
    pub shipping_fee: f64,
    pub total_estimated: f64,
    pub total_final: f64,
    /// `total_final` was set by hand and no longer follows the estimate
    pub final_overridden: bool,
    pub payment_status: PaymentStatus,
}

impl Default for CostBreakdown {
    fn default() -> Self {
        Self {
            diagnostic_fee: 0.0,
            parts_cost: 0.0,
            labor_cost: 0.0,
            priority_fee: 0.0,
            shipping_fee: 0.0,
            total_estimated: 0.0,
            total_final: 0.0,
            final_overridden: false,
            payment_status: PaymentStatus::Pending,
        }
    }
}

impl CostBreakdown {
    /// Recomputes `total_estimated` as the sum of every fee.
    ///
    /// `total_final` follows the estimate unless it has been overridden.
    pub fn calculate_total(&mut self) {
        self.total_estimated = self.diagnostic_fee
            + self.parts_cost
            + self.labor_cost
            + self.priority_fee
            + self.shipping_fee;
        if !self.final_overridden {
            self.total_final = self.total_estimated;
        }
    }

    /// Reads the breakdown out of a stored request.
    pub fn from_model(model: &maintenance_request::Model) -> Result<Self> {
        Ok(Self {
            diagnostic_fee: model.cost_diagnostic_fee,
            parts_cost: model.cost_parts,
            labor_cost: model.cost_labor,
            priority_fee: model.cost_priority_fee,
            shipping_fee: model.cost_shipping_fee,
            total_estimated: model.cost_total_estimated,
            total_final: model.cost_total_final,
            final_overridden: model.cost_final_overridden,
            payment_status: model.payment_status.parse()?,
        })
    }

    /// Writes every cost column onto an active model.
    pub fn apply(&self, active: &mut maintenance_request::ActiveModel) {
        active.cost_diagnostic_fee = Set(self.diagnostic_fee);
        active.cost_parts = Set(self.parts_cost);
        active.cost_labor = Set(self.labor_cost);
        active.cost_priority_fee = Set(self.priority_fee);
        active.cost_shipping_fee = Set(self.shipping_fee);
        active.cost_total_estimated = Set(self.total_estimated);
        active.cost_total_final = Set(self.total_final);
        active.cost_final_overridden = Set(self.final_overridden);
        active.payment_status = Set(self.payment_status.as_str().to_string());
    }
}

/// Admin edit of a request's costs. Absent fields are left unchanged.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostPatch {
    pub diagnostic_fee: Option<f64>,
    pub labor_cost: Option<f64>,
    pub priority_fee: Option<f64>,
    pub shipping_fee: Option<f64>,
    /// Pins `total_final` to this amount
    pub total_final: Option<f64>,
    /// Drops a previous override so the final total follows the estimate again
    #[serde(default)]
    pub clear_final_override: bool,
    pub payment_status: Option<PaymentStatus>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    fn breakdown() -> CostBreakdown {
        CostBreakdown {
            diagnostic_fee: 50.0,
            parts_cost: 220.0,
            labor_cost: 80.0,
            priority_fee: 0.0,
            shipping_fee: 25.0,
            ..CostBreakdown::default()
        }
    }

    #[test]
    fn test_calculate_total_sums_every_fee() {
        let mut cost = breakdown();
        cost.calculate_total();
        assert_eq!(cost.total_estimated, 375.0);
        assert_eq!(cost.total_final, 375.0);
    }

    #[test]
    fn test_overridden_final_is_kept() {
        let mut cost = breakdown();
        cost.total_final = 300.0;
        cost.final_overridden = true;
        cost.calculate_total();
        assert_eq!(cost.total_estimated, 375.0);
        assert_eq!(cost.total_final, 300.0);
    }

    #[test]
    fn test_total_is_exact_sum_of_fees() {
        let fees = [
            [10.004, 0.0, 0.003, 0.0, 0.0],
            [0.1, 0.2, 0.0, 0.0, 0.0],
            [49.999, 1234.567, 0.005, 50.0, 17.25],
            [0.0, 0.0, 0.0, 0.0, 0.0],
        ];
        for [diagnostic, parts, labor, priority, shipping] in fees {
            let mut cost = CostBreakdown {
                diagnostic_fee: diagnostic,
                parts_cost: parts,
                labor_cost: labor,
                priority_fee: priority,
                shipping_fee: shipping,
                ..CostBreakdown::default()
            };
            cost.calculate_total();
            let sum = diagnostic + parts + labor + priority + shipping;
            assert_eq!(cost.total_estimated, sum);
            assert_eq!(cost.total_final, sum);
        }
    }
}
