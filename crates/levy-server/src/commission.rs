//! Commission split and payable-amount arithmetic.
//!
//! Amounts are naira as `f64`; no rounding is applied beyond what the
//! formatter does for display.

use serde::{Deserialize, Serialize};

use crate::envelope::ApiError;

/// How the payable amount relates to the commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableMode {
    /// The payer is charged `amount - commission`.
    #[default]
    Discounted,
    /// The payer is charged `amount`.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRates {
    /// Percentage of the amount taken as commission.
    pub rate: f64,
    /// Percentage of the commission paid to the agent.
    pub agent_share: f64,
    /// Percentage of the commission paid to the agency.
    pub agency_share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSplit {
    pub total_commission: f64,
    pub agent_commission: f64,
    pub agency_commission: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub amount: f64,
    pub mode: PayableMode,
    pub payable_amount: f64,
    #[serde(flatten)]
    pub split: CommissionSplit,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            rate: 5.0,
            agent_share: 60.0,
            agency_share: 40.0,
        }
    }
}

impl CommissionRates {
    pub fn validate(&self) -> Result<(), ApiError> {
        percentage("rate", self.rate)?;
        percentage("agentShare", self.agent_share)?;
        percentage("agencyShare", self.agency_share)?;
        if self.agent_share + self.agency_share > 100.0 {
            return Err(ApiError::invalid(
                "agentShare and agencyShare must not exceed 100 combined",
            ));
        }
        Ok(())
    }

    pub fn split(&self, amount: f64) -> CommissionSplit {
        let total = amount * self.rate / 100.0;
        CommissionSplit {
            total_commission: total,
            agent_commission: total * self.agent_share / 100.0,
            agency_commission: total * self.agency_share / 100.0,
        }
    }

    pub fn quote(&self, amount: f64, mode: PayableMode) -> Quote {
        let split = self.split(amount);
        Quote {
            amount,
            mode,
            payable_amount: payable_amount(amount, split.total_commission, mode),
            split,
        }
    }
}

pub fn payable_amount(amount: f64, commission: f64, mode: PayableMode) -> f64 {
    match mode {
        PayableMode::Discounted => amount - commission,
        PayableMode::Full => amount,
    }
}

/// Rejects negative, NaN and infinite money values.
pub fn non_negative(field: &'static str, value: f64) -> Result<f64, ApiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ApiError::field(
            field,
            format!("{field} must be a non-negative amount"),
        ))
    }
}

fn percentage(field: &'static str, value: f64) -> Result<(), ApiError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::field(
            field,
            format!("{field} must be between 0 and 100"),
        ))
    }
}
