use repomart_model::Cents;

use crate::error::Result;

/// How a sale amount divides between the platform and the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub amount: Cents,
    pub platform_fee: Cents,
    pub seller_amount: Cents,
}

impl FeeSplit {
    /// `platform_fee = round_half_up(amount * fee_bps / 10_000)`; the seller
    /// receives the remainder.
    pub fn compute(amount: Cents, fee_bps: u32) -> Result<Self> {
        let platform_fee = amount.basis_points(fee_bps)?;
        let seller_amount = amount.checked_sub(platform_fee)?;
        Ok(Self {
            amount,
            platform_fee,
            seller_amount,
        })
    }
}
