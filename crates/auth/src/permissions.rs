use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "stock.shipment.write").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const STOCK_READ: &'static str = "stock.read";
    pub const STOCK_SHIPMENT_WRITE: &'static str = "stock.shipment.write";
    pub const STOCK_FORCE_ASSIGN: &'static str = "stock.shipment.force_assign";
    pub const STOCK_LOCATION_WRITE: &'static str = "stock.location.write";
    pub const PRODUCT_WRITE: &'static str = "product.write";
    pub const ACCOUNT_READ: &'static str = "account.read";
    pub const ACCOUNT_MOVE_POST: &'static str = "account.move.post";
    pub const ACCOUNT_CHART_WRITE: &'static str = "account.chart.write";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
