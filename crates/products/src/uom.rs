use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit of measure a product is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Uom {
    #[default]
    Unit,
    Kilogram,
    Liter,
    Meter,
    Hour,
}

impl Uom {
    pub fn symbol(&self) -> &'static str {
        match self {
            Uom::Unit => "u",
            Uom::Kilogram => "kg",
            Uom::Liter => "l",
            Uom::Meter => "m",
            Uom::Hour => "h",
        }
    }

    /// Decimal places a quantity may carry in this unit.
    pub fn digits(&self) -> u32 {
        match self {
            Uom::Unit => 0,
            Uom::Kilogram | Uom::Liter => 3,
            Uom::Meter | Uom::Hour => 2,
        }
    }

    /// Whether `quantity` is expressible in this unit without rounding.
    pub fn accepts(&self, quantity: Decimal) -> bool {
        quantity.normalize().scale() <= self.digits()
    }
}

impl core::str::FromStr for Uom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u" | "unit" => Ok(Uom::Unit),
            "kg" | "kilogram" => Ok(Uom::Kilogram),
            "l" | "liter" => Ok(Uom::Liter),
            "m" | "meter" => Ok(Uom::Meter),
            "h" | "hour" => Ok(Uom::Hour),
            other => Err(format!("unknown unit of measure '{other}'")),
        }
    }
}
