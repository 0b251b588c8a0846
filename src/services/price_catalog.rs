use rust_decimal::Decimal;

/// Pricing/catalog is an external collaborator the core does not own
/// (§1); this port is the seam the Order Promoter calls through to price
/// an order line. The one concrete implementation below satisfies it with
/// a single flat per-unit price since no catalog service is in scope.
pub trait PriceCatalog: Send + Sync {
    fn price_for(&self, sku: &str) -> Decimal;
}

/// Returns the same configured price for every SKU.
pub struct FlatPriceCatalog {
    unit_price: Decimal,
}

impl FlatPriceCatalog {
    pub fn new(unit_price: Decimal) -> Self {
        Self { unit_price }
    }
}

impl PriceCatalog for FlatPriceCatalog {
    fn price_for(&self, _sku: &str) -> Decimal {
        self.unit_price
    }
}
