//! Canonical order types produced by the normalizer.

/// A single cart position with its subtotal recomputed from quantity and price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub title: String,
    /// Always at least 1
    pub quantity: u64,
    /// Minor currency units, truncated from the source value
    pub unit_price: u64,
    pub subtotal: u64,
}

impl LineItem {
    /// Build a line item; the subtotal is derived, never taken from input
    pub fn new(title: impl Into<String>, quantity: u64, unit_price: u64) -> Self {
        let quantity = quantity.max(1);
        Self {
            title: title.into(),
            quantity,
            unit_price,
            subtotal: quantity.saturating_mul(unit_price),
        }
    }
}

/// Who placed the order. All fields are raw, unescaped text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuyerIdentity {
    pub display_name: String,
    /// Without the leading `@`
    pub username: Option<String>,
    pub external_id: Option<String>,
}

/// A validated, totalled order ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanonicalOrder {
    /// Payload order is preserved
    pub items: Vec<LineItem>,
    pub buyer: BuyerIdentity,
    pub comment: Option<String>,
    /// Total as reported by the catalog, 0 when absent or invalid
    pub declared_total: u64,
    /// Sum of all item subtotals
    pub computed_total: u64,
}

impl CanonicalOrder {
    /// The total shown to the seller: the declared total when the catalog sent a
    /// positive one, otherwise the computed total.
    pub fn effective_total(&self) -> u64 {
        if self.declared_total > 0 {
            self.declared_total
        } else {
            self.computed_total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all items
    pub fn unit_count(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_subtotal_is_derived() {
        let item = LineItem::new("Mug", 3, 250);
        assert_eq!(item.subtotal, 750);
    }

    #[test]
    fn test_line_item_clamps_zero_quantity() {
        let item = LineItem::new("Mug", 0, 250);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.subtotal, 250);
    }

    #[test]
    fn test_line_item_subtotal_saturates() {
        let item = LineItem::new("Gold", u64::MAX, 2);
        assert_eq!(item.subtotal, u64::MAX);
    }

    #[test]
    fn test_effective_total_prefers_positive_declared() {
        let order = CanonicalOrder {
            declared_total: 900,
            computed_total: 1000,
            ..Default::default()
        };
        assert_eq!(order.effective_total(), 900);

        let order = CanonicalOrder {
            declared_total: 0,
            computed_total: 1000,
            ..Default::default()
        };
        assert_eq!(order.effective_total(), 1000);
    }

    #[test]
    fn test_empty_order_totals() {
        let order = CanonicalOrder::default();
        assert!(order.is_empty());
        assert_eq!(order.effective_total(), 0);
        assert_eq!(order.unit_count(), 0);
    }
}
