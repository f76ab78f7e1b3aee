//! Order value objects.
//!
//! An inbound request is parsed into an [`OrderRequest`] (loose, as the client
//! sent it), validated into an [`OrderDraft`] (typed, not yet priced) and
//! finally priced into an [`Order`]. Once built, an [`Order`] is immutable.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while validating an inbound order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The request body is not a well-formed order document.
    #[error("Malformed order: {0}")]
    Malformed(String),

    /// Table numbers are positive integers.
    #[error("Invalid table number: {0}")]
    InvalidTableNumber(i64),

    /// An order needs at least one line item.
    #[error("Order has no items")]
    NoItems,

    /// Menu item identifiers are positive integers.
    #[error("Invalid menu item id {id} at line {line}")]
    InvalidMenuItem {
        /// Zero-based position of the offending line
        line: usize,
        /// The rejected identifier
        id: i64,
    },

    /// Quantities are positive integers.
    #[error("Invalid quantity {quantity} at line {line}")]
    InvalidQuantity {
        /// Zero-based position of the offending line
        line: usize,
        /// The rejected quantity
        quantity: i64,
    },

    /// The number of unit prices does not match the number of lines.
    #[error("Expected {expected} unit prices, got {actual}")]
    PriceCountMismatch {
        /// Number of line items
        expected: usize,
        /// Number of prices supplied
        actual: usize,
    },

    /// The subtotal does not fit in the currency representation.
    #[error("Subtotal overflow")]
    SubtotalOverflow,
}

/// Largest table number or menu item id (the store keeps them as `INTEGER`).
pub const MAX_ID: u32 = 0x7fff_ffff;

/// Largest amount of money in minor units (the store keeps it as `BIGINT`).
pub const MAX_CENTS: u64 = 0x7fff_ffff_ffff_ffff;

/// Restaurant table identifier (`1..=MAX_ID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TableNumber(u32);

impl TableNumber {
    /// Create a table number, returning `None` for zero or above [`MAX_ID`].
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 || value > MAX_ID { None } else { Some(Self(value)) }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TableNumber {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidTableNumber(i64::from(value)))
    }
}

impl From<TableNumber> for u32 {
    fn from(value: TableNumber) -> Self {
        value.0
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Menu item identifier (`1..=MAX_ID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MenuItemId(u32);

impl MenuItemId {
    /// Create a menu item id, returning `None` for zero or above [`MAX_ID`].
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 || value > MAX_ID { None } else { Some(Self(value)) }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for MenuItemId {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidMenuItem {
            line: 0,
            id: i64::from(value),
        })
    }
}

impl From<MenuItemId> for u32 {
    fn from(value: MenuItemId) -> Self {
        value.0
    }
}

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of portions of a menu item (positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidQuantity {
            line: 0,
            quantity: i64::from(value),
        })
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// Amount of money in minor currency units (cents), at most [`MAX_CENTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from minor units.
    ///
    /// Amounts above [`MAX_CENTS`] are clamped to it.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        if cents > MAX_CENTS { Self(MAX_CENTS) } else { Self(cents) }
    }

    /// Get the amount in minor units.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Multiply by a quantity, `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: Quantity) -> Option<Self> {
        self.0
            .checked_mul(u64::from(quantity.get()))
            .filter(|cents| *cents <= MAX_CENTS)
            .map(Self)
    }

    /// Add two amounts, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .filter(|cents| *cents <= MAX_CENTS)
            .map(Self)
    }
}

impl TryFrom<u64> for Money {
    type Error = ValidationError;

    fn try_from(cents: u64) -> Result<Self, Self::Error> {
        if cents > MAX_CENTS {
            Err(ValidationError::SubtotalOverflow)
        } else {
            Ok(Self(cents))
        }
    }
}

impl From<Money> for u64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// One line of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The ordered menu item
    pub menu_item_id: MenuItemId,
    /// How many portions
    pub quantity: Quantity,
}

/// A raw line item as sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
    /// Menu item identifier
    pub menu_item_id: i64,
    /// Quantity
    pub quantity: i64,
}

/// A raw order as sent by a client.
///
/// Unknown fields (older clients send `total_price`) are ignored; the
/// subtotal is always recomputed from menu prices.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    /// Table number
    pub table_number: i64,
    /// Line items in the order they were taken
    pub items: Vec<LineItemRequest>,
}

impl OrderRequest {
    /// Parse a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] if the body is not an order document.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Structurally validate the request.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation found.
    pub fn validate(self) -> Result<OrderDraft, ValidationError> {
        let table_number = u32::try_from(self.table_number)
            .ok()
            .and_then(TableNumber::new)
            .ok_or(ValidationError::InvalidTableNumber(self.table_number))?;

        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(line, item)| {
                let menu_item_id = u32::try_from(item.menu_item_id)
                    .ok()
                    .and_then(MenuItemId::new)
                    .ok_or(ValidationError::InvalidMenuItem {
                        line,
                        id: item.menu_item_id,
                    })?;
                let quantity = u32::try_from(item.quantity)
                    .ok()
                    .and_then(Quantity::new)
                    .ok_or(ValidationError::InvalidQuantity {
                        line,
                        quantity: item.quantity,
                    })?;
                Ok(LineItem {
                    menu_item_id,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(OrderDraft {
            table_number,
            items,
        })
    }
}

/// A validated order that has not been priced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    table_number: TableNumber,
    items: Vec<LineItem>,
}

impl OrderDraft {
    /// Table the order belongs to.
    #[must_use]
    pub const fn table_number(&self) -> TableNumber {
        self.table_number
    }

    /// Line items in order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Price the draft with one unit price per line (same order as [`Self::items`]).
    ///
    /// Subtotal is `Σ unit_price × quantity` in integer minor units.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PriceCountMismatch`] if the prices do not line up
    /// with the items, or [`ValidationError::SubtotalOverflow`] on overflow.
    pub fn into_priced(self, unit_prices: &[Money]) -> Result<Order, ValidationError> {
        if unit_prices.len() != self.items.len() {
            return Err(ValidationError::PriceCountMismatch {
                expected: self.items.len(),
                actual: unit_prices.len(),
            });
        }

        let subtotal = self
            .items
            .iter()
            .zip(unit_prices)
            .try_fold(Money::ZERO, |acc, (item, price)| {
                price
                    .checked_mul(item.quantity)
                    .and_then(|line| acc.checked_add(line))
            })
            .ok_or(ValidationError::SubtotalOverflow)?;

        Ok(Order {
            table_number: self.table_number,
            items: self.items,
            subtotal,
        })
    }
}

/// A priced order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    table_number: TableNumber,
    items: Vec<LineItem>,
    subtotal: Money,
}

impl Order {
    /// Table the order belongs to.
    #[must_use]
    pub const fn table_number(&self) -> TableNumber {
        self.table_number
    }

    /// Line items in order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of unit price × quantity over all lines.
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(body: &str) -> OrderDraft {
        OrderRequest::from_json(body.as_bytes())
            .and_then(OrderRequest::validate)
            .expect("valid order")
    }

    #[test]
    fn subtotal_is_sum_of_price_times_quantity() {
        let order = draft(
            r#"{"table_number":4,"items":[{"menu_item_id":1,"quantity":2},{"menu_item_id":2,"quantity":1}]}"#,
        )
        .into_priced(&[Money::from_cents(500), Money::from_cents(300)])
        .unwrap();

        assert_eq!(order.subtotal(), Money::from_cents(1300));
        assert_eq!(order.table_number().get(), 4);
        assert_eq!(order.items().len(), 2);
    }

    #[test]
    fn legacy_total_price_field_is_ignored() {
        let draft = draft(
            r#"{"table_number":1,"items":[{"menu_item_id":3,"quantity":1}],"total_price":99.5}"#,
        );
        assert_eq!(draft.items().len(), 1);
    }

    #[test]
    fn rejects_non_positive_table() {
        let err = OrderRequest::from_json(br#"{"table_number":0,"items":[{"menu_item_id":1,"quantity":1}]}"#)
            .and_then(OrderRequest::validate)
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidTableNumber(0));
    }

    #[test]
    fn rejects_empty_items() {
        let err = OrderRequest::from_json(br#"{"table_number":2,"items":[]}"#)
            .and_then(OrderRequest::validate)
            .unwrap_err();
        assert_eq!(err, ValidationError::NoItems);
    }

    #[test]
    fn reports_offending_line() {
        let err = OrderRequest::from_json(
            br#"{"table_number":2,"items":[{"menu_item_id":1,"quantity":1},{"menu_item_id":5,"quantity":-3}]}"#,
        )
        .and_then(OrderRequest::validate)
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidQuantity {
                line: 1,
                quantity: -3
            }
        );
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = OrderRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn price_count_must_match() {
        let err = draft(r#"{"table_number":2,"items":[{"menu_item_id":1,"quantity":1}]}"#)
            .into_priced(&[])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PriceCountMismatch {
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn overflow_is_an_error() {
        let err = draft(r#"{"table_number":2,"items":[{"menu_item_id":1,"quantity":2}]}"#)
            .into_priced(&[Money::from_cents(u64::MAX)])
            .unwrap_err();
        assert_eq!(err, ValidationError::SubtotalOverflow);
    }

    #[test]
    fn table_number_must_fit_the_store_column() {
        let body = format!(
            r#"{{"table_number":{},"items":[{{"menu_item_id":1,"quantity":1}}]}}"#,
            u64::from(MAX_ID) + 1
        );
        let err = OrderRequest::from_json(body.as_bytes())
            .and_then(OrderRequest::validate)
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidTableNumber(i64::from(MAX_ID) + 1));

        assert_eq!(TableNumber::new(MAX_ID).map(TableNumber::get), Some(MAX_ID));
        assert!(TableNumber::new(3_000_000_000).is_none());
    }

    #[test]
    fn menu_item_id_must_fit_the_store_column() {
        let body = format!(
            r#"{{"table_number":1,"items":[{{"menu_item_id":{},"quantity":1}}]}}"#,
            u64::from(MAX_ID) + 1
        );
        let err = OrderRequest::from_json(body.as_bytes())
            .and_then(OrderRequest::validate)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidMenuItem {
                line: 0,
                id: i64::from(MAX_ID) + 1
            }
        );
        assert!(MenuItemId::new(MAX_ID).is_some());
    }

    #[test]
    fn subtotal_must_fit_the_store_column() {
        let items = r#"{"table_number":2,"items":[{"menu_item_id":1,"quantity":1},{"menu_item_id":2,"quantity":1}]}"#;

        let at_limit = draft(items)
            .into_priced(&[Money::from_cents(MAX_CENTS - 1), Money::from_cents(1)])
            .unwrap();
        assert_eq!(at_limit.subtotal().cents(), MAX_CENTS);

        let err = draft(items)
            .into_priced(&[Money::from_cents(MAX_CENTS), Money::from_cents(1)])
            .unwrap_err();
        assert_eq!(err, ValidationError::SubtotalOverflow);
    }

    #[test]
    fn out_of_range_amount_does_not_deserialize() {
        let too_large = (MAX_CENTS + 1).to_string();
        assert!(serde_json::from_str::<Money>(&too_large).is_err());
        assert_eq!(
            serde_json::from_str::<Money>(&MAX_CENTS.to_string()).unwrap(),
            Money::from_cents(MAX_CENTS)
        );
    }

    #[test]
    fn money_display_uses_two_decimals() {
        assert_eq!(Money::from_cents(1305).to_string(), "13.05");
    }

    proptest! {
        #[test]
        fn subtotal_matches_reference_sum(
            lines in prop::collection::vec((1u32..1_000, 1u32..50, 0u64..100_000), 1..20)
        ) {
            let items: Vec<LineItem> = lines
                .iter()
                .map(|(id, qty, _)| LineItem {
                    menu_item_id: MenuItemId::new(*id).unwrap(),
                    quantity: Quantity::new(*qty).unwrap(),
                })
                .collect();
            let prices: Vec<Money> = lines.iter().map(|(_, _, p)| Money::from_cents(*p)).collect();
            let expected: u64 = lines.iter().map(|(_, q, p)| u64::from(*q) * p).sum();

            let order = OrderDraft { table_number: TableNumber::new(1).unwrap(), items }
                .into_priced(&prices)
                .unwrap();

            prop_assert_eq!(order.subtotal().cents(), expected);
        }
    }
}
