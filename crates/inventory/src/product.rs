use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::error::required_text;
use warehouse_core::{CategoryId, DomainError, DomainResult, Entity, Money, ProductId};

/// A stocked item. Persisted rows always carry `quantity > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub category_id: CategoryId,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock value at the current price. Never stored.
    pub fn value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: ReceiveStock (accumulate by product name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub name: String,
    pub category_id: CategoryId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl ReceiveStock {
    pub fn validate(&self) -> DomainResult<ReceiveStock> {
        let name = required_text("product name", &self.name)?;
        if self.quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        Ok(ReceiveStock {
            name,
            category_id: self.category_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        })
    }
}

/// Command: IssueStock (deduct by product id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Command: UpdateProduct (direct edit of every column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub category_id: CategoryId,
}

impl UpdateProduct {
    pub fn validate(&self) -> DomainResult<UpdateProduct> {
        let name = required_text("product name", &self.name)?;
        if self.quantity <= 0 {
            return Err(DomainError::validation(
                "quantity must be positive; issue the remaining stock to remove a product",
            ));
        }
        Ok(UpdateProduct {
            id: self.id,
            name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            category_id: self.category_id,
        })
    }
}

/// Row to insert for a product seen for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub category_id: CategoryId,
}

/// Write decided by [`plan_receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivePlan {
    Create(NewProduct),
    /// Existing row gets the accumulated `quantity` and the latest `unit_price`.
    Restock {
        id: ProductId,
        quantity: i64,
        unit_price: Money,
    },
}

/// Decide the write for a receipt, given the product currently stored under the
/// same name (if any). The category must already be known to exist.
pub fn plan_receive(existing: Option<&Product>, cmd: &ReceiveStock) -> DomainResult<ReceivePlan> {
    let cmd = cmd.validate()?;
    match existing {
        None => Ok(ReceivePlan::Create(NewProduct {
            name: cmd.name,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            category_id: cmd.category_id,
        })),
        Some(product) => {
            if product.name != cmd.name {
                return Err(DomainError::precondition(format!(
                    "receipt for {:?} matched product {:?}",
                    cmd.name, product.name
                )));
            }
            let quantity = product
                .quantity
                .checked_add(cmd.quantity)
                .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            Ok(ReceivePlan::Restock {
                id: product.id,
                quantity,
                unit_price: cmd.unit_price,
            })
        }
    }
}

/// Write decided by [`plan_issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePlan {
    Deduct { id: ProductId, remaining: i64 },
    /// Stock reaches zero: the row is deleted.
    Remove { id: ProductId },
}

/// Decide the write for an issue against the currently stored product.
pub fn plan_issue(existing: Option<&Product>, cmd: &IssueStock) -> DomainResult<IssuePlan> {
    if cmd.quantity <= 0 {
        return Err(DomainError::validation("issued quantity must be positive"));
    }
    let product = existing.ok_or_else(|| {
        DomainError::precondition(format!("no such product: {}", cmd.product_id))
    })?;
    if cmd.quantity > product.quantity {
        return Err(DomainError::precondition(format!(
            "cannot issue {} of {:?}: only {} on hand",
            cmd.quantity, product.name, product.quantity
        )));
    }

    let remaining = product.quantity - cmd.quantity;
    if remaining == 0 {
        Ok(IssuePlan::Remove { id: product.id })
    } else {
        Ok(IssuePlan::Deduct {
            id: product.id,
            remaining,
        })
    }
}

/// Result of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReceiveOutcome {
    Created { product: Product },
    Restocked { product: Product },
}

impl ReceiveOutcome {
    pub fn product(&self) -> &Product {
        match self {
            ReceiveOutcome::Created { product } | ReceiveOutcome::Restocked { product } => product,
        }
    }
}

/// Result of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssueOutcome {
    Deducted { product: Product },
    /// The product reached zero stock and no longer exists.
    Depleted { product_id: ProductId, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64) -> Product {
        Product {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            quantity,
            unit_price: Money::from_cents(250),
            category_id: CategoryId::new(1),
            updated_at: Utc::now(),
        }
    }

    fn receipt(quantity: i64, cents: u64) -> ReceiveStock {
        ReceiveStock {
            name: " Widget ".to_string(),
            category_id: CategoryId::new(1),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn receive_new_name_creates() {
        let plan = plan_receive(None, &receipt(10, 250)).unwrap();
        assert_eq!(
            plan,
            ReceivePlan::Create(NewProduct {
                name: "Widget".to_string(),
                quantity: 10,
                unit_price: Money::from_cents(250),
                category_id: CategoryId::new(1),
            })
        );
    }

    #[test]
    fn receive_existing_accumulates_and_overwrites_price() {
        let existing = product(10);
        let plan = plan_receive(Some(&existing), &receipt(5, 275)).unwrap();
        assert_eq!(
            plan,
            ReceivePlan::Restock {
                id: existing.id,
                quantity: 15,
                unit_price: Money::from_cents(275),
            }
        );
    }

    #[test]
    fn receive_rejects_non_positive_quantity() {
        for q in [0, -3] {
            assert!(matches!(plan_receive(None, &receipt(q, 100)), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn receive_rejects_blank_name() {
        let mut cmd = receipt(1, 100);
        cmd.name = "  ".to_string();
        assert!(matches!(plan_receive(None, &cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn issue_partial_deducts() {
        let plan = plan_issue(
            Some(&product(10)),
            &IssueStock { product_id: ProductId::new(7), quantity: 4 },
        )
        .unwrap();
        assert_eq!(plan, IssuePlan::Deduct { id: ProductId::new(7), remaining: 6 });
    }

    #[test]
    fn issue_everything_removes() {
        let plan = plan_issue(
            Some(&product(3)),
            &IssueStock { product_id: ProductId::new(7), quantity: 3 },
        )
        .unwrap();
        assert_eq!(plan, IssuePlan::Remove { id: ProductId::new(7) });
    }

    #[test]
    fn issue_more_than_on_hand_is_precondition_failure() {
        let err = plan_issue(
            Some(&product(3)),
            &IssueStock { product_id: ProductId::new(7), quantity: 4 },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }

    #[test]
    fn issue_missing_product_is_precondition_failure() {
        let err = plan_issue(None, &IssueStock { product_id: ProductId::new(7), quantity: 3 })
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(msg) if msg.contains("no such product")));
    }

    #[test]
    fn issue_zero_is_validation_error() {
        let err = plan_issue(
            Some(&product(3)),
            &IssueStock { product_id: ProductId::new(7), quantity: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn value_is_quantity_times_price() {
        let mut p = product(15);
        p.unit_price = Money::from_cents(275);
        assert_eq!(p.value(), Money::from_cents(4125));
    }

    #[test]
    fn update_rejects_zero_quantity() {
        let cmd = UpdateProduct {
            id: ProductId::new(1),
            name: "Widget".to_string(),
            quantity: 0,
            unit_price: Money::ZERO,
            category_id: CategoryId::new(1),
        };
        assert!(matches!(cmd.validate(), Err(DomainError::Validation(_))));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: consecutive receipts sum their quantities; price is last write.
            #[test]
            fn receipts_accumulate(
                deltas in proptest::collection::vec((1i64..10_000, 0u64..100_000), 1..20)
            ) {
                let mut stored: Option<Product> = None;
                for (delta, cents) in &deltas {
                    let plan = plan_receive(stored.as_ref(), &receipt(*delta, *cents)).unwrap();
                    stored = Some(match plan {
                        ReceivePlan::Create(new) => Product {
                            id: ProductId::new(1),
                            name: new.name,
                            quantity: new.quantity,
                            unit_price: new.unit_price,
                            category_id: new.category_id,
                            updated_at: Utc::now(),
                        },
                        ReceivePlan::Restock { quantity, unit_price, .. } => {
                            let mut p = stored.take().unwrap();
                            p.quantity = quantity;
                            p.unit_price = unit_price;
                            p
                        }
                    });
                }

                let p = stored.unwrap();
                prop_assert_eq!(p.quantity, deltas.iter().map(|(d, _)| d).sum::<i64>());
                prop_assert_eq!(p.unit_price, Money::from_cents(deltas.last().unwrap().1));
            }

            /// Property: an issue never leaves a zero or negative quantity behind.
            #[test]
            fn issue_never_persists_zero(on_hand in 1i64..1_000, take in 1i64..2_000) {
                let cmd = IssueStock { product_id: ProductId::new(7), quantity: take };
                match plan_issue(Some(&product(on_hand)), &cmd) {
                    Ok(IssuePlan::Deduct { remaining, .. }) => {
                        prop_assert!(remaining > 0);
                        prop_assert_eq!(remaining, on_hand - take);
                    }
                    Ok(IssuePlan::Remove { .. }) => prop_assert_eq!(take, on_hand),
                    Err(DomainError::PreconditionFailed(_)) => prop_assert!(take > on_hand),
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
        }
    }
}
