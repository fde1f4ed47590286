use std::collections::HashMap;

use serde::Deserialize;

use crate::common::{DishId, DomainError, DomainResult, RestaurantId};
use crate::domains::orders::models::NewOrderItem;
use crate::kernel::ServerDeps;

/// One requested line: a dish and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CartLine {
    pub dish_id: DishId,
    pub qty: i32,
}

/// Validates cart lines against the menu and snapshots name and price.
pub(crate) async fn price_cart(
    deps: &ServerDeps,
    restaurant_id: RestaurantId,
    lines: &[CartLine],
) -> DomainResult<Vec<NewOrderItem>> {
    if lines.is_empty() {
        return Err(DomainError::invalid("order must contain at least one item"));
    }
    if let Some(line) = lines.iter().find(|line| line.qty <= 0) {
        return Err(DomainError::invalid(format!(
            "quantity for dish {} must be positive",
            line.dish_id
        )));
    }

    let ids: Vec<DishId> = lines.iter().map(|line| line.dish_id).collect();
    let dishes: HashMap<DishId, _> = deps
        .restaurants
        .find_dishes(&ids)
        .await?
        .into_iter()
        .map(|dish| (dish.id, dish))
        .collect();

    lines
        .iter()
        .map(|line| {
            let dish = dishes
                .get(&line.dish_id)
                .filter(|dish| dish.restaurant_id == restaurant_id)
                .ok_or_else(|| {
                    DomainError::invalid(format!(
                        "dish {} is not on this restaurant's menu",
                        line.dish_id
                    ))
                })?;
            if !dish.is_available {
                return Err(DomainError::invalid(format!(
                    "dish {} is currently unavailable",
                    dish.name
                )));
            }
            Ok(NewOrderItem {
                dish_id: dish.id,
                dish_name: dish.name.clone(),
                qty: line.qty,
                price_each: dish.price,
            })
        })
        .collect()
}
