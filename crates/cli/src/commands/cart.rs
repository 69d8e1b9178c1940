//! Cart commands.

use apex_core::{CartItem, Price, Quantity};
use apex_storefront::state::Storefront;

use super::CommandError;

/// Append a line to the cart.
pub fn add(
    storefront: &Storefront,
    id: String,
    name: String,
    price: Price,
    quantity: u32,
) -> Result<(), CommandError> {
    let item = CartItem::new(id, name, price, Quantity::new(quantity)?);
    tracing::info!("Adding {} x {} ({})", item.quantity, item.name, item.price);

    storefront.session().add_to_cart(item)?;
    tracing::info!("Cart now holds {} item(s)", storefront.session().cart_count());
    Ok(())
}

/// Print every cart line and the subtotal.
pub fn list(storefront: &Storefront) {
    let cart = storefront.session().cart();
    if cart.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for item in &cart {
        tracing::info!(
            "{:>3} x {:<30} {:>10} {:>10}",
            item.quantity,
            item.name,
            item.price,
            item.line_total()
        );
    }
    tracing::info!("Subtotal: {}", storefront.session().cart_subtotal());
}
