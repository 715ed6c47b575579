//! The checkout flow.

use marketstall_core::{CurrencyCode, ShippingTier};
use marketstall_storefront::checkout::{
    AddressForm, AddressState, DiscountOutcome, PendingPayment, PriceSummary,
};
use marketstall_storefront::{Checkout, CheckoutError, Session, Storefront};
use tracing::{info, warn};

use super::CommandError;
use super::cart::print_lines;
use crate::CheckoutArgs;

/// Price the cart, then place the order and print the approval URL.
///
/// # Errors
///
/// Returns an error when the shopper is signed out, the cart is empty, the
/// address is incomplete or the order cannot be placed.
pub async fn run(
    storefront: &Storefront,
    session: Option<&Session>,
    args: &CheckoutArgs,
    currency: CurrencyCode,
) -> Result<(), CommandError> {
    super::require_session(session)?;
    let mut checkout = Checkout::load(storefront, session).await;

    if let Some(e) = checkout.take_cart_error() {
        return Err(e.into());
    }
    if checkout.cart().is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    if args.update_address {
        checkout.address_mut().edit();
    }
    if let Some(form) = checkout.address_mut().form_mut() {
        fill_form(form, args);
    }

    if args.express {
        checkout.select_shipping(ShippingTier::Express);
    }

    if let Some(code) = &args.discount {
        match checkout.apply_discount(code).await {
            DiscountOutcome::Applied { message, .. } => println!("Discount: {message}"),
            DiscountOutcome::Invalid { message } => println!("Discount not applied: {message}"),
        }
    }

    print_lines(checkout.cart(), currency);
    print_summary(&checkout.summary(), checkout.shipping_tier(), currency);
    print_address(checkout.address());

    if args.dry_run {
        return Ok(());
    }

    let pending = match checkout.submit().await {
        Ok(pending) => pending,
        Err(CheckoutError::InvalidAddress(errors)) => {
            for message in errors.messages() {
                println!("  - {message}");
            }
            return Err(CommandError::Invalid(
                "Please check your shipping information (--name, --phone, --address)".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    print_pending(&pending);
    Ok(())
}

fn fill_form(form: &mut AddressForm, args: &CheckoutArgs) {
    let fields = [
        (&mut form.name, &args.name),
        (&mut form.phone, &args.phone),
        (&mut form.street, &args.address),
        (&mut form.country, &args.country),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            value.clone_into(field);
        }
    }
}

fn print_summary(summary: &PriceSummary, tier: ShippingTier, currency: CurrencyCode) {
    println!();
    println!("Items:     {}", summary.item_count);
    println!("Subtotal:  {}", summary.subtotal.display(currency));
    println!(
        "Shipping:  {} ({tier})",
        summary.shipping_fee.display(currency)
    );
    if !summary.discount_amount.is_zero() {
        println!("Discount: -{}", summary.discount_amount.display(currency));
    }
    println!("Total:     {}", summary.total.display(currency));
}

fn print_address(address: &AddressState) {
    println!();
    match address {
        AddressState::Resolved(address) => {
            println!("Ship to:   {} ({})", address.name, address.phone);
            println!("           {}, {}", address.street, address.country);
        }
        AddressState::NeedsForm(_) => println!("Ship to:   (address required)"),
        AddressState::Loading => println!("Ship to:   (loading)"),
    }
}

fn print_pending(pending: &PendingPayment) {
    info!(order_id = %pending.order.order_id, "Order placed");
    println!();
    println!("Order {} placed.", pending.order.order_id);

    if let Some(e) = pending.cart_cleared.fetch_error() {
        warn!(error = %e, "Cart could not be re-read for clearing");
        println!("Note: your cart could not be emptied automatically.");
    }
    let failed: Vec<_> = pending
        .cart_cleared
        .failed()
        .map(|(id, _)| id.to_string())
        .collect();
    if !failed.is_empty() {
        println!(
            "Note: these products are still in your cart: {}",
            failed.join(", ")
        );
    }

    println!("Approve payment at: {}", pending.approval_url);
    if let Some(id) = &pending.payment_order_id {
        println!("Then run: mst payment capture {id} <PAYER_ID>");
    }
}
