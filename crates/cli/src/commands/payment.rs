//! Payment completion.

use marketstall_core::{PayerId, PaymentOrderId};
use marketstall_storefront::Storefront;

use super::CommandError;

/// Capture an approved payment.
///
/// # Errors
///
/// Returns an error if the processor refuses the capture.
pub async fn capture(
    storefront: &Storefront,
    order_id: &str,
    payer_id: &str,
) -> Result<(), CommandError> {
    storefront
        .capture_payment(&PaymentOrderId::new(order_id), &PayerId::new(payer_id))
        .await?;
    println!("Payment captured. Thank you for your purchase!");
    Ok(())
}

/// Confirm a payment from the processor's return parameters.
///
/// # Errors
///
/// Returns an error if the processor reports the capture as failed.
pub async fn confirm(
    storefront: &Storefront,
    order_id: Option<&str>,
    payer_id: Option<&str>,
) -> Result<(), CommandError> {
    let Some(confirmation) = storefront.confirm_return(order_id, payer_id).await? else {
        println!("Processing... both the order ID and the payer ID are needed to confirm.");
        return Ok(());
    };

    println!("Payment Successful!");
    if let Some(payment) = &confirmation.payment {
        for (label, key) in [("Order ID", "orderId"), ("Amount Paid", "amount"), ("Status", "status")] {
            if let Some(value) = payment.get(key) {
                println!("  {label}: {value}");
            }
        }
    }
    Ok(())
}
