//! Payment handoff and completion.
//!
//! After an order is placed the shopper approves payment on the processor's
//! page. Completion happens one of two ways: the storefront captures with
//! the payer ID it was handed, or the processor redirects back with the
//! order and payer IDs in the query string.

use marketstall_core::{Money, OrderId, PayerId, PaymentOrderId};
use serde::Serialize;
use tracing::{info, instrument};

use super::cart::ClearReport;
use super::order::{Order, OrderItem};
use super::Address;
use crate::api::CaptureConfirmation;
use crate::error::{CheckoutError, Result};
use crate::state::Storefront;

/// A placed order waiting for the shopper to approve payment.
#[derive(Debug)]
pub struct PendingPayment {
    pub order: Order,
    /// Where to send the shopper to approve payment.
    pub approval_url: String,
    /// The processor's order ID, when it reported one.
    pub payment_order_id: Option<PaymentOrderId>,
    /// How emptying the cart went.
    pub cart_cleared: ClearReport,
}

impl PendingPayment {
    /// Capture the approved payment and produce the receipt.
    ///
    /// # Errors
    ///
    /// Returns `PaymentFailed` if the processor never issued an order ID or
    /// the capture is refused.
    pub async fn complete(
        &self,
        storefront: &Storefront,
        payer_id: &PayerId,
    ) -> Result<CheckoutReceipt> {
        let Some(payment_order_id) = &self.payment_order_id else {
            let message = "Payment order has no processor ID";
            storefront
                .errors()
                .report_message("capturePayment", message)
                .await;
            return Err(CheckoutError::PaymentFailed(message.to_string()));
        };

        storefront.capture_payment(payment_order_id, payer_id).await?;
        Ok(CheckoutReceipt::new(&self.order, payer_id.clone()))
    }
}

/// What the success view shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub payer_id: PayerId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub shipping_fee: Money,
    pub discount_amount: Money,
    pub total: Money,
}

impl CheckoutReceipt {
    #[must_use]
    pub fn new(order: &Order, payer_id: PayerId) -> Self {
        Self {
            order_id: order.order_id.clone(),
            payer_id,
            items: order.items.clone(),
            shipping_address: order.shipping_address.clone(),
            shipping_fee: order.shipping_fee,
            discount_amount: order.discount_amount,
            total: order.total_amount,
        }
    }
}

impl Storefront {
    /// Capture an approved payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentFailed` if the capture request fails.
    #[instrument(skip(self))]
    pub async fn capture_payment(
        &self,
        payment_order_id: &PaymentOrderId,
        payer_id: &PayerId,
    ) -> Result<()> {
        match self
            .backend()
            .capture_payment(payment_order_id, payer_id)
            .await
        {
            Ok(()) => {
                info!("Payment captured");
                Ok(())
            }
            Err(e) => {
                self.errors().report("capturePayment", &e).await;
                Err(CheckoutError::PaymentFailed(e.to_string()))
            }
        }
    }

    /// Confirm a payment when the processor redirects back.
    ///
    /// Both query parameters must be present; otherwise nothing is sent and
    /// `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `PaymentFailed` if the confirmation request fails or the
    /// processor reports the capture as unsuccessful.
    #[instrument(skip(self))]
    pub async fn confirm_return(
        &self,
        order_id: Option<&str>,
        payer_id: Option<&str>,
    ) -> Result<Option<CaptureConfirmation>> {
        let (Some(order_id), Some(_payer_id)) = (
            order_id.filter(|id| !id.is_empty()),
            payer_id.filter(|id| !id.is_empty()),
        ) else {
            return Ok(None);
        };

        let confirmation = match self
            .backend()
            .confirm_capture(&PaymentOrderId::new(order_id))
            .await
        {
            Ok(confirmation) => confirmation,
            Err(e) => {
                self.errors().report("confirmCapture", &e).await;
                return Err(CheckoutError::PaymentFailed(e.to_string()));
            }
        };

        if !confirmation.success {
            let message = confirmation
                .message
                .unwrap_or_else(|| "Payment capture failed".to_string());
            self.errors().report_message("confirmCapture", &message).await;
            return Err(CheckoutError::PaymentFailed(message));
        }

        info!(order_id, "Payment confirmed");
        Ok(Some(confirmation))
    }
}
