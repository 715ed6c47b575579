//! Conversions between wire types and checkout domain types.

use marketstall_core::{Money, Quantity};
use tracing::warn;

use super::types::{
    AddressPayload, CartEnvelope, CartEntry, Populated, StoredAddress, UserAddressUpdate,
    UserProfile,
};
use crate::checkout::{Address, AddressForm, LineItem};

/// Normalize `GET /cart` into line items.
///
/// Entries whose product was not populated, or whose quantity is below 1,
/// are skipped with a warning.
#[must_use]
pub fn convert_cart(envelope: &CartEnvelope) -> Vec<LineItem> {
    envelope.entries().iter().filter_map(convert_entry).collect()
}

fn convert_entry(entry: &CartEntry) -> Option<LineItem> {
    let product = match &entry.product {
        Some(Populated::Document(product)) => product,
        Some(Populated::Id(id)) => {
            warn!(product_id = %id, "Skipping cart entry with unpopulated product");
            return None;
        }
        None => {
            warn!("Skipping cart entry without a product");
            return None;
        }
    };

    let quantity = Quantity::new(entry.quantity)
        .inspect_err(|e| warn!(product_id = %product.id, error = %e, "Skipping cart entry"))
        .ok()?;

    Some(LineItem {
        product_id: product.id.clone(),
        cart_item_id: entry.id.clone(),
        title: product.title.clone(),
        description: product.description.clone(),
        image: product.image.clone(),
        unit_price: Money::from_minor(product.price),
        quantity,
    })
}

/// Resolve the shipping address from a stored profile.
///
/// A profile with both a street and a phone number yields an [`Address`];
/// anything less yields a form pre-filled with what is known.
///
/// # Errors
///
/// Returns the pre-filled form when the profile is missing or incomplete.
pub fn convert_profile(
    profile: Option<&UserProfile>,
    default_country: &str,
) -> Result<Address, AddressForm> {
    let Some(profile) = profile else {
        return Err(AddressForm::new(default_country));
    };

    let name = profile
        .fullname
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or(profile.username.as_deref())
        .unwrap_or_default()
        .to_string();
    let street = profile
        .address
        .as_ref()
        .and_then(|a| a.street.as_deref())
        .unwrap_or_default()
        .to_string();
    let phone = profile.phone.clone().unwrap_or_default();
    let country = profile
        .address
        .as_ref()
        .and_then(|a| a.country.as_deref())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(default_country)
        .to_string();

    if street.trim().is_empty() || phone.trim().is_empty() {
        return Err(AddressForm {
            name,
            street,
            phone,
            country,
            ..AddressForm::default()
        });
    }

    Ok(Address {
        name,
        street,
        phone,
        country,
    })
}

/// Body for persisting an address onto the user profile.
#[must_use]
pub fn convert_address_update(address: &Address) -> UserAddressUpdate {
    UserAddressUpdate {
        address: StoredAddress {
            street: Some(address.street.clone()),
            zipcode: Some(String::new()),
            city: Some(String::new()),
            country: Some(address.country.clone()),
        },
        phone: address.phone.clone(),
    }
}

/// Shipping address as sent with an order.
#[must_use]
pub fn convert_address_payload(address: &Address) -> AddressPayload {
    AddressPayload {
        name: address.name.clone(),
        address: address.street.clone(),
        phone: address.phone.clone(),
        country: address.country.clone(),
    }
}
