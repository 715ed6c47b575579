//! Shipping address resolution.
//!
//! The address comes from the user's stored profile when it is complete;
//! otherwise the checkout shows a form that must validate before an order
//! can be submitted.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Phone numbers are 10 or 11 digits.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,11}$").expect("Invalid regex"));

/// A validated shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    /// Street address, free-form.
    pub street: String,
    pub phone: String,
    pub country: String,
}

/// Per-field validation messages for the address form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub name: Option<String>,
    pub street: Option<String>,
    pub phone: Option<String>,
}

impl FormErrors {
    /// Whether no field has an error.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.street.is_none() && self.phone.is_none()
    }

    /// All messages, in form order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        [&self.name, &self.street, &self.phone]
            .into_iter()
            .filter_map(Option::as_deref)
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.messages().collect();
        f.write_str(&messages.join("; "))
    }
}

/// The editable address form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressForm {
    pub name: String,
    pub street: String,
    pub phone: String,
    pub country: String,
    /// Messages from the last failed validation.
    pub errors: FormErrors,
}

impl AddressForm {
    /// An empty form with the country pre-filled.
    #[must_use]
    pub fn new(default_country: impl Into<String>) -> Self {
        Self {
            country: default_country.into(),
            ..Self::default()
        }
    }

    /// A form pre-filled from an existing address.
    #[must_use]
    pub fn from_address(address: &Address) -> Self {
        Self {
            name: address.name.clone(),
            street: address.street.clone(),
            phone: address.phone.clone(),
            country: address.country.clone(),
            errors: FormErrors::default(),
        }
    }

    /// Check every field and produce a trimmed [`Address`].
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any required field is empty or
    /// the phone number is not 10-11 digits.
    pub fn validate(&self) -> Result<Address, FormErrors> {
        let name = self.name.trim();
        let street = self.street.trim();
        let phone = self.phone.trim();

        let mut errors = FormErrors::default();
        if name.is_empty() {
            errors.name = Some("Please enter your full name".to_string());
        }
        if street.is_empty() {
            errors.street = Some("Please enter your address".to_string());
        }
        if phone.is_empty() {
            errors.phone = Some("Please enter your phone number".to_string());
        } else if !PHONE_PATTERN.is_match(phone) {
            errors.phone = Some("Invalid phone number (10-11 digits)".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Address {
            name: name.to_string(),
            street: street.to_string(),
            phone: phone.to_string(),
            country: self.country.trim().to_string(),
        })
    }
}

/// Where the checkout's shipping address currently stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddressState {
    /// The profile fetch is in flight.
    #[default]
    Loading,
    /// A complete address is known.
    Resolved(Address),
    /// The user must fill in the form.
    NeedsForm(AddressForm),
}

impl AddressState {
    /// The resolved address, if any.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match self {
            Self::Resolved(address) => Some(address),
            Self::Loading | Self::NeedsForm(_) => None,
        }
    }

    /// Whether the form is showing.
    #[must_use]
    pub const fn is_form_active(&self) -> bool {
        matches!(self, Self::NeedsForm(_))
    }

    /// Mutable access to the form while it is showing.
    pub const fn form_mut(&mut self) -> Option<&mut AddressForm> {
        match self {
            Self::NeedsForm(form) => Some(form),
            Self::Loading | Self::Resolved(_) => None,
        }
    }

    /// Reopen the form, pre-filled from the resolved address.
    ///
    /// Does nothing while loading or when the form is already showing.
    pub fn edit(&mut self) {
        if let Self::Resolved(address) = self {
            *self = Self::NeedsForm(AddressForm::from_address(address));
        }
    }

    /// Validate the form and, on success, move to `Resolved`.
    ///
    /// Returns the newly resolved address, which the caller persists. When
    /// the form is not showing this returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages on validation failure; they are also
    /// kept on the form.
    pub fn submit_form(&mut self) -> Result<Option<Address>, FormErrors> {
        let Self::NeedsForm(form) = self else {
            return Ok(None);
        };

        match form.validate() {
            Ok(address) => {
                *self = Self::Resolved(address.clone());
                Ok(Some(address))
            }
            Err(errors) => {
                form.errors = errors.clone();
                Err(errors)
            }
        }
    }
}
