//! Session management.

use marketstall_core::{Email, UserId};
use marketstall_storefront::error::clear_sentry_user;
use marketstall_storefront::{CurrentUser, Session, SessionStore};
use secrecy::SecretString;
use tracing::info;

use super::CommandError;

/// Show who is signed in.
///
/// # Errors
///
/// Returns an error if the session file is unreadable.
pub fn show(store: &SessionStore) -> Result<(), CommandError> {
    match store.load()? {
        Some(session) => {
            println!("Signed in as {} ({})", session.user.display_name(), session.user.id);
            if let Some(email) = &session.user.email {
                println!("Confirmations go to {email}");
            }
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

/// Store a session issued by the marketplace.
///
/// # Errors
///
/// Returns an error for an invalid email or if the session cannot be saved.
pub fn login(
    store: &SessionStore,
    user_id: &str,
    token: &str,
    fullname: Option<String>,
    username: Option<String>,
    email: Option<&str>,
) -> Result<(), CommandError> {
    let email = email
        .map(Email::parse)
        .transpose()
        .map_err(|e| CommandError::Invalid(format!("Email: {e}")))?;

    let session = Session::new(
        CurrentUser {
            id: UserId::new(user_id),
            fullname,
            username,
            email,
        },
        SecretString::from(token),
    );
    store.save(&session)?;

    info!(user_id, path = %store.path().display(), "Session saved");
    println!("Signed in as {}.", session.user.display_name());
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Returns an error if the session file cannot be removed.
pub fn clear(store: &SessionStore) -> Result<(), CommandError> {
    store.clear()?;
    clear_sentry_user();
    println!("Signed out.");
    Ok(())
}
