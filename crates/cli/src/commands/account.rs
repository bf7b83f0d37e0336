//! Account commands.

use bazaar_client::Storefront;
use bazaar_client::auth::SignupForm;
use bazaar_client::error::messages;
use bazaar_client::redirect::LoginRedirect;
use bazaar_core::ProductId;

use super::{CliError, read_password, rejected};
use crate::render;

pub async fn signup(
    storefront: &Storefront,
    email: String,
    first_name: String,
    last_name: String,
) -> Result<(), CliError> {
    let form = SignupForm {
        email,
        first_name,
        last_name,
        password: read_password("Password")?,
        confirm_password: read_password("Confirm password")?,
    };

    let message = storefront
        .auth()
        .signup(&form)
        .await
        .map_err(rejected(messages::SIGNUP_FAILED))?;

    render::emit(&message);
    render::emit(&format!("Log in with: bz login -e {}", form.email.trim()));
    Ok(())
}

/// Log in. `resume` is a login page URL carrying a redirect and an
/// interrupted add-to-cart; `product` builds the same intent directly.
pub async fn login(
    storefront: &Storefront,
    email: &str,
    resume: Option<String>,
    product: Option<i64>,
    quantity: u32,
) -> Result<(), CliError> {
    let redirect = match (resume, product) {
        (Some(url), _) => LoginRedirect::parse(&url),
        (None, Some(id)) => LoginRedirect::for_add_to_cart("/", ProductId::new(id), quantity),
        (None, None) => LoginRedirect::default(),
    };
    let password = read_password("Password")?;

    let outcome = storefront
        .login_with_redirect(email, password, redirect)
        .await
        .map_err(rejected(messages::LOGIN_FAILED))?;

    render::emit("Logged in");
    match outcome.replayed {
        Some(Ok(())) => render::emit("Added to cart"),
        Some(Err(e)) => render::emit(&e.user_message(messages::ADD_FAILED)),
        None => {}
    }
    render::emit(&format!("Continue at {}", outcome.redirect));
    Ok(())
}

pub fn logout(storefront: &Storefront) {
    storefront.logout();
    render::emit("Logged out");
}
