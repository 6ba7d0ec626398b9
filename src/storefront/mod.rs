pub mod buttons;
pub mod client;

pub use buttons::{PlaceOrderButton, WishlistButton, WishlistOutcome};
pub use client::{CheckoutOutcome, CheckoutRequest, Product, StorefrontClient, WishlistAction};
