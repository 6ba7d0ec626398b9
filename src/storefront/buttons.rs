//! Optimistic button state for storefront actions. The UI flips first and
//! reverts if the request fails; nothing is retried automatically.

use anyhow::Result;
use tracing::warn;

use super::client::{CheckoutOutcome, WishlistAction, WishlistResponse};

const WISHLIST_FAILED: &str = "Could not update your wishlist. Please try again.";
const CHECKOUT_FAILED: &str = "Could not place your order. Please try again.";

pub const PLACE_ORDER_LABEL: &str = "Place Order";
pub const PROCESSING_LABEL: &str = "Processing...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistOutcome {
    Saved {
        in_wishlist: bool,
        count: Option<u32>,
        message: Option<String>,
    },
    Reverted {
        notice: String,
    },
}

/// Heart icon on a product card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistButton {
    product_id: u64,
    in_wishlist: bool,
    pending: Option<WishlistAction>,
}

impl WishlistButton {
    pub fn new(product_id: u64, in_wishlist: bool) -> Self {
        Self {
            product_id,
            in_wishlist,
            pending: None,
        }
    }

    pub fn product_id(&self) -> u64 {
        self.product_id
    }

    pub fn in_wishlist(&self) -> bool {
        self.in_wishlist
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Flip the icon and return the request to make. Presses while a
    /// request is in flight are ignored.
    pub fn press(&mut self) -> Option<WishlistAction> {
        if self.pending.is_some() {
            return None;
        }
        let action = if self.in_wishlist {
            WishlistAction::Remove
        } else {
            WishlistAction::Add
        };
        self.in_wishlist = !self.in_wishlist;
        self.pending = Some(action);
        Some(action)
    }

    pub fn settle(&mut self, result: Result<WishlistResponse>) -> WishlistOutcome {
        let Some(action) = self.pending.take() else {
            return WishlistOutcome::Saved {
                in_wishlist: self.in_wishlist,
                count: None,
                message: None,
            };
        };

        let notice = match result {
            Ok(response) if response.success => {
                return WishlistOutcome::Saved {
                    in_wishlist: self.in_wishlist,
                    count: response.wishlist_count,
                    message: response.message,
                };
            }
            Ok(response) => response.message.unwrap_or_else(|| WISHLIST_FAILED.into()),
            Err(e) => {
                warn!(product = self.product_id, ?action, "Wishlist update failed: {:#}", e);
                WISHLIST_FAILED.into()
            }
        };

        self.in_wishlist = action == WishlistAction::Remove;
        WishlistOutcome::Reverted { notice }
    }
}

/// Submit button on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderButton {
    label: &'static str,
    disabled: bool,
}

impl Default for PlaceOrderButton {
    fn default() -> Self {
        Self {
            label: PLACE_ORDER_LABEL,
            disabled: false,
        }
    }
}

impl PlaceOrderButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns false if a submission is already running.
    pub fn begin(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        self.label = PROCESSING_LABEL;
        self.disabled = true;
        true
    }

    /// On success the page navigates away, so the button stays busy.
    /// Anything else puts it back and yields the notice to show.
    pub fn settle(&mut self, result: &Result<CheckoutOutcome>) -> Option<String> {
        let notice = match result {
            Ok(CheckoutOutcome::Confirmed { .. }) => return None,
            // A redirect carries its own explanation, e.g. "Please log in"
            Ok(CheckoutOutcome::Rejected {
                error,
                redirect: Some(_),
            }) => error.clone(),
            Ok(CheckoutOutcome::Rejected { error, .. }) => format!("Error: {}", error),
            Err(e) => {
                warn!("Checkout failed: {:#}", e);
                CHECKOUT_FAILED.to_string()
            }
        };
        self.label = PLACE_ORDER_LABEL;
        self.disabled = false;
        Some(notice)
    }
}
