use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WishlistResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wishlist_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub payment_method: String,
}

impl Default for CheckoutRequest {
    fn default() -> Self {
        Self {
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            pincode: String::new(),
            payment_method: "cod".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    success: bool,
    #[serde(default)]
    order_id: Option<u64>,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Confirmed {
        order_id: u64,
        order_number: Option<String>,
    },
    Rejected {
        error: String,
        redirect: Option<String>,
    },
}

impl CheckoutOutcome {
    /// Where the browser goes next, if anywhere.
    pub fn next_location(&self) -> Option<String> {
        match self {
            CheckoutOutcome::Confirmed { order_id, .. } => {
                Some(format!("/order-confirmed/{}", order_id))
            }
            CheckoutOutcome::Rejected { redirect, .. } => redirect.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistAction {
    Add,
    Remove,
}

impl WishlistAction {
    fn path(&self) -> &'static str {
        match self {
            WishlistAction::Add => "add",
            WishlistAction::Remove => "remove",
        }
    }
}

/// JSON client for the storefront endpoints the page scripts call.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    http: reqwest::Client,
    base_url: String,
}

impl StorefrontClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Product record for the quick-view modal.
    pub async fn product(&self, id: u64) -> Result<Product> {
        let url = self.url(&format!("/api/product/{}", id));
        debug!("GET {}", url);

        let product = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch product {}", id))?
            .error_for_status()
            .with_context(|| format!("Product {} request was refused", id))?
            .json::<Product>()
            .await
            .context("Failed to decode product")?;

        Ok(product)
    }

    pub async fn add_to_wishlist(&self, id: u64) -> Result<WishlistResponse> {
        self.wishlist(WishlistAction::Add, id).await
    }

    pub async fn remove_from_wishlist(&self, id: u64) -> Result<WishlistResponse> {
        self.wishlist(WishlistAction::Remove, id).await
    }

    pub async fn wishlist(&self, action: WishlistAction, id: u64) -> Result<WishlistResponse> {
        let url = self.url(&format!("/api/wishlist/{}/{}", action.path(), id));
        debug!("POST {}", url);

        self.http
            .post(&url)
            .send()
            .await
            .context("Wishlist request failed")?
            .error_for_status()
            .context("Wishlist request was refused")?
            .json::<WishlistResponse>()
            .await
            .context("Failed to decode wishlist response")
    }

    /// Submit the order form. The backend answers failures with the same
    /// JSON shape (sometimes with a 500), so the body is read regardless of
    /// status.
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutOutcome> {
        let url = self.url("/checkout");
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Checkout request failed")?;
        let status = response.status();
        let body: CheckoutResponse = response
            .json()
            .await
            .with_context(|| format!("Unreadable checkout response ({})", status))?;

        let outcome = match (body.success, body.order_id) {
            (true, Some(order_id)) => CheckoutOutcome::Confirmed {
                order_id,
                order_number: body.order_number,
            },
            (true, None) => anyhow::bail!("Checkout succeeded without an order id"),
            (false, _) => CheckoutOutcome::Rejected {
                error: body.error.unwrap_or_else(|| "Checkout failed".to_string()),
                redirect: body.redirect,
            },
        };

        info!(?outcome, "Checkout finished");
        Ok(outcome)
    }
}
