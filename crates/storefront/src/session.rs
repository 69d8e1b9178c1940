//! Session store: who is logged in and what is in the cart.
//!
//! One [`SessionStore`] is created at startup and handed to every consumer.
//! Only its own operations mutate it. The cart is mirrored to storage on
//! every change; the user is never stored locally and is re-derived from the
//! backend session cookie on each start.

use std::sync::{Arc, Mutex, PoisonError};

use apex_core::{ApiResponse, CartItem, Price, User};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::StorageError;
use crate::http::{ApiClient, HttpMethod, RequestConfig};
use crate::storage::Storage;

/// Path of the "who am I" endpoint.
pub const SESSION_PATH: &str = "api/auth/me";

/// Storage keys owned by the storefront.
pub mod keys {
    /// Key for the JSON-serialized cart.
    pub const CART: &str = "cart";

    /// Key for the persisted backend cookies.
    pub const COOKIES: &str = "cookies";
}

/// Everything the store holds at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The authenticated user, if any.
    pub user: Option<User>,
    /// Cart lines in insertion order.
    pub cart: Vec<CartItem>,
}

impl SessionSnapshot {
    /// Total number of units across all lines.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.cart
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity.get()))
    }

    /// Sum of every line total.
    #[must_use]
    pub fn cart_subtotal(&self) -> Price {
        self.cart.iter().map(CartItem::line_total).sum()
    }
}

/// Shared handle to the session/cart state.
///
/// Cheaply cloneable; every clone sees the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn Storage>,
    state: watch::Sender<SessionSnapshot>,
    /// Orders cart writes without holding the state lock during I/O.
    cart_writes: Mutex<()>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store with the given cart and no user, without any I/O.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, cart: Vec<CartItem>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot { user: None, cart });
        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                state,
                cart_writes: Mutex::new(()),
            }),
        }
    }

    /// Hydrate the cart from storage and try to restore the backend session.
    ///
    /// Never fails: an unreadable cart starts empty and an unreachable or
    /// unwilling backend leaves the store anonymous.
    #[instrument(skip_all)]
    pub async fn initialize(api: &ApiClient, storage: Arc<dyn Storage>) -> Self {
        let cart = load_cart(storage.as_ref());
        let store = Self::new(storage, cart);

        // An unreachable backend and a missing session both mean anonymous
        if let Some(user) = restore_session(api).await {
            info!(user_id = %user.id, "Session restored");
            store.login(user);
        }

        store
    }

    /// Replace the current user.
    pub fn login(&self, user: User) {
        self.inner.state.send_modify(|state| state.user = Some(user));
    }

    /// Forget the current user. The backend session is left alone.
    pub fn logout(&self) {
        self.inner.state.send_modify(|state| state.user = None);
    }

    /// Append `item` to the cart and persist the whole cart.
    ///
    /// Repeated adds of the same product create separate lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written to storage. The item
    /// stays in the in-memory cart either way.
    pub fn add_to_cart(&self, item: CartItem) -> Result<(), StorageError> {
        let _writes = self
            .inner
            .cart_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut serialized = Ok(String::new());
        self.inner.state.send_modify(|state| {
            state.cart.push(item);
            serialized = serde_json::to_string(&state.cart);
        });

        let persisted = serialized
            .map_err(StorageError::from)
            .and_then(|raw| self.inner.storage.set_item(keys::CART, &raw));
        if let Err(e) = &persisted {
            warn!(error = %e, "Failed to persist cart");
        }
        persisted
    }

    /// The current user, if authenticated.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// `true` when a user is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().user.is_some()
    }

    /// The current cart lines.
    #[must_use]
    pub fn cart(&self) -> Vec<CartItem> {
        self.inner.state.borrow().cart.clone()
    }

    /// Total number of units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.inner.state.borrow().cart_count()
    }

    /// Sum of every line total in the cart.
    #[must_use]
    pub fn cart_subtotal(&self) -> Price {
        self.inner.state.borrow().cart_subtotal()
    }

    /// Snapshot of user and cart together.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }
}

// =============================================================================
// Hydration Helpers
// =============================================================================

/// Read and parse the persisted cart; any problem yields what could be kept.
fn load_cart(storage: &dyn Storage) -> Vec<CartItem> {
    match storage.get_item(keys::CART) {
        Ok(Some(raw)) => parse_cart(&raw),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, starting empty");
            Vec::new()
        }
    }
}

/// Parse a persisted cart.
///
/// Text that is not a JSON array yields an empty cart. Inside an array,
/// entries that do not parse as a [`CartItem`] are dropped and the rest kept.
#[must_use]
pub fn parse_cart(raw: &str) -> Vec<CartItem> {
    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!("Stored cart is not a JSON array, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Stored cart is not valid JSON, starting empty");
            return Vec::new();
        }
    };

    let total = entries.len();
    let cart: Vec<CartItem> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();

    if cart.len() < total {
        warn!(
            dropped = total - cart.len(),
            kept = cart.len(),
            "Dropped unparseable cart entries"
        );
    }
    cart
}

/// Ask the backend who the cookie belongs to.
async fn restore_session(api: &ApiClient) -> Option<User> {
    let state = api
        .executor(RequestConfig::new(HttpMethod::Get, SESSION_PATH))
        .execute()
        .await;

    if let Some(error) = &state.error {
        debug!(error = %error, "Session check failed, continuing anonymously");
        return None;
    }

    let user = state
        .envelope::<User>()
        .and_then(ApiResponse::into_success_data);
    if user.is_none() {
        debug!("No active session");
    }
    user
}
