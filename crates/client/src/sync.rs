//! The cart synchronizer.
//!
//! Owns the in-memory cart and keeps it consistent with the local cache and
//! the remote cart document.
//!
//! # Transitions
//!
//! Every sign-in or sign-out is a transition. The local snapshot is loaded
//! and published straight away; on sign-in the remote document is then read:
//!
//! | remote | local | result |
//! | --- | --- | --- |
//! | present | any | remote replaces memory and local cache |
//! | absent | non-empty | local items pushed as the new remote document |
//! | absent | empty | stays empty |
//! | read failed | any | local state kept for the session |
//!
//! Once a sign-in reconciliation settles, the resulting cart is published as
//! a second `cartUpdated`, followed by `cartReady`. A sign-out publishes only
//! `cartReady`. A transition that is overtaken by a newer one before settling
//! publishes nothing further.
//!
//! # Commit protocol
//!
//! Every cart mutation: apply in memory, save to the local cache (both under
//! the state lock), merge-write to the remote when signed in, then publish
//! `cartUpdated`. Remote write failures only downgrade the result to
//! [`PersistMode::LocalOnly`].

use std::sync::{Arc, Mutex};

use cartsync_core::{
    CartItem, ProductId, ProductInput, QuantityInput, UserId, cart_count, cart_total,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{
    CartError, MutationOutcome, PersistMode, add_breadcrumb, capture_remote_error,
    clear_sentry_user, set_sentry_user,
};
use crate::events::{CartEvent, CountIndicator, Notifier};
use crate::local::{FileStorage, LocalCartCache};
use crate::lock;
use crate::remote::{DocumentStore, HttpDocumentStore, RemoteError, RemoteGateway};
use crate::ui::{GuardedAction, SignInPrompt, TracingSignInPrompt};

/// Where the synchronizer is in the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Nobody is signed in; state comes from the local cache only.
    #[default]
    SignedOut,
    /// A buyer signed in and the remote cart has not been reconciled yet.
    Reconciling,
    /// A buyer is signed in and reconciliation has settled.
    Ready,
}

/// Local-first cart synchronizer.
///
/// Cheap to clone; clones share state. Construct once in the composition
/// root and hand clones to whatever needs the cart.
#[derive(Clone)]
pub struct CartSynchronizer {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: ClientConfig,
    local: LocalCartCache,
    pub(crate) remote: Option<RemoteGateway>,
    pub(crate) notifier: Notifier,
    prompt: Arc<dyn SignInPrompt>,
    state: Mutex<CartState>,
}

#[derive(Debug, Default)]
struct CartState {
    user: Option<UserId>,
    items: Vec<CartItem>,
    phase: SyncPhase,
    ready: bool,
    epoch: u64,
}

/// A transition whose local half has been applied.
#[derive(Debug)]
pub(crate) struct Transition {
    epoch: u64,
    user: Option<UserId>,
}

/// Builder for [`CartSynchronizer`].
pub struct CartSynchronizerBuilder {
    config: ClientConfig,
    local: Option<LocalCartCache>,
    remote: Option<Arc<dyn DocumentStore>>,
    indicators: Vec<Arc<dyn CountIndicator>>,
    prompt: Option<Arc<dyn SignInPrompt>>,
}

impl CartSynchronizerBuilder {
    /// Use this local cache instead of files under `config.cache_dir`.
    #[must_use]
    pub fn local(mut self, local: LocalCartCache) -> Self {
        self.local = Some(local);
        self
    }

    /// Use this document store instead of the one described by `config.remote`.
    #[must_use]
    pub fn remote(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.remote = Some(store);
        self
    }

    /// Register a cart-count badge.
    #[must_use]
    pub fn indicator(mut self, indicator: Arc<dyn CountIndicator>) -> Self {
        self.indicators.push(indicator);
        self
    }

    /// Use this sign-in prompt for guarded actions.
    #[must_use]
    pub fn prompt(mut self, prompt: Arc<dyn SignInPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Build the synchronizer.
    ///
    /// A remote store that cannot be constructed is not an error: the
    /// session runs local-only and the reason is logged once here.
    #[must_use]
    pub fn build(self) -> CartSynchronizer {
        let Self {
            config,
            local,
            remote,
            indicators,
            prompt,
        } = self;

        let local = local.unwrap_or_else(|| {
            LocalCartCache::new(FileStorage::new(&config.cache_dir), config.cache_scope)
        });

        let remote = remote.or_else(|| match &config.remote {
            Some(remote_config) => match HttpDocumentStore::new(remote_config) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn DocumentStore>),
                Err(e) => {
                    warn!(error = %e, "Remote store misconfigured, running in local-only mode");
                    capture_remote_error(&e);
                    None
                }
            },
            None => {
                info!("No remote store configured, running in local-only mode");
                None
            }
        });

        let notifier = indicators
            .into_iter()
            .fold(Notifier::new(config.event_capacity), Notifier::with_indicator);

        CartSynchronizer {
            inner: Arc::new(Inner {
                local,
                remote: remote.map(RemoteGateway::new),
                notifier,
                prompt: prompt.unwrap_or_else(|| Arc::new(TracingSignInPrompt)),
                state: Mutex::new(CartState::default()),
                config,
            }),
        }
    }
}

impl CartSynchronizer {
    /// Start building a synchronizer.
    #[must_use]
    pub fn builder(config: ClientConfig) -> CartSynchronizerBuilder {
        CartSynchronizerBuilder {
            config,
            local: None,
            remote: None,
            indicators: Vec::new(),
            prompt: None,
        }
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    /// Apply a sign-in (`Some`) or sign-out (`None`) and reconcile.
    ///
    /// Returns once the transition has settled or been superseded.
    pub async fn handle_auth_change(&self, user: Option<UserId>) {
        let transition = self.begin_transition(user);
        self.finish_transition(transition).await;
    }

    /// Load and publish the local snapshot for `user`.
    pub(crate) fn begin_transition(&self, user: Option<UserId>) -> Transition {
        let (epoch, items) = {
            let mut state = lock(&self.inner.state);
            state.epoch = state.epoch.wrapping_add(1);
            state.items = self.inner.local.load(user.as_ref());
            state.user.clone_from(&user);
            state.phase = if user.is_some() {
                SyncPhase::Reconciling
            } else {
                SyncPhase::SignedOut
            };
            state.ready = false;
            (state.epoch, state.items.clone())
        };

        match &user {
            Some(uid) => {
                set_sentry_user(uid);
                add_breadcrumb("auth", "Signed in", None);
                info!(user_id = %uid, items = items.len(), "Buyer signed in, loaded local cart");
            }
            None => {
                clear_sentry_user();
                add_breadcrumb("auth", "Signed out", None);
                info!(items = items.len(), "Signed out, loaded local cart");
            }
        }

        self.publish_items(items);
        Transition { epoch, user }
    }

    /// Reconcile with the remote (when signed in), then publish the reconciled
    /// cart and `cartReady`.
    pub(crate) async fn finish_transition(&self, transition: Transition) {
        let reconciled = match (&transition.user, &self.inner.remote) {
            (Some(user), Some(remote)) => {
                self.reconcile(user, remote, transition.epoch).await;
                true
            }
            _ => false,
        };

        let settled = {
            let mut state = lock(&self.inner.state);
            if state.epoch == transition.epoch {
                state.ready = true;
                if transition.user.is_some() {
                    state.phase = SyncPhase::Ready;
                }
                Some(reconciled.then(|| state.items.clone()))
            } else {
                None
            }
        };

        if let Some(reconciled_items) = settled {
            if let Some(items) = reconciled_items {
                self.publish_items(items);
            }
            self.inner.notifier.publish(CartEvent::CartReady {
                user: transition.user.is_some(),
            });
        } else {
            debug!(epoch = transition.epoch, "Transition superseded before settling");
        }
    }

    #[instrument(skip(self, remote), fields(user_id = %user))]
    async fn reconcile(&self, user: &UserId, remote: &RemoteGateway, epoch: u64) {
        match remote.read_cart_document(user).await {
            Ok(Some(doc)) => {
                let mut state = lock(&self.inner.state);
                if state.epoch != epoch {
                    return;
                }
                state.items = doc.items;
                self.inner.local.save(Some(user), &state.items);
                info!(items = state.items.len(), "Remote cart replaced local state");
            }
            Ok(None) => {
                let local = {
                    let state = lock(&self.inner.state);
                    if state.epoch != epoch {
                        return;
                    }
                    state.items.clone()
                };
                if local.is_empty() {
                    debug!("No remote cart and local cart is empty");
                    return;
                }
                match remote.write_cart_document(user, &local).await {
                    Ok(()) => info!(items = local.len(), "Pushed local cart to new remote document"),
                    Err(e) => report_remote_failure("Failed to push local cart", &e),
                }
            }
            Err(e) => report_remote_failure("Remote cart read failed, keeping local cart", &e),
        }
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    /// Add `quantity` of a product, incrementing an existing line.
    ///
    /// Quantity below one (or unparsable) counts as one.
    ///
    /// # Errors
    ///
    /// - [`CartError::AuthRequired`] when signed out; the sign-in prompt has
    ///   been shown and nothing changed
    /// - [`CartError::InvalidProduct`] when the product has no usable id
    #[instrument(skip(self, product, quantity))]
    pub async fn add_to_cart(
        &self,
        product: &ProductInput,
        quantity: impl Into<QuantityInput>,
    ) -> Result<PersistMode, CartError> {
        if self.current_user().is_none() {
            return Err(self.require_sign_in(GuardedAction::AddToCart));
        }

        let product = product.resolve().inspect_err(|e| {
            warn!(error = %e, "Rejected product without a usable id");
        })?;
        let quantity = quantity.into().for_add();
        let product_id = product.id.clone();

        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", product_id.as_str())]),
        );

        let outcome = self
            .commit(move |items| {
                if let Some(item) = items.iter_mut().find(|item| item.id == product.id) {
                    item.quantity = item.quantity.saturating_add(quantity);
                } else {
                    items.push(CartItem::from_product(product, quantity, Utc::now()));
                }
                true
            })
            .await;

        debug!(product_id = %product_id, quantity, "Added to cart");
        Ok(outcome.persist_mode().unwrap_or(PersistMode::LocalOnly))
    }

    /// Remove a line. Removing an absent id changes nothing.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_from_cart(&self, id: &ProductId) -> MutationOutcome {
        let outcome = self
            .commit(|items| {
                let before = items.len();
                items.retain(|item| &item.id != id);
                items.len() != before
            })
            .await;

        if outcome.is_committed() {
            add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));
        }
        outcome
    }

    /// Set a line's quantity exactly. Zero or below removes the line.
    #[instrument(skip(self, quantity), fields(product_id = %id))]
    pub async fn update_quantity(
        &self,
        id: &ProductId,
        quantity: impl Into<QuantityInput>,
    ) -> MutationOutcome {
        let target = quantity.into().for_update();

        self.commit(|items| {
            let Some(pos) = items.iter().position(|item| &item.id == id) else {
                return false;
            };
            match target {
                Some(quantity) => {
                    if let Some(item) = items.get_mut(pos) {
                        item.quantity = quantity;
                    }
                }
                None => {
                    items.remove(pos);
                }
            }
            true
        })
        .await
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> PersistMode {
        add_breadcrumb("cart", "Cleared cart", None);
        self.commit(|items| {
            items.clear();
            true
        })
        .await
        .persist_mode()
        .unwrap_or(PersistMode::LocalOnly)
    }

    async fn commit<F>(&self, mutate: F) -> MutationOutcome
    where
        F: FnOnce(&mut Vec<CartItem>) -> bool + Send,
    {
        let (user, snapshot) = {
            let mut state = lock(&self.inner.state);
            if !mutate(&mut state.items) {
                return MutationOutcome::Unchanged;
            }
            self.inner.local.save(state.user.as_ref(), &state.items);
            (state.user.clone(), state.items.clone())
        };

        let mode = match (&user, &self.inner.remote) {
            (Some(user), Some(remote)) => match remote.write_cart_document(user, &snapshot).await {
                Ok(()) => PersistMode::Remote,
                Err(e) => {
                    report_remote_failure("Remote cart write failed, kept local copy", &e);
                    PersistMode::LocalOnly
                }
            },
            _ => PersistMode::LocalOnly,
        };

        self.publish_items(self.cart_items());
        MutationOutcome::Committed(mode)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current cart lines.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartItem> {
        lock(&self.inner.state).items.clone()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        cart_count(&lock(&self.inner.state).items)
    }

    /// Sum of `price * quantity`.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        cart_total(&lock(&self.inner.state).items)
    }

    /// The signed-in buyer, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        lock(&self.inner.state).user.clone()
    }

    /// Whether the latest transition has settled.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        lock(&self.inner.state).ready
    }

    /// Where the current session is in its sign-in lifecycle.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        lock(&self.inner.state).phase
    }

    /// When the local snapshot for the current session was last saved.
    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        let user = self.current_user();
        self.inner.local.last_saved_at(user.as_ref())
    }

    /// Returns `true` when no remote store is in use.
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.inner.remote.is_none()
    }

    /// Subscribe to notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.notifier.subscribe()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Show the sign-in prompt and build the matching error.
    pub(crate) fn require_sign_in(&self, action: GuardedAction) -> CartError {
        let action_name = action.to_string();
        add_breadcrumb(
            "auth",
            "Sign-in required",
            Some(&[("action", action_name.as_str())]),
        );
        self.inner
            .prompt
            .require_sign_in(action, &self.inner.config.sign_in_url);
        CartError::AuthRequired(action)
    }

    fn publish_items(&self, items: Vec<CartItem>) {
        let count = cart_count(&items);
        self.inner
            .notifier
            .publish(CartEvent::CartUpdated { items, count });
    }
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("CartSynchronizer")
            .field("user", &state.user)
            .field("items", &state.items.len())
            .field("phase", &state.phase)
            .field("local_only", &self.inner.remote.is_none())
            .finish_non_exhaustive()
    }
}

/// Log and capture a swallowed remote failure.
pub(crate) fn report_remote_failure(context: &str, err: &RemoteError) {
    warn!(error = %err, "{context}");
    capture_remote_error(err);
}
