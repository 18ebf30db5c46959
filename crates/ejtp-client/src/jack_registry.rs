//! Process-wide registry mapping an address's transport family to a
//! constructor for the [`Jack`] that serves it.
//!
//! Mirrors `ejtp-proto`'s frame-kind registry: a static table populated
//! lazily, consulted by [`crate::Client::new`] when `make_jack` is set.
//! `ejtp-transport` populates this table with its concrete jacks at the
//! call site that constructs a `Router` for a process, rather than at
//! link time, so this crate never needs to depend on `ejtp-transport`.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use ejtp_core::{CoreError, Jack};
use ejtp_proto::Address;

/// Builds a [`Jack`] bound to (or otherwise serving) `interface`'s
/// transport family.
pub type Factory = Arc<dyn Fn(&Address) -> Result<Arc<dyn Jack>, CoreError> + Send + Sync>;

static REGISTRY: LazyLock<Mutex<HashMap<String, Factory>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

#[allow(clippy::expect_used, reason = "jack registry mutex is never held across a panic")]
fn lock() -> std::sync::MutexGuard<'static, HashMap<String, Factory>> {
    REGISTRY.lock().expect("jack registry mutex poisoned")
}

/// Register (or replace) the jack factory for `addrtype`.
pub fn register(addrtype: impl Into<String>, factory: Factory) {
    lock().insert(addrtype.into(), factory);
}

/// Build a jack for `interface`'s transport family, if one is registered.
/// `None` means no factory is registered for this `addrtype` — a normal
/// condition for purely in-process addresses, since delivery to a
/// registered client never touches a jack.
pub fn create(interface: &Address) -> Option<Result<Arc<dyn Jack>, CoreError>> {
    lock().get(interface.addrtype()).map(|factory| factory(interface))
}
