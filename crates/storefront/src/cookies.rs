//! Cookie jar persisted through [`Storage`].
//!
//! Credentialed requests replay whatever cookies the backend set earlier.
//! Parsing, expiry and domain/path matching are handled by
//! [`cookie_store`], the same store `reqwest` uses for its own jar. The jar
//! only accepts cookies from the configured API origin and is written to
//! storage after every change so the backend session survives process
//! restarts.

use std::sync::{Arc, PoisonError, RwLock};

use cookie_store::{CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use tracing::warn;
use url::Url;

use crate::session::keys;
use crate::storage::Storage;

/// Cookie store handed to `reqwest` for the backend origin.
pub struct PersistentCookieJar {
    origin: Url,
    storage: Arc<dyn Storage>,
    store: RwLock<CookieStore>,
}

impl std::fmt::Debug for PersistentCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Cookie values are session credentials
        f.debug_struct("PersistentCookieJar")
            .field("origin", &self.origin.as_str())
            .field("cookies", &self.names())
            .finish_non_exhaustive()
    }
}

impl PersistentCookieJar {
    /// Load the jar for `origin` from storage.
    ///
    /// Unreadable or malformed stored cookies are discarded. Cookies that
    /// expired while the process was not running are dropped on load.
    #[must_use]
    pub fn load(origin: &Url, storage: Arc<dyn Storage>) -> Self {
        let store = match storage.get_item(keys::COOKIES) {
            Ok(Some(raw)) => cookie_store::serde::json::load(raw.as_bytes()).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding malformed stored cookies");
                CookieStore::new()
            }),
            Ok(None) => CookieStore::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cookies");
                CookieStore::new()
            }
        };

        Self {
            origin: origin.clone(),
            storage,
            store: RwLock::new(store),
        }
    }

    /// Names of the unexpired cookies currently held.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = store
            .iter_unexpired()
            .map(|cookie| cookie.name().to_owned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `true` when no unexpired cookies are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .next()
            .is_none()
    }

    /// Forget every cookie, in memory and in storage.
    pub fn clear(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Err(e) = self.storage.remove_item(keys::COOKIES) {
            warn!(error = %e, "Failed to remove stored cookies");
        }
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }

    /// Session cookies are kept too: for a CLI the "browser session" spans
    /// invocations.
    fn persist(&self, store: &CookieStore) {
        let mut buf = Vec::new();
        let result = cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut buf)
            .and_then(|()| Ok(String::from_utf8(buf)?))
            .and_then(|raw| Ok(self.storage.set_item(keys::COOKIES, &raw)?));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cookies");
        }
    }
}

impl reqwest::cookie::CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if !self.same_origin(url) {
            return;
        }

        let parsed: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| RawCookie::parse(value).map(RawCookie::into_owned).ok())
            .collect();
        if parsed.is_empty() {
            return;
        }

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.store_response_cookies(parsed.into_iter(), url);
        self.persist(&store);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        if !self.same_origin(url) {
            return None;
        }

        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::cookie::CookieStore;

    use super::*;
    use crate::storage::MemoryStorage;

    fn origin() -> Url {
        Url::parse("http://localhost:4003").unwrap()
    }

    fn set(jar: &PersistentCookieJar, url: &Url, headers: &[&str]) {
        let values: Vec<HeaderValue> = headers
            .iter()
            .map(|h| HeaderValue::from_str(h).unwrap())
            .collect();
        jar.set_cookies(&mut values.iter(), url);
    }

    fn jar() -> PersistentCookieJar {
        PersistentCookieJar::load(&origin(), Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_replays_cookies_for_origin_only() {
        let jar = jar();

        set(
            &jar,
            &origin().join("/api/auth/login").unwrap(),
            &["sid=abc; Path=/", "theme=dark; Path=/"],
        );

        let header = jar.cookies(&origin().join("/api/auth/me").unwrap()).unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("sid=abc"));
        assert!(header.contains("theme=dark"));

        let other = Url::parse("http://localhost:9999/api").unwrap();
        assert!(jar.cookies(&other).is_none());
    }

    #[test]
    fn test_ignores_foreign_set_cookie() {
        let jar = jar();

        set(&jar, &Url::parse("https://tracker.example.com").unwrap(), &["id=1"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_ignores_malformed_set_cookie() {
        let jar = jar();

        set(&jar, &origin(), &["garbage", "=value"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_expired_cookie_stops_replay() {
        let jar = jar();
        set(&jar, &origin(), &["session=tok-1; Path=/; HttpOnly"]);
        assert!(jar.cookies(&origin()).is_some());

        set(
            &jar,
            &origin(),
            &["session=deleted; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"],
        );
        assert!(jar.cookies(&origin()).is_none());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_max_age_zero_stops_replay() {
        let jar = jar();
        set(&jar, &origin(), &["sid=abc; Path=/"]);

        set(&jar, &origin(), &["sid=abc; Path=/; Max-Age=0"]);
        assert!(jar.cookies(&origin()).is_none());
    }

    #[test]
    fn test_path_scoped_cookie_not_sent_elsewhere() {
        let jar = jar();
        set(
            &jar,
            &origin().join("/api/auth/login").unwrap(),
            &["scoped=1; Path=/api/auth"],
        );

        assert!(jar.cookies(&origin().join("/api/auth/me").unwrap()).is_some());
        assert!(jar.cookies(&origin().join("/api/cart").unwrap()).is_none());
    }

    #[test]
    fn test_cookies_survive_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(&origin(), Arc::clone(&storage));
        set(&jar, &origin(), &["sid=abc; Path=/"]);
        drop(jar);

        let reloaded = PersistentCookieJar::load(&origin(), storage);
        assert_eq!(reloaded.names(), vec!["sid".to_string()]);
        assert_eq!(
            reloaded.cookies(&origin()).unwrap().to_str().unwrap(),
            "sid=abc"
        );
    }

    #[test]
    fn test_malformed_stored_cookies_discarded() {
        let storage: Arc<dyn Storage> =
            Arc::new(MemoryStorage::with_item(keys::COOKIES, "{not json"));
        let jar = PersistentCookieJar::load(&origin(), storage);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_clear_removes_stored_cookies() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let jar = PersistentCookieJar::load(&origin(), Arc::clone(&storage));
        set(&jar, &origin(), &["sid=abc; Path=/"]);

        jar.clear();
        assert!(jar.is_empty());
        assert!(jar.cookies(&origin()).is_none());
        assert_eq!(storage.get_item(keys::COOKIES).unwrap(), None);
    }

    #[test]
    fn test_debug_hides_values() {
        let jar = jar();
        set(&jar, &origin(), &["sid=very-secret-session; Path=/"]);

        let debug_output = format!("{jar:?}");
        assert!(debug_output.contains("sid"));
        assert!(!debug_output.contains("very-secret-session"));
    }
}
