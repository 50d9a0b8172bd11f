//! Fixed pool of HTTP client identities for session rotation.
//!
//! Each identity bundles a user-agent with matching accept headers so a
//! rotated session presents a coherent browser fingerprint, not a UA swap
//! on top of mismatched headers. The pool is static; identities are
//! selected randomly per session and never mutated.

use rand::Rng;

/// One HTTP client identity: headers that travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// User-Agent header value.
    pub user_agent: &'static str,
    /// Accept header value.
    pub accept: &'static str,
    /// Accept-Language header value.
    pub accept_language: &'static str,
}

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// The identity pool. Ordinary desktop browser profiles; no two share a
/// user-agent.
pub(crate) const IDENTITY_POOL: &[Identity] = &[
    Identity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept: BROWSER_ACCEPT,
        accept_language: "en-US,en;q=0.9",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        accept: BROWSER_ACCEPT,
        accept_language: "en-US,en;q=0.8",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        accept_language: "en-GB,en;q=0.9,en-US;q=0.8",
    },
    Identity {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        accept: BROWSER_ACCEPT,
        accept_language: "en-US,en;q=0.9",
    },
    Identity {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept: BROWSER_ACCEPT,
        accept_language: "en-US,en;q=0.7",
    },
];

/// Picks a random identity from the pool.
#[must_use]
pub(crate) fn random_identity() -> &'static Identity {
    let index = rand::thread_rng().gen_range(0..IDENTITY_POOL.len());
    &IDENTITY_POOL[index]
}

/// Descriptive first-party user agent for image downloads.
///
/// Image fetches identify the tool rather than mimicking a browser.
#[must_use]
pub fn image_client_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("modharvest/{version} (image-rehost; +https://github.com/modharvest/modharvest)")
}
