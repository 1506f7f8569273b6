//! Per-request context: the caller's bearer credential and its cancellation.

use tokio_util::sync::CancellationToken;

/// Request-scoped state handed to every [`Gateway`](crate::Gateway) RPC.
///
/// Cancellation is cooperative: transports cancel the token when the client
/// goes away, and the gateway checks it before touching any cache or backing
/// service. Background work spawned by a request never inherits the token.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    api_key: Option<String>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Context carrying the `authorization` credential, if any.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(Some(api_key.into()))
    }

    /// Attach an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Mask all but the last four characters of a credential for logging.
pub fn obfuscate_api_key(key: &str) -> String {
    const VISIBLE: usize = 4;
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= VISIBLE {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - VISIBLE;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_treated_as_missing() {
        assert!(RequestContext::new(Some(String::new())).api_key().is_none());
    }

    #[test]
    fn cancelling_attached_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_api_key("k").with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn obfuscation_keeps_last_four() {
        assert_eq!(obfuscate_api_key("abcdefgh"), "****efgh");
        assert_eq!(obfuscate_api_key("abc"), "***");
    }
}
