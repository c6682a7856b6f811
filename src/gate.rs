//! Interception gate in the resource-loading path.
//!
//! The host calls [`LoadInterceptor::load_web_resource`] once per outgoing
//! fetch, from whatever network thread it likes. A blocked request gets a
//! [`SyntheticResponse`]: a successful, zero-byte body. A hard failure would
//! trip the page's own error/retry handling; an empty success does not.

use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::classifier::{Classification, RequestClassifier, ResourceRequest};

/// Content type of every synthetic response.
pub const SYNTHETIC_MIME_TYPE: &str = "application/octet-stream";

/// Character encoding label of every synthetic response.
pub const SYNTHETIC_ENCODING: &str = "UTF-8";

/// Fixed, empty response handed back to the host in place of a real fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticResponse {
    mime_type: &'static str,
    encoding: &'static str,
}

impl SyntheticResponse {
    pub const EMPTY: Self = Self {
        mime_type: SYNTHETIC_MIME_TYPE,
        encoding: SYNTHETIC_ENCODING,
    };

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    /// Always 200: the host must treat the fetch as completed.
    pub fn status(&self) -> u16 {
        200
    }

    /// Zero-length body stream.
    pub fn body(&self) -> io::Empty {
        io::empty()
    }

    pub fn content_length(&self) -> usize {
        0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InterceptionGate
// ─────────────────────────────────────────────────────────────────────────────

/// Consults the classifier for a request under a given blocking value.
///
/// Holds no mutable state: `Send + Sync`, no locking on the hot path.
#[derive(Debug, Clone, Default)]
pub struct InterceptionGate {
    classifier: RequestClassifier,
}

impl InterceptionGate {
    pub fn new(classifier: RequestClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    /// `None` means "proceed normally".
    pub fn before_fetch(
        &self,
        request: &ResourceRequest,
        blocking_enabled: bool,
    ) -> Option<SyntheticResponse> {
        if !blocking_enabled {
            return None;
        }
        match self.classifier.classify(request) {
            Classification::Block => {
                debug!(url = request.url(), "Media request replaced by empty response");
                Some(SyntheticResponse::EMPTY)
            }
            Classification::Allow => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LoadInterceptor : snapshot par chargement de document
// ─────────────────────────────────────────────────────────────────────────────

/// Gate bound to one document load.
///
/// The blocking value is captured when the load begins, so every request of
/// that document is decided under the same policy even if the flag changes
/// while requests are still in flight. Cheap to clone and hand to network
/// threads.
#[derive(Debug, Clone)]
pub struct LoadInterceptor {
    gate: Arc<InterceptionGate>,
    generation: u64,
    blocking_enabled: bool,
}

impl LoadInterceptor {
    pub fn new(gate: Arc<InterceptionGate>, generation: u64, blocking_enabled: bool) -> Self {
        Self {
            gate,
            generation,
            blocking_enabled,
        }
    }

    /// Monotonic load counter of the owning session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn blocking_enabled(&self) -> bool {
        self.blocking_enabled
    }

    pub fn load_web_resource(&self, request: &ResourceRequest) -> Option<SyntheticResponse> {
        self.gate.before_fetch(request, self.blocking_enabled)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_disabled_gate_always_proceeds() {
        let gate = InterceptionGate::default();
        let request = ResourceRequest::new("https://example.com/a.png").with_accept("image/png");
        assert_eq!(gate.before_fetch(&request, false), None);
    }

    #[test]
    fn test_blocked_request_gets_empty_response() {
        let gate = InterceptionGate::default();
        let request = ResourceRequest::new("https://example.com/b.mp4");
        let response = gate.before_fetch(&request, true).expect("should be intercepted");
        assert_eq!(response.mime_type(), "application/octet-stream");
        assert_eq!(response.encoding(), "UTF-8");
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_length(), 0);

        let mut body = Vec::new();
        response.body().read_to_end(&mut body).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_allowed_request_proceeds() {
        let gate = InterceptionGate::default();
        let request = ResourceRequest::new("https://example.com/app.js");
        assert_eq!(gate.before_fetch(&request, true), None);
    }

    #[test]
    fn test_document_navigation_never_intercepted() {
        let gate = InterceptionGate::default();
        let request = ResourceRequest::new("https://example.com/photo.jpg").with_accept("text/html");
        assert_eq!(gate.before_fetch(&request, true), None);
    }

    #[test]
    fn test_interceptor_uses_snapshot() {
        let gate = Arc::new(InterceptionGate::default());
        let on = LoadInterceptor::new(gate.clone(), 1, true);
        let off = LoadInterceptor::new(gate, 2, false);
        let request = ResourceRequest::new("https://example.com/a.gif");
        assert!(on.load_web_resource(&request).is_some());
        assert!(off.load_web_resource(&request).is_none());
        assert_eq!(on.generation(), 1);
        assert!(!off.blocking_enabled());
    }

    #[test]
    fn test_concurrent_interception_is_consistent() {
        let interceptor = LoadInterceptor::new(Arc::new(InterceptionGate::default()), 7, true);
        let results: Vec<Vec<bool>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|worker| {
                    let interceptor = interceptor.clone();
                    scope.spawn(move || {
                        (0..200)
                            .map(|i| {
                                let url = if (i + worker) % 2 == 0 {
                                    format!("https://example.com/{i}.png")
                                } else {
                                    format!("https://example.com/{i}.css")
                                };
                                interceptor
                                    .load_web_resource(&ResourceRequest::new(url))
                                    .is_some()
                            })
                            .collect()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (worker, blocked) in results.iter().enumerate() {
            for (i, &was_blocked) in blocked.iter().enumerate() {
                assert_eq!(was_blocked, (i + worker) % 2 == 0);
            }
        }
    }
}
