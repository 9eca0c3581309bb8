use uuid::Uuid;

/// Origin of the operation caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerOrigin {
    /// An external client of the adapter.
    Client,
    /// Internal machinery (self-describing bindings, maintenance calls).
    System,
}

/// Context carried with every call through dispatch.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Unique identifier of this call, for tracing and correlation.
    pub call_id: Uuid,
    /// Identifier of the calling client, when the call has one.
    pub client_id: Option<String>,
    pub origin: CallerOrigin,
}

impl CallContext {
    /// Context for a call placed by an external client.
    #[must_use]
    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            client_id: Some(client_id.into()),
            origin: CallerOrigin::Client,
        }
    }

    /// Context for an internally-originated call.
    #[must_use]
    pub fn system() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            client_id: None,
            origin: CallerOrigin::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_context_carries_identity() {
        let ctx = CallContext::client("client-7");
        assert_eq!(ctx.origin, CallerOrigin::Client);
        assert_eq!(ctx.client_id.as_deref(), Some("client-7"));
    }

    #[test]
    fn call_ids_are_unique() {
        assert_ne!(CallContext::system().call_id, CallContext::system().call_id);
    }
}
