//! Boundary between a host platform's native sender type and the engine.
//!
//! The engine is generic over its own sender type `S`. A platform supplies
//! two plain functions converting its native sender `N` in and out, plus a
//! native permission query; nothing inside the tree ever sees `N`.

use std::sync::Arc;

use arbor::PermissionChecker;

/// A platform's own sender (player, chat user, console...).
pub trait NativeSender {
    fn has_permission(&self, permission: &str) -> bool;
}

/// Bidirectional sender conversion.
///
/// Both directions must be total: every native sender maps to an engine
/// sender and back.
pub struct SenderMapper<N, S> {
    map_in: Arc<dyn Fn(N) -> S + Send + Sync>,
    map_out: Arc<dyn Fn(&S) -> N + Send + Sync>,
}

impl<N, S> Clone for SenderMapper<N, S> {
    fn clone(&self) -> Self {
        Self {
            map_in: Arc::clone(&self.map_in),
            map_out: Arc::clone(&self.map_out),
        }
    }
}

impl<N, S> SenderMapper<N, S> {
    pub fn new<I, O>(map_in: I, map_out: O) -> Self
    where
        I: Fn(N) -> S + Send + Sync + 'static,
        O: Fn(&S) -> N + Send + Sync + 'static,
    {
        Self {
            map_in: Arc::new(map_in),
            map_out: Arc::new(map_out),
        }
    }

    /// Native sender to engine sender.
    pub fn map_in(&self, native: N) -> S {
        (self.map_in)(native)
    }

    /// Engine sender back to the native sender.
    pub fn map_out(&self, sender: &S) -> N {
        (self.map_out)(sender)
    }
}

impl<S: Clone + 'static> SenderMapper<S, S> {
    /// For platforms whose native sender is used as is.
    pub fn identity() -> Self {
        Self::new(|sender: S| sender, |sender: &S| sender.clone())
    }
}

/// Answers engine permission checks by asking the native sender.
pub struct NativePermissions<N, S> {
    mapper: SenderMapper<N, S>,
}

impl<N, S> NativePermissions<N, S> {
    pub fn new(mapper: SenderMapper<N, S>) -> Self {
        Self { mapper }
    }
}

impl<N: NativeSender, S> PermissionChecker<S> for NativePermissions<N, S> {
    fn has_permission(&self, sender: &S, permission: &str) -> bool {
        self.mapper.map_out(sender).has_permission(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Native {
        id: u32,
        op: bool,
    }

    impl NativeSender for Native {
        fn has_permission(&self, permission: &str) -> bool {
            self.op || permission.starts_with("public.")
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sender {
        id: u32,
        op: bool,
    }

    fn mapper() -> SenderMapper<Native, Sender> {
        SenderMapper::new(
            |native: Native| Sender {
                id: native.id,
                op: native.op,
            },
            |sender: &Sender| Native {
                id: sender.id,
                op: sender.op,
            },
        )
    }

    #[test]
    fn test_mapping_round_trips() {
        let mapper = mapper();
        let native = Native { id: 7, op: false };
        let sender = mapper.map_in(native.clone());
        assert_eq!(sender.id, 7);
        assert_eq!(mapper.clone().map_out(&sender), native);
    }

    #[test]
    fn test_native_permissions() {
        let permissions = NativePermissions::new(mapper());
        let guest = Sender { id: 1, op: false };
        let op = Sender { id: 2, op: true };

        assert!(permissions.has_permission(&guest, "public.help"));
        assert!(!permissions.has_permission(&guest, "admin.ban"));
        assert!(permissions.has_permission(&op, "admin.ban"));
    }

    #[test]
    fn test_identity() {
        let mapper = SenderMapper::<String, String>::identity();
        assert_eq!(mapper.map_in("console".to_string()), "console");
        assert_eq!(mapper.map_out(&"console".to_string()), "console");
    }
}
