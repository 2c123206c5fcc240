//! Host-side descriptor of one foreign value.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use pontoon_engine::{EngineResult, Resolvers, TypeTag, ValueHandle};

use crate::monitor::DropGuard;

/// Immutable handle descriptor: the foreign handle, the type it had
/// when the handle was produced, and the session's shared resolution
/// closures.
///
/// Clones share one descriptor; the foreign handle is released by the
/// session's reference monitor after the last clone is dropped. No
/// application code releases a handle directly.
///
/// Equality is delegated to the engine, never derived from handle
/// identity, because two handles may alias one foreign value.
#[derive(Clone)]
pub struct ValueReference {
    inner: Arc<ReferenceInner>,
}

struct ReferenceInner {
    handle: ValueHandle,
    nominal_type: TypeTag,
    resolvers: Resolvers,
    /// Dropping this notifies the monitor. Must stay last-ish in
    /// spirit: it holds only the channel sender and the raw id.
    _guard: DropGuard,
}

impl ValueReference {
    pub(crate) fn new(
        handle: ValueHandle,
        nominal_type: TypeTag,
        resolvers: Resolvers,
        guard: DropGuard,
    ) -> Self {
        Self {
            inner: Arc::new(ReferenceInner {
                handle,
                nominal_type,
                resolvers,
                _guard: guard,
            }),
        }
    }

    /// The foreign handle. Opaque outside the owning session.
    pub fn handle(&self) -> ValueHandle {
        self.inner.handle
    }

    /// Type recorded when the handle was produced.
    pub fn nominal_type(&self) -> TypeTag {
        self.inner.nominal_type
    }

    /// Type the engine reports right now; may differ from the nominal
    /// one when the engine changed the value's representation.
    pub fn actual_type(&self) -> EngineResult<TypeTag> {
        (self.inner.resolvers.type_of)(self.inner.handle)
    }
}

impl PartialEq for ValueReference {
    fn eq(&self, other: &Self) -> bool {
        (self.inner.resolvers.equals)(self.inner.handle, other.inner.handle)
    }
}

impl Hash for ValueReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.handle.hash(state);
        self.inner.nominal_type.hash(state);
    }
}

impl fmt::Debug for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueReference")
            .field("handle", &self.inner.handle)
            .field("nominal_type", &self.inner.nominal_type)
            .finish()
    }
}
