//! Failed ownership transitions.

/// A consuming operation that failed.
///
/// Typestate transitions take `self` by value; on failure the caller gets the
/// handle back unchanged together with the reason.
pub struct Rejected<T, E> {
    /// The value the operation consumed.
    pub handle: T,
    /// Why it failed.
    pub error: E,
}

impl<T, E> Rejected<T, E> {
    /// Pair a handle with an error.
    pub const fn new(handle: T, error: E) -> Self {
        Self { handle, error }
    }

    /// Split into handle and error.
    pub fn into_parts(self) -> (T, E) {
        (self.handle, self.error)
    }

    /// Transform the error, keeping the handle.
    pub fn map_error<F>(self, f: impl FnOnce(E) -> F) -> Rejected<T, F> {
        Rejected {
            handle: self.handle,
            error: f(self.error),
        }
    }

    /// Transform the handle, keeping the error.
    pub fn map_handle<U>(self, f: impl FnOnce(T) -> U) -> Rejected<U, E> {
        Rejected {
            handle: f(self.handle),
            error: self.error,
        }
    }
}

impl<T, E: core::fmt::Debug> core::fmt::Debug for Rejected<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T, E: core::fmt::Display> core::fmt::Display for Rejected<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "rejected: {}", self.error)
    }
}

#[cfg(feature = "defmt")]
impl<T, E: defmt::Format> defmt::Format for Rejected<T, E> {
    fn format(&self, fmt: defmt::Formatter<'_>) {
        defmt::write!(fmt, "rejected: {}", self.error);
    }
}
