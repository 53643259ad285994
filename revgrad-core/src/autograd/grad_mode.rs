//! Thread-local gradient mode.
//!
//! Tracking can be suspended for a region of code (inference, frozen
//! parameters) with [`NoGradGuard`] or [`no_grad`]. Guards restore the mode
//! that was active when they were created, so they nest.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    /// Whether operations on this thread record graph nodes.
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Returns whether gradient tracking is currently enabled on this thread.
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(Cell::get)
}

/// RAII guard that sets the gradient mode and restores the previous mode on drop.
///
/// The guard is tied to the thread that created it (`!Send`).
#[must_use = "the previous mode is restored as soon as the guard is dropped"]
pub struct GradModeGuard {
    prev: bool,
    _not_send: PhantomData<*const ()>,
}

impl GradModeGuard {
    pub fn new(enabled: bool) -> Self {
        let prev = GRAD_ENABLED.with(|g| g.replace(enabled));
        GradModeGuard {
            prev,
            _not_send: PhantomData,
        }
    }
}

impl Drop for GradModeGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|g| g.set(self.prev));
    }
}

/// Disables gradient tracking until dropped.
///
/// ```rust,ignore
/// use revgrad_core::NoGradGuard;
///
/// {
///     let _guard = NoGradGuard::new();
///     let y = x.mul(&w)?; // not recorded
/// }
/// // tracking is back to what it was
/// ```
#[must_use = "tracking is re-enabled as soon as the guard is dropped"]
pub struct NoGradGuard {
    _inner: GradModeGuard,
}

impl NoGradGuard {
    pub fn new() -> Self {
        NoGradGuard {
            _inner: GradModeGuard::new(false),
        }
    }
}

impl Default for NoGradGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-enables gradient tracking inside a no-grad region until dropped.
#[must_use = "the previous mode is restored as soon as the guard is dropped"]
pub struct EnableGradGuard {
    _inner: GradModeGuard,
}

impl EnableGradGuard {
    pub fn new() -> Self {
        EnableGradGuard {
            _inner: GradModeGuard::new(true),
        }
    }
}

impl Default for EnableGradGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` with gradient tracking disabled.
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = NoGradGuard::new();
    f()
}

/// Runs `f` with gradient tracking enabled.
pub fn enable_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = EnableGradGuard::new();
    f()
}

#[cfg(test)]
#[path = "grad_mode_test.rs"]
mod tests;
