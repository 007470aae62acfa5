//! Shared storage for mutable containers

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reference-counted, lockable contents of a list, dict or frame.
///
/// Cloning a `Shared` aliases the contents: a mutation made through one
/// clone is seen by every name and container slot holding another. The lock
/// is held only while a closure runs, and the closure must not reach a value
/// that locks the same contents again.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(Arc::new(Mutex::new(value)))
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        // A panic mid-mutation leaves the contents usable; there is no
        // invariant spanning the lock.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    /// Python `is`.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the contents, stable while any clone is alive.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T: Clone> Shared<T> {
    /// Copy of the current contents, taken without holding the lock afterwards.
    pub fn snapshot(&self) -> T {
        self.with(T::clone)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_alias_the_contents() {
        let a = Shared::new(vec![1]);
        let b = a.clone();
        b.with_mut(|items| items.push(2));
        assert_eq!(a.snapshot(), vec![1, 2]);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn equal_contents_are_not_identical() {
        let a = Shared::new(vec![1]);
        let b = Shared::new(vec![1]);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.id(), b.id());
    }
}
