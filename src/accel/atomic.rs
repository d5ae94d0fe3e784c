// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Atomic utilities

use std::{
    hint::spin_loop,
    marker::PhantomData,
    ptr,
    sync::atomic::{AtomicBool, AtomicPtr, Ordering},
    thread,
};

use thiserror::Error;

/// Error for cells whose value was left behind by a panicking update.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("atomic cell poisoned by a panic during update")]
pub struct PoisonError;

/// A cell supporting exclusive mutation with spin locks for waiters.
///
/// This uses spin loops on atomic pointers instead of full OS-level mutexes, so
/// we can create one per matrix row without incurring the overhead of going to
/// pthreads.  A null pointer means some thread holds the cell.
///
/// Like a `Mutex`, the cell is poisoned if an update panics; the lock is
/// still released, but later updates and `into_inner` report [`PoisonError`].
pub struct AtomicCell<T: Send> {
    pointer: AtomicPtr<T>,
    poisoned: AtomicBool,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: the value is only reached through the lock, like a Mutex
unsafe impl<T: Send> Send for AtomicCell<T> {}
unsafe impl<T: Send> Sync for AtomicCell<T> {}

/// Lock holder that hands the pointer back when dropped, even on unwind.
struct Held<'a, T: Send> {
    cell: &'a AtomicCell<T>,
    ptr: *mut T,
}

impl<T: Send> Drop for Held<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.cell.poisoned.store(true, Ordering::Relaxed);
        }
        // we hold the lock, so nobody else writes the pointer
        self.cell.pointer.store(self.ptr, Ordering::Release);
    }
}

impl<T: Send> AtomicCell<T> {
    /// Construct a new atomic cell.
    pub fn new(value: T) -> Self {
        let ptr = Box::into_raw(Box::new(value));
        AtomicCell {
            pointer: AtomicPtr::new(ptr),
            poisoned: AtomicBool::new(false),
            _owns: PhantomData,
        }
    }

    /// Create a new vector of atomic cells.
    pub fn new_vec<S: IntoIterator<Item = T>>(src: S) -> Vec<AtomicCell<T>> {
        src.into_iter().map(AtomicCell::new).collect()
    }

    /// Check whether an earlier update panicked.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Relaxed)
    }

    /// Mutate the cell, waiting for any other writer to finish.
    pub fn update<R, F: FnOnce(&mut T) -> R>(&self, func: F) -> Result<R, PoisonError> {
        let held = Held {
            cell: self,
            ptr: self.acquire(),
        };
        if self.is_poisoned() {
            return Err(PoisonError);
        }
        // SAFETY: acquire nulled the shared pointer, so we are the only holder
        let tref = unsafe { &mut *held.ptr };
        Ok(func(tref))
    }

    /// Take the value out of the cell, consuming it.
    pub fn into_inner(mut self) -> Result<T, PoisonError> {
        let ptr = std::mem::replace(self.pointer.get_mut(), ptr::null_mut());
        debug_assert!(!ptr.is_null(), "atomic cell consumed while locked");
        // SAFETY: the pointer came from Box::into_raw and is no longer shared
        let boxed = unsafe { Box::from_raw(ptr) };
        if *self.poisoned.get_mut() {
            Err(PoisonError)
        } else {
            Ok(*boxed)
        }
    }

    /// Acquire the pointer.
    fn acquire(&self) -> *mut T {
        let mut ptr = self.pointer.load(Ordering::Relaxed);
        loop {
            if !ptr.is_null() {
                // the cell is live, try to take the lock (null the cell)
                match self.pointer.compare_exchange_weak(
                    ptr,
                    ptr::null_mut(),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return ptr,
                    Err(p) => {
                        ptr = p;
                        continue;
                    }
                }
            }
            spin_loop();
            ptr = self.pointer.load(Ordering::Relaxed);
        }
    }
}

impl<T: Send> Drop for AtomicCell<T> {
    fn drop(&mut self) {
        let ptr = self.pointer.get_mut();
        if !ptr.is_null() {
            let _ = unsafe { Box::from_raw(*ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::thread;

    #[test]
    fn test_update_and_take() {
        let cell = AtomicCell::new(vec![1, 2]);
        let n = cell
            .update(|v| {
                v.push(3);
                v.len()
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(cell.into_inner().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_contended_updates() {
        let cell = AtomicCell::new(0usize);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        cell.update(|c| *c += 1).unwrap();
                    }
                });
            }
        });
        assert_eq!(cell.into_inner().unwrap(), 80_000);
    }

    #[test]
    fn test_new_vec() {
        let cells = AtomicCell::new_vec(0..4);
        cells[2].update(|x| *x *= 10).unwrap();
        let vals: Vec<i32> = cells
            .into_iter()
            .map(|c| c.into_inner().unwrap())
            .collect();
        assert_eq!(vals, vec![0, 1, 20, 3]);
    }

    #[test]
    fn test_panic_releases_and_poisons() {
        let cell = AtomicCell::new(vec![1]);
        let res = catch_unwind(AssertUnwindSafe(|| {
            cell.update(|v| {
                v.push(2);
                panic!("update failed");
            })
        }));
        assert!(res.is_err());
        assert!(cell.is_poisoned());

        // the lock was released, so this returns instead of spinning
        assert_eq!(cell.update(|v| v.len()), Err(PoisonError));
        assert_eq!(cell.into_inner(), Err(PoisonError));
    }
}
