use std::sync::atomic::{AtomicUsize, Ordering};

use crate::queue::Pending;

/// One queued payload. Records are linked through `link` while they wait
/// for delivery and through `next` while they sit on the free list, so
/// neither queueing nor recycling touches the allocator.
pub(crate) struct Invocation<D> {
    pub(crate) payload: Option<D>,
    pub(crate) link: Option<Box<dyn Pending>>,
    next: Option<Box<Invocation<D>>>,
}

/// Free list of invocation records for one payload type.
///
/// Records are never freed while the pool lives. The pool grows without bound
/// when more invocations are in flight than it holds.
pub(crate) struct InvocationPool<D> {
    free: spin::Mutex<Option<Box<Invocation<D>>>>,
    allocated: AtomicUsize,
    pooled: AtomicUsize,
}

impl<D> InvocationPool<D> {
    pub(crate) fn new() -> Self {
        Self {
            free: spin::Mutex::new(None),
            allocated: AtomicUsize::new(0),
            pooled: AtomicUsize::new(0),
        }
    }

    /// Take a free record (or allocate one) and load `payload` into it.
    pub(crate) fn get(&self, payload: D) -> Box<Invocation<D>> {
        let recycled = {
            let mut head = self.free.lock();
            let taken = head.take();
            taken.map(|mut invocation| {
                *head = invocation.next.take();
                self.pooled.fetch_sub(1, Ordering::Relaxed);
                invocation
            })
        };

        match recycled {
            Some(mut invocation) => {
                invocation.payload = Some(payload);
                invocation
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Box::new(Invocation {
                    payload: Some(payload),
                    link: None,
                    next: None,
                })
            }
        }
    }

    /// Return a record to the free list.
    pub(crate) fn recycle(&self, mut invocation: Box<Invocation<D>>) {
        // Drop any payload before taking the lock.
        invocation.payload = None;
        {
            let mut head = self.free.lock();
            invocation.next = head.take();
            *head = Some(invocation);
            self.pooled.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records ever allocated by this pool.
    pub(crate) fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Records currently on the free list.
    pub(crate) fn pooled(&self) -> usize {
        self.pooled.load(Ordering::Relaxed)
    }
}

impl<D> Drop for InvocationPool<D> {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop could overflow the
        // stack on a long free list.
        let mut next = self.free.get_mut().take();
        while let Some(mut invocation) = next {
            next = invocation.next.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_record_is_reused() {
        let pool = InvocationPool::new();
        let first = pool.get(1_u32);
        let addr = &*first as *const Invocation<u32>;
        pool.recycle(first);

        let second = pool.get(2_u32);
        assert_eq!(&*second as *const Invocation<u32>, addr);
        assert_eq!(second.payload, Some(2));
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn live_records_are_distinct() {
        let pool = InvocationPool::new();
        let a = pool.get("a");
        let b = pool.get("b");
        assert_ne!(
            &*a as *const Invocation<&str>,
            &*b as *const Invocation<&str>
        );
        assert_eq!(pool.allocated(), 2);
    }

    #[test]
    fn recycle_clears_payload() {
        let pool = InvocationPool::new();
        let invocation = pool.get(String::from("payload"));
        pool.recycle(invocation);
        assert_eq!(pool.pooled(), 1);

        let again = pool.get(String::from("next"));
        assert_eq!(again.payload.as_deref(), Some("next"));
    }

    #[test]
    fn long_free_list_drops_cleanly() {
        let pool = InvocationPool::new();
        let live: Vec<_> = (0..200_000_u32).map(|i| pool.get(i)).collect();
        for invocation in live {
            pool.recycle(invocation);
        }
        assert_eq!(pool.pooled(), 200_000);
        drop(pool);
    }
}
