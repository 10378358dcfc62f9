// UiEventQueue - Hands worker results over to the single UI thread
//
// Workers run on tokio's thread pool and must never touch UI-owned state. Instead they
// post events through a UiEventPoster; the UI thread drains the queue once per tick and
// applies each event itself. This queue is the only structure shared between the two
// sides.

use std::marker::PhantomData;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Receiving side of the UI event queue, owned by the UI thread.
///
/// The queue is `!Send`: once created on the UI thread it cannot be moved to another one,
/// so [`drain_once`](Self::drain_once) can only ever run there. Posting happens through
/// cloneable [`UiEventPoster`] handles that may live on any thread.
///
/// The channel is unbounded: a worker's terminal event must never be dropped because the
/// UI fell behind.
///
/// # Example
/// ```ignore
/// let mut queue = UiEventQueue::new();
/// let poster = queue.poster();
///
/// std::thread::spawn(move || poster.post("done"));
///
/// // On the UI thread, once per tick
/// queue.drain_once(|event| println!("{}", event));
/// ```
pub struct UiEventQueue<E> {
    rx: mpsc::UnboundedReceiver<E>,
    tx: mpsc::UnboundedSender<E>,

    /// Pins the queue to the thread that created it
    _ui_thread: PhantomData<Rc<()>>,
}

impl<E: Send + 'static> UiEventQueue<E> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            tx,
            _ui_thread: PhantomData,
        }
    }

    /// Handle for posting events from any thread
    pub fn poster(&self) -> UiEventPoster<E> {
        UiEventPoster {
            tx: self.tx.clone(),
        }
    }

    /// Run `handler` on every event queued at the time of the call, in FIFO order.
    ///
    /// Events posted while the handler runs are left for the next tick, so one drain
    /// always terminates.
    ///
    /// # Returns
    /// Number of events handled
    pub fn drain_once<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(E),
    {
        let pending = self.rx.len();
        let mut handled = 0;

        while handled < pending {
            match self.rx.try_recv() {
                Ok(event) => {
                    handler(event);
                    handled += 1;
                }
                Err(_) => break,
            }
        }

        if handled > 0 {
            tracing::trace!("Drained {} UI events", handled);
        }
        handled
    }

    /// Number of events waiting for the next drain
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<E: Send + 'static> Default for UiEventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe posting handle for a [`UiEventQueue`]
pub struct UiEventPoster<E> {
    tx: mpsc::UnboundedSender<E>,
}

// Manual Clone implementation to avoid requiring E: Clone
impl<E> Clone for UiEventPoster<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> UiEventPoster<E> {
    /// Queue an event for the UI thread.
    ///
    /// # Returns
    /// `false` if the UI side has shut down and the event was discarded
    pub fn post(&self, event: E) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Failed to post UI event - UI queue has been dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let mut queue = UiEventQueue::new();
        let poster = queue.poster();

        for i in 0..5 {
            poster.post(i);
        }

        let mut seen = Vec::new();
        let handled = queue.drain_once(|e| seen.push(e));

        assert_eq!(handled, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_post_from_worker_threads() {
        let mut queue = UiEventQueue::new();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let poster = queue.poster();
                thread::spawn(move || {
                    assert!(poster.post(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = Vec::new();
        queue.drain_once(|e| seen.push(e));
        seen.sort();

        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_drain_leaves_later_events_for_next_tick() {
        let mut queue = UiEventQueue::new();
        let poster = queue.poster();
        poster.post(1);
        poster.post(2);

        let mut seen = Vec::new();
        let handled = queue.drain_once(|e| {
            seen.push(e);
            poster.post(e * 10);
        });

        assert_eq!(handled, 2);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_empty_drain() {
        let mut queue: UiEventQueue<u32> = UiEventQueue::new();
        assert_eq!(queue.drain_once(|_| panic!("no events expected")), 0);
    }

    #[test]
    fn test_post_after_queue_dropped() {
        let queue: UiEventQueue<u32> = UiEventQueue::new();
        let poster = queue.poster();
        drop(queue);

        assert!(!poster.post(1));
    }
}
