//! A small async-generator helper used by the read stream (component G) to
//! emit payload chunks one event-loop turn at a time, with cooperative
//! pause/resume.
//!
//! The technique is lifted from `gazette::journal`'s use of its `coroutines`
//! crate, which drives retryable RPC streams (append/read/list) the same
//! way: an async function suspends itself by yielding a value through a
//! shared mailbox and waiting to be resumed, and the whole thing is exposed
//! to callers as a `futures::Stream`.

use std::{
    cell::UnsafeCell,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

pub fn generator<Fut, Item>(body: impl FnOnce(Yielder<Item>) -> Fut) -> Generator<Fut, Item>
where
    Fut: Future<Output = ()>,
{
    let mailbox = Arc::new(Mailbox {
        slot: UnsafeCell::new(None),
        resume: UnsafeCell::new(false),
    });
    let fut = body(Yielder {
        mailbox: mailbox.clone(),
    });
    Generator { mailbox, fut }
}

struct Mailbox<Item> {
    slot: UnsafeCell<Option<Item>>,
    resume: UnsafeCell<bool>,
}

// Safety: `slot` and `resume` are only ever touched from the single future
// driven by `Generator::poll_next`, or by `Yielder::emit` which that same
// future owns exclusively while it runs. There is never concurrent access.
unsafe impl<Item: Send> Sync for Mailbox<Item> {}

pub struct Yielder<Item> {
    mailbox: Arc<Mailbox<Item>>,
}

impl<Item> Yielder<Item> {
    /// Publish `item` to the driving stream and suspend until it has been
    /// consumed and the stream polls for the next one.
    pub async fn emit(&mut self, item: Item) {
        {
            let slot = unsafe { &mut *self.mailbox.slot.get() };
            assert!(slot.is_none(), "emit() called again before prior item was collected");
            *slot = Some(item);
        }
        let mailbox = self.mailbox.clone();
        std::future::poll_fn(move |_| {
            let resume = unsafe { &mut *mailbox.resume.get() };
            if *resume {
                *resume = false;
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

pin_project_lite::pin_project! {
    pub struct Generator<Fut, Item> {
        mailbox: Arc<Mailbox<Item>>,
        #[pin]
        fut: Fut,
    }
}

impl<Fut, Item> futures_core::Stream for Generator<Fut, Item>
where
    Fut: Future<Output = ()>,
{
    type Item = Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        let mailbox = self.mailbox.clone();
        let me = self.project();

        match me.fut.poll(cx) {
            Poll::Ready(()) => Poll::Ready(None),
            Poll::Pending => match unsafe { (&mut *mailbox.slot.get()).take() } {
                Some(item) => {
                    // Prime the mailbox so the *next* poll resumes the
                    // suspended `emit()` past this item before running
                    // forward to the one after it.
                    unsafe { *mailbox.resume.get() = true };
                    Poll::Ready(Some(item))
                }
                None => Poll::Pending,
            },
        }
    }
}
