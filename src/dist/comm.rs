//! Message exchange between ranks.
//!
//! Every collective is built on a single primitive, [`Transport::exchange`], in which each rank
//! hands one optional payload to every other rank and receives one optional payload from every
//! other rank. A [`Comm`] restricts the exchange to an ordered group of ranks and provides typed
//! collectives on top of it.
//!
//! Group collectives are world exchanges: the ranks outside of a group take part in the same
//! exchange, each within its own group. Every rank must therefore call the same sequence of
//! collectives, with communicators that partition the world in the same way. A missing call
//! deadlocks.

use crate::{ComplexField, Error, Result};
use core::any::Any;
use std::sync::{Arc, Barrier, Mutex, PoisonError};

/// Type-erased message.
pub type Payload = Box<dyn Any + Send>;

/// World-level message exchange.
pub trait Transport: Send + Sync {
    /// Rank of the calling process, in `0..self.size()`.
    fn rank(&self) -> usize;
    /// Number of processes.
    fn size(&self) -> usize;
    /// Sends `outgoing[q]` to rank `q` and returns the payloads received from every rank, indexed
    /// by sender. Blocks until every rank has called `exchange`.
    ///
    /// # Panics
    ///
    /// Panics if `outgoing.len() != self.size()`.
    fn exchange(&self, outgoing: Vec<Option<Payload>>) -> Vec<Option<Payload>>;
}

/// Transport of a world made of a single process.
#[derive(Copy, Clone, Debug, Default)]
pub struct SelfTransport;

impl Transport for SelfTransport {
    #[inline]
    fn rank(&self) -> usize {
        0
    }

    #[inline]
    fn size(&self) -> usize {
        1
    }

    #[track_caller]
    fn exchange(&self, outgoing: Vec<Option<Payload>>) -> Vec<Option<Payload>> {
        crate::assert!(outgoing.len() == 1);
        outgoing
    }
}

struct Mailbox {
    size: usize,
    // slot `src * size + dst`
    slots: Mutex<Vec<Option<Payload>>>,
    barrier: Barrier,
}

/// Transport between threads of the same process, one thread per rank.
#[derive(Clone)]
pub struct ThreadTransport {
    rank: usize,
    mailbox: Arc<Mailbox>,
}

impl core::fmt::Debug for ThreadTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadTransport")
            .field("rank", &self.rank)
            .field("size", &self.mailbox.size)
            .finish()
    }
}

impl ThreadTransport {
    /// Creates the transports of a world of `size` ranks. Transport `r` must be moved to the thread
    /// that plays rank `r`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[track_caller]
    pub fn world(size: usize) -> Vec<ThreadTransport> {
        crate::assert!(size > 0);
        let mut slots = Vec::with_capacity(size * size);
        slots.resize_with(size * size, || None);
        let mailbox = Arc::new(Mailbox {
            size,
            slots: Mutex::new(slots),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| ThreadTransport {
                rank,
                mailbox: mailbox.clone(),
            })
            .collect()
    }
}

impl Transport for ThreadTransport {
    #[inline]
    fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    fn size(&self) -> usize {
        self.mailbox.size
    }

    #[track_caller]
    fn exchange(&self, outgoing: Vec<Option<Payload>>) -> Vec<Option<Payload>> {
        let size = self.mailbox.size;
        crate::assert!(outgoing.len() == size);

        {
            let mut slots = self
                .mailbox
                .slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for (dst, msg) in outgoing.into_iter().enumerate() {
                slots[self.rank * size + dst] = msg;
            }
        }
        self.mailbox.barrier.wait();

        let incoming = {
            let mut slots = self
                .mailbox
                .slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (0..size)
                .map(|src| slots[src * size + self.rank].take())
                .collect()
        };
        // the slots must not be refilled before every rank has emptied its column
        self.mailbox.barrier.wait();
        incoming
    }
}

/// Runs `f` on `size` threads, each one playing one rank of a [`ThreadTransport`] world, and
/// returns the results indexed by rank.
///
/// A panic on any rank is propagated to the caller once every thread has finished.
pub fn spawn_world<R, F>(size: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadTransport) -> R + Sync,
{
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = ThreadTransport::world(size)
            .into_iter()
            .map(|transport| s.spawn(move || f(transport)))
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(value) => value,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

/// Ordered group of ranks on which typed collectives run.
#[derive(Clone)]
pub struct Comm {
    transport: Arc<dyn Transport>,
    members: Arc<[usize]>,
    rank: usize,
}

impl core::fmt::Debug for Comm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Comm")
            .field("members", &self.members)
            .field("rank", &self.rank)
            .finish()
    }
}

impl Comm {
    /// Returns the communicator containing every rank of `transport`, ordered by rank.
    pub fn world(transport: Arc<dyn Transport>) -> Self {
        let members: Arc<[usize]> = (0..transport.size()).collect();
        let rank = transport.rank();
        Self {
            transport,
            members,
            rank,
        }
    }

    /// Returns the communicator made of the world ranks in `members`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if the calling rank is not one of `members`.
    #[track_caller]
    pub fn subgroup(transport: Arc<dyn Transport>, members: Vec<usize>) -> Self {
        let me = transport.rank();
        let rank = members.iter().position(|&m| m == me);
        crate::assert!(rank.is_some());
        Self {
            transport,
            members: members.into(),
            rank: rank.unwrap_or(0),
        }
    }

    /// Rank of the calling process within the group.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks in the group.
    #[inline]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// World ranks of the group, in group order.
    #[inline]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Sends `send[q]` to group rank `q` and returns the vectors received from every group rank.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if `send.len() != self.size()`.
    /// - [`Error::Communication`] if a group member did not send a `Vec<T>` to the caller.
    pub fn all_to_all<T: Send + 'static>(&self, send: Vec<Vec<T>>) -> Result<Vec<Vec<T>>> {
        if send.len() != self.size() {
            return Err(Error::InvalidParameter {
                op: "all_to_all",
                reason: "one buffer per group rank is required",
            });
        }
        log::trace!(
            "all_to_all: group of {} ranks, {} values sent",
            self.size(),
            send.iter().map(Vec::len).sum::<usize>()
        );

        let mut outgoing: Vec<Option<Payload>> = (0..self.transport.size()).map(|_| None).collect();
        for (&dst, buf) in self.members.iter().zip(send) {
            outgoing[dst] = Some(Box::new(buf));
        }

        let mut incoming = self.transport.exchange(outgoing);
        self.members
            .iter()
            .map(|&src| {
                let payload = incoming[src].take().ok_or(Error::Communication {
                    reason: "missing message from a group member",
                })?;
                payload
                    .downcast::<Vec<T>>()
                    .map(|buf| *buf)
                    .map_err(|_| Error::Communication {
                        reason: "unexpected message type",
                    })
            })
            .collect()
    }

    /// Returns the values contributed by every group rank, in group order.
    pub fn all_gather<T: Clone + Send + 'static>(&self, value: T) -> Result<Vec<T>> {
        let send = (0..self.size()).map(|_| vec![value.clone()]).collect();
        self.all_to_all(send)?
            .into_iter()
            .map(|mut buf| {
                buf.pop().ok_or(Error::Communication {
                    reason: "empty all-gather contribution",
                })
            })
            .collect()
    }

    /// Returns the value held by group rank `root`. Only the root needs to provide a value.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if `root` is out of bounds.
    /// - [`Error::Communication`] if the root did not provide a value.
    pub fn broadcast<T: Clone + Send + 'static>(&self, value: Option<T>, root: usize) -> Result<T> {
        if root >= self.size() {
            return Err(Error::InvalidParameter {
                op: "broadcast",
                reason: "root is not a group rank",
            });
        }
        let send = if self.rank == root {
            (0..self.size())
                .map(|_| value.clone().into_iter().collect())
                .collect()
        } else {
            (0..self.size()).map(|_| Vec::new()).collect()
        };
        let mut recv = self.all_to_all::<T>(send)?;
        recv[root].pop().ok_or(Error::Communication {
            reason: "broadcast root did not provide a value",
        })
    }

    /// Replaces `values` with the element-wise sum of the `values` of every group rank.
    ///
    /// Contributions are added in group-rank order, so every rank obtains the same result.
    ///
    /// # Errors
    ///
    /// - [`Error::Communication`] if the ranks contributed buffers of different lengths.
    pub fn sum_in_place<E: ComplexField>(&self, values: &mut [E]) -> Result<()> {
        let contributions = self.all_gather(values.to_vec())?;
        if contributions.iter().any(|c| c.len() != values.len()) {
            return Err(Error::Communication {
                reason: "sum contributions have different lengths",
            });
        }
        // starting from the first contribution keeps single-member sums exact, signed zeros included
        let mut contributions = contributions.into_iter();
        if let Some(first) = contributions.next() {
            values.copy_from_slice(&first);
        }
        for contribution in contributions {
            for (v, c) in values.iter_mut().zip(contribution) {
                *v += c;
            }
        }
        Ok(())
    }

    /// Blocks until every rank of the world has reached the barrier.
    pub fn barrier(&self) {
        let outgoing = (0..self.transport.size()).map(|_| None).collect();
        self.transport.exchange(outgoing);
    }
}
