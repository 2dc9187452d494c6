// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The slot channel: how a worker hands hit records to the
//! coordinator without ever touching the image, and without the
//! coordinator ever waiting on a particular worker.
//!
//! Every worker owns a small ring of fixed-size buffers ("slots").  It
//! fills them in round-robin order.  A full slot is *published*: the
//! buffer itself moves down a readiness channel shared by all the
//! workers, tagged with the worker and slot it came from.  The
//! coordinator drains whichever publication arrives next, applies it,
//! and *acknowledges* it by sending the buffer back down that worker's
//! private acknowledgement channel.  A worker that comes around to a
//! slot whose buffer hasn't come back yet waits for it, which bounds
//! how far a worker can run ahead of the coordinator.
//!
//! Because the buffer travels with the message, only one side can hold
//! it at a time, and everything the worker wrote into it before
//! sending is visible to the coordinator once it has been received.
//!
//! When a worker runs out of rows it publishes whatever is in its
//! current slot, with an explicit count, as its final publication.
//! A writer that is dropped without finishing (its worker panicked,
//! say) publishes an `Abandoned` notice instead, so the coordinator is
//! never left waiting for it.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::trace;
use std::time::Duration;

use crate::accumulator::HitRecord;
use crate::errors::{RenderError, Result};
use crate::sampler::{HitSink, SampleStats};

/// Slots per worker.
pub const SLOT_COUNT: usize = 8;

/// Hit records per slot.
pub const SLOT_CAPACITY: usize = 2048;

/// How big each worker's ring is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotGeometry {
    /// Slots in the ring.
    pub slots: usize,
    /// Records per slot.
    pub capacity: usize,
}

impl Default for SlotGeometry {
    fn default() -> SlotGeometry {
        SlotGeometry {
            slots: SLOT_COUNT,
            capacity: SLOT_CAPACITY,
        }
    }
}

/// What a worker reports about itself when it's done.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Which worker.
    pub worker: usize,
    /// What its sampler did.
    pub sampled: SampleStats,
    /// Slots it published, the final one included.
    pub publications: u64,
}

/// Why a slot was published.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The slot filled up.
    Full,
    /// The worker is done; this is its last, possibly partial, slot.
    Final(WorkerStats),
    /// The worker went away without finishing.  Carries no records.
    Abandoned,
}

/// A published slot, in transit to or held by the coordinator.
#[derive(Debug)]
pub struct Publication {
    /// The worker that published it.
    pub worker: usize,
    /// Its position in that worker's ring.
    pub slot: usize,
    /// How many records at the front of the buffer are valid.
    pub count: usize,
    /// Why it was published.
    pub readiness: Readiness,
    records: Box<[HitRecord]>,
}

impl Publication {
    /// The valid records, in the order they were written.
    pub fn records(&self) -> &[HitRecord] {
        &self.records[..self.count]
    }

    /// Whether this publication ends its worker's stream.
    pub fn is_final(&self) -> bool {
        match self.readiness {
            Readiness::Full => false,
            Readiness::Final(_) | Readiness::Abandoned => true,
        }
    }
}

// A drained buffer on its way home.
struct Ack {
    slot: usize,
    records: Box<[HitRecord]>,
}

/// Build the channels for one render: a writer per worker, and the
/// single reader the coordinator drains them all through.
pub fn slot_channels(workers: usize, geometry: SlotGeometry) -> Result<(Vec<SlotWriter>, SlotReader)> {
    if geometry.slots == 0 {
        return Err(RenderError::InvalidValue {
            field: "slots",
            expected: "at least 1",
        });
    }
    if geometry.capacity == 0 {
        return Err(RenderError::InvalidValue {
            field: "slot capacity",
            expected: "at least 1",
        });
    }

    let (ready_tx, ready_rx) = channel::unbounded();
    let mut writers = Vec::with_capacity(workers);
    let mut acks = Vec::with_capacity(workers);
    for worker in 0..workers {
        let (ack_tx, ack_rx) = channel::unbounded();
        let slots = (0..geometry.slots)
            .map(|_| Some(vec![HitRecord::default(); geometry.capacity].into_boxed_slice()))
            .collect();
        writers.push(SlotWriter {
            worker,
            slots,
            current: None,
            next: 0,
            fill: 0,
            publications: 0,
            ready: ready_tx.clone(),
            acks: ack_rx,
            finished: false,
        });
        acks.push(ack_tx);
    }

    let reader = SlotReader {
        ready: ready_rx,
        acks,
        stall_timeout: None,
    };
    Ok((writers, reader))
}

/// A worker's end of its slot channel.
pub struct SlotWriter {
    worker: usize,
    // Buffers this worker holds that aren't being filled.  `None` means
    // the slot's last occupant is still with the coordinator.
    slots: Vec<Option<Box<[HitRecord]>>>,
    // The buffer being filled, belonging to slot `next`.
    current: Option<Box<[HitRecord]>>,
    next: usize,
    fill: usize,
    publications: u64,
    ready: Sender<Publication>,
    acks: Receiver<Ack>,
    finished: bool,
}

impl SlotWriter {
    /// Which worker this writer belongs to.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Take the buffer for the next slot in the ring, waiting for the
    /// coordinator to acknowledge its previous occupant if need be.
    pub fn acquire_slot_for_write(&mut self) -> Result<Box<[HitRecord]>> {
        loop {
            if let Some(buffer) = self.slots[self.next].take() {
                return Ok(buffer);
            }
            let ack = self
                .acks
                .recv()
                .map_err(|_| RenderError::CoordinatorGone(self.worker))?;
            self.slots[ack.slot] = Some(ack.records);
        }
    }

    /// Append one record, publishing the slot if that fills it.
    pub fn push(&mut self, record: HitRecord) -> Result<()> {
        let mut buffer = match self.current.take() {
            Some(buffer) => buffer,
            None => self.acquire_slot_for_write()?,
        };
        buffer[self.fill] = record;
        self.fill += 1;
        if self.fill == buffer.len() {
            self.publish(buffer, Readiness::Full)
        } else {
            self.current = Some(buffer);
            Ok(())
        }
    }

    fn publish(&mut self, records: Box<[HitRecord]>, readiness: Readiness) -> Result<()> {
        let publication = Publication {
            worker: self.worker,
            slot: self.next,
            count: self.fill,
            readiness,
            records,
        };
        self.ready
            .send(publication)
            .map_err(|_| RenderError::CoordinatorGone(self.worker))?;
        self.publications += 1;
        self.next = (self.next + 1) % self.slots.len();
        self.fill = 0;
        Ok(())
    }

    /// Publish the current slot, however full, as this worker's final
    /// word.  Sent even when the worker never produced a record.
    pub fn finish(mut self, sampled: SampleStats) -> Result<WorkerStats> {
        let buffer = match self.current.take() {
            Some(buffer) => buffer,
            None => self.acquire_slot_for_write()?,
        };
        let stats = WorkerStats {
            worker: self.worker,
            sampled,
            publications: self.publications + 1,
        };
        self.finished = true;
        self.publish(buffer, Readiness::Final(stats))?;
        Ok(stats)
    }
}

impl HitSink for SlotWriter {
    fn hit(&mut self, record: HitRecord) -> Result<()> {
        self.push(record)
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let notice = Publication {
            worker: self.worker,
            slot: self.next,
            count: 0,
            readiness: Readiness::Abandoned,
            records: Vec::new().into_boxed_slice(),
        };
        // Nobody to tell if the coordinator is gone too.
        let _ = self.ready.send(notice);
    }
}

/// The coordinator's end of every worker's slot channel.
pub struct SlotReader {
    ready: Receiver<Publication>,
    acks: Vec<Sender<Ack>>,
    stall_timeout: Option<Duration>,
}

impl SlotReader {
    /// How many workers feed this reader.
    pub fn workers(&self) -> usize {
        self.acks.len()
    }

    /// Give up waiting for a publication after `timeout`.  `None`, the
    /// default, waits forever.
    pub fn set_stall_timeout(&mut self, timeout: Option<Duration>) {
        self.stall_timeout = timeout;
    }

    /// Wait for any worker to publish a slot, and take it.
    pub fn drain_next_ready(&self) -> Result<Publication> {
        match self.stall_timeout {
            None => self
                .ready
                .recv()
                .map_err(|_| RenderError::WorkersGone(self.workers())),
            Some(timeout) => self.ready.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => RenderError::Stalled(timeout),
                RecvTimeoutError::Disconnected => RenderError::WorkersGone(self.workers()),
            }),
        }
    }

    /// Hand a drained slot back to its worker so it can be filled
    /// again.  A worker that has already finished doesn't need it.
    pub fn acknowledge(&self, publication: Publication) {
        let Publication {
            worker,
            slot,
            records,
            ..
        } = publication;
        if let Some(acks) = self.acks.get(worker) {
            if acks.send(Ack { slot, records }).is_err() {
                trace!("worker {} has already gone, dropping ack for slot {}", worker, slot);
            }
        }
    }
}
