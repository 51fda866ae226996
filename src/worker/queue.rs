//! Bounded job queue with per-connection lanes.
//!
//! # Layout
//! ```text
//! connection readers ──push(conn_id)──▶ lane[conn_id % N] ──▶ worker N
//! ```
//!
//! Each worker owns one lane, a bounded `mpsc` channel. Every request from
//! a connection goes to the same lane, so one worker sees a connection's
//! requests in arrival order. The total capacity is split across lanes,
//! the first `capacity % N` lanes taking one extra slot; a full lane makes
//! `push` wait instead of dropping.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::net::ConnectionId;

/// Returned when the consuming worker is gone. Carries the rejected job.
#[derive(Debug)]
pub struct QueueClosed<J>(pub J);

impl<J> std::fmt::Display for QueueClosed<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job queue closed")
    }
}

/// Producer side of the queue. Cheap to clone; one per connection reader.
#[derive(Debug)]
pub struct JobQueue<J> {
    lanes: Arc<[mpsc::Sender<J>]>,
}

impl<J> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            lanes: Arc::clone(&self.lanes),
        }
    }
}

/// Consumer side of one lane.
#[derive(Debug)]
pub struct Lane<J> {
    index: usize,
    rx: mpsc::Receiver<J>,
}

/// Create a queue of `lanes` lanes holding `capacity` jobs in total.
///
/// Every lane needs at least one slot, so the total is exact only when
/// `capacity >= lanes`; configuration validation enforces that.
pub fn bounded<J>(lanes: usize, capacity: usize) -> (JobQueue<J>, Vec<Lane<J>>) {
    let lanes = lanes.max(1);
    let (base, extra) = (capacity / lanes, capacity % lanes);

    let (senders, receivers): (Vec<_>, Vec<_>) = (0..lanes)
        .map(|index| {
            let slots = (base + usize::from(index < extra)).max(1);
            let (tx, rx) = mpsc::channel(slots);
            (tx, Lane { index, rx })
        })
        .unzip();

    let queue = JobQueue {
        lanes: senders.into(),
    };
    (queue, receivers)
}

impl<J> JobQueue<J> {
    /// Lane that serves the given connection.
    pub fn lane_for(&self, connection: ConnectionId) -> usize {
        (connection.as_u64() % self.lanes.len() as u64) as usize
    }

    /// Enqueue a job for `connection`, waiting while its lane is full.
    pub async fn push(&self, connection: ConnectionId, job: J) -> Result<(), QueueClosed<J>> {
        self.lanes[self.lane_for(connection)]
            .send(job)
            .await
            .map_err(|e| QueueClosed(e.0))
    }

    /// Number of jobs lane `index` can buffer.
    pub fn lane_capacity(&self, index: usize) -> usize {
        self.lanes[index].max_capacity()
    }

    /// Total number of jobs the queue can buffer.
    pub fn capacity(&self) -> usize {
        self.lanes.iter().map(mpsc::Sender::max_capacity).sum()
    }

    /// Jobs currently buffered across all lanes.
    pub fn queued(&self) -> usize {
        self.lanes
            .iter()
            .map(|lane| lane.max_capacity() - lane.capacity())
            .sum()
    }
}

impl<J> Lane<J> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Take the next job, waiting while the lane is empty.
    /// Returns `None` once every producer is gone and the lane is drained.
    pub async fn recv(&mut self) -> Option<J> {
        self.rx.recv().await
    }
}
