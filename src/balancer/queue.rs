use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::balancer::request::Request;
use crate::error::{BalancerError, Result};

/// Heap key: lowest priority value first, then earliest insertion.
type PendingKey = Reverse<(i64, u64, u64)>;

#[derive(Debug)]
struct Entry {
    request: Request,
    sequence: u64,
    /// Whether the request currently sits in the pending heap.
    queued: bool,
}

/// Holds every request of the current epoch and the pending backlog ordered
/// by `(priority, insertion sequence)`.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: HashMap<u64, Entry>,
    /// Request ids in submission order, for reporting.
    order: Vec<u64>,
    pending: BinaryHeap<PendingKey>,
    next_sequence: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new pending request. Fails if the request id was already used.
    pub fn enqueue(&mut self, mut request: Request) -> Result<()> {
        if self.entries.contains_key(&request.request_id) {
            return Err(BalancerError::DuplicateRequest(request.request_id));
        }

        request.mark_pending();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.pending
            .push(Reverse((request.priority, sequence, request.request_id)));
        self.order.push(request.request_id);
        self.entries.insert(
            request.request_id,
            Entry {
                request,
                sequence,
                queued: true,
            },
        );
        Ok(())
    }

    /// Remove and return the best pending request.
    pub fn dequeue_best(&mut self) -> Option<Request> {
        let Reverse((_, _, request_id)) = self.pending.pop()?;
        let entry = self.entries.get_mut(&request_id)?;
        entry.queued = false;
        Some(entry.request)
    }

    /// Put a dequeued request back into the backlog as pending. It keeps the
    /// sequence number it got at `enqueue`.
    pub fn requeue(&mut self, request_id: u64) -> bool {
        let Some(entry) = self.entries.get_mut(&request_id) else {
            return false;
        };
        if entry.queued {
            return false;
        }

        entry.queued = true;
        entry.request.mark_pending();
        self.pending
            .push(Reverse((entry.request.priority, entry.sequence, request_id)));
        true
    }

    /// Record that a dequeued request was handed to `server_id`.
    pub fn mark_processed(&mut self, request_id: u64, server_id: u64) -> bool {
        if let Some(entry) = self.entries.get_mut(&request_id) {
            entry.request.mark_processed(server_id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, request_id: u64) -> Option<&Request> {
        self.entries.get(&request_id).map(|entry| &entry.request)
    }

    pub fn contains(&self, request_id: u64) -> bool {
        self.entries.contains_key(&request_id)
    }

    /// All requests, pending and processed, in submission order.
    pub fn snapshot(&self) -> impl Iterator<Item = &Request> + Clone + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.entries.get(id).map(|entry| &entry.request))
    }

    /// Number of requests waiting for a server.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of requests in the current epoch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::request::RequestStatus;

    fn drain_ids(queue: &mut RequestQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.dequeue_best())
            .map(|r| r.request_id)
            .collect()
    }

    #[test]
    fn dequeue_on_empty_returns_none() {
        let mut queue = RequestQueue::new();
        assert!(queue.dequeue_best().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn lowest_priority_value_first() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 1, 5)).unwrap();
        queue.enqueue(Request::new(0, 2, 1)).unwrap();
        queue.enqueue(Request::new(0, 3, 3)).unwrap();

        assert_eq!(drain_ids(&mut queue), vec![2, 3, 1]);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut queue = RequestQueue::new();
        for id in [10, 4, 7, 1] {
            queue.enqueue(Request::new(0, id, 2)).unwrap();
        }
        assert_eq!(drain_ids(&mut queue), vec![10, 4, 7, 1]);
    }

    #[test]
    fn duplicate_request_rejected_and_original_untouched() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 1, 5)).unwrap();

        let err = queue.enqueue(Request::new(9, 1, 1)).unwrap_err();
        assert!(matches!(err, BalancerError::DuplicateRequest(1)));

        let original = queue.get(1).unwrap();
        assert_eq!(original.client_id, 0);
        assert_eq!(original.priority, 5);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn duplicate_rejected_even_after_processing() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 1, 5)).unwrap();
        let request = queue.dequeue_best().unwrap();
        queue.mark_processed(request.request_id, 0);

        assert!(queue.enqueue(Request::new(0, 1, 5)).is_err());
    }

    #[test]
    fn requeue_keeps_original_position_among_equal_priorities() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 1, 2)).unwrap();
        queue.enqueue(Request::new(0, 2, 2)).unwrap();

        let first = queue.dequeue_best().unwrap();
        assert_eq!(first.request_id, 1);
        queue.mark_processed(1, 0);

        queue.enqueue(Request::new(0, 3, 2)).unwrap();
        assert!(queue.requeue(1));

        assert_eq!(drain_ids(&mut queue), vec![1, 2, 3]);
    }

    #[test]
    fn requeue_resets_status() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 1, 1)).unwrap();
        queue.dequeue_best().unwrap();
        queue.mark_processed(1, 3);
        assert_eq!(queue.get(1).unwrap().status, RequestStatus::Processed);

        assert!(queue.requeue(1));
        let request = queue.get(1).unwrap();
        assert!(request.is_pending());
        assert!(request.assigned_server.is_none());
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn requeue_unknown_or_already_pending_is_rejected() {
        let mut queue = RequestQueue::new();
        assert!(!queue.requeue(42));

        queue.enqueue(Request::new(0, 1, 1)).unwrap();
        assert!(!queue.requeue(1));
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn snapshot_lists_all_requests_in_submission_order() {
        let mut queue = RequestQueue::new();
        queue.enqueue(Request::new(0, 3, 9)).unwrap();
        queue.enqueue(Request::new(0, 1, 1)).unwrap();
        queue.dequeue_best().unwrap();
        queue.mark_processed(1, 0);

        let snapshot = queue.snapshot();
        let ids: Vec<u64> = snapshot.clone().map(|r| r.request_id).collect();
        assert_eq!(ids, vec![3, 1]);

        // Restartable: a second pass sees the same requests.
        let statuses: Vec<RequestStatus> = snapshot.map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![RequestStatus::Pending, RequestStatus::Processed]
        );
        assert_eq!(queue.pending_len(), 1);
    }
}
