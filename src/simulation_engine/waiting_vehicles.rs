use crate::error::ControlError;
use crate::simulation_engine::vehicles::VehicleId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Creates a linked one-shot pair: the queue keeps the signal, the waiting
/// vehicle keeps the admission.
pub fn completion_signal() -> (CompletionSignal, Admission) {
    let (sender, receiver) = oneshot::channel();
    (
        CompletionSignal {
            sender: Mutex::new(Some(sender)),
        },
        Admission { receiver },
    )
}

/// Releasing side of a one-shot rendezvous. Can be fulfilled exactly once.
#[derive(Debug)]
pub struct CompletionSignal {
    sender: Mutex<Option<oneshot::Sender<()>>>,
}

impl CompletionSignal {
    pub fn fulfill(&self) -> Result<(), ControlError> {
        let sender = self
            .sender
            .lock()
            .take()
            .ok_or(ControlError::DoubleFulfillment)?;
        sender.send(()).map_err(|_| ControlError::ReceiverDropped)
    }

    pub fn is_fulfilled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Waiting side of a one-shot rendezvous.
#[derive(Debug)]
pub struct Admission {
    receiver: oneshot::Receiver<()>,
}

impl Admission {
    /// Resolves once the matching signal is fulfilled. Fails with
    /// [`ControlError::Stopped`] if the signal is dropped unfulfilled.
    pub async fn wait(&mut self) -> Result<(), ControlError> {
        (&mut self.receiver)
            .await
            .map_err(|_| ControlError::Stopped)
    }

    /// Refuses any later fulfillment. A fulfillment that already happened is
    /// kept.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// Vehicles waiting to enter an intersection, in arrival order.
#[derive(Debug, Default)]
pub struct WaitingVehicles {
    queue: Mutex<VecDeque<(VehicleId, CompletionSignal)>>,
}

impl WaitingVehicles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn push_back(&self, vehicle: VehicleId, signal: CompletionSignal) {
        let mut queue = self.queue.lock();
        debug_assert!(
            queue.iter().all(|(queued, _)| *queued != vehicle),
            "vehicle {} queued twice",
            vehicle
        );
        queue.push_back((vehicle, signal));
    }

    /// Removes the longest-waiting vehicle and fulfills its signal.
    ///
    /// The entry is removed even when its waiter has gone away, in which case
    /// [`ControlError::ReceiverDropped`] is returned.
    pub fn permit_entry_to_first(&self) -> Result<VehicleId, ControlError> {
        let (vehicle, signal) = self
            .queue
            .lock()
            .pop_front()
            .ok_or(ControlError::EmptyQueueRelease)?;
        signal.fulfill()?;
        Ok(vehicle)
    }

    /// Snapshot of queued vehicle ids, head first.
    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        self.queue.lock().iter().map(|(id, _)| *id).collect()
    }

    /// Drops every pending entry; their waiters observe [`ControlError::Stopped`].
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.queue.lock().drain(..).collect();
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn releases_in_arrival_order() {
        let waiting = WaitingVehicles::new();
        let mut admissions = Vec::new();
        for id in 1..=3 {
            let (signal, admission) = completion_signal();
            waiting.push_back(VehicleId(id), signal);
            admissions.push(admission);
        }
        assert_eq!(waiting.len(), 3);
        assert_eq!(
            waiting.vehicle_ids(),
            vec![VehicleId(1), VehicleId(2), VehicleId(3)]
        );

        assert_eq!(waiting.permit_entry_to_first(), Ok(VehicleId(1)));
        assert_eq!(waiting.len(), 2);
        assert_eq!(waiting.permit_entry_to_first(), Ok(VehicleId(2)));
        assert_eq!(waiting.permit_entry_to_first(), Ok(VehicleId(3)));
        assert!(waiting.is_empty());

        for mut admission in admissions {
            assert_eq!(admission.wait().await, Ok(()));
        }
    }

    #[test]
    fn release_on_empty_queue_fails() {
        let waiting = WaitingVehicles::new();
        assert_eq!(
            waiting.permit_entry_to_first(),
            Err(ControlError::EmptyQueueRelease)
        );
    }

    #[tokio::test]
    async fn signal_fulfills_only_once() {
        let (signal, mut admission) = completion_signal();
        assert!(!signal.is_fulfilled());
        assert_eq!(signal.fulfill(), Ok(()));
        assert!(signal.is_fulfilled());
        assert_eq!(signal.fulfill(), Err(ControlError::DoubleFulfillment));
        assert_eq!(admission.wait().await, Ok(()));
    }

    #[test]
    fn dropped_waiter_is_reported_and_removed() {
        let waiting = WaitingVehicles::new();
        let (signal, admission) = completion_signal();
        waiting.push_back(VehicleId(9), signal);
        drop(admission);

        assert_eq!(
            waiting.permit_entry_to_first(),
            Err(ControlError::ReceiverDropped)
        );
        assert!(waiting.is_empty());
    }

    #[tokio::test]
    async fn clear_wakes_waiters_with_stopped() {
        let waiting = WaitingVehicles::new();
        let (signal, mut admission) = completion_signal();
        waiting.push_back(VehicleId(4), signal);

        assert_eq!(waiting.clear(), 1);
        assert_eq!(admission.wait().await, Err(ControlError::Stopped));
    }

    #[tokio::test]
    async fn closed_admission_refuses_release_but_keeps_an_earlier_one() {
        let (signal, mut admission) = completion_signal();
        admission.close();
        assert_eq!(signal.fulfill(), Err(ControlError::ReceiverDropped));

        let (signal, mut admission) = completion_signal();
        signal.fulfill().unwrap();
        admission.close();
        assert_eq!(admission.wait().await, Ok(()));
    }
}
