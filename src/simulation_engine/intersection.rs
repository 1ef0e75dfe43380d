use crate::config::{GreenWait, IntersectionConfig};
use crate::control_system::traffic_light::{Phase, TrafficLight};
use crate::error::ControlError;
use crate::simulation_engine::streets::{Street, StreetId};
use crate::simulation_engine::vehicles::{Vehicle, VehicleId};
use crate::simulation_engine::waiting_vehicles::{completion_signal, Admission, WaitingVehicles};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Unique identifier for an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntersectionId(pub u32);

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an admitted vehicle is still inside the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    Occupied(VehicleId),
}

/// State shared with the serializer task.
struct Core {
    id: IntersectionId,
    occupancy: Mutex<Occupancy>,
    waiting: WaitingVehicles,
    /// Poked by `enter` and `depart`.
    wake: Notify,
}

impl Core {
    /// Admits the head of the queue if the intersection is free.
    fn try_admit_next(&self) {
        let mut occupancy = self.occupancy.lock();
        while *occupancy == Occupancy::Free && !self.waiting.is_empty() {
            match self.waiting.permit_entry_to_first() {
                Ok(vehicle) => {
                    *occupancy = Occupancy::Occupied(vehicle);
                    log::debug!(
                        "Intersection {} blocked by vehicle {} ({} waiting)",
                        self.id,
                        vehicle,
                        self.waiting.len()
                    );
                }
                Err(ControlError::ReceiverDropped) => {
                    log::warn!(
                        "Intersection {}: skipped a vehicle that stopped waiting",
                        self.id
                    );
                }
                Err(err) => {
                    log::error!("Intersection {}: admission failed: {}", self.id, err);
                    debug_assert!(false, "admission failed: {}", err);
                    break;
                }
            }
        }
    }
}

/// A queued vehicle's claim on its admission. If the claim is dropped before
/// the vehicle learned it was admitted, the intersection is handed back.
struct PendingEntry<'a> {
    core: &'a Core,
    vehicle: VehicleId,
    admission: Admission,
    acknowledged: bool,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if self.acknowledged {
            return;
        }
        // no admission can land after this
        self.admission.close();
        let mut occupancy = self.core.occupancy.lock();
        if *occupancy != Occupancy::Occupied(self.vehicle) {
            return;
        }
        *occupancy = Occupancy::Free;
        drop(occupancy);
        self.core.wake.notify_one();
        log::warn!(
            "Intersection {}: vehicle {} was admitted after it stopped waiting, released",
            self.core.id,
            self.vehicle
        );
    }
}

async fn process_vehicle_queue(core: Arc<Core>) {
    log::debug!("Intersection {} processing its vehicle queue", core.id);
    loop {
        core.try_admit_next();
        core.wake.notified().await;
    }
}

/// A traffic intersection that admits one vehicle at a time.
///
/// Vehicles call [`Intersection::enter`] from their own task, which waits for
/// a green light, joins the queue, and returns once the vehicle is the head
/// of the queue and the intersection is free. The vehicle must then call
/// [`Intersection::depart`] exactly once; until it does, no other vehicle is
/// admitted.
pub struct Intersection {
    core: Arc<Core>,
    green_wait: GreenWait,
    streets: Mutex<Vec<Street>>,
    light: TrafficLight,
    running: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Intersection {
    pub fn new(id: IntersectionId) -> Self {
        Self::with_config(id, IntersectionConfig::default())
    }

    pub fn with_config(id: IntersectionId, config: IntersectionConfig) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            core: Arc::new(Core {
                id,
                occupancy: Mutex::new(Occupancy::Free),
                waiting: WaitingVehicles::new(),
                wake: Notify::new(),
            }),
            green_wait: config.green_wait,
            streets: Mutex::new(Vec::new()),
            light: TrafficLight::new(format!("at intersection {}", id), config.light),
            running,
            task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.core.id
    }

    /// Registers an adjacent street. Returns `false` if a street with the same
    /// id is already registered.
    pub fn add_street(&self, street: Street) -> bool {
        let mut streets = self.streets.lock();
        if streets.iter().any(|s| s.id == street.id) {
            log::debug!(
                "Intersection {}: street {} already registered",
                self.core.id,
                street.id
            );
            return false;
        }
        streets.push(street);
        true
    }

    /// All registered streets except `excluding`, in registration order.
    pub fn adjacent_streets(&self, excluding: StreetId) -> Vec<Street> {
        self.streets
            .lock()
            .iter()
            .filter(|street| street.id != excluding)
            .cloned()
            .collect()
    }

    pub fn streets(&self) -> Vec<Street> {
        self.streets.lock().clone()
    }

    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    pub fn phase(&self) -> Phase {
        self.light.phase()
    }

    pub fn is_green(&self) -> bool {
        self.light.is_green()
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant().is_some()
    }

    pub fn occupant(&self) -> Option<VehicleId> {
        match *self.core.occupancy.lock() {
            Occupancy::Free => None,
            Occupancy::Occupied(vehicle) => Some(vehicle),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.core.waiting.len()
    }

    /// Vehicles waiting to be admitted, head first.
    pub fn waiting_vehicles(&self) -> Vec<VehicleId> {
        self.core.waiting.vehicle_ids()
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Starts the traffic light and the queue serializer on the current tokio
    /// runtime.
    pub fn start(&self) -> Result<(), ControlError> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(ControlError::AlreadyStarted);
        }

        self.light.start()?;
        *task = Some(tokio::spawn(process_vehicle_queue(Arc::clone(&self.core))));
        self.running.send_replace(true);
        log::info!("Intersection {} started", self.core.id);
        Ok(())
    }

    /// Stops the serializer and the traffic light. Vehicles still waiting for
    /// green or for admission get [`ControlError::Stopped`]. A vehicle already
    /// inside keeps the intersection occupied until it departs.
    pub async fn stop(&self) {
        self.running.send_replace(false);

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        let dropped = self.core.waiting.clear();
        self.light.stop().await;

        log::info!(
            "Intersection {} stopped, {} waiting vehicle(s) turned away",
            self.core.id,
            dropped
        );
    }

    /// Waits until `vehicle` is allowed into the intersection.
    ///
    /// On red, first waits for the light to turn green, then joins the queue
    /// and waits for its turn. Dropping the returned future abandons the
    /// vehicle's place in line. If the vehicle was already admitted when the
    /// future is dropped or [`Intersection::stop`] interrupts it, the
    /// intersection is released again, so `Ok` is the only outcome that
    /// leaves it occupied.
    pub async fn enter(&self, vehicle: &Vehicle) -> Result<(), ControlError> {
        let mut running = self.running.subscribe();
        if !*running.borrow_and_update() {
            return Err(ControlError::NotStarted);
        }

        tokio::select! {
            biased;
            _ = running.wait_for(|running| !*running) => Err(ControlError::Stopped),
            admitted = self.add_vehicle_to_queue(vehicle) => admitted,
        }
    }

    async fn add_vehicle_to_queue(&self, vehicle: &Vehicle) -> Result<(), ControlError> {
        let mut phase = self.light.subscribe();
        if *phase.borrow_and_update() == Phase::Red {
            log::debug!(
                "Intersection {}: light is red, vehicle {} waiting for green",
                self.core.id,
                vehicle
            );
            match self.green_wait {
                GreenWait::Broadcast => {
                    phase
                        .wait_for(|phase| *phase == Phase::Green)
                        .await
                        .map_err(|_| ControlError::Stopped)?;
                }
                GreenWait::SingleDelivery => self.light.wait_for_green().await,
            }
        }

        let (signal, admission) = completion_signal();
        let mut entry = PendingEntry {
            core: &self.core,
            vehicle: vehicle.id,
            admission,
            acknowledged: false,
        };
        self.core.waiting.push_back(vehicle.id, signal);
        self.core.wake.notify_one();
        log::debug!(
            "Intersection {}: vehicle {} queued at position {}",
            self.core.id,
            vehicle,
            self.core.waiting.len()
        );

        entry.admission.wait().await?;
        entry.acknowledged = true;
        log::info!(
            "Intersection {}: vehicle {} has entered the intersection",
            self.core.id,
            vehicle
        );
        Ok(())
    }

    /// Reports that `vehicle` has left, freeing the intersection for the next
    /// vehicle in line.
    pub fn depart(&self, vehicle: &Vehicle) -> Result<(), ControlError> {
        {
            let mut occupancy = self.core.occupancy.lock();
            if *occupancy != Occupancy::Occupied(vehicle.id) {
                return Err(ControlError::UnexpectedDeparture {
                    intersection: self.core.id,
                    vehicle: vehicle.id,
                });
            }
            *occupancy = Occupancy::Free;
        }
        self.core.wake.notify_one();
        log::info!(
            "Intersection {}: vehicle {} has left the intersection",
            self.core.id,
            vehicle
        );
        Ok(())
    }
}

impl Drop for Intersection {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Intersection")
            .field("id", &self.core.id)
            .field("phase", &self.phase())
            .field("occupancy", &*self.core.occupancy.lock())
            .field("waiting", &self.core.waiting.len())
            .finish()
    }
}
