use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use glam::Vec3;
use lumen_core::LightAddRequest;
use thiserror::Error;

use crate::light::{DirectionalLight, PointLight};

#[derive(Debug, Error, PartialEq)]
pub enum LightError {
    #[error("light store is full ({capacity} lights)")]
    CapacityExceeded { capacity: usize },
    #[error("light radius must be finite and positive, got {radius}")]
    InvalidRadius { radius: f32 },
}

// Identifies where a snapshot came from, so a consumer caching uploads by
// version never confuses two stores or two hand-built light lists.
static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_source_id() -> u64 {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

struct StoreState {
    // Only the first `len()` slots exist; capacity is reserved up front.
    point_lights: Vec<PointLight>,
    directional: Option<DirectionalLight>,
}

/// Authoritative list of scene lights.
///
/// Producers on any thread call [`LightStore::add_point_light`]; the render
/// thread calls [`LightStore::snapshot`] once per frame. A light becomes
/// visible to snapshots only once its record is complete, and the count seen
/// by successive snapshots never decreases.
pub struct LightStore {
    capacity: usize,
    source: u64,
    state: RwLock<StoreState>,
    generation: AtomicU64,
}

impl LightStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            source: next_source_id(),
            state: RwLock::new(StoreState {
                point_lights: Vec::with_capacity(capacity),
                directional: None,
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.read(|state| state.point_lights.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped by every successful mutation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Appends a light and returns its index.
    pub fn add_point_light(
        &self,
        position: Vec3,
        color: Vec3,
        intensity: f32,
        radius: f32,
    ) -> Result<usize, LightError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(LightError::InvalidRadius { radius });
        }

        let light = PointLight::new(position, color, intensity, radius);
        let index = self.write(|state| {
            if state.point_lights.len() >= self.capacity {
                return Err(LightError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
            // The record is built before the push, so the new length is
            // only ever observed together with a complete light.
            state.point_lights.push(light);
            Ok(state.point_lights.len() - 1)
        })?;

        log::debug!(
            "added point light #{index} at {position} (radius {radius}, intensity {intensity})"
        );
        Ok(index)
    }

    pub fn add_request(&self, request: &LightAddRequest) -> Result<usize, LightError> {
        self.add_point_light(
            request.position,
            request.color,
            request.intensity,
            request.radius,
        )
    }

    /// Installs or clears the single directional light.
    pub fn set_directional_light(&self, light: Option<DirectionalLight>) {
        self.write(|state| {
            state.directional = light;
            Ok::<_, LightError>(())
        })
        .ok();
    }

    /// Copies the live lights out under one read lock.
    pub fn snapshot(&self) -> LightSnapshot {
        self.read(|state| LightSnapshot {
            point_lights: Arc::from(state.point_lights.as_slice()),
            directional: state.directional,
            source: self.source,
            generation: self.generation.load(Ordering::Acquire),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        // A panic elsewhere cannot leave a half-pushed light behind, so a
        // poisoned lock still guards consistent data.
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<R, LightError>,
    ) -> Result<R, LightError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(result)
    }
}

/// Read-consistent copy of the store taken once per frame.
#[derive(Clone, Debug, Default)]
pub struct LightSnapshot {
    point_lights: Arc<[PointLight]>,
    directional: Option<DirectionalLight>,
    source: u64,
    generation: u64,
}

impl LightSnapshot {
    pub fn from_lights(point_lights: Vec<PointLight>, directional: Option<DirectionalLight>) -> Self {
        Self {
            point_lights: Arc::from(point_lights),
            directional,
            source: next_source_id(),
            generation: 0,
        }
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn count(&self) -> usize {
        self.point_lights.len()
    }

    pub fn get(&self, index: usize) -> Option<&PointLight> {
        self.point_lights.get(index)
    }

    pub fn directional(&self) -> Option<&DirectionalLight> {
        self.directional.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Equal only for snapshots of the same store at the same generation.
    pub fn version(&self) -> (u64, u64) {
        (self.source, self.generation)
    }
}
