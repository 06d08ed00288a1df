use crate::error::{KdeError, Result};

/// Collision-specific event data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    pub position: [f64; 3],
    pub total_cross_section: f64,
}

/// Track-specific event data. `direction` is a unit vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackData {
    pub start: [f64; 3],
    pub direction: [f64; 3],
    pub track_length: f64,
}

/// Exactly one kind of event is ever set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    Collision(CollisionData),
    Track(TrackData),
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Collision(_) => "collision",
            EventKind::Track(_) => "track",
        }
    }
}

/// A single tally event triggered by the transport code.
///
/// Events are immutable once built; the host creates one per physical event
/// and discards it after scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TallyEvent {
    pub kind: EventKind,
    pub particle_energy: f64,
    pub particle_weight: f64,
    /// Energy-dependent tally multiplier, 1 unless set by the host
    pub multiplier: f64,
}

impl TallyEvent {
    /// Create a collision event
    pub fn collision(
        position: [f64; 3],
        total_cross_section: f64,
        particle_energy: f64,
        particle_weight: f64,
    ) -> Result<Self> {
        if !(total_cross_section > 0.0) {
            return Err(KdeError::InvalidEvent(format!(
                "total cross section must be positive, got {}",
                total_cross_section
            )));
        }
        Ok(Self {
            kind: EventKind::Collision(CollisionData {
                position,
                total_cross_section,
            }),
            particle_energy,
            particle_weight,
            multiplier: 1.0,
        })
    }

    /// Create a track event. The direction is normalized here so the
    /// path-length formulas downstream can rely on a unit vector.
    pub fn track(
        start: [f64; 3],
        direction: [f64; 3],
        track_length: f64,
        particle_energy: f64,
        particle_weight: f64,
    ) -> Result<Self> {
        let mag = (direction[0] * direction[0]
            + direction[1] * direction[1]
            + direction[2] * direction[2])
            .sqrt();
        if mag == 0.0 || !mag.is_finite() {
            return Err(KdeError::InvalidEvent(
                "track direction cannot be a zero vector".to_string(),
            ));
        }
        if track_length < 0.0 || !track_length.is_finite() {
            return Err(KdeError::InvalidEvent(format!(
                "track length must be non-negative, got {}",
                track_length
            )));
        }
        Ok(Self {
            kind: EventKind::Track(TrackData {
                start,
                direction: [direction[0] / mag, direction[1] / mag, direction[2] / mag],
                track_length,
            }),
            particle_energy,
            particle_weight,
            multiplier: 1.0,
        })
    }

    /// Set the energy-dependent tally multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Product of tally multiplier and particle weight
    pub fn weighting_factor(&self) -> f64 {
        self.multiplier * self.particle_weight
    }

    /// Point at path length `s` along a track; the collision point otherwise.
    pub fn position_at(&self, s: f64) -> [f64; 3] {
        match &self.kind {
            EventKind::Collision(c) => c.position,
            EventKind::Track(t) => [
                t.start[0] + s * t.direction[0],
                t.start[1] + s * t.direction[1],
                t.start[2] + s * t.direction[2],
            ],
        }
    }
}
