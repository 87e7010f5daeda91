//! Frontier slots, lattice particles, and the crystallization engine.
//!
//! The engine runs a small state machine:
//!
//! ```text
//! Idle --begin(boundary)--> Crystallizing --quiescence--> (rebuild) --> Idle
//! ```
//!
//! While crystallizing, each tick scans the unfilled frontier, captures
//! nearby free particles into the lattice, and expands the frontier
//! around every new lattice particle. A tick with zero captures feeds
//! an inactivity timer; when it exceeds the configured timeout the
//! lattice is solidified into a new boundary polygon and handed back to
//! the caller.

use crate::config::{CrystalConfig, RebuildConfig};
use crate::geometry;
use crate::particle::{ParticlePool, remove_descending};
use crate::rebuild;
use crate::types::SlotId;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// An open bonding site on the lattice boundary.
///
/// The capture position is `anchor + dir * spacing`. Once `filled` is
/// set the slot is never reused or mutated.
#[derive(Clone, Copy, Debug)]
pub struct FrontierSlot {
    pub anchor: Vec2,
    /// Outward unit direction.
    pub dir: Vec2,
    pub filled: bool,
}

impl FrontierSlot {
    pub fn target(&self, spacing: f32) -> Vec2 {
        self.anchor + self.dir * spacing
    }
}

/// A particle frozen into the crystal structure. Immutable once created.
#[derive(Clone, Debug)]
pub struct LatticeParticle {
    pub pos: Vec2,
    /// The slot this particle filled.
    pub source_slot: SlotId,
    /// Slots this particle opened around itself.
    pub spawned_slots: Vec<SlotId>,
    pub drawable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EngineState {
    Idle,
    Crystallizing,
}

/// Owns the slot frontier and the lattice; converts free particles into
/// lattice particles and, on quiescence, reconstructs the boundary.
#[derive(Debug)]
pub struct CrystalEngine {
    pub cfg: CrystalConfig,
    pub rebuild_cfg: RebuildConfig,
    pub slots: Vec<FrontierSlot>,
    pub lattice: Vec<LatticeParticle>,
    boundary: Vec<Vec2>,
    centroid: Vec2,
    branch_count: usize,
    idle_time: f32,
    state: EngineState,
}

impl CrystalEngine {
    pub fn new(cfg: CrystalConfig, rebuild_cfg: RebuildConfig) -> Self {
        Self {
            cfg,
            rebuild_cfg,
            slots: Vec::new(),
            lattice: Vec::new(),
            boundary: Vec::new(),
            centroid: Vec2::ZERO,
            branch_count: cfg.branch_min,
            idle_time: 0.0,
            state: EngineState::Idle,
        }
    }

    pub fn is_crystallizing(&self) -> bool {
        self.state == EngineState::Crystallizing
    }

    pub fn boundary(&self) -> &[Vec2] {
        &self.boundary
    }

    /// Starts a crystallization episode on a copy of `boundary`.
    ///
    /// Clears all frontier and lattice state, draws the per-episode
    /// branch count from the injected RNG (pin the RNG in tests for a
    /// deterministic frontier), and generates the initial frontier:
    /// `max(1, floor(perimeter / spacing))` slots evenly spaced by
    /// arclength, each pointing away from the polygon centroid.
    pub fn begin(&mut self, boundary: &[Vec2], rng: &mut impl Rng) {
        self.boundary = boundary.to_vec();
        self.centroid = geometry::centroid(boundary);
        self.slots.clear();
        self.lattice.clear();
        self.idle_time = 0.0;
        self.branch_count = rng.random_range(self.cfg.branch_min..=self.cfg.branch_max);
        self.generate_frontier();
        self.state = EngineState::Crystallizing;
    }

    fn generate_frontier(&mut self) {
        let perimeter = geometry::perimeter(&self.boundary);
        if perimeter <= f32::EPSILON {
            return;
        }
        let slot_count = ((perimeter / self.cfg.spacing).floor() as usize).max(1);
        let actual_spacing = perimeter / slot_count as f32;

        for k in 0..slot_count {
            let sample = geometry::sample_at_arclength(&self.boundary, k as f32 * actual_spacing);
            let dir = geometry::outward_perpendicular(sample.tangent, sample.pos, self.centroid);
            if dir == Vec2::ZERO {
                continue;
            }
            self.slots.push(FrontierSlot {
                anchor: sample.pos,
                dir,
                filled: false,
            });
        }
    }

    /// Runs one crystallization tick after the pool has stepped.
    ///
    /// Returns `Some(new_boundary)` exactly once, when the quiescence
    /// timeout elapses: the reconstructed polygon, or the original
    /// boundary unchanged if fewer than 3 lattice particles were
    /// captured. Returns `None` while idle or still active.
    pub fn tick(&mut self, dt: f32, pool: &mut ParticlePool) -> Option<Vec<Vec2>> {
        if self.state != EngineState::Crystallizing {
            return None;
        }

        let captures = self.capture_step(pool);
        if captures == 0 {
            self.idle_time += dt;
        } else {
            self.idle_time = 0.0;
        }

        if self.idle_time < self.cfg.quiescence_timeout {
            return None;
        }

        let result = if self.lattice.len() < 3 {
            self.boundary.clone()
        } else {
            let lattice: Vec<Vec2> = self.lattice.iter().map(|l| l.pos).collect();
            let open_targets = self.open_slot_targets();
            rebuild::rebuild_boundary(
                &self.boundary,
                &lattice,
                &open_targets,
                self.cfg.spacing,
                &self.rebuild_cfg,
            )
        };
        self.state = EngineState::Idle;
        self.idle_time = 0.0;
        Some(result)
    }

    /// Capture positions of all still-open slots.
    pub fn open_slot_targets(&self) -> Vec<Vec2> {
        self.slots
            .iter()
            .filter(|s| !s.filled)
            .map(|s| s.target(self.cfg.spacing))
            .collect()
    }

    /// Scans unfilled slots (up to the per-tick cap), claiming for each
    /// the nearest free particle within the capture radius. Claimed
    /// particles are removed from the pool in one descending batch at
    /// the end, so a particle can never fill two slots in one tick.
    ///
    /// Returns the number of captures made this tick.
    fn capture_step(&mut self, pool: &mut ParticlePool) -> usize {
        let open: Vec<SlotId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| (!s.filled).then_some(i))
            .collect();

        let r2 = self.cfg.capture_radius * self.cfg.capture_radius;
        let mut claimed: Vec<usize> = Vec::new();
        let mut captures = 0;

        for slot_id in open.into_iter().take(self.cfg.slots_per_tick) {
            let slot = self.slots[slot_id];
            let candidate = slot.target(self.cfg.spacing);

            // Nearest unclaimed particle within the capture radius.
            let mut best: Option<(usize, f32)> = None;
            for (i, p) in pool.particles.iter().enumerate() {
                if claimed.contains(&i) {
                    continue;
                }
                let d2 = (p.pos - candidate).length_squared();
                if d2 <= r2 && best.is_none_or(|(_, bd2)| d2 < bd2) {
                    best = Some((i, d2));
                }
            }
            let Some((particle_idx, _)) = best else {
                continue;
            };

            claimed.push(particle_idx);
            self.slots[slot_id].filled = true;
            let spawned = self.spawn_slots_around(candidate, slot.dir);
            self.lattice.push(LatticeParticle {
                pos: candidate,
                source_slot: slot_id,
                spawned_slots: spawned,
                drawable: true,
            });
            captures += 1;
        }

        remove_descending(&mut pool.particles, claimed);
        captures
    }

    /// Opens new slots around a freshly placed lattice particle.
    ///
    /// Directions are spaced evenly by `TAU / branch_count` starting
    /// from the incoming slot's angle. A direction is skipped when it
    /// folds back onto the incoming slot, or when its target would land
    /// within `spacing * min_distance_factor` of an existing lattice
    /// particle or an existing unfilled slot's target.
    fn spawn_slots_around(&mut self, anchor: Vec2, incoming: Vec2) -> Vec<SlotId> {
        let base = incoming.to_angle();
        let min_d = self.cfg.spacing * self.cfg.min_distance_factor;
        let min_d2 = min_d * min_d;
        let mut spawned = Vec::new();

        for k in 0..self.branch_count {
            let dir = Vec2::from_angle(base + k as f32 * TAU / self.branch_count as f32);
            if dir.dot(-incoming) > self.cfg.fold_back_dot {
                continue;
            }

            let target = anchor + dir * self.cfg.spacing;
            let near_lattice = self
                .lattice
                .iter()
                .any(|l| (l.pos - target).length_squared() < min_d2);
            let near_open_slot = self.slots.iter().any(|s| {
                !s.filled && (s.target(self.cfg.spacing) - target).length_squared() < min_d2
            });
            if near_lattice || near_open_slot {
                continue;
            }

            let id = self.slots.len();
            self.slots.push(FrontierSlot {
                anchor,
                dir,
                filled: false,
            });
            spawned.push(id);
        }
        spawned
    }
}
