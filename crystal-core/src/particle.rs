//! Free particles, boundary emitters, and the pool that drives them.
//!
//! The pool is the simulation side of the engine: emitters seeded from
//! the current boundary polygon produce particles, the pool integrates
//! and damps them, applies the O(n²) pairwise interaction, applies the
//! mode-dependent force, and culls expired particles in one batch at
//! the end of each tick.

use crate::config::{GrowthMode, PoolConfig};
use crate::geometry;
use crate::types::EmitterId;
use glam::Vec2;
use rand::Rng;

/// A single emitted unit of growth material.
#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub age: f32,
    pub lifetime: f32,
    pub damping: f32,
    pub interaction_radius: f32,
    /// Emitter that produced this particle, if it still has one.
    pub emitter: Option<EmitterId>,
}

impl Particle {
    pub fn expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

/// A fixed emitter on the boundary with a biased outward direction.
///
/// Emitters are regenerated in full whenever the boundary polygon
/// changes: one per vertex and one per edge midpoint. Each emitter
/// remembers the boundary segments adjacent to it so growth-mode
/// particles can be pulled back toward the shape.
#[derive(Clone, Debug)]
pub struct EmissionPoint {
    pub pos: Vec2,
    /// Outward emission angle in radians.
    pub angle: f32,
    pub angle_jitter: f32,
    /// Radius used for local density queries around this emitter.
    pub crowd_size: f32,
    /// One segment for midpoint emitters, two for vertex emitters.
    pub segments: Vec<(Vec2, Vec2)>,
}

/// Owns all live particles and emission points and steps them each tick.
#[derive(Debug)]
pub struct ParticlePool {
    pub particles: Vec<Particle>,
    pub emitters: Vec<EmissionPoint>,
    pub cfg: PoolConfig,
    centroid: Vec2,
    emit_timer: f32,
}

impl ParticlePool {
    pub fn new(cfg: PoolConfig) -> Self {
        Self {
            particles: Vec::new(),
            emitters: Vec::new(),
            cfg,
            centroid: Vec2::ZERO,
            emit_timer: cfg.emit_period,
        }
    }

    /// Regenerates all emission points for a new boundary polygon:
    /// one per vertex (adjacent segments = both incident edges) and one
    /// per edge midpoint (adjacent segment = the owning edge). Existing
    /// particles keep flying but lose nothing; their emitter indices
    /// stay valid because the emitter count only depends on the vertex
    /// count, which the caller controls.
    pub fn set_boundary(&mut self, boundary: &[Vec2]) {
        self.centroid = geometry::centroid(boundary);
        self.emitters.clear();
        let n = boundary.len();
        if n < 3 {
            return;
        }

        for i in 0..n {
            let prev = boundary[(i + n - 1) % n];
            let curr = boundary[i];
            let next = boundary[(i + 1) % n];

            self.emitters.push(self.make_emitter(
                curr,
                vec![(prev, curr), (curr, next)],
            ));

            let mid = (curr + next) * 0.5;
            self.emitters.push(self.make_emitter(mid, vec![(curr, next)]));
        }
    }

    fn make_emitter(&self, pos: Vec2, segments: Vec<(Vec2, Vec2)>) -> EmissionPoint {
        let angle = (pos - self.centroid).normalize_or_zero().to_angle();
        EmissionPoint {
            pos,
            angle,
            angle_jitter: self.cfg.angle_jitter,
            crowd_size: self.cfg.crowd_size,
            segments,
        }
    }

    /// Discards all live particles.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Number of live particles within `radius` of `pos`.
    pub fn crowd_count(&self, pos: Vec2, radius: f32) -> usize {
        let r2 = radius * radius;
        self.particles
            .iter()
            .filter(|p| (p.pos - pos).length_squared() <= r2)
            .count()
    }

    /// Advances the pool by one tick.
    ///
    /// Order within the tick:
    /// 1. Emission (countdown timer, one particle per emitter on expiry,
    ///    speed scaled by the emitter's local crowd).
    /// 2. Integration: `pos += vel * dt`, `age += dt`, exponential
    ///    damping `vel -= vel * damping * dt`.
    /// 3. Pairwise interaction over all unordered pairs.
    /// 4. Mode force: segment attraction in [`GrowthMode::Growth`],
    ///    radial outward push in [`GrowthMode::Crystallizing`].
    /// 5. Batch cull of expired / dead-zone particles, by descending
    ///    index so earlier removals cannot invalidate later ones.
    pub fn step(&mut self, dt: f32, mode: GrowthMode, rng: &mut impl Rng) {
        self.emit(dt, rng);
        let dead = self.integrate(dt);
        self.interact(dt);
        self.apply_mode_force(dt, mode);
        remove_descending(&mut self.particles, dead);
    }

    fn emit(&mut self, dt: f32, rng: &mut impl Rng) {
        self.emit_timer -= dt;
        if self.emit_timer > 0.0 {
            return;
        }
        self.emit_timer += self.cfg.emit_period;

        // One vertical bias shared by the whole batch; purely cosmetic.
        let batch_bias = (rng.random::<f32>() - 0.5) * self.cfg.batch_bias;

        let mut spawned = Vec::with_capacity(self.emitters.len());
        for (id, e) in self.emitters.iter().enumerate() {
            let crowd = self.crowd_count(e.pos, e.crowd_size + self.cfg.interaction_radius);
            let speed = self.cfg.base_speed + crowd as f32 * self.cfg.crowd_multiplier;
            let angle = e.angle + (rng.random::<f32>() - 0.5) * 2.0 * e.angle_jitter;

            let mut vel = Vec2::from_angle(angle) * speed;
            vel.y += batch_bias;

            spawned.push(Particle {
                pos: e.pos,
                vel,
                age: 0.0,
                lifetime: self.cfg.lifetime,
                damping: self.cfg.damping,
                interaction_radius: self.cfg.interaction_radius,
                emitter: Some(id),
            });
        }
        self.particles.extend(spawned);
    }

    /// Moves and ages every particle, returning the indices to cull.
    fn integrate(&mut self, dt: f32) -> Vec<usize> {
        let mut dead = Vec::new();
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.pos += p.vel * dt;
            p.age += dt;
            p.vel -= p.vel * p.damping * dt;

            let below_floor = self
                .cfg
                .dead_zone_min_y
                .is_some_and(|min_y| p.pos.y < min_y);
            if p.expired() || below_floor {
                dead.push(i);
            }
        }
        dead
    }

    /// Symmetric pairwise impulse: intensity falls linearly from 1 at
    /// contact to 0 at the interaction radius. Positive force constants
    /// push pairs apart. Coincident particles are left alone.
    fn interact(&mut self, dt: f32) {
        let n = self.particles.len();
        for i in 0..n {
            let r = self.particles[i].interaction_radius;
            let r2 = r * r;
            for j in (i + 1)..n {
                let delta = self.particles[j].pos - self.particles[i].pos;
                let d2 = delta.length_squared();
                if d2 >= r2 || d2 <= f32::EPSILON {
                    continue;
                }
                let d = d2.sqrt();
                let intensity = 1.0 - d / r;
                let impulse = (delta / d) * intensity * self.cfg.interaction_force * dt;
                self.particles[i].vel -= impulse;
                self.particles[j].vel += impulse;
            }
        }
    }

    fn apply_mode_force(&mut self, dt: f32, mode: GrowthMode) {
        match mode {
            GrowthMode::Growth => {
                for i in 0..self.particles.len() {
                    let pos = self.particles[i].pos;
                    let Some(id) = self.particles[i].emitter else {
                        continue;
                    };
                    let Some(e) = self.emitters.get(id) else {
                        continue;
                    };

                    // Nearest point across the emitter's adjacent segments.
                    let mut best: Option<(Vec2, f32)> = None;
                    for &(a, b) in &e.segments {
                        let q = geometry::closest_point_on_segment(pos, a, b);
                        let d2 = (q - pos).length_squared();
                        if best.is_none_or(|(_, bd2)| d2 < bd2) {
                            best = Some((q, d2));
                        }
                    }
                    if let Some((q, _)) = best {
                        let dir = (q - pos).normalize_or_zero();
                        self.particles[i].vel += dir * self.cfg.shape_attraction * dt;
                    }
                }
            }
            GrowthMode::Crystallizing => {
                let centroid = self.centroid;
                for p in &mut self.particles {
                    let dir = (p.pos - centroid).normalize_or_zero();
                    p.vel += dir * self.cfg.outward_accel * dt;
                }
            }
        }
    }
}

/// Removes the given indices from `items` in one batch, highest index
/// first, so no removal shifts a later target.
pub fn remove_descending<T>(items: &mut Vec<T>, mut indices: Vec<usize>) {
    indices.sort_unstable();
    indices.dedup();
    for i in indices.into_iter().rev() {
        if i < items.len() {
            items.remove(i);
        }
    }
}
