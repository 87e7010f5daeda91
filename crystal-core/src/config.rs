use glam::Vec2;

/// Behavior applied to free particles each tick.
///
/// Passed explicitly into [`crate::particle::ParticlePool::step`] so the
/// step function stays pure with respect to global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthMode {
    /// Particles are pulled toward the boundary segments adjacent to
    /// their parent emission point.
    Growth,
    /// Particles receive a radial outward acceleration away from the
    /// boundary centroid, feeding the frontier.
    Crystallizing,
}

/// Tunables for the particle pool.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Seconds between emission batches.
    pub emit_period: f32,
    /// Base emission speed before crowd scaling.
    pub base_speed: f32,
    /// Extra speed per live particle crowding the emitter.
    pub crowd_multiplier: f32,
    /// Radius contribution of the emitter itself when counting its crowd.
    pub crowd_size: f32,
    /// Half-width of the uniform angular jitter applied per emitted particle.
    pub angle_jitter: f32,
    /// Magnitude of the random vertical bias shared by one emission batch.
    pub batch_bias: f32,
    /// Particle lifetime in seconds.
    pub lifetime: f32,
    /// Exponential velocity damping coefficient.
    pub damping: f32,
    /// Pairwise interaction radius.
    pub interaction_radius: f32,
    /// Pairwise force constant; positive pushes particles apart,
    /// negative pulls them together.
    pub interaction_force: f32,
    /// Acceleration toward the parent emitter's boundary segments
    /// while in [`GrowthMode::Growth`].
    pub shape_attraction: f32,
    /// Radial acceleration away from the centroid while in
    /// [`GrowthMode::Crystallizing`].
    pub outward_accel: f32,
    /// Optional world-space floor; particles below it are culled.
    /// Scene-specific, disabled by default.
    pub dead_zone_min_y: Option<f32>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            emit_period: 0.1,
            base_speed: 18.0,
            crowd_multiplier: 1.5,
            crowd_size: 12.0,
            angle_jitter: 0.35,
            batch_bias: 6.0,
            lifetime: 6.0,
            damping: 0.6,
            interaction_radius: 6.0,
            interaction_force: 25.0,
            shape_attraction: 40.0,
            outward_accel: 30.0,
            dead_zone_min_y: None,
        }
    }
}

/// Tunables for the crystallization engine.
#[derive(Clone, Copy, Debug)]
pub struct CrystalConfig {
    /// Lattice spacing: distance from a slot anchor to its capture
    /// position, and between initial frontier samples.
    pub spacing: f32,
    /// Maximum distance from a capture position at which a free
    /// particle can be claimed.
    pub capture_radius: f32,
    /// Maximum number of unfilled slots visited per tick.
    pub slots_per_tick: usize,
    /// New slots must land at least `spacing * min_distance_factor`
    /// away from existing lattice particles and open slot targets.
    pub min_distance_factor: f32,
    /// Directions folding back onto the incoming slot (dot with the
    /// reversed incoming direction above this) are skipped.
    pub fold_back_dot: f32,
    /// Seconds without a capture before the episode completes.
    pub quiescence_timeout: f32,
    /// Inclusive range for the per-episode branch count draw.
    pub branch_min: usize,
    pub branch_max: usize,
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            spacing: 20.0,
            capture_radius: 12.0,
            slots_per_tick: 24,
            min_distance_factor: 0.8,
            fold_back_dot: 0.95,
            quiescence_timeout: 1.5,
            branch_min: 2,
            branch_max: 6,
        }
    }
}

/// Tunables for perimeter reconstruction.
#[derive(Clone, Copy, Debug)]
pub struct RebuildConfig {
    /// Target maximum vertex count of the reconstructed polygon.
    pub max_vertices: usize,
    /// Angular sector count clamp for the radial envelope.
    pub min_sectors: usize,
    pub max_sectors: usize,
    /// Outward bias added to previous-boundary samples.
    pub outward_bias: f32,
    /// Fraction of `outward_bias` applied to open-slot targets.
    pub slot_bias_factor: f32,
    /// Neighbor-edge dot product above which a point counts as collinear.
    pub collinear_dot: f32,
    /// Maximum perpendicular deviation for collinear removal.
    pub collinear_deviation: f32,
    /// Minimum distance between consecutive kept points.
    pub min_point_spacing: f32,
    /// Minimum clearance of output vertices from the previous boundary.
    pub min_clearance: f32,
    /// Outward step size when pushing a vertex clear of the previous
    /// boundary, and the step budget per vertex.
    pub push_step: f32,
    pub max_push_steps: usize,
    /// Candidate area below `ratio * previous area` triggers rescaling
    /// by `sqrt(prev / candidate) * scale`.
    pub area_guard_ratio: f32,
    pub area_guard_scale: f32,
    /// Merge threshold for the hull fallback, as a fraction of spacing.
    pub hull_merge_frac: f32,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            max_vertices: 24,
            min_sectors: 24,
            max_sectors: 96,
            outward_bias: 4.0,
            slot_bias_factor: 0.5,
            collinear_dot: 0.995,
            collinear_deviation: 0.75,
            min_point_spacing: 6.0,
            min_clearance: 2.0,
            push_step: 2.0,
            max_push_steps: 48,
            area_guard_ratio: 0.995,
            area_guard_scale: 1.01,
            hull_merge_frac: 0.25,
        }
    }
}

/// Convenience: a unit square boundary of the given half extent,
/// counter-clockwise, centered on the origin.
pub fn square_boundary(half: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(-half, -half),
        Vec2::new(half, -half),
        Vec2::new(half, half),
        Vec2::new(-half, half),
    ]
}
