/// Identifier for an emission point in a [`crate::particle::ParticlePool`].
///
/// This is an index into `ParticlePool::emitters`, and is only meaningful
/// until the emitters are regenerated for a new boundary polygon.
pub type EmitterId = usize;

/// Identifier for a frontier slot in a [`crate::frontier::CrystalEngine`].
///
/// This is an index into `CrystalEngine::slots`, and is only meaningful
/// within the crystallization episode that created it.
pub type SlotId = usize;
