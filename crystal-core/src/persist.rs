//! Run-scoped, append-only persistence for completed crystal shapes.
//!
//! Each run writes a `run_<unix>` directory containing a single
//! `shapes.json` that is rewritten whenever a shape is appended. Field
//! names match the downstream renderer's reader: `run_id`, and per
//! shape `index`, `saved_unix`, `color{r,g,b,a}`, `points[{x,y}]`.
//!
//! Store failures are never fatal to the simulation: callers are
//! expected to log the error and carry on without persistence.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shape store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("shape store encode: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShapeColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShapePoint {
    pub x: f32,
    pub y: f32,
}

/// One completed shape: an increasing index, a timestamp, a color tag,
/// and the ordered boundary vertices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub index: u32,
    pub saved_unix: f64,
    pub color: ShapeColor,
    pub points: Vec<ShapePoint>,
}

#[derive(Serialize)]
struct RunFile<'a> {
    run_id: &'a str,
    shapes: &'a [ShapeRecord],
}

/// Append-only shape store for one simulation run.
#[derive(Debug)]
pub struct ShapeStore {
    dir: PathBuf,
    run_id: String,
    records: Vec<ShapeRecord>,
}

impl ShapeStore {
    /// Creates `root/run_<unix_secs>/` and an empty record list.
    pub fn create(root: &Path) -> Result<Self, StoreError> {
        let run_id = format!("run_{}", unix_now() as u64);
        let dir = root.join(&run_id);
        fs::create_dir_all(&dir)?;
        log::info!("shape store at {}", dir.display());
        Ok(Self {
            dir,
            run_id,
            records: Vec::new(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a shape and rewrites `shapes.json`. The record index is
    /// 1-based and strictly increasing within the run.
    pub fn push(&mut self, points: &[Vec2], color: [f32; 4]) -> Result<(), StoreError> {
        let record = ShapeRecord {
            index: self.records.len() as u32 + 1,
            saved_unix: unix_now(),
            color: ShapeColor {
                r: color[0],
                g: color[1],
                b: color[2],
                a: color[3],
            },
            points: points.iter().map(|p| ShapePoint { x: p.x, y: p.y }).collect(),
        };
        self.records.push(record);
        self.write()
    }

    fn write(&self) -> Result<(), StoreError> {
        let file = RunFile {
            run_id: &self.run_id,
            shapes: &self.records,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(self.dir.join("shapes.json"), json)?;
        Ok(())
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
