//! Fixed landmark schema and the landmark source capability.
//!
//! The core never runs a landmark model itself. A [`LandmarkSource`] hands it
//! raw points keyed by face-mesh index, and [`LandmarkSet::from_mesh`] picks the
//! semantic points the measurement and warp stages rely on. Left/right always
//! mean the image-space side, not the subject's.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VisionError};
use crate::geometry::{Midline, Point};

/// Semantic landmarks required for a complete face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    ForeheadTop,
    Glabella,
    Nasion,
    NoseTip,
    Subnasale,
    LeftAlar,
    RightAlar,
    LeftEyeOuter,
    RightEyeOuter,
    LeftEyeInner,
    RightEyeInner,
    LeftBrowPeak,
    RightBrowPeak,
    LeftCheek,
    RightCheek,
    LeftJawAngle,
    RightJawAngle,
    LeftMouth,
    RightMouth,
    Pogonion,
    Menton,
}

impl LandmarkId {
    pub const COUNT: usize = 21;

    pub const ALL: [LandmarkId; Self::COUNT] = [
        LandmarkId::ForeheadTop,
        LandmarkId::Glabella,
        LandmarkId::Nasion,
        LandmarkId::NoseTip,
        LandmarkId::Subnasale,
        LandmarkId::LeftAlar,
        LandmarkId::RightAlar,
        LandmarkId::LeftEyeOuter,
        LandmarkId::RightEyeOuter,
        LandmarkId::LeftEyeInner,
        LandmarkId::RightEyeInner,
        LandmarkId::LeftBrowPeak,
        LandmarkId::RightBrowPeak,
        LandmarkId::LeftCheek,
        LandmarkId::RightCheek,
        LandmarkId::LeftJawAngle,
        LandmarkId::RightJawAngle,
        LandmarkId::LeftMouth,
        LandmarkId::RightMouth,
        LandmarkId::Pogonion,
        LandmarkId::Menton,
    ];

    /// Bilateral landmarks as (image-left, image-right) pairs.
    pub const MIRROR_PAIRS: [(LandmarkId, LandmarkId); 7] = [
        (LandmarkId::LeftEyeOuter, LandmarkId::RightEyeOuter),
        (LandmarkId::LeftEyeInner, LandmarkId::RightEyeInner),
        (LandmarkId::LeftBrowPeak, LandmarkId::RightBrowPeak),
        (LandmarkId::LeftAlar, LandmarkId::RightAlar),
        (LandmarkId::LeftCheek, LandmarkId::RightCheek),
        (LandmarkId::LeftJawAngle, LandmarkId::RightJawAngle),
        (LandmarkId::LeftMouth, LandmarkId::RightMouth),
    ];

    /// Index of this landmark in the 468/478-point face mesh topology.
    pub const fn mesh_index(self) -> usize {
        match self {
            LandmarkId::ForeheadTop => 10,
            LandmarkId::Glabella => 9,
            LandmarkId::Nasion => 168,
            LandmarkId::NoseTip => 1,
            LandmarkId::Subnasale => 2,
            LandmarkId::LeftAlar => 64,
            LandmarkId::RightAlar => 294,
            LandmarkId::LeftEyeOuter => 33,
            LandmarkId::RightEyeOuter => 263,
            LandmarkId::LeftEyeInner => 133,
            LandmarkId::RightEyeInner => 362,
            LandmarkId::LeftBrowPeak => 105,
            LandmarkId::RightBrowPeak => 334,
            LandmarkId::LeftCheek => 50,
            LandmarkId::RightCheek => 280,
            LandmarkId::LeftJawAngle => 172,
            LandmarkId::RightJawAngle => 397,
            LandmarkId::LeftMouth => 61,
            LandmarkId::RightMouth => 291,
            LandmarkId::Pogonion => 175,
            LandmarkId::Menton => 152,
        }
    }
}

/// One detector output point. `z` is relative depth on the x scale, more
/// negative is closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

/// Detector output keyed by face-mesh index, possibly sparse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLandmarks {
    pub points: BTreeMap<usize, RawPoint>,
}

impl RawLandmarks {
    pub fn from_dense(points: Vec<RawPoint>) -> Self {
        Self {
            points: points.into_iter().enumerate().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Scale normalized [0, 1] coordinates to pixels. Depth follows the x scale.
    pub fn denormalize(mut self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        for p in self.points.values_mut() {
            p.x *= w;
            p.y *= h;
            p.z = p.z.map(|z| z * w);
        }
        self
    }
}

/// Complete set of required landmarks for one detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point; LandmarkId::COUNT],
    depth: Option<[f32; LandmarkId::COUNT]>,
}

impl LandmarkSet {
    /// Pick the required points out of raw detector output.
    ///
    /// Depth is kept only when every required point carries it.
    pub fn from_mesh(raw: &RawLandmarks) -> Result<Self> {
        let mut points = [Point::new(0.0, 0.0); LandmarkId::COUNT];
        let mut depth = [0.0f32; LandmarkId::COUNT];
        let mut has_depth = true;
        let mut missing = Vec::new();

        for id in LandmarkId::ALL {
            match raw.points.get(&id.mesh_index()) {
                Some(p) if p.x.is_finite() && p.y.is_finite() => {
                    points[id as usize] = Point::new(p.x, p.y);
                    match p.z {
                        Some(z) if z.is_finite() => depth[id as usize] = z,
                        _ => has_depth = false,
                    }
                }
                _ => missing.push(id),
            }
        }

        if !missing.is_empty() {
            return Err(VisionError::IncompleteLandmarks { missing });
        }

        Ok(Self {
            points,
            depth: has_depth.then_some(depth),
        })
    }

    pub fn get(&self, id: LandmarkId) -> Point {
        self.points[id as usize]
    }

    pub fn depth(&self, id: LandmarkId) -> Option<f32> {
        self.depth.map(|d| d[id as usize])
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Replace a single point, keeping everything else.
    pub fn with_point(mut self, id: LandmarkId, p: Point) -> Self {
        self.points[id as usize] = p;
        self
    }

    /// Attach relative depth to every landmark.
    pub fn with_depth(mut self, depth_of: impl Fn(LandmarkId) -> f32) -> Self {
        let mut depth = [0.0f32; LandmarkId::COUNT];
        for id in LandmarkId::ALL {
            depth[id as usize] = depth_of(id);
        }
        self.depth = Some(depth);
        self
    }

    /// Distance between the outer eye corners, the universal scale proxy.
    pub fn interocular_px(&self) -> f32 {
        self.get(LandmarkId::LeftEyeOuter)
            .distance(&self.get(LandmarkId::RightEyeOuter))
    }

    /// Facial midline through glabella and subnasale, extended over the face.
    pub fn midline(&self) -> Option<Midline> {
        Midline::new(self.get(LandmarkId::Glabella), self.get(LandmarkId::Subnasale))
    }

    /// Sparse mesh-indexed form, e.g. for writing a landmark file.
    pub fn to_raw(&self) -> RawLandmarks {
        let points = LandmarkId::ALL
            .iter()
            .map(|&id| {
                let p = self.get(id);
                (
                    id.mesh_index(),
                    RawPoint {
                        x: p.x,
                        y: p.y,
                        z: self.depth(id),
                    },
                )
            })
            .collect();
        RawLandmarks { points }
    }
}

/// Landmark inference capability.
///
/// Implementations are shared across concurrent analyses, so they must be
/// safe to call from several threads or serialise access internally.
pub trait LandmarkSource: Send + Sync {
    /// Locate the face landmarks in `image`. `Ok(None)` means no face was found.
    fn locate(&self, image: &DynamicImage) -> anyhow::Result<Option<RawLandmarks>>;
}

/// Always returns the same landmarks, regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarkSource {
    landmarks: Option<RawLandmarks>,
}

impl StaticLandmarkSource {
    pub fn new(landmarks: RawLandmarks) -> Self {
        Self {
            landmarks: Some(landmarks),
        }
    }

    pub fn from_set(set: &LandmarkSet) -> Self {
        Self::new(set.to_raw())
    }

    /// A source that never finds a face.
    pub fn no_face() -> Self {
        Self { landmarks: None }
    }
}

impl LandmarkSource for StaticLandmarkSource {
    fn locate(&self, _image: &DynamicImage) -> anyhow::Result<Option<RawLandmarks>> {
        Ok(self.landmarks.clone())
    }
}

/// A landmark tagged with its face-mesh index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

/// Point list of a landmark file: either explicitly indexed points or a dense
/// mesh-ordered array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointTable {
    Sparse(Vec<IndexedPoint>),
    Dense(Vec<RawPoint>),
}

/// On-disk landmark output of an external detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFile {
    /// Coordinates are in [0, 1] and must be scaled by the image size.
    #[serde(default)]
    pub normalized: bool,
    /// `null` or empty when the detector found no face.
    pub points: Option<PointTable>,
}

impl LandmarkFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_set(set: &LandmarkSet) -> Self {
        Self {
            normalized: false,
            points: Some(PointTable::Sparse(
                set.to_raw()
                    .points
                    .into_iter()
                    .map(|(index, p)| IndexedPoint {
                        index,
                        x: p.x,
                        y: p.y,
                        z: p.z,
                    })
                    .collect(),
            )),
        }
    }

    fn into_raw(self, width: u32, height: u32) -> Option<RawLandmarks> {
        let raw = match self.points? {
            PointTable::Dense(points) => RawLandmarks::from_dense(points),
            PointTable::Sparse(points) => RawLandmarks {
                points: points
                    .into_iter()
                    .map(|p| (p.index, RawPoint { x: p.x, y: p.y, z: p.z }))
                    .collect(),
            },
        };
        if raw.is_empty() {
            return None;
        }
        Some(if self.normalized {
            raw.denormalize(width, height)
        } else {
            raw
        })
    }
}

/// Reads landmarks produced out of process by a detector.
#[derive(Debug, Clone)]
pub struct FileLandmarkSource {
    path: PathBuf,
}

impl FileLandmarkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LandmarkSource for FileLandmarkSource {
    fn locate(&self, image: &DynamicImage) -> anyhow::Result<Option<RawLandmarks>> {
        let file = LandmarkFile::load(&self.path)?;
        let (width, height) = image.dimensions();
        let raw = file.into_raw(width, height);
        log::debug!(
            "loaded {} landmark(s) from {}",
            raw.as_ref().map_or(0, |r| r.points.len()),
            self.path.display()
        );
        Ok(raw)
    }
}

/// Canonical mirror-symmetric face with ideal proportions, centred in a
/// `width` x `height` image.
///
/// Coordinates are laid out on a unit face box spanning 80% of the shorter
/// image side.
pub fn reference_face(width: u32, height: u32) -> LandmarkSet {
    let size = width.min(height) as f32 * 0.8;
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let at = |u: f32, v: f32| Point::new(cx + u * size, cy + v * size);

    let mut points = [Point::new(0.0, 0.0); LandmarkId::COUNT];
    let mut set = |id: LandmarkId, p: Point| points[id as usize] = p;

    set(LandmarkId::ForeheadTop, at(0.0, -0.45));
    set(LandmarkId::Glabella, at(0.0, -0.17));
    set(LandmarkId::Nasion, at(0.0, -0.13));
    set(LandmarkId::NoseTip, at(0.0, 0.06));
    set(LandmarkId::Subnasale, at(0.0, 0.11));
    set(LandmarkId::LeftAlar, at(-0.085, 0.08));
    set(LandmarkId::RightAlar, at(0.085, 0.08));
    set(LandmarkId::LeftEyeOuter, at(-0.22, -0.08));
    set(LandmarkId::RightEyeOuter, at(0.22, -0.08));
    set(LandmarkId::LeftEyeInner, at(-0.08, -0.08));
    set(LandmarkId::RightEyeInner, at(0.08, -0.08));
    set(LandmarkId::LeftBrowPeak, at(-0.15, -0.20));
    set(LandmarkId::RightBrowPeak, at(0.15, -0.20));
    set(LandmarkId::LeftCheek, at(-0.24, 0.02));
    set(LandmarkId::RightCheek, at(0.24, 0.02));
    set(LandmarkId::LeftJawAngle, at(-0.30, 0.22));
    set(LandmarkId::RightJawAngle, at(0.30, 0.22));
    set(LandmarkId::LeftMouth, at(-0.10, 0.22));
    set(LandmarkId::RightMouth, at(0.10, 0.22));
    set(LandmarkId::Pogonion, at(0.0, 0.36));
    set(LandmarkId::Menton, at(0.0, 0.39));

    LandmarkSet {
        points,
        depth: None,
    }
}
