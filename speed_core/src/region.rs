//! Calibration geometry: the pixel quadrilateral drawn by the user and the
//! real-world rectangle it stands for.
//!
//! # Region file format
//! A JSON array whose first element is the calibration polygon, written as
//! exactly four `[x, y]` pixel pairs:
//!
//! ```json
//! [[[812, 305], [1108, 305], [1690, 1010], [236, 1010]]]
//! ```
//!
//! Further elements (other zones drawn in the same tool) are ignored.
//! Fractional coordinates are truncated to whole pixels.

use crate::error::{require_positive, CalibrationError, Result};
use crate::types::PixelPoint;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative tolerance for the degeneracy checks (sine of the smallest angle).
const DEGENERACY_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// CalibrationRegion
// ---------------------------------------------------------------------------

/// Four pixel points, ordered to match the ground rectangle corners
/// (top-left, top-right, bottom-right, bottom-left or any consistent winding).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct CalibrationRegion {
    corners: [PixelPoint; 4],
}

impl CalibrationRegion {
    /// Validate and build a region. Fails on duplicate or collinear points.
    pub fn new(corners: [PixelPoint; 4]) -> Result<Self> {
        for (i, p) in corners.iter().enumerate() {
            if !p.is_finite() {
                return Err(CalibrationError::NonFinite(i).into());
            }
        }

        for i in 0..4 {
            for j in (i + 1)..4 {
                let dx = corners[j].x - corners[i].x;
                let dy = corners[j].y - corners[i].y;
                if dx.hypot(dy) <= DEGENERACY_EPS {
                    return Err(CalibrationError::DuplicatePoints(i, j).into());
                }
            }
        }

        for (a, b, c) in [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)] {
            if collinear(&corners[a], &corners[b], &corners[c]) {
                return Err(CalibrationError::CollinearPoints(a, b, c).into());
            }
        }

        Ok(Self { corners })
    }

    /// Build from a slice of `[x, y]` pairs; the slice must hold exactly 4.
    pub fn from_pairs(pairs: &[[f64; 2]]) -> Result<Self> {
        let corners: [PixelPoint; 4] = match pairs {
            [a, b, c, d] => [(*a).into(), (*b).into(), (*c).into(), (*d).into()],
            _ => return Err(CalibrationError::WrongPointCount(pairs.len()).into()),
        };
        Self::new(corners)
    }

    /// Parse the region file format (see module docs).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let zones: Vec<Vec<[f64; 2]>> = serde_json::from_str(json)
            .map_err(|e| CalibrationError::Malformed(e.to_string()))?;
        let first = zones
            .first()
            .ok_or_else(|| CalibrationError::Malformed("no region in file".into()))?;
        let pixels: Vec<[f64; 2]> = first.iter().map(|p| [p[0].trunc(), p[1].trunc()]).collect();
        Self::from_pairs(&pixels)
    }

    /// Read and parse a region file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let region = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), corners = ?region.corners, "loaded calibration region");
        Ok(region)
    }

    pub fn corners(&self) -> &[PixelPoint; 4] {
        &self.corners
    }

    /// Point-in-polygon test (even-odd rule). Points on an edge may go either way.
    pub fn contains(&self, p: PixelPoint) -> bool {
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let (a, b) = (self.corners[i], self.corners[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl TryFrom<Vec<[f64; 2]>> for CalibrationRegion {
    type Error = crate::Error;

    fn try_from(pairs: Vec<[f64; 2]>) -> Result<Self> {
        Self::from_pairs(&pairs)
    }
}

impl From<CalibrationRegion> for Vec<[f64; 2]> {
    fn from(region: CalibrationRegion) -> Self {
        region.corners.iter().map(|p| [p.x, p.y]).collect()
    }
}

fn collinear(a: &PixelPoint, b: &PixelPoint, c: &PixelPoint) -> bool {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (acx, acy) = (c.x - a.x, c.y - a.y);
    let cross = abx * acy - aby * acx;
    cross.abs() <= DEGENERACY_EPS * abx.hypot(aby) * acx.hypot(acy)
}

// ---------------------------------------------------------------------------
// GroundRectangle
// ---------------------------------------------------------------------------

/// The real-world rectangle the region maps onto, in ground units.
///
/// Corners: (0, 0), (W, 0), (W, L), (0, L).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundRectangle {
    pub width: f64,
    pub length: f64,
}

impl GroundRectangle {
    pub fn new(width: f64, length: f64) -> Result<Self> {
        Ok(Self {
            width: require_positive("real width", width)?,
            length: require_positive("real length", length)?,
        })
    }

    /// Corners in the same order as the calibration region.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [0.0, 0.0],
            [self.width, 0.0],
            [self.width, self.length],
            [0.0, self.length],
        ]
    }

    /// True when (x, y) lies inside the rectangle (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.length).contains(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigurationError, Error};

    fn pts(raw: [[f64; 2]; 4]) -> [PixelPoint; 4] {
        raw.map(PixelPoint::from)
    }

    #[test]
    fn accepts_a_road_trapezoid() {
        let region = CalibrationRegion::new(pts([
            [812., 305.],
            [1108., 305.],
            [1690., 1010.],
            [236., 1010.],
        ]))
        .unwrap();
        assert_eq!(region.corners()[2], PixelPoint::new(1690., 1010.));
    }

    #[test]
    fn rejects_three_collinear_points() {
        let err = CalibrationRegion::new(pts([[0., 0.], [50., 0.], [100., 0.], [0., 100.]]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Calibration(CalibrationError::CollinearPoints(0, 1, 2))
        ));
    }

    #[test]
    fn rejects_duplicate_points() {
        let err = CalibrationRegion::new(pts([[0., 0.], [100., 0.], [100., 0.], [0., 100.]]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Calibration(CalibrationError::DuplicatePoints(1, 2))
        ));
    }

    #[test]
    fn rejects_non_finite_points() {
        let err = CalibrationRegion::new(pts([[0., 0.], [f64::NAN, 0.], [100., 100.], [0., 100.]]))
            .unwrap_err();
        assert!(matches!(err, Error::Calibration(CalibrationError::NonFinite(1))));
    }

    #[test]
    fn parses_first_zone_of_region_file() {
        let json = "[[[812, 305], [1108, 305], [1690, 1010], [236, 1010]], [[0, 0], [1, 1]]]";
        let region = CalibrationRegion::from_json_str(json).unwrap();
        assert_eq!(region.corners()[0], PixelPoint::new(812., 305.));
    }

    #[test]
    fn region_file_coordinates_are_truncated() {
        let json = "[[[10.9, 20.2], [110.5, 20.0], [110.0, 120.7], [10.0, 120.0]]]";
        let region = CalibrationRegion::from_json_str(json).unwrap();
        assert_eq!(region.corners()[0], PixelPoint::new(10., 20.));
        assert_eq!(region.corners()[2], PixelPoint::new(110., 120.));
    }

    #[test]
    fn malformed_region_files_are_calibration_errors() {
        for json in [
            "{}",
            "[]",
            "[[[0, 0], [1, 0], [1, 1]]]",
            "[[[0, 0], [1, 0], [1, 1], [0, 1], [2, 2]]]",
            "[[[0, \"a\"], [1, 0], [1, 1], [0, 1]]]",
        ] {
            let err = CalibrationRegion::from_json_str(json).unwrap_err();
            assert!(
                matches!(err, Error::Calibration(_)),
                "expected calibration error for {json}"
            );
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CalibrationRegion::load(Path::new("/nonexistent/region.json")).unwrap_err();
        assert!(matches!(err, Error::Calibration(CalibrationError::Io { .. })));
    }

    #[test]
    fn load_reads_region_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region.json");
        std::fs::write(&path, "[[[0, 0], [730, 0], [730, 5000], [0, 5000]]]").unwrap();
        let region = CalibrationRegion::load(&path).unwrap();
        assert_eq!(region.corners()[1], PixelPoint::new(730., 0.));
    }

    #[test]
    fn contains_uses_polygon_interior() {
        let region =
            CalibrationRegion::new(pts([[100., 0.], [200., 0.], [300., 100.], [0., 100.]])).unwrap();
        assert!(region.contains(PixelPoint::new(150., 50.)));
        assert!(region.contains(PixelPoint::new(20., 90.)));
        assert!(!region.contains(PixelPoint::new(20., 10.)));
        assert!(!region.contains(PixelPoint::new(150., 150.)));
    }

    #[test]
    fn serde_round_trip_validates() {
        let bad: std::result::Result<CalibrationRegion, _> =
            serde_json::from_str("[[0, 0], [1, 1], [2, 2], [0, 5]]");
        assert!(bad.is_err());
    }

    #[test]
    fn ground_rectangle_requires_positive_sides() {
        let rect = GroundRectangle::new(730.0, 5000.0).unwrap();
        assert_eq!(rect.corners()[2], [730.0, 5000.0]);
        assert!(rect.contains(365.0, 2500.0));
        assert!(!rect.contains(-1.0, 2500.0));

        let err = GroundRectangle::new(0.0, 5000.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::NonPositive { name: "real width", .. })
        ));
        assert!(GroundRectangle::new(730.0, -5.0).is_err());
    }
}
