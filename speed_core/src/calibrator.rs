//! PlaneCalibrator: pixel anchors → integer ground coordinates.

use crate::error::Result;
use crate::homography::Homography;
use crate::region::{CalibrationRegion, GroundRectangle};
use crate::types::{GroundPoint, PixelPoint};
use std::path::Path;

/// Owns the fixed perspective transform of a session.
///
/// Read-only after construction, so it can be shared between threads freely.
#[derive(Clone, Debug)]
pub struct PlaneCalibrator {
    region: CalibrationRegion,
    ground: GroundRectangle,
    to_ground: Homography,
    to_image: Homography,
}

impl PlaneCalibrator {
    /// Build the calibrator from a validated region and the real-world size
    /// (same units as the output, e.g. centimeters) of the rectangle it covers.
    pub fn new(region: CalibrationRegion, real_width: f64, real_length: f64) -> Result<Self> {
        let ground = GroundRectangle::new(real_width, real_length)?;
        let src = (*region.corners()).map(|p| [p.x, p.y]);
        let to_ground = Homography::from_correspondences(&src, &ground.corners())?;
        let to_image = to_ground.inverse()?;

        tracing::info!(
            width = real_width,
            length = real_length,
            "plane calibration ready"
        );
        tracing::debug!(homography = ?to_ground.matrix(), "pixel to ground transform");

        Ok(Self {
            region,
            ground,
            to_ground,
            to_image,
        })
    }

    /// Convenience: load the region file and build the calibrator.
    pub fn from_region_file(path: &Path, real_width: f64, real_length: f64) -> Result<Self> {
        Self::new(CalibrationRegion::load(path)?, real_width, real_length)
    }

    /// Map one pixel point, truncating toward zero to whole ground units.
    pub fn map_point(&self, p: PixelPoint) -> GroundPoint {
        let [x, y] = self.to_ground.apply(p);
        GroundPoint::new(x as i64, y as i64)
    }

    /// Map a batch of pixel points. Empty input gives empty output.
    pub fn map_points(&self, points: &[PixelPoint]) -> Vec<GroundPoint> {
        points.iter().map(|&p| self.map_point(p)).collect()
    }

    /// Ground → pixel, full precision. Used to synthesise detections.
    pub fn project_to_image(&self, x: f64, y: f64) -> PixelPoint {
        let [u, v] = self.to_image.apply(PixelPoint::new(x, y));
        PixelPoint::new(u, v)
    }

    pub fn region(&self) -> &CalibrationRegion {
        &self.region
    }

    pub fn ground(&self) -> &GroundRectangle {
        &self.ground
    }

    pub fn homography(&self) -> &Homography {
        &self.to_ground
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CalibrationError, Error};
    use approx::assert_abs_diff_eq;

    fn road_calibrator() -> PlaneCalibrator {
        let region = CalibrationRegion::from_pairs(&[
            [812., 305.],
            [1108., 305.],
            [1690., 1010.],
            [236., 1010.],
        ])
        .unwrap();
        PlaneCalibrator::new(region, 730.0, 5000.0).unwrap()
    }

    #[test]
    fn calibration_corners_land_on_rectangle_corners() {
        let cal = road_calibrator();
        let expected = [[0, 0], [730, 0], [730, 5000], [0, 5000]];
        for (corner, want) in cal.region().corners().iter().zip(expected) {
            let got = cal.map_point(*corner);
            // Truncation may drop a unit when the float lands just below
            assert!((got.x - want[0]).abs() <= 1, "x {got:?} vs {want:?}");
            assert!((got.y - want[1]).abs() <= 1, "y {got:?} vs {want:?}");
        }
    }

    #[test]
    fn mapping_is_pure() {
        let cal = road_calibrator();
        let input = vec![
            PixelPoint::new(960.0, 600.0),
            PixelPoint::new(500.0, 900.5),
            PixelPoint::new(1200.25, 400.75),
        ];
        let first = cal.map_points(&input);
        let second = cal.map_points(&input);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn empty_input_maps_to_empty_output() {
        assert!(road_calibrator().map_points(&[]).is_empty());
    }

    #[test]
    fn mapped_coordinates_truncate_toward_zero() {
        // Scale 1 px -> 10 units on a square region: 0.57 px -> 5.7 -> 5
        let region =
            CalibrationRegion::from_pairs(&[[0., 0.], [100., 0.], [100., 100.], [0., 100.]])
                .unwrap();
        let cal = PlaneCalibrator::new(region, 1000.0, 1000.0).unwrap();
        let p = cal.map_point(PixelPoint::new(0.57, 99.99));
        assert_eq!(p.x, 5);
        assert_eq!(p.y, 999);
        // Outside the region on the negative side truncates toward zero too
        let n = cal.map_point(PixelPoint::new(-0.57, 10.0));
        assert_eq!(n.x, -5);
    }

    #[test]
    fn project_to_image_inverts_the_mapping() {
        let cal = road_calibrator();
        let p = cal.project_to_image(365.0, 2500.0);
        assert!(cal.region().contains(p));
        let back = cal.homography().apply(p);
        assert_abs_diff_eq!(back[0], 365.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back[1], 2500.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_region_never_builds_a_calibrator() {
        let err =
            CalibrationRegion::from_pairs(&[[0., 0.], [10., 10.], [20., 20.], [0., 30.]])
                .and_then(|r| PlaneCalibrator::new(r, 730.0, 5000.0))
                .unwrap_err();
        assert!(matches!(
            err,
            Error::Calibration(CalibrationError::CollinearPoints(..))
        ));
    }

    #[test]
    fn non_positive_sizes_are_configuration_errors() {
        let region =
            CalibrationRegion::from_pairs(&[[0., 0.], [100., 0.], [100., 100.], [0., 100.]])
                .unwrap();
        assert!(matches!(
            PlaneCalibrator::new(region.clone(), -730.0, 5000.0),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            PlaneCalibrator::new(region, 730.0, f64::NAN),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn calibrator_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<PlaneCalibrator>();
    }
}
