//! Geographic utilities: great-circle distance and bounds.

use geo::{BoundingRect, Coord, LineString};

use crate::{Bounds, GpsPoint};

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle surface distance between two points in meters (haversine).
///
/// The intermediate haversine term is clamped to `[0, 1]` so coincident
/// points return exactly `0.0` and antipodal points never produce NaN from
/// rounding past the domain of `asin`.
///
/// # Example
/// ```
/// use track_profile::GpsPoint;
/// use track_profile::geo_utils::haversine_distance;
///
/// let a = GpsPoint::new(0.0, 0.0);
/// let b = GpsPoint::new(0.0, 1.0);
/// let d = haversine_distance(&a, &b);
/// assert!((d - 111_195.0).abs() < 50.0);
/// ```
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let d_phi = (p2.latitude - p1.latitude).to_radians();
    let d_lambda = (p2.longitude - p1.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Bounding box of a set of points, or `None` when there are none.
pub fn compute_bounds<'a, I>(points: I) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a GpsPoint>,
{
    let coords: Vec<Coord> = points
        .into_iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let rect = LineString::new(coords).bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_at_equator() {
        let d = haversine_distance(&GpsPoint::new(0.0, 0.0), &GpsPoint::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn test_haversine_coincident_is_zero() {
        for p in [
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(-89.9999, 179.9999),
            GpsPoint::new(90.0, 0.0),
        ] {
            assert_eq!(haversine_distance(&p, &p), 0.0);
        }
    }

    #[test]
    fn test_haversine_symmetric() {
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let d1 = haversine_distance(&london, &paris);
        let d2 = haversine_distance(&paris, &london);
        assert_eq!(d1, d2);
        // London to Paris is about 344 km
        assert!(d1 > 340_000.0 && d1 < 350_000.0);
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let d = haversine_distance(&GpsPoint::new(0.0, 0.0), &GpsPoint::new(0.0, 180.0));
        assert!(d.is_finite());
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half_circumference).abs() < 1.0);

        let d = haversine_distance(&GpsPoint::new(90.0, 0.0), &GpsPoint::new(-90.0, 0.0));
        assert!((d - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_compute_bounds() {
        let points = vec![
            GpsPoint::new(46.0, 7.0),
            GpsPoint::new(46.5, 6.5),
            GpsPoint::new(45.9, 7.2),
        ];
        let bounds = compute_bounds(&points).unwrap();
        assert_eq!(bounds.min_lat, 45.9);
        assert_eq!(bounds.max_lat, 46.5);
        assert_eq!(bounds.min_lng, 6.5);
        assert_eq!(bounds.max_lng, 7.2);

        let empty: Vec<GpsPoint> = vec![];
        assert!(compute_bounds(&empty).is_none());
    }
}
