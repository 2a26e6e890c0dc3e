//! Integration tests: run full registration workflows against a synthetic
//! flat projection and verify the solved transforms and placements.

use georef::{
    Error, GeoPoint, ImageSource, MapProjector, PixelPoint, RegistrationSession, ScreenPoint,
    SessionState, TransformMode,
};

const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

/// Flat equirectangular projection, adequate at the city scales these
/// tests use. Screen space is +X east, +Y south, like a real map widget.
struct FlatProjector;

impl MapProjector for FlatProjector {
    fn project(&self, p: &GeoPoint) -> ScreenPoint {
        ScreenPoint {
            x: p.lng * 1e5,
            y: -p.lat * 1e5,
        }
    }

    fn distance(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        let dlat = b.lat - a.lat;
        let dlng = b.lng - a.lng;
        (dlat * dlat + dlng * dlng).sqrt() * METERS_PER_DEGREE
    }
}

fn session_with_image(mode: TransformMode, width: f64, height: f64) -> RegistrationSession {
    let mut session = RegistrationSession::new(mode);
    let ticket = session.begin_image_load();
    assert!(session.finish_image_load(
        ticket,
        ImageSource {
            width,
            height,
            display_scale: 1.0,
        },
    ));
    session
}

#[test]
fn test_two_point_workflow() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let mut session = session_with_image(TransformMode::TwoPoint, 1200.0, 800.0);

    session.add_image_point(PixelPoint::new(100.0, 400.0)).unwrap();
    session.add_image_point(PixelPoint::new(1100.0, 400.0)).unwrap();
    session.add_map_point(GeoPoint::new(35.68, 139.70));
    session.add_map_point(GeoPoint::new(35.68, 139.71));
    assert_eq!(session.state(), SessionState::Ready);

    let placement = session.apply(&FlatProjector).unwrap();
    assert_eq!(session.state(), SessionState::Applied);
    assert!(
        placement.raster_override.is_none(),
        "axis-aligned picks must not request a raster rotation"
    );

    // Both correspondences reproduced by the solved transform
    let transform = session.transform().expect("transform stored after apply");
    for (ip, mp) in [
        (PixelPoint::new(100.0, 400.0), GeoPoint::new(35.68, 139.70)),
        (PixelPoint::new(1100.0, 400.0), GeoPoint::new(35.68, 139.71)),
    ] {
        let g = transform.apply(&ip);
        assert!(
            (g.lat - mp.lat).abs() < 1e-6 && (g.lng - mp.lng).abs() < 1e-6,
            "correspondence not reproduced: expected ({}, {}), got ({}, {})",
            mp.lat,
            mp.lng,
            g.lat,
            g.lng,
        );
    }

    // 1000 px spans 0.01°: the bounds must be 1200 px = 0.012° wide,
    // corrected for cos(lat) on the longitude axis
    let ground_width_deg =
        1200.0 * (0.01 * METERS_PER_DEGREE / 1000.0) / (METERS_PER_DEGREE * 35.68_f64.to_radians().cos());
    let b = placement.bounds;
    assert!(
        ((b.northeast.lng - b.southwest.lng) - ground_width_deg).abs() < 1e-9,
        "bounds width: expected {:.6}, got {:.6}",
        ground_width_deg,
        b.northeast.lng - b.southwest.lng,
    );
}

#[test]
fn test_three_point_workflow() {
    let mut session = session_with_image(TransformMode::ThreePoint, 1000.0, 1000.0);

    // Plain scale + translation: x → lng, y → -lat at 0.0001°/px
    let image = [
        PixelPoint::new(0.0, 0.0),
        PixelPoint::new(1000.0, 0.0),
        PixelPoint::new(0.0, 1000.0),
    ];
    let map = [
        GeoPoint::new(35.1, 139.0),
        GeoPoint::new(35.1, 139.1),
        GeoPoint::new(35.0, 139.0),
    ];
    for p in image {
        session.add_image_point(p).unwrap();
    }
    for m in map {
        session.add_map_point(m);
    }

    let placement = session.apply(&FlatProjector).unwrap();
    let b = placement.bounds;
    assert!(
        (b.southwest.lat - 35.0).abs() < 1e-9
            && (b.southwest.lng - 139.0).abs() < 1e-9
            && (b.northeast.lat - 35.1).abs() < 1e-9
            && (b.northeast.lng - 139.1).abs() < 1e-9,
        "bounds: got SW ({}, {}), NE ({}, {})",
        b.southwest.lat,
        b.southwest.lng,
        b.northeast.lat,
        b.northeast.lng,
    );

    let mid = session
        .transform()
        .unwrap()
        .apply(&PixelPoint::new(500.0, 500.0));
    assert!(
        (mid.lat - 35.05).abs() < 1e-9 && (mid.lng - 139.05).abs() < 1e-9,
        "center pixel: got ({}, {})",
        mid.lat,
        mid.lng,
    );
}

#[test]
fn test_four_point_workflow() {
    let mut session = session_with_image(TransformMode::FourPoint, 1000.0, 800.0);

    let image = [
        PixelPoint::new(0.0, 0.0),
        PixelPoint::new(1000.0, 0.0),
        PixelPoint::new(1000.0, 800.0),
        PixelPoint::new(0.0, 800.0),
    ];
    // A quadrilateral with genuine perspective (not a parallelogram)
    let map = [
        GeoPoint::new(35.710, 139.700),
        GeoPoint::new(35.709, 139.713),
        GeoPoint::new(35.700, 139.711),
        GeoPoint::new(35.701, 139.702),
    ];
    for p in image {
        session.add_image_point(p).unwrap();
    }
    for m in map {
        session.add_map_point(m);
    }

    let placement = session.apply(&FlatProjector).unwrap();
    let transform = session.transform().unwrap();

    // All four corners reproduced exactly: this is the true 4-point solve,
    // not a 3-of-4 affine approximation (which would miss the 4th corner).
    for (ip, mp) in image.iter().zip(map.iter()) {
        let g = transform.apply(ip);
        assert!(
            (g.lat - mp.lat).abs() < 1e-6 && (g.lng - mp.lng).abs() < 1e-6,
            "corner not reproduced: expected ({}, {}), got ({}, {})",
            mp.lat,
            mp.lng,
            g.lat,
            g.lng,
        );
    }

    // Envelope covers every target point
    let b = placement.bounds;
    for mp in &map {
        assert!(
            mp.lat >= b.southwest.lat - 1e-9
                && mp.lat <= b.northeast.lat + 1e-9
                && mp.lng >= b.southwest.lng - 1e-9
                && mp.lng <= b.northeast.lng + 1e-9,
            "bounds must cover ({}, {})",
            mp.lat,
            mp.lng,
        );
    }
}

#[test]
fn test_large_rotation_raster_request_and_invalidation() {
    let mut session = session_with_image(TransformMode::TwoPoint, 1000.0, 600.0);

    // Image vector points right; map vector points north-east at 45° up
    // the screen, so the rotation is -45° and well past the threshold.
    session.add_image_point(PixelPoint::new(100.0, 300.0)).unwrap();
    session.add_image_point(PixelPoint::new(900.0, 300.0)).unwrap();
    session.add_map_point(GeoPoint::new(35.00, 139.00));
    session.add_map_point(GeoPoint::new(35.01, 139.01));

    let placement = session.apply(&FlatProjector).unwrap();
    let request = placement
        .raster_override
        .expect("45° rotation must request raster pre-rotation");
    assert!(
        (request.rotation_degrees + 45.0).abs() < 1e-9,
        "rotation: got {}",
        request.rotation_degrees,
    );
    let diag = (1000.0_f64 * 1000.0 + 600.0 * 600.0).sqrt().ceil();
    assert_eq!(request.canvas_width, diag);
    assert!(session.raster_still_wanted(request.epoch));

    // A mode change invalidates the outstanding raster job
    session.set_mode(TransformMode::ThreePoint);
    assert!(
        !session.raster_still_wanted(request.epoch),
        "mode change must drop in-flight raster results"
    );
}

#[test]
fn test_undo_across_full_cycle() {
    let mut session = session_with_image(TransformMode::ThreePoint, 500.0, 500.0);
    for p in [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)] {
        session.add_image_point(PixelPoint::new(p.0, p.1)).unwrap();
    }
    for m in [(35.0, 139.0), (35.0, 139.1), (34.9, 139.0)] {
        session.add_map_point(GeoPoint::new(m.0, m.1));
    }
    assert_eq!(session.state(), SessionState::Ready);

    // K undos drain the map points
    for expected_remaining in [2usize, 1, 0] {
        assert!(session.undo_last());
        assert_eq!(session.map_points().len(), expected_remaining);
        assert_eq!(session.state(), SessionState::CollectingMapPoints);
    }
    // The next undo starts on image points
    assert!(session.undo_last());
    assert_eq!(session.state(), SessionState::CollectingImagePoints);
    assert_eq!(session.image_points().len(), 2);
}

#[test]
fn test_coincident_two_point_picks_rejected() {
    let mut session = session_with_image(TransformMode::TwoPoint, 500.0, 500.0);
    session.add_image_point(PixelPoint::new(250.0, 250.0)).unwrap();
    session.add_image_point(PixelPoint::new(250.0, 250.0)).unwrap();
    session.add_map_point(GeoPoint::new(35.0, 139.0));
    session.add_map_point(GeoPoint::new(35.1, 139.1));

    let result = session.apply(&FlatProjector);
    assert!(
        matches!(result, Err(Error::DegenerateGeometry(_))),
        "coincident image picks leave the scale undefined"
    );
    assert_eq!(
        session.state(),
        SessionState::Ready,
        "session must stay Ready for a re-pick"
    );
}
