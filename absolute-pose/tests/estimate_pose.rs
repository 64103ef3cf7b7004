use absolute_pose::{
    estimate_calibrated_absolute_pose, CalibratedAbsolutePoseEstimator, ConsensusError,
    RansacParameters, RansacType, ReusableCalibratedAbsolutePoseEstimator,
};
use approx::relative_eq;
use cv_consensus::Estimator;
use cv_core::nalgebra::{
    IsometryMatrix3, Point2, Point3, Rotation3, Translation, Vector2, Vector3,
};
use cv_core::{
    CalibratedAbsolutePose, FeatureWorldMatch, NormalizedKeyPoint, WorldPoint, WorldToCamera,
};
use lambda_twist::LambdaTwist;
use quickcheck_macros::quickcheck;
use rand::{rngs::SmallRng, Rng, SeedableRng};

const ROUNDS: usize = 200;
const OUTLIER_EVERY: usize = 5;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn is_outlier(ix: usize) -> bool {
    ix % OUTLIER_EVERY == OUTLIER_EVERY - 1
}

/// A random camera a few units from the world origin.
fn some_pose(rng: &mut SmallRng) -> CalibratedAbsolutePose {
    WorldToCamera::from_parts(
        Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        ),
        Rotation3::new(Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )),
    )
    .into()
}

/// A random world point in front of the camera and the exact feature it is observed at.
fn some_match(rng: &mut SmallRng, pose: &CalibratedAbsolutePose) -> FeatureWorldMatch {
    let camera = Vector3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(2.0..5.0),
    );
    let feature = NormalizedKeyPoint((camera / camera.z).xy().into());
    let world = WorldPoint(pose.position + pose.rotation.inverse() * camera);
    FeatureWorldMatch(feature, world)
}

/// Replaces the feature with a random one.
fn wrong_feature(
    rng: &mut SmallRng,
    FeatureWorldMatch(_, world): FeatureWorldMatch,
) -> FeatureWorldMatch {
    let wrong = Point2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
    FeatureWorldMatch(NormalizedKeyPoint(wrong), world)
}

/// Replaces the world point with an unrelated one somewhere around the origin.
fn wrong_world_point(
    rng: &mut SmallRng,
    FeatureWorldMatch(feature, _): FeatureWorldMatch,
) -> FeatureWorldMatch {
    let wrong = Point3::new(
        rng.gen_range(-5.0..5.0),
        rng.gen_range(-5.0..5.0),
        rng.gen_range(-5.0..5.0),
    );
    FeatureWorldMatch(feature, WorldPoint(wrong))
}

/// Exact matches for `pose`, except that every fifth one is corrupted by `outlier`.
fn some_test_data(
    rng: &mut SmallRng,
    pose: &CalibratedAbsolutePose,
    num_matches: usize,
    outlier: fn(&mut SmallRng, FeatureWorldMatch) -> FeatureWorldMatch,
) -> Vec<FeatureWorldMatch> {
    (0..num_matches)
        .map(|ix| {
            let datum = some_match(rng, pose);
            if is_outlier(ix) {
                outlier(rng, datum)
            } else {
                datum
            }
        })
        .collect()
}

/// Offsets every feature by `noise` in a random direction.
fn add_noise(rng: &mut SmallRng, matches: &mut [FeatureWorldMatch], noise: f64) {
    for FeatureWorldMatch(feature, _) in matches {
        let direction = Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        feature.0 += direction * noise;
    }
}

fn close_to(pose: &CalibratedAbsolutePose, truth: &CalibratedAbsolutePose, epsilon: f64) -> bool {
    relative_eq!(pose.rotation, truth.rotation, epsilon = epsilon)
        && relative_eq!(pose.position, truth.position, epsilon = epsilon)
}

#[quickcheck]
fn exact_matches_have_zero_error(seed: u64) -> bool {
    let mut rng = SmallRng::seed_from_u64(seed);
    let pose = some_pose(&mut rng);
    let estimator = CalibratedAbsolutePoseEstimator::new();
    (0..10).all(|_| estimator.error(&some_match(&mut rng, &pose), &pose) < 1e-20)
}

#[test]
fn manual() {
    // Points in camera coordinates, all in front of the camera.
    let camera_points = [
        [-0.228_125, -0.061_458_334, 1.0],
        [0.418_75, -0.581_25, 2.0],
        [1.128_125, 0.878_125, 3.0],
    ]
    .map(Point3::from);

    let rotation = Rotation3::from_euler_angles(0.1, 0.2, 0.3);
    let translation = Translation::from(Vector3::new(0.1, 0.2, 0.3));
    let world_to_camera = IsometryMatrix3::from_parts(translation, rotation);
    let truth = CalibratedAbsolutePose::from(WorldToCamera(world_to_camera));

    let sample = camera_points.map(|p| {
        FeatureWorldMatch(
            NormalizedKeyPoint((p / p.z).xy()),
            WorldPoint(world_to_camera.inverse() * p),
        )
    });

    let estimator = CalibratedAbsolutePoseEstimator::new();
    let mut candidates = Vec::new();
    estimator.generate(&sample, &mut candidates);
    assert!(!candidates.is_empty() && candidates.len() <= 4);
    assert!(
        candidates.iter().any(|pose| {
            relative_eq!(pose.rotation, truth.rotation, epsilon = 1e-6)
                && relative_eq!(pose.position, truth.position, epsilon = 1e-6)
        }),
        "ground truth {:?} not among {:?}",
        truth,
        candidates
    );
    // Every candidate explains the sample it came from.
    for pose in &candidates {
        for datum in &sample {
            assert!(estimator.error(datum, pose) < 1e-10);
        }
    }
}

#[test]
fn randomized_round_trip() {
    let mut rng = SmallRng::seed_from_u64(0);
    let estimator = CalibratedAbsolutePoseEstimator::new();
    let mut candidates = Vec::new();
    let successes = (0..ROUNDS)
        .filter(|_| {
            let truth = some_pose(&mut rng);
            let sample = [(); 3].map(|_| some_match(&mut rng, &truth));
            estimator.generate(&sample, &mut candidates);
            candidates.iter().any(|pose| close_to(pose, &truth, 1e-4))
        })
        .count();
    eprintln!("successes: {}", successes);
    assert!(successes > ROUNDS * 9 / 10);
}

#[test]
fn collinear_world_points_have_no_candidates() {
    let estimator = CalibratedAbsolutePoseEstimator::new();
    let sample = [0.0, 1.0, 2.0].map(|x| {
        FeatureWorldMatch(
            NormalizedKeyPoint(Point2::new(x * 0.1, 0.0)),
            WorldPoint(Point3::new(x, 0.0, 5.0)),
        )
    });
    let mut candidates = vec![CalibratedAbsolutePose::identity()];
    estimator.generate(&sample, &mut candidates);
    assert!(candidates.is_empty());
}

#[test]
fn inliers_do_not_increase_with_noise() {
    let mut rng = SmallRng::seed_from_u64(1);
    let truth = some_pose(&mut rng);
    let exact: Vec<FeatureWorldMatch> = (0..100).map(|_| some_match(&mut rng, &truth)).collect();
    let estimator = CalibratedAbsolutePoseEstimator::new();
    let thresh = 1e-6;

    let counts: Vec<usize> = [0.0, 1e-4, 1e-3, 3e-3, 1e-2, 1e-1]
        .iter()
        .map(|&noise| {
            // The same directions at every level, only the magnitude changes.
            let mut noisy = exact.clone();
            add_noise(&mut SmallRng::seed_from_u64(2), &mut noisy, noise);
            noisy
                .iter()
                .filter(|datum| estimator.error(datum, &truth) < thresh)
                .count()
        })
        .collect();

    eprintln!("inlier counts: {:?}", counts);
    assert_eq!(counts[0], exact.len());
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    assert!(counts[counts.len() - 1] < exact.len());
}

#[test]
fn end_to_end() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(3);
    let truth = some_pose(&mut rng);
    let matches = some_test_data(&mut rng, &truth, 20, wrong_feature);

    let params = RansacParameters::new(1e-6).seed(0);
    let (pose, summary) =
        estimate_calibrated_absolute_pose(params, RansacType::Ransac, &matches).unwrap();

    let expected: Vec<usize> = (0..20).filter(|&ix| !is_outlier(ix)).collect();
    assert_eq!(expected.len(), 16);
    assert_eq!(summary.inliers, expected);
    assert_eq!(summary.num_input_data_points, 20);
    assert!(summary.confidence > 0.99);
    assert!(close_to(&pose, &truth, 1e-2), "{:?} != {:?}", pose, truth);
}

#[test]
fn end_to_end_with_wrong_world_points() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(12);
    let truth = some_pose(&mut rng);
    let matches = some_test_data(&mut rng, &truth, 20, wrong_world_point);

    let params = RansacParameters::new(1e-6).seed(13);
    let (pose, summary) =
        estimate_calibrated_absolute_pose(params, RansacType::Ransac, &matches).unwrap();

    let expected: Vec<usize> = (0..20).filter(|&ix| !is_outlier(ix)).collect();
    assert_eq!(summary.inliers, expected);
    assert!(close_to(&pose, &truth, 1e-2), "{:?} != {:?}", pose, truth);
}

#[test]
fn every_variant_rejects_wrong_world_points() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(14);
    let truth = some_pose(&mut rng);
    let mut matches = some_test_data(&mut rng, &truth, 20, wrong_world_point);
    add_noise(&mut rng, &mut matches, 1e-4);

    for ransac_type in [
        RansacType::Ransac,
        RansacType::Lmeds,
        RansacType::Exhaustive,
        RansacType::Arrsac,
    ] {
        let params = RansacParameters::new(1e-5).seed(15);
        let (pose, summary) = estimate_calibrated_absolute_pose(params, ransac_type, &matches)
            .unwrap_or_else(|e| panic!("{} failed: {}", ransac_type, e));
        assert!(
            summary.inliers.iter().all(|&ix| !is_outlier(ix)),
            "{}: {:?}",
            ransac_type,
            summary.inliers
        );
        assert!(summary.inliers.len() >= 12, "{}: {:?}", ransac_type, summary.inliers);
        assert!(
            close_to(&pose, &truth, 5e-2),
            "{}: {:?} != {:?}",
            ransac_type,
            pose,
            truth
        );
    }
}

#[test]
fn every_variant_handles_noise() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(4);
    let truth = some_pose(&mut rng);
    let mut matches = some_test_data(&mut rng, &truth, 40, wrong_feature);
    add_noise(&mut rng, &mut matches, 1e-4);

    for ransac_type in [
        RansacType::Ransac,
        RansacType::Lmeds,
        RansacType::Exhaustive,
        RansacType::Arrsac,
    ] {
        let params = RansacParameters::new(1e-5).seed(5);
        let (pose, summary) = estimate_calibrated_absolute_pose(params, ransac_type, &matches)
            .unwrap_or_else(|e| panic!("{} failed: {}", ransac_type, e));
        assert!(
            summary.inliers.iter().all(|&ix| !is_outlier(ix)),
            "{}: {:?}",
            ransac_type,
            summary.inliers
        );
        assert!(summary.inliers.len() >= 16, "{}: {:?}", ransac_type, summary.inliers);
        assert!(
            close_to(&pose, &truth, 5e-2),
            "{}: {:?} != {:?}",
            ransac_type,
            pose,
            truth
        );
    }
}

#[test]
fn mle_with_local_optimization() {
    init_logger();
    let mut rng = SmallRng::seed_from_u64(6);
    let truth = some_pose(&mut rng);
    let mut matches = some_test_data(&mut rng, &truth, 40, wrong_feature);
    add_noise(&mut rng, &mut matches, 1e-4);

    let params = RansacParameters::new(1e-5)
        .seed(7)
        .use_mle(true)
        .use_lo(true)
        .lo_start_iterations(0);
    let (pose, summary) =
        estimate_calibrated_absolute_pose(params, RansacType::Ransac, &matches).unwrap();
    assert!(summary.inliers.iter().all(|&ix| !is_outlier(ix)));
    assert!(summary.num_lo_iterations > 0);
    assert!(close_to(&pose, &truth, 5e-2));
}

#[test]
fn repeat_calls_are_independent() {
    init_logger();
    let params = RansacParameters::new(1e-6).seed(8).max_iterations(1000);
    let degenerate: Vec<FeatureWorldMatch> = (0..10)
        .map(|i| {
            let x = i as f64;
            FeatureWorldMatch(
                NormalizedKeyPoint(Point2::new(x * 0.05, 0.0)),
                WorldPoint(Point3::new(x, 0.0, 5.0)),
            )
        })
        .collect();
    let mut rng = SmallRng::seed_from_u64(9);
    let truth = some_pose(&mut rng);
    let easy = some_test_data(&mut rng, &truth, 20, wrong_feature);

    let mut reused =
        ReusableCalibratedAbsolutePoseEstimator::build(params.clone(), RansacType::Ransac);
    match reused.estimate(&degenerate) {
        Err(ConsensusError::NoConsensus { summary }) => {
            assert!(summary.inliers.is_empty());
            assert_eq!(summary.num_iterations, 1000);
        }
        other => panic!("expected no consensus, got {:?}", other),
    }
    let after_failure = reused.estimate(&easy).unwrap();
    let again = reused.estimate(&easy).unwrap();

    let mut fresh = ReusableCalibratedAbsolutePoseEstimator::build(params, RansacType::Ransac);
    let first_call = fresh.estimate(&easy).unwrap();

    assert_eq!(after_failure, first_call);
    assert_eq!(again, first_call);
    assert_eq!(first_call.1.inliers.len(), 16);
    assert!(close_to(&first_call.0, &truth, 1e-2));
}

#[test]
fn estimator_can_move_between_threads() {
    let mut rng = SmallRng::seed_from_u64(10);
    let truth = some_pose(&mut rng);
    let matches = some_test_data(&mut rng, &truth, 20, wrong_feature);
    let params = RansacParameters::new(1e-6).seed(11);
    let mut estimator = ReusableCalibratedAbsolutePoseEstimator::build(params, RansacType::Ransac);
    let (pose, _) = std::thread::spawn(move || estimator.estimate(&matches))
        .join()
        .unwrap()
        .unwrap();
    assert!(close_to(&pose, &truth, 1e-2));
}

#[test]
fn custom_solver_settings() {
    let mut rng = SmallRng::seed_from_u64(16);
    let truth = some_pose(&mut rng);
    let matches = some_test_data(&mut rng, &truth, 20, wrong_feature);
    let estimator = CalibratedAbsolutePoseEstimator::with_solver(
        LambdaTwist::new()
            .gauss_newton_iterations(10)
            .rotation_convergence_iterations(50),
    );
    let params = RansacParameters::new(1e-6).seed(17);
    let mut reusable = ReusableCalibratedAbsolutePoseEstimator::with_estimator(
        params,
        RansacType::Ransac,
        estimator,
    );
    let (pose, summary) = reusable.estimate(&matches).unwrap();
    assert_eq!(summary.inliers.len(), 16);
    assert!(close_to(&pose, &truth, 1e-2));
}
