use std::collections::HashMap;
use std::time::Instant;

use log::{error, info};
use track_velocity::math::Point2d;
use track_velocity::{
    combine_cones, extract_centerline, PlannerConfig, StripTriangulator, VehicleParameters,
    VelocityPlanner,
};

/// The number of cones triangulated together.
const BATCH_SIZE: usize = 3;

/// The speed limit used for the demo lap in m/s.
const MAX_SPEED: f64 = 18.0;

/// The cones of the reference lap, used when no file is given.
const REFERENCE_CONES: &str = include_str!("../data/reference_cones.json");

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let as_json = args.iter().any(|arg| arg == "--json");
    let path = args.iter().find(|arg| !arg.starts_with("--"));

    let loaded = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(Box::<dyn std::error::Error>::from)
            .and_then(|content| parse_cones(&content)),
        None => parse_cones(REFERENCE_CONES),
    };
    let (left, right) = match loaded {
        Ok(cones) => cones,
        Err(err) => {
            error!(
                "Failed to load cones from {}: {}",
                path.map_or("the reference lap", |p| p.as_str()),
                err
            );
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let cones = combine_cones(&left, &right);
    let result = extract_centerline(&cones, BATCH_SIZE, &StripTriangulator).and_then(|centre| {
        let config = PlannerConfig::new(MAX_SPEED);
        let planner = VelocityPlanner::new(config, &VehicleParameters::default())?;
        planner.plan(&centre, 0.0)
    });
    let profile = match result {
        Ok(profile) => profile,
        Err(err) => {
            error!("Planning failed: {}", err);
            std::process::exit(1);
        }
    };
    info!(
        "Planned {} waypoints from {} cones in {:?}",
        profile.len(),
        cones.len(),
        start.elapsed()
    );

    if as_json {
        let rows: Vec<_> = profile.iter().map(|(s, v)| [s, v]).collect();
        println!("{}", serde_json::json!({ "profile": rows }));
    } else {
        println!("{:>10} {:>10}", "s (m)", "v (m/s)");
        for (s, v) in profile.iter() {
            println!("{:>10.2} {:>10.2}", s, v);
        }
    }
}

type Cones = (Vec<Point2d>, Vec<Point2d>);

/// Parses cones from JSON of the form `{"left": [[x, y], ...], "right": [...]}`.
fn parse_cones(content: &str) -> Result<Cones, Box<dyn std::error::Error>> {
    let mut sides: HashMap<String, Vec<[f64; 2]>> = serde_json::from_str(content)?;
    let mut side = |name: &str| -> Result<Vec<Point2d>, String> {
        sides
            .remove(name)
            .map(|cones| cones.into_iter().map(|[x, y]| Point2d::new(x, y)).collect())
            .ok_or_else(|| format!("missing \"{}\" cones", name))
    };
    Ok((side("left")?, side("right")?))
}
