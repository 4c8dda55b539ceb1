//! Lumen CLI - build, cache and query the spatial indices from the command line.

use std::env;
use std::path::Path;
use std::time::Instant;

use lumen::bvh::HitPacket;
use lumen::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Photons generated per batch by one task.
const PHOTON_BATCH: usize = 4096;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut settings_path: Option<String> = None;
    let mut seed: u64 = 1;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "--settings" => settings_path = iter.next().cloned(),
            "--seed" => match iter.next().and_then(|s| s.parse().ok()) {
                Some(s) => seed = s,
                None => exit_usage("--seed expects an integer"),
            },
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    let settings = settings_path
        .map(BuildSettings::load_or_default)
        .unwrap_or_default();

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        // Photons command - build and cache a random photon map
        "photons" | "p" => {
            if filtered_args.len() < 3 {
                exit_usage("Usage: lumen photons <count> <out.kdt>");
            }
            let count = parse_arg(filtered_args[1], "count");
            cmd_photons(count, filtered_args[2], seed, &settings)
        }

        // Query command - nearest photons around a point
        "query" | "q" => {
            if filtered_args.len() < 5 {
                exit_usage("Usage: lumen query <file.kdt> <x> <y> <z> [k] [--caustic]");
            }
            let target = Vec3::new(
                parse_arg(filtered_args[2], "x"),
                parse_arg(filtered_args[3], "y"),
                parse_arg(filtered_args[4], "z"),
            );
            let k = filtered_args
                .get(5)
                .filter(|s| !s.starts_with("--"))
                .map_or(8, |s| parse_arg(s, "k"));
            let caustic_only = filtered_args.iter().any(|&s| s == "--caustic");
            cmd_query(filtered_args[1], target, k, caustic_only)
        }

        // Spheres command - instanced scene BVH with packet tracing
        "spheres" | "s" => {
            let count = filtered_args.get(1).map_or(1000, |s| parse_arg(s, "count"));
            cmd_spheres(count, seed, &settings)
        }

        // Settings command - write the effective settings as JSON
        "settings" => match filtered_args.get(1) {
            Some(path) => settings.save(path),
            None => {
                println!("{settings:#?}");
                Ok(())
            }
        },

        "version" | "--version" => {
            println!(
                "lumen {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                env!("LUMEN_BUILD_DATE"),
                env!("LUMEN_BUILD_TIME")
            );
            Ok(())
        }

        // Help
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("LUMEN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("lumen={default_level}")));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn exit_usage(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn parse_arg<T: std::str::FromStr>(s: &str, name: &str) -> T {
    s.parse()
        .unwrap_or_else(|_| exit_usage(&format!("invalid {name}: {s}")))
}

fn cmd_photons(count: usize, out: &str, seed: u64, settings: &BuildSettings) -> Result<()> {
    let start = Instant::now();
    let list = PhotonList::new();
    let batches = count.div_ceil(PHOTON_BATCH);
    (0..batches).into_par_iter().for_each(|batch| {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(batch as u64));
        let len = PHOTON_BATCH.min(count - batch * PHOTON_BATCH);
        let photons: Vec<Photon> = (0..len).map(|_| random_photon(&mut rng)).collect();
        list.push_batch(photons);
    });
    tracing::info!("emitted {} photons in {:.2?}", list.len(), start.elapsed());

    let start = Instant::now();
    let mut map = list.build_map(settings)?;
    tracing::info!("built photon map in {:.2?}: {}", start.elapsed(), map.stats());

    map.pack()?;
    map.save(out)?;
    println!("Wrote {} photons to {}", map.size(), out);
    Ok(())
}

fn random_photon(rng: &mut StdRng) -> Photon {
    let position = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0 - 5.0;
    let incoming = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
    .normalize_or_zero();
    let energy = Vec3::splat(rng.gen_range(0.0..0.01));
    Photon::new(position, Vec3::Y, incoming, energy, rng.gen_bool(0.1))
}

fn cmd_query(path: &str, target: Vec3, k: usize, caustic_only: bool) -> Result<()> {
    if !Path::new(path).exists() {
        return Err(Error::FileNotFound(path.into()));
    }
    let map = PhotonMap::load(path)?;
    let mut search = map.search().ok_or(Error::NotPacked)?;

    let mut out = Vec::new();
    let nearest = search.nearest(
        target,
        k,
        f32::INFINITY,
        |p: &Photon| !caustic_only || p.is_caustic(),
        &mut out,
    );

    println!(
        "{} photons within {:.4} of ({}, {}, {})",
        nearest.found, nearest.radius, target.x, target.y, target.z
    );
    for photon in out {
        let p = photon.position;
        println!(
            "  ({:8.4}, {:8.4}, {:8.4})  d={:.4}{}",
            p.x,
            p.y,
            p.z,
            (p - target).length(),
            if photon.is_caustic() { "  caustic" } else { "" }
        );
    }
    Ok(())
}

fn cmd_spheres(count: usize, seed: u64, settings: &BuildSettings) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let model = Model::new(std::sync::Arc::new(Shape::Sphere(Sphere)), 0);
    let instances: InstanceList = (0..count as u32)
        .map(|id| {
            let offset = Vec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let scale = rng.gen_range(0.2..1.5);
            Instance::new(id, Transform::scale_translate(scale, offset), model.clone())
        })
        .collect();

    let start = Instant::now();
    let mut bvh = BvhBuilder::new(settings.clone()).build(ShapeList::from(instances))?;
    tracing::info!("built BVH in {:.2?}: {}", start.elapsed(), bvh.stats());
    bvh.pack()?;

    // A 256x256 pinhole view from outside the cloud, traced in packets.
    const WIDTH: usize = 256;
    let origin = Vec3::new(0.0, 0.0, -120.0);
    let rays: Vec<Ray> = (0..WIDTH * WIDTH)
        .map(|i| {
            let (x, y) = ((i % WIDTH) as f32, (i / WIDTH) as f32);
            let dir = Vec3::new(x / WIDTH as f32 - 0.5, y / WIDTH as f32 - 0.5, 1.0);
            Ray::new(origin, dir.normalize())
        })
        .collect();

    let start = Instant::now();
    let hits: usize = rays
        .par_chunks_exact(PACKET_SIZE)
        .map(|chunk| {
            let packet: RayPacket = std::array::from_fn(|i| chunk[i]);
            let results: HitPacket = bvh.trace_rays(&packet);
            results.iter().filter(|h| h.is_some()).count()
        })
        .sum();
    println!(
        "{} of {} rays hit one of {} spheres ({:.2?})",
        hits,
        rays.len(),
        count,
        start.elapsed()
    );
    Ok(())
}

fn print_help() {
    println!("lumen - BVH and photon map toolkit");
    println!();
    println!("USAGE:");
    println!("    lumen [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    p, photons <count> <out>        Build a random photon map and cache it");
    println!("    q, query   <file> <x> <y> <z> [k] [--caustic]");
    println!("                                    Nearest photons around a point");
    println!("    s, spheres [count]              Build an instanced sphere BVH and trace it");
    println!("    settings   [out.json]           Print or save the build settings");
    println!("    version                         Show version and build date");
    println!("    h, help                         Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Only show errors");
    println!("    --settings <file>    Load build settings from JSON");
    println!("    --seed <n>           Random seed (default 1)");
    println!();
    println!("ENVIRONMENT:");
    println!("    LUMEN_LOG            tracing filter, overrides the verbosity flags");
    println!();
    println!("EXAMPLES:");
    println!("    lumen photons 1000000 photons.kdt");
    println!("    lumen query photons.kdt 0 0 0 16 --caustic");
    println!("    lumen -v spheres 50000");
}
