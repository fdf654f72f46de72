//! Smooth Demo
//!
//! Builds one shared mesh asset, attaches many smoothers to it and drives
//! them to completion, either inline or on a background worker.
//!
//! ```text
//! cargo run -p meshsmooth-demos --bin smooth_demo -- --shape cube --instances 64
//! RUST_LOG=trace cargo run -p meshsmooth-demos --bin smooth_demo -- --sync
//! ```

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use meshsmooth_core::compute::SmoothWorker;
use meshsmooth_core::mesh::MeshHandle;
use meshsmooth_core::mesh::generators::{generate_cube, generate_sphere};
use meshsmooth_core::smooth::{
    MeshResultCache, MeshSmoother, SmoothRequest, SmoothState, SmoothedMesh, SmootherConfig,
};

/// Shape of the shared asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum Shape {
    /// UV sphere with a duplicated seam column and pole rings.
    #[default]
    Sphere,
    /// Flat-shaded cube, three vertices per corner.
    Cube,
}

/// Smooth many instances of one mesh through a shared result cache.
#[derive(Parser, Debug)]
#[command(name = "smooth_demo", version)]
struct Args {
    /// Shape of the shared asset.
    #[arg(long, default_value = "sphere", value_enum)]
    shape: Shape,

    /// Sphere segments around the equator.
    #[arg(long, default_value = "64")]
    segments: u32,

    /// Sphere rings from pole to pole.
    #[arg(long, default_value = "32")]
    rings: u32,

    /// Number of entities sharing the asset.
    #[arg(long, default_value = "16")]
    instances: usize,

    /// Worker threads (0 = one per core).
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Smooth on the calling thread instead of the worker.
    #[arg(long)]
    sync: bool,

    /// UV channel receiving the smoothed normals.
    #[arg(long, default_value = "2")]
    channel: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    meshsmooth_core::init();

    let args = Args::parse();
    log::debug!("{args:?}");

    let mesh = match args.shape {
        Shape::Sphere => generate_sphere(1.0, args.segments, args.rings),
        Shape::Cube => generate_cube(1.0),
    };
    log::info!(
        "{:?}: {} vertices, {} instances",
        args.shape,
        mesh.vertex_count(),
        args.instances
    );

    let cache = Arc::new(MeshResultCache::new());
    let asset = MeshHandle::new(mesh);
    let config = SmootherConfig::new().with_uv_channel(args.channel);
    let mut smoothers: Vec<_> = (0..args.instances)
        .map(|_| MeshSmoother::new(cache.clone(), asset.clone(), config))
        .collect();

    let start = Instant::now();
    let mut hits = 0usize;
    let mut results: Vec<Arc<SmoothedMesh>> = Vec::with_capacity(smoothers.len());

    if args.sync {
        for smoother in &mut smoothers {
            let was_cached = cache.contains(asset.id());
            results.push(smoother.smooth_normals()?);
            hits += usize::from(was_cached);
        }
    } else {
        let worker = if args.threads == 0 {
            SmoothWorker::default_threads()?
        } else {
            SmoothWorker::new(args.threads)?
        };
        log::info!("worker running {} threads", worker.thread_count());

        for smoother in &mut smoothers {
            if let SmoothRequest::Immediate(_) = smoother.smooth_normals_async(&worker)? {
                hits += 1;
            }
        }

        // Frame loop: apply finished results on this thread.
        let mut frames = 0u64;
        while smoothers
            .iter()
            .any(|s| s.state() == SmoothState::Computing)
        {
            for smoother in &mut smoothers {
                if let Some(Err(err)) = smoother.poll() {
                    return Err(err.into());
                }
            }
            frames += 1;
            std::thread::yield_now();
        }
        log::debug!("applied after {frames} polling frames");

        for smoother in &smoothers {
            if let Some(result) = smoother.result() {
                results.push(result.clone());
            }
        }
    }

    let elapsed = start.elapsed();
    let mut distinct: Vec<&Arc<SmoothedMesh>> = Vec::new();
    for result in &results {
        if !distinct.iter().any(|seen| Arc::ptr_eq(seen, result)) {
            distinct.push(result);
        }
    }

    log::info!(
        "{} smoothers applied in {:.3} ms: {} computation(s), {} immediate cache hit(s)",
        results.len(),
        elapsed.as_secs_f64() * 1000.0,
        distinct.len(),
        hits
    );
    log::info!("cache: {cache:?}");

    if let Some(result) = distinct.first() {
        let mesh = result.mesh().read();
        let written = mesh.uv_channel(args.channel).map_or(0, <[_]>::len);
        log::info!(
            "{} carries {written} smoothed normals on channel {}",
            result.mesh().id(),
            args.channel
        );
    }

    Ok(())
}
