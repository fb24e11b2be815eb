use std::env;
use std::fs;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use corsa_tiler::pipeline::{ingest, subdivide, writer};

fn main() -> Result<()> {
    env_logger::init();

    println!(" ___________________________________________________________");
    println!("|                                                           |");
    println!("|                Corsa track asset processor                |");
    println!("|___________________________________________________________|");
    println!("usage: corsa-processor <input.obj> <out/dir/track> [cell-size]");
    println!();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        bail!("Invalid arguments");
    }

    let input = &args[1];
    let output = &args[2];

    // 输出必须落在转换器工作目录之内
    for arg in [input, output] {
        if arg.starts_with('/') || arg.as_bytes().get(1) == Some(&b':') {
            bail!("Do not use absolute paths");
        }
    }

    let cell_size = match args.get(3) {
        Some(raw) => raw
            .parse::<f32>()
            .with_context(|| format!("Invalid cell size: {}", raw))?,
        None => subdivide::DEFAULT_CELL_SIZE,
    };
    if cell_size <= 0.0 {
        bail!("Cell size must be positive");
    }

    if !Path::new(input).exists() {
        bail!("Input file doesn't exist");
    }

    // 备份旧的输出目录，然后重建
    let out_dir = match output.rfind('/') {
        Some(i) => &output[..i],
        None => bail!("Do not put output files into the converter directory"),
    };
    if Path::new(out_dir).exists() {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let backup = format!("backup-{}", millis);
        fs::rename(out_dir, &backup)
            .with_context(|| format!("Failed to back up {} to {}", out_dir, backup))?;
        println!("Previous output moved to {}", backup);
    }
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir))?;

    println!("Processing {}...", input);
    let total_start = Instant::now();

    let lines = ingest::load_obj(input)?;
    let scene = ingest::ObjParser::new().parse(&lines)?;
    for warning in &scene.warnings {
        log::warn!("line {}: {}", warning.line, warning.message);
    }
    if !scene.warnings.is_empty() {
        println!(
            "Parsed with {} warnings (set RUST_LOG=warn for details)",
            scene.warnings.len()
        );
    }
    println!(
        "Parsed {} models and {} nav groups in {:.2}s",
        scene.models.len(),
        scene.graphs.len(),
        total_start.elapsed().as_secs_f32()
    );

    let subdivide_start = Instant::now();
    let edge_count: usize = scene.graphs.values().map(|g| g.len()).sum();
    let tiles = subdivide::subdivide(scene.models, cell_size);
    println!(
        "Subdivided into {} tiles in {:.2}s",
        tiles.len(),
        subdivide_start.elapsed().as_secs_f32()
    );

    let write_start = Instant::now();
    print!("Writing output files...");
    writer::write_graph(output, &scene.graphs)?;
    writer::write_tiles(output, &tiles, &scene.extent)?;
    println!("OK");
    println!(
        "Wrote {} tiles and {} nav edges in {:.2}s",
        tiles.len(),
        edge_count,
        write_start.elapsed().as_secs_f32()
    );

    println!(
        "Total execution time: {:.2}s",
        total_start.elapsed().as_secs_f32()
    );
    Ok(())
}
