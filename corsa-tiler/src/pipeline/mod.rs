pub mod ingest;
pub mod subdivide;
pub mod types;
pub mod writer;

pub use types::*;

use crate::TilerResult;

pub struct ConvertSummary {
    pub model_count: usize,
    pub tile_count: usize,
    pub edge_count: usize,
    pub warnings: Vec<ParseWarning>,
}

/// 完整流水线：摄取 → 细分 → 序列化。
/// 图文件写在裸前缀路径，瓦片文件写在 前缀+键。
pub fn convert(input: &str, output_prefix: &str, cell_size: f32) -> TilerResult<ConvertSummary> {
    let lines = ingest::load_obj(input)?;
    let scene = ingest::ObjParser::new().parse(&lines)?;
    log::info!(
        "Parsed {} models, {} nav groups, {} warnings",
        scene.models.len(),
        scene.graphs.len(),
        scene.warnings.len()
    );

    let model_count = scene.models.len();
    let edge_count = scene.graphs.values().map(|g| g.len()).sum();

    let tiles = subdivide::subdivide(scene.models, cell_size);
    log::info!("Subdivided into {} tiles", tiles.len());

    writer::write_graph(output_prefix, &scene.graphs)?;
    writer::write_tiles(output_prefix, &tiles, &scene.extent)?;

    Ok(ConvertSummary {
        model_count,
        tile_count: tiles.len(),
        edge_count,
        warnings: scene.warnings,
    })
}
