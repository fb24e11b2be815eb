use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use bytemuck::cast_slice;
use rayon::prelude::*;

use crate::error::{TilerError, TilerResult};
use crate::pipeline::types::{Aabb, Model, NavEdge};
use crate::{EdgeRecord, TILE_MAGIC, TILE_VERSION, TileHeader, TileTriangle};

/// 每个瓦片键写一个文件 <prefix><key>；瓦片相互独立，并行写出，
/// 任一失败即中止整个序列化阶段，不回滚已写出的文件
pub fn write_tiles(
    prefix: &str,
    tiles: &BTreeMap<String, Vec<Model>>,
    extent: &Aabb,
) -> TilerResult<()> {
    tiles.par_iter().try_for_each(|(key, models)| {
        let path = format!("{}{}", prefix, key);
        emit_tile(&path, models, extent)
            .map_err(|e| TilerError::Serialization(format!("{}: {}", path, e)))
    })?;
    log::info!("Wrote {} tile files", tiles.len());
    Ok(())
}

fn emit_tile(path: &str, models: &[Model], extent: &Aabb) -> std::io::Result<()> {
    // 合并瓦片内各模型：顶点顺序拼接，索引按累计偏移重定位
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut index_offset = 0u32;
    for model in models {
        vertices.extend_from_slice(&model.vertices);
        for tri in &model.triangles {
            triangles.push(TileTriangle {
                indices: [
                    tri.indices[0] + index_offset,
                    tri.indices[1] + index_offset,
                    tri.indices[2] + index_offset,
                ],
                material: tri.material,
            });
        }
        index_offset += model.vertices.len() as u32;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);

    let header = TileHeader {
        magic: TILE_MAGIC,
        version: TILE_VERSION,
    };
    writer.write_all(cast_slice(&[header]))?;
    writer.write_all(&(vertices.len() as u32).to_le_bytes())?;
    writer.write_all(cast_slice(&vertices))?;
    writer.write_all(&(triangles.len() as u32).to_le_bytes())?;
    writer.write_all(cast_slice(&triangles))?;

    // 尾部：全局包围盒六个浮点，单个瓦片即可独立做归一化/剔除
    writer.write_all(cast_slice(&extent.min.to_array()))?;
    writer.write_all(cast_slice(&extent.max.to_array()))?;

    writer.flush()
}

/// 导航图单独成文件：总边数 + 逐边记录，与瓦片无关
pub fn write_graph(path: &str, graphs: &BTreeMap<String, Vec<NavEdge>>) -> TilerResult<()> {
    emit_graph(path, graphs).map_err(|e| TilerError::Serialization(format!("{}: {}", path, e)))
}

fn emit_graph(path: &str, graphs: &BTreeMap<String, Vec<NavEdge>>) -> std::io::Result<()> {
    let mut records = Vec::new();
    for edges in graphs.values() {
        for edge in edges {
            records.push(EdgeRecord {
                a: edge.a.to_array(),
                b: edge.b.to_array(),
                tag: edge.tag,
            });
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);
    writer.write_all(&(records.len() as u32).to_le_bytes())?;
    writer.write_all(cast_slice(&records))?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileVertex;
    use glam::Vec3;
    use tempfile::tempdir;

    fn sample_model(name: &str, base: f32) -> Model {
        let mut model = Model::new(name);
        for p in [
            [base, 0.0, 0.0],
            [base + 1.0, 0.0, 0.0],
            [base, 1.0, 0.0],
        ] {
            model.vertices.push(TileVertex {
                position: p,
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
            });
            model.bounds.extend(Vec3::from(p));
        }
        model.triangles.push(TileTriangle {
            indices: [0, 1, 2],
            material: 0,
        });
        model
    }

    #[test]
    fn tile_layout_is_fixed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tile_0_0_0").to_str().unwrap().to_string();
        let model = sample_model("tri", 0.0);
        let extent = model.bounds;
        emit_tile(&path, std::slice::from_ref(&model), &extent).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8 + 4 + 3 * 32 + 4 + 16 + 24);
        assert_eq!(&bytes[0..4], b"CTIL");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
        // 顶点区起始于 12，首顶点的位置场
        assert_eq!(&bytes[12..24], cast_slice::<f32, u8>(&[0.0, 0.0, 0.0]));
        let tri_at = 12 + 3 * 32;
        assert_eq!(
            u32::from_le_bytes(bytes[tri_at..tri_at + 4].try_into().unwrap()),
            1
        );
        // 尾部 24 字节 = 全局包围盒 min/max
        assert_eq!(
            &bytes[bytes.len() - 24..],
            cast_slice::<f32, u8>(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0])
        );
    }

    #[test]
    fn indices_rebased_across_models() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tile").to_str().unwrap().to_string();
        let models = vec![sample_model("a", 0.0), sample_model("b", 10.0)];
        let mut extent = Aabb::empty();
        extent.extend(Vec3::ZERO);
        extent.extend(Vec3::new(11.0, 1.0, 0.0));
        emit_tile(&path, &models, &extent).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 6);
        let tri_at = 12 + 6 * 32;
        assert_eq!(
            u32::from_le_bytes(bytes[tri_at..tri_at + 4].try_into().unwrap()),
            2
        );
        // 第二个三角形的索引整体偏移了前一个模型的顶点数
        let second_tri = tri_at + 4 + 16;
        let indices: Vec<u32> = bytes[second_tri..second_tri + 12]
            .chunks(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(indices, vec![3, 4, 5]);
    }

    #[test]
    fn graph_layout_is_fixed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track").to_str().unwrap().to_string();
        let mut graphs = BTreeMap::new();
        graphs.insert(
            "nav_lane".to_string(),
            vec![
                NavEdge {
                    a: Vec3::ZERO,
                    b: Vec3::new(1.0, 0.0, 0.0),
                    tag: 0,
                },
                NavEdge {
                    a: Vec3::new(1.0, 0.0, 0.0),
                    b: Vec3::new(2.0, 0.0, 0.0),
                    tag: 0,
                },
            ],
        );
        write_graph(&path, &graphs).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 2);
        assert_eq!(bytes.len(), 4 + 2 * 28);
        assert_eq!(&bytes[4..16], cast_slice::<f32, u8>(&[0.0, 0.0, 0.0]));
        assert_eq!(&bytes[16..28], cast_slice::<f32, u8>(&[1.0, 0.0, 0.0]));
    }

    #[test]
    fn write_failure_is_serialization_error() {
        let mut tiles = BTreeMap::new();
        tiles.insert("_0_0_0".to_string(), vec![sample_model("a", 0.0)]);
        let extent = tiles["_0_0_0"][0].bounds;
        let result = write_tiles("/no-such-dir/track", &tiles, &extent);
        match result {
            Err(TilerError::Serialization(msg)) => assert!(msg.contains("/no-such-dir/track")),
            _ => panic!("expected serialization error"),
        }
    }

    #[test]
    fn reserialization_is_byte_identical() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a").to_str().unwrap().to_string();
        let b = dir.path().join("b").to_str().unwrap().to_string();
        let model = sample_model("tri", 0.0);
        let extent = model.bounds;
        emit_tile(&a, std::slice::from_ref(&model), &extent).unwrap();
        emit_tile(&b, std::slice::from_ref(&model), &extent).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }
}
