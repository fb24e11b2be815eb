use std::collections::BTreeMap;

use glam::{IVec3, Vec3};

use crate::pipeline::types::Model;

/// 默认网格单元尺寸（场景单位），固定值保证可复现的瓦片划分
pub const DEFAULT_CELL_SIZE: f32 = 512.0;

/// 质心分配：模型整体落入其包围盒中心所在的网格单元，不做几何切分，
/// 同一单元内保持输入顺序
pub fn subdivide(models: Vec<Model>, cell_size: f32) -> BTreeMap<String, Vec<Model>> {
    let mut tiles: BTreeMap<String, Vec<Model>> = BTreeMap::new();
    for model in models {
        // 无顶点的模型没有可写出的数据
        if model.vertices.is_empty() {
            log::debug!("Dropping empty model '{}'", model.name);
            continue;
        }
        let key = tile_key(cell_of(model.bounds.center(), cell_size));
        tiles.entry(key).or_default().push(model);
    }
    log::debug!("Subdivision produced {} tiles", tiles.len());
    tiles
}

fn cell_of(center: Vec3, cell_size: f32) -> IVec3 {
    (center / cell_size).floor().as_ivec3()
}

/// 由整数单元坐标拼接出确定性的瓦片键
pub fn tile_key(cell: IVec3) -> String {
    format!("_{}_{}_{}", cell.x, cell.y, cell.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TileTriangle, TileVertex};
    use glam::Vec3;

    fn model_at(name: &str, positions: &[[f32; 3]]) -> Model {
        let mut model = Model::new(name);
        for &p in positions {
            model.vertices.push(TileVertex {
                position: p,
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
            });
            model.bounds.extend(Vec3::from(p));
        }
        if positions.len() >= 3 {
            model.triangles.push(TileTriangle {
                indices: [0, 1, 2],
                material: 0,
            });
        }
        model
    }

    #[test]
    fn assigns_by_bounds_center() {
        let model = model_at(
            "road",
            &[[90.0, 0.0, -590.0], [110.0, 0.0, -610.0], [100.0, 10.0, -600.0]],
        );
        let tiles = subdivide(vec![model], 512.0);
        // 中心 (100, 5, -600) → 单元 (0, 0, -2)
        assert_eq!(tiles.keys().collect::<Vec<_>>(), vec!["_0_0_-2"]);
    }

    #[test]
    fn preserves_model_multiset() {
        let models: Vec<Model> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let x = i as f32 * 400.0;
                model_at(n, &[[x, 0.0, 0.0], [x + 10.0, 0.0, 0.0], [x, 10.0, 0.0]])
            })
            .collect();
        let tiles = subdivide(models, 512.0);
        assert_eq!(tiles.values().map(|v| v.len()).sum::<usize>(), 4);
        let mut seen: Vec<&str> = tiles
            .values()
            .flatten()
            .map(|m| m.name.as_str())
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn keeps_declaration_order_within_tile() {
        let models = vec![
            model_at("first", &[[1.0, 0.0, 0.0]]),
            model_at("second", &[[2.0, 0.0, 0.0]]),
        ];
        let tiles = subdivide(models, 512.0);
        let tile = &tiles["_0_0_0"];
        assert_eq!(tile[0].name, "first");
        assert_eq!(tile[1].name, "second");
    }

    #[test]
    fn degenerate_model_still_tiled() {
        // 零三角形的模型按其顶点包围盒中心入瓦片
        let model = model_at("marker", &[[1000.0, 0.0, 0.0]]);
        assert!(model.triangles.is_empty());
        let tiles = subdivide(vec![model], 512.0);
        assert_eq!(tiles["_1_0_0"].len(), 1);
    }

    #[test]
    fn vertexless_model_dropped() {
        let tiles = subdivide(vec![Model::new("empty")], 512.0);
        assert!(tiles.is_empty());
    }

    #[test]
    fn negative_centers_floor_toward_negative() {
        let model = model_at("m", &[[-1.0, -1.0, -1.0]]);
        let tiles = subdivide(vec![model], 512.0);
        assert!(tiles.contains_key("_-1_-1_-1"));
    }
}
