use std::collections::BTreeMap;

use glam::Vec3;

use crate::{TileTriangle, TileVertex};

/// 包围盒：解析时增量累积，之后只读
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }
}

/// 源文件中一个命名网格分组
#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub vertices: Vec<TileVertex>,
    pub triangles: Vec<TileTriangle>,
    pub bounds: Aabb,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            bounds: Aabb::empty(),
        }
    }
}

/// 导航边：两个端点 + 所属分组的序号标签
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavEdge {
    pub a: Vec3,
    pub b: Vec3,
    pub tag: u32,
}

/// 单行解析警告，摄取结束后一次性上报
#[derive(Clone, Debug)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

/// 摄取阶段的完整产物，作为后续阶段的只读输入
#[derive(Debug)]
pub struct Scene {
    pub models: Vec<Model>,
    pub extent: Aabb,
    pub graphs: BTreeMap<String, Vec<NavEdge>>,
    pub warnings: Vec<ParseWarning>,
    pub materials: Vec<String>,
}
