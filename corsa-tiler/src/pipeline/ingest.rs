use std::collections::{BTreeMap, HashMap};
use std::fs;

use glam::{Vec2, Vec3};

use crate::error::{TilerError, TilerResult};
use crate::pipeline::types::{Aabb, Model, NavEdge, ParseWarning, Scene};
use crate::{TileTriangle, TileVertex};

/// 保留的导航分组前缀：以此开头的分组不进入渲染模型集，
/// 其顶点按声明顺序两两配对成导航边
pub const NAV_GROUP_PREFIX: &str = "nav_";

/// 读取源文件全部行，文件缺失或不可读时报 Io
pub fn load_obj(path: &str) -> TilerResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| TilerError::Io(format!("{}: {}", path, e)))?;
    Ok(text.lines().map(str::to_string).collect())
}

enum ActiveGroup {
    Mesh(usize),
    Nav(String),
}

struct NavGroup {
    tag: u32,
    edges: Vec<NavEdge>,
    pending: Option<(Vec3, usize)>,
}

/// OBJ 解析器：单趟扫描，行级容错，几何损坏立即终止
pub struct ObjParser {
    // 文件级索引空间，按声明顺序累积，分组切换不重置
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,

    models: Vec<Model>,
    corner_maps: Vec<HashMap<(u32, u32, u32), u32>>,
    model_lookup: HashMap<String, usize>,

    nav_groups: BTreeMap<String, NavGroup>,

    materials: Vec<String>,
    material_lookup: HashMap<String, u32>,
    active_material: u32,

    active: Option<ActiveGroup>,
    extent: Aabb,
    warnings: Vec<ParseWarning>,
}

impl ObjParser {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            models: Vec::new(),
            corner_maps: Vec::new(),
            model_lookup: HashMap::new(),
            nav_groups: BTreeMap::new(),
            materials: vec!["default".to_string()],
            material_lookup: HashMap::from([("default".to_string(), 0)]),
            active_material: 0,
            active: None,
            extent: Aabb::empty(),
            warnings: Vec::new(),
        }
    }

    pub fn parse(mut self, lines: &[String]) -> TilerResult<Scene> {
        for (i, raw) in lines.iter().enumerate() {
            self.parse_line(raw, i + 1)?;
        }

        // 导航分组里落单的尾顶点配不成边
        let nav_groups = std::mem::take(&mut self.nav_groups);
        let mut graphs = BTreeMap::new();
        for (name, group) in nav_groups {
            if let Some((_, line)) = group.pending {
                self.warnings.push(ParseWarning {
                    line,
                    message: format!("navigation group '{}' has an unpaired trailing vertex", name),
                });
            }
            graphs.insert(name, group.edges);
        }

        log::debug!(
            "Parse pass done: {} positions, {} models, {} nav groups",
            self.positions.len(),
            self.models.len(),
            graphs.len()
        );

        Ok(Scene {
            models: self.models,
            extent: self.extent,
            graphs,
            warnings: self.warnings,
            materials: self.materials,
        })
    }

    fn parse_line(&mut self, raw: &str, line: usize) -> TilerResult<()> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap();
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "v" => self.position_record(&rest, line),
            "vn" => self.normal_record(&rest, line),
            "vt" => self.texcoord_record(&rest, line),
            "f" => return self.face_record(&rest, line),
            "g" | "o" => self.group_record(&rest, line),
            "usemtl" => self.material_record(&rest, line),
            // 材质库与平滑组对本工具无意义
            "mtllib" | "s" => {}
            _ => self.warn(line, format!("unknown record '{}'", keyword)),
        }
        Ok(())
    }

    fn warn(&mut self, line: usize, message: String) {
        self.warnings.push(ParseWarning { line, message });
    }

    fn position_record(&mut self, rest: &[&str], line: usize) {
        let Some(p) = parse_vec3(rest) else {
            self.warn(line, "malformed vertex record".to_string());
            return;
        };
        self.positions.push(p);

        // 导航分组的顶点只参与配对，不进渲染集，但仍推进全局计数
        if let Some(ActiveGroup::Nav(name)) = &self.active {
            let name = name.clone();
            self.nav_vertex(&name, p, line);
        }
    }

    fn normal_record(&mut self, rest: &[&str], line: usize) {
        let Some(n) = parse_vec3(rest) else {
            self.warn(line, "malformed normal record".to_string());
            return;
        };
        self.normals.push(n);
    }

    fn texcoord_record(&mut self, rest: &[&str], line: usize) {
        let Some(uv) = parse_vec2(rest) else {
            self.warn(line, "malformed texcoord record".to_string());
            return;
        };
        self.texcoords.push(uv);
    }

    fn nav_vertex(&mut self, name: &str, p: Vec3, line: usize) {
        let Some(group) = self.nav_groups.get_mut(name) else {
            return;
        };
        match group.pending.take() {
            Some((a, _)) => {
                let tag = group.tag;
                group.edges.push(NavEdge { a, b: p, tag });
            }
            None => group.pending = Some((p, line)),
        }
    }

    fn group_record(&mut self, rest: &[&str], line: usize) {
        if rest.is_empty() {
            self.warn(line, "group record without a name".to_string());
            return;
        }
        let name = rest.join(" ");

        if name.starts_with(NAV_GROUP_PREFIX) {
            let tag = self.nav_groups.len() as u32;
            self.nav_groups.entry(name.clone()).or_insert(NavGroup {
                tag,
                edges: Vec::new(),
                pending: None,
            });
            self.active = Some(ActiveGroup::Nav(name));
            return;
        }

        // 重复的分组名重新选中既有模型，声明位置保持首次出现处
        let index = self.intern_model(&name);
        self.active = Some(ActiveGroup::Mesh(index));
    }

    fn intern_model(&mut self, name: &str) -> usize {
        match self.model_lookup.get(name) {
            Some(&i) => i,
            None => {
                let i = self.models.len();
                self.models.push(Model::new(name));
                self.corner_maps.push(HashMap::new());
                self.model_lookup.insert(name.to_string(), i);
                i
            }
        }
    }

    fn material_record(&mut self, rest: &[&str], line: usize) {
        let Some(&name) = rest.first() else {
            self.warn(line, "usemtl record without a name".to_string());
            return;
        };
        let id = match self.material_lookup.get(name) {
            Some(&i) => i,
            None => {
                let i = self.materials.len() as u32;
                self.materials.push(name.to_string());
                self.material_lookup.insert(name.to_string(), i);
                i
            }
        };
        self.active_material = id;
    }

    fn face_record(&mut self, rest: &[&str], line: usize) -> TilerResult<()> {
        if let Some(ActiveGroup::Nav(name)) = &self.active {
            return Err(TilerError::Geometry {
                line,
                message: format!("face record inside navigation group '{}'", name),
            });
        }

        // 先整行解析角点：畸形记号跳过整个面，越界索引立即终止
        let mut corners = Vec::with_capacity(rest.len());
        for token in rest {
            match parse_corner(token) {
                Some(c) => corners.push(c),
                None => {
                    self.warn(line, format!("malformed face corner '{}'", token));
                    return Ok(());
                }
            }
        }
        if corners.len() < 3 {
            self.warn(line, "face with fewer than 3 corners".to_string());
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(corners.len());
        for (v, vt, vn) in corners {
            resolved.push((
                resolve_index(v, self.positions.len(), line)?,
                match vt {
                    Some(i) => resolve_index(i, self.texcoords.len(), line)?,
                    None => 0,
                },
                match vn {
                    Some(i) => resolve_index(i, self.normals.len(), line)?,
                    None => 0,
                },
            ));
        }

        let model = self.ensure_active_model();
        let material = self.active_material;
        let mut locals = Vec::with_capacity(resolved.len());
        for corner in resolved {
            locals.push(self.push_corner(model, corner));
        }

        // 扇形三角化：首角点为公共顶点
        for i in 1..locals.len() - 1 {
            self.models[model].triangles.push(TileTriangle {
                indices: [locals[0], locals[i], locals[i + 1]],
                material,
            });
        }
        Ok(())
    }

    fn ensure_active_model(&mut self) -> usize {
        if let Some(ActiveGroup::Mesh(i)) = &self.active {
            return *i;
        }
        // 任何分组声明之前的面进入隐式 default 模型
        let index = self.intern_model("default");
        self.active = Some(ActiveGroup::Mesh(index));
        index
    }

    /// 角点按 (v, vt, vn) 三元组在所属模型内去重，首见顺序即顶点顺序
    fn push_corner(&mut self, model: usize, corner: (u32, u32, u32)) -> u32 {
        if let Some(&local) = self.corner_maps[model].get(&corner) {
            return local;
        }
        let (v, vt, vn) = corner;
        let position = self.positions[(v - 1) as usize];
        let vertex = TileVertex {
            position: position.to_array(),
            normal: if vn != 0 {
                self.normals[(vn - 1) as usize].to_array()
            } else {
                [0.0, 1.0, 0.0]
            },
            uv: if vt != 0 {
                self.texcoords[(vt - 1) as usize].to_array()
            } else {
                [0.0, 0.0]
            },
        };
        let target = &mut self.models[model];
        let local = target.vertices.len() as u32;
        target.vertices.push(vertex);
        target.bounds.extend(position);
        self.extent.extend(position);
        self.corner_maps[model].insert(corner, local);
        local
    }
}

fn parse_vec3(rest: &[&str]) -> Option<Vec3> {
    if rest.len() < 3 {
        return None;
    }
    Some(Vec3::new(
        rest[0].parse().ok()?,
        rest[1].parse().ok()?,
        rest[2].parse().ok()?,
    ))
}

fn parse_vec2(rest: &[&str]) -> Option<Vec2> {
    if rest.len() < 2 {
        return None;
    }
    Some(Vec2::new(rest[0].parse().ok()?, rest[1].parse().ok()?))
}

// 角点形态: "v"、"v/vt"、"v//vn"、"v/vt/vn"
fn parse_corner(token: &str) -> Option<(i64, Option<i64>, Option<i64>)> {
    let mut parts = token.split('/');
    let v = parts.next()?.parse().ok()?;
    let vt = match parts.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse().ok()?),
    };
    let vn = match parts.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse().ok()?),
    };
    if parts.next().is_some() {
        return None;
    }
    Some((v, vt, vn))
}

// 负索引相对当前累计数解析：count + index + 1
fn resolve_index(index: i64, count: usize, line: usize) -> TilerResult<u32> {
    let resolved = if index < 0 {
        count as i64 + index + 1
    } else {
        index
    };
    if resolved < 1 || resolved > count as i64 {
        return Err(TilerError::Geometry {
            line,
            message: format!("index {} out of range (running count {})", index, count),
        });
    }
    Ok(resolved as u32)
}
