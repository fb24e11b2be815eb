use bytemuck::{Pod, Zeroable};

pub mod error;
pub mod pipeline;

pub use error::{TilerError, TilerResult};

pub const TILE_MAGIC: [u8; 4] = *b"CTIL";
pub const TILE_VERSION: u32 = 1;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TileHeader {
    pub magic: [u8; 4], // "CTIL"
    pub version: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3], // 12字节
    pub normal: [f32; 3],   // 12字节
    pub uv: [f32; 2],       // 8字节，总计 32 字节
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TileTriangle {
    pub indices: [u32; 3], // 指向所属模型顶点表
    pub material: u32,     // 材质表序号
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct EdgeRecord {
    pub a: [f32; 3],
    pub b: [f32; 3],
    pub tag: u32, // 总计 28 字节
}
