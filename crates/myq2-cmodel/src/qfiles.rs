// qfiles.rs — on-disk BSP layout: header, lump directory and the collision records
// Derived from: myq2-original/qcommon/qfiles.h

// ============================================================
// BSP file format
// ============================================================

/// BSP magic: "IBSP" in little-endian
pub const IDBSPHEADER: i32 =
    (b'P' as i32) << 24 | (b'S' as i32) << 16 | (b'B' as i32) << 8 | b'I' as i32;
pub const BSPVERSION: i32 = 38;

// Upper design bounds
pub const MAX_MAP_MODELS: usize = 1024;
pub const MAX_MAP_BRUSHES: usize = 8192;
pub const MAX_MAP_ENTSTRING: usize = 0x40000;
pub const MAX_MAP_TEXINFO: usize = 8192;
pub const MAX_MAP_AREAS: usize = 256;
pub const MAX_MAP_AREAPORTALS: usize = 1024;
pub const MAX_MAP_PLANES: usize = 65536;
pub const MAX_MAP_NODES: usize = 65536;
pub const MAX_MAP_BRUSHSIDES: usize = 65536;
pub const MAX_MAP_LEAFS: usize = 65536;
pub const MAX_MAP_LEAFBRUSHES: usize = 65536;
pub const MAX_MAP_VISIBILITY: usize = 0x100000;

// Lump indices
pub const LUMP_ENTITIES: usize = 0;
pub const LUMP_PLANES: usize = 1;
pub const LUMP_VERTEXES: usize = 2;
pub const LUMP_VISIBILITY: usize = 3;
pub const LUMP_NODES: usize = 4;
pub const LUMP_TEXINFO: usize = 5;
pub const LUMP_FACES: usize = 6;
pub const LUMP_LIGHTING: usize = 7;
pub const LUMP_LEAFS: usize = 8;
pub const LUMP_LEAFFACES: usize = 9;
pub const LUMP_LEAFBRUSHES: usize = 10;
pub const LUMP_EDGES: usize = 11;
pub const LUMP_SURFEDGES: usize = 12;
pub const LUMP_MODELS: usize = 13;
pub const LUMP_BRUSHES: usize = 14;
pub const LUMP_BRUSHSIDES: usize = 15;
pub const LUMP_POP: usize = 16;
pub const LUMP_AREAS: usize = 17;
pub const LUMP_AREAPORTALS: usize = 18;
pub const HEADER_LUMPS: usize = 19;

/// ident + version + lump directory
pub const HEADER_SIZE: usize = 8 + HEADER_LUMPS * 8;

// Plane types: 0-2 are axial planes with a positive normal,
// 3-5 are "snapped to the nearest axis" and need the full dot product.
pub const PLANE_X: u8 = 0;
pub const PLANE_Y: u8 = 1;
pub const PLANE_Z: u8 = 2;
pub const PLANE_ANYX: u8 = 3;
pub const PLANE_ANYY: u8 = 4;
pub const PLANE_ANYZ: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lump {
    pub fileofs: i32,
    pub filelen: i32,
}

// ============================================================
// Little-endian field readers
// ============================================================

#[inline]
pub(crate) fn le_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[inline]
pub(crate) fn le_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[inline]
pub(crate) fn le_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
pub(crate) fn le_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

fn le_vec3(data: &[u8], offset: usize) -> [f32; 3] {
    [
        le_f32(data, offset),
        le_f32(data, offset + 4),
        le_f32(data, offset + 8),
    ]
}

// ============================================================
// Fixed-size lump records
// ============================================================

/// A fixed-size record stored back to back inside one lump.
///
/// `parse` is only ever handed a slice of exactly `SIZE` bytes.
pub trait Record: Sized + Send {
    const SIZE: usize;
    /// Lump name used in load errors.
    const NAME: &'static str;

    fn parse(rec: &[u8]) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DPlane {
    pub normal: [f32; 3],
    pub dist: f32,
    pub plane_type: i32,
}

impl Record for DPlane {
    const SIZE: usize = 20;
    const NAME: &'static str = "planes";

    fn parse(rec: &[u8]) -> Self {
        Self {
            normal: le_vec3(rec, 0),
            dist: le_f32(rec, 12),
            plane_type: le_i32(rec, 16),
        }
    }
}

/// dnode_t: planenum, children[2], then mins/maxs/face range that
/// only the renderer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DNode {
    pub planenum: i32,
    pub children: [i32; 2],
}

impl Record for DNode {
    const SIZE: usize = 28;
    const NAME: &'static str = "nodes";

    fn parse(rec: &[u8]) -> Self {
        Self {
            planenum: le_i32(rec, 0),
            children: [le_i32(rec, 4), le_i32(rec, 8)],
        }
    }
}

// dleaf_t layout:
// contents: i32 (4), cluster: i16 (2), area: i16 (2)
// mins: [i16; 3] (6), maxs: [i16; 3] (6)
// firstleafface: u16 (2), numleaffaces: u16 (2)
// firstleafbrush: u16 (2), numleafbrushes: u16 (2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLeaf {
    pub contents: i32,
    pub cluster: i16,
    pub area: i16,
    pub firstleafbrush: u16,
    pub numleafbrushes: u16,
}

impl Record for DLeaf {
    const SIZE: usize = 28;
    const NAME: &'static str = "leafs";

    fn parse(rec: &[u8]) -> Self {
        Self {
            contents: le_i32(rec, 0),
            cluster: le_i16(rec, 4),
            area: le_i16(rec, 6),
            firstleafbrush: le_u16(rec, 24),
            numleafbrushes: le_u16(rec, 26),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLeafBrush(pub u16);

impl Record for DLeafBrush {
    const SIZE: usize = 2;
    const NAME: &'static str = "leafbrushes";

    fn parse(rec: &[u8]) -> Self {
        Self(le_u16(rec, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DBrush {
    pub firstside: i32,
    pub numsides: i32,
    pub contents: i32,
}

impl Record for DBrush {
    const SIZE: usize = 12;
    const NAME: &'static str = "brushes";

    fn parse(rec: &[u8]) -> Self {
        Self {
            firstside: le_i32(rec, 0),
            numsides: le_i32(rec, 4),
            contents: le_i32(rec, 8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DBrushSide {
    pub planenum: u16,
    pub texinfo: i16,
}

impl Record for DBrushSide {
    const SIZE: usize = 4;
    const NAME: &'static str = "brushsides";

    fn parse(rec: &[u8]) -> Self {
        Self {
            planenum: le_u16(rec, 0),
            texinfo: le_i16(rec, 2),
        }
    }
}

/// dmodel_t minus the face range (firstface/numfaces at 40..48).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DModel {
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub origin: [f32; 3],
    pub headnode: i32,
}

impl Record for DModel {
    const SIZE: usize = 48;
    const NAME: &'static str = "models";

    fn parse(rec: &[u8]) -> Self {
        Self {
            mins: le_vec3(rec, 0),
            maxs: le_vec3(rec, 12),
            origin: le_vec3(rec, 24),
            headnode: le_i32(rec, 36),
        }
    }
}

/// texinfo_t: vecs[2][4] (32), flags, value, texture[32], nexttexinfo.
/// Collision only keeps flags, value and the texture name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexInfo {
    pub flags: i32,
    pub value: i32,
    pub texture: [u8; 32],
}

impl Record for TexInfo {
    const SIZE: usize = 76;
    const NAME: &'static str = "surfaces";

    fn parse(rec: &[u8]) -> Self {
        let mut texture = [0u8; 32];
        texture.copy_from_slice(&rec[40..72]);
        Self {
            flags: le_i32(rec, 32),
            value: le_i32(rec, 36),
            texture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DArea {
    pub numareaportals: i32,
    pub firstareaportal: i32,
}

impl Record for DArea {
    const SIZE: usize = 8;
    const NAME: &'static str = "areas";

    fn parse(rec: &[u8]) -> Self {
        Self {
            numareaportals: le_i32(rec, 0),
            firstareaportal: le_i32(rec, 4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DAreaPortal {
    pub portalnum: i32,
    pub otherarea: i32,
}

impl Record for DAreaPortal {
    const SIZE: usize = 8;
    const NAME: &'static str = "areaportals";

    fn parse(rec: &[u8]) -> Self {
        Self {
            portalnum: le_i32(rec, 0),
            otherarea: le_i32(rec, 4),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
