// testmap.rs — builds small but valid BSP buffers for the unit tests

use crate::cmodel::CModelContext;
use crate::q_shared::{Contents, SurfaceFlags, Vec3};
use crate::qfiles::*;

/// Write side of the lump records, in on-disk layout.
trait Encode {
    fn encode(&self, out: &mut Vec<u8>);
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_vec3(out: &mut Vec<u8>, v: &Vec3) {
    v.iter().for_each(|f| put_f32(out, *f));
}

impl Encode for DPlane {
    fn encode(&self, out: &mut Vec<u8>) {
        put_vec3(out, &self.normal);
        put_f32(out, self.dist);
        put_i32(out, self.plane_type);
    }
}

impl Encode for DNode {
    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.planenum);
        put_i32(out, self.children[0]);
        put_i32(out, self.children[1]);
        // mins, maxs, firstface, numfaces
        out.extend_from_slice(&[0u8; 16]);
    }
}

impl Encode for DLeaf {
    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.contents);
        out.extend_from_slice(&self.cluster.to_le_bytes());
        out.extend_from_slice(&self.area.to_le_bytes());
        // mins, maxs, firstleafface, numleaffaces
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&self.firstleafbrush.to_le_bytes());
        out.extend_from_slice(&self.numleafbrushes.to_le_bytes());
    }
}

impl Encode for DBrush {
    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.firstside);
        put_i32(out, self.numsides);
        put_i32(out, self.contents);
    }
}

impl Encode for DBrushSide {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.planenum.to_le_bytes());
        out.extend_from_slice(&self.texinfo.to_le_bytes());
    }
}

impl Encode for DModel {
    fn encode(&self, out: &mut Vec<u8>) {
        put_vec3(out, &self.mins);
        put_vec3(out, &self.maxs);
        put_vec3(out, &self.origin);
        put_i32(out, self.headnode);
        // firstface, numfaces
        out.extend_from_slice(&[0u8; 8]);
    }
}

impl Encode for TexInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        // texture vecs
        out.extend_from_slice(&[0u8; 32]);
        put_i32(out, self.flags);
        put_i32(out, self.value);
        out.extend_from_slice(&self.texture);
        // nexttexinfo
        put_i32(out, -1);
    }
}

fn encode_all<T: Encode>(records: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    records.iter().for_each(|r| r.encode(&mut out));
    out
}

fn encode_pairs(pairs: &[(i32, i32)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (a, b) in pairs {
        put_i32(&mut out, *a);
        put_i32(&mut out, *b);
    }
    out
}

fn axial(axis: usize, dist: f32) -> [DPlane; 2] {
    let mut normal = [0.0; 3];
    normal[axis] = 1.0;
    let front = DPlane {
        normal,
        dist,
        plane_type: axis as i32,
    };
    normal[axis] = -1.0;
    let back = DPlane {
        normal,
        dist: -dist,
        plane_type: PLANE_ANYX as i32 + axis as i32,
    };
    [front, back]
}

fn texinfo(name: &str, flags: SurfaceFlags) -> TexInfo {
    let mut texture = [0u8; 32];
    texture[..name.len()].copy_from_slice(name.as_bytes());
    TexInfo {
        flags: flags.bits(),
        value: 0,
        texture,
    }
}

fn leaf(contents: Contents, cluster: i16, area: i16, firstleafbrush: u16, numleafbrushes: u16) -> DLeaf {
    DLeaf {
        contents: contents.bits(),
        cluster,
        area,
        firstleafbrush,
        numleafbrushes,
    }
}

fn node(planenum: i32, front: i32, back: i32) -> DNode {
    DNode {
        planenum,
        children: [front, back],
    }
}

fn side(planenum: u16, texinfo: i16) -> DBrushSide {
    DBrushSide { planenum, texinfo }
}

/// Leaf child index in on-disk form.
const fn l(leaf: i32) -> i32 {
    -1 - leaf
}

pub(crate) struct TestMap {
    pub entities: Vec<u8>,
    pub planes: Vec<DPlane>,
    pub nodes: Vec<DNode>,
    pub texinfo: Vec<TexInfo>,
    pub leafs: Vec<DLeaf>,
    pub leafbrushes: Vec<u16>,
    pub models: Vec<DModel>,
    pub brushes: Vec<DBrush>,
    pub brushsides: Vec<DBrushSide>,
    /// (numareaportals, firstareaportal)
    pub areas: Vec<(i32, i32)>,
    /// (portalnum, otherarea)
    pub areaportals: Vec<(i32, i32)>,
    pub visibility: Vec<u8>,
    raw: Vec<Option<Vec<u8>>>,
}

impl TestMap {
    fn new() -> Self {
        Self {
            entities: Vec::new(),
            planes: Vec::new(),
            nodes: Vec::new(),
            texinfo: Vec::new(),
            leafs: Vec::new(),
            leafbrushes: Vec::new(),
            models: Vec::new(),
            brushes: Vec::new(),
            brushsides: Vec::new(),
            areas: Vec::new(),
            areaportals: Vec::new(),
            visibility: Vec::new(),
            raw: vec![None; HEADER_LUMPS],
        }
    }

    /// A solid 64 unit cube at the origin inside an empty room, plus a door
    /// model "*1" whose solid half-space starts at x = 200.
    ///
    /// Leafs: 0 reserved solid, 1 room (cluster 0, area 1), 2 cube,
    /// 3 door (area 2). Areas 1 and 2 share portal 1, closed at load.
    pub fn cube_room() -> Self {
        let mut map = Self::new();
        map.entities = b"{\n\"classname\" \"worldspawn\"\n}\n\0".to_vec();

        // planes come in (positive, negative) pairs
        for (axis, dist) in [(2, 64.0), (2, 0.0), (0, 64.0), (0, 0.0), (1, 64.0), (1, 0.0), (0, 200.0)] {
            map.planes.extend(axial(axis, dist));
        }

        map.nodes = vec![
            node(0, l(1), 1),  // z = 64
            node(2, 2, l(1)),  // z = 0
            node(4, l(1), 3),  // x = 64
            node(6, 4, l(1)),  // x = 0
            node(8, l(1), 5),  // y = 64
            node(10, l(2), l(1)), // y = 0
            node(12, l(3), l(1)), // door, x = 200
        ];

        map.texinfo = vec![
            texinfo("e1u1/floor", SurfaceFlags::empty()),
            texinfo("e1u1/door", SurfaceFlags::SLICK),
        ];

        map.leafs = vec![
            leaf(Contents::SOLID, -1, 0, 0, 0),
            leaf(Contents::empty(), 0, 1, 0, 0),
            leaf(Contents::SOLID, -1, 1, 0, 1),
            leaf(Contents::SOLID, -1, 2, 1, 1),
        ];
        map.leafbrushes = vec![0, 1];

        map.brushes = vec![
            DBrush { firstside: 0, numsides: 6, contents: Contents::SOLID.bits() },
            DBrush { firstside: 6, numsides: 1, contents: Contents::SOLID.bits() },
        ];
        map.brushsides = vec![
            side(4, -1),  // +x
            side(7, -1),  // -x
            side(8, -1),  // +y
            side(11, -1), // -y
            side(0, 0),   // +z, textured top
            side(3, -1),  // -z
            side(13, 1),  // door face
        ];

        map.models = vec![
            DModel {
                mins: [-1024.0; 3],
                maxs: [1024.0; 3],
                origin: [0.0; 3],
                headnode: 0,
            },
            DModel {
                mins: [200.0, -64.0, 0.0],
                maxs: [264.0, 64.0, 128.0],
                origin: [0.0; 3],
                headnode: 6,
            },
        ];

        map.areas = vec![(0, 0), (1, 0), (1, 1)];
        map.areaportals = vec![(1, 2), (1, 1)];
        map.visibility = vec![1, 0, 0, 0];
        map
    }

    /// Two slab brushes across the x axis: X (SOLID) spans 100..120 and
    /// Y (WINDOW) spans 200..220, in separate leafs.
    pub fn split_pair() -> Self {
        let mut map = Self::new();

        for dist in [160.0, 200.0, 220.0, 120.0, 100.0] {
            map.planes.extend(axial(0, dist));
        }

        map.nodes = vec![
            node(0, 1, 2),         // x = 160
            node(2, 3, l(1)),      // x = 200
            node(6, l(1), 4),      // x = 120
            node(4, l(1), l(3)),   // x = 220
            node(8, l(2), l(1)),   // x = 100
        ];

        map.texinfo = vec![
            texinfo("x_wall", SurfaceFlags::empty()),
            texinfo("y_wall", SurfaceFlags::empty()),
        ];

        map.leafs = vec![
            leaf(Contents::SOLID, -1, 0, 0, 0),
            leaf(Contents::empty(), 0, 1, 0, 0),
            leaf(Contents::SOLID, -1, 1, 0, 1),
            leaf(Contents::WINDOW, -1, 1, 1, 1),
        ];
        map.leafbrushes = vec![0, 1];

        map.brushes = vec![
            DBrush { firstside: 0, numsides: 2, contents: Contents::SOLID.bits() },
            DBrush { firstside: 2, numsides: 2, contents: Contents::WINDOW.bits() },
        ];
        map.brushsides = vec![side(6, 0), side(9, 0), side(4, 1), side(3, 1)];

        map.models = vec![DModel {
            mins: [-512.0; 3],
            maxs: [512.0; 3],
            origin: [0.0; 3],
            headnode: 0,
        }];

        map.areas = vec![(0, 0), (0, 0)];
        map
    }

    /// One SOLID slab brush over x = 100..120, cut by a node at x = 110 so
    /// the brush is listed in both halves (leafs 2 and 3).
    pub fn split_slab() -> Self {
        let mut map = Self::new();

        for dist in [110.0, 120.0, 100.0] {
            map.planes.extend(axial(0, dist));
        }

        map.nodes = vec![
            node(0, 1, 2),       // x = 110
            node(2, l(1), l(2)), // x = 120
            node(4, l(3), l(1)), // x = 100
        ];

        map.texinfo = vec![texinfo("slab", SurfaceFlags::empty())];

        map.leafs = vec![
            leaf(Contents::SOLID, -1, 0, 0, 0),
            leaf(Contents::empty(), 0, 1, 0, 0),
            leaf(Contents::SOLID, -1, 1, 0, 1),
            leaf(Contents::SOLID, -1, 1, 1, 1),
        ];
        map.leafbrushes = vec![0, 0];

        map.brushes = vec![DBrush { firstside: 0, numsides: 2, contents: Contents::SOLID.bits() }];
        map.brushsides = vec![side(2, 0), side(5, 0)];

        map.models = vec![DModel {
            mins: [-512.0; 3],
            maxs: [512.0; 3],
            origin: [0.0; 3],
            headnode: 0,
        }];

        map.areas = vec![(0, 0), (0, 0)];
        map
    }

    /// A SOLID half-space in front of the diagonal plane
    /// `(x + y) / sqrt(2) = 100`. Leaf 2 holds the wall, leaf 1 is open.
    pub fn diagonal_wall() -> Self {
        let mut map = Self::new();

        let s = std::f32::consts::FRAC_1_SQRT_2;
        map.planes = vec![
            DPlane { normal: [s, s, 0.0], dist: 100.0, plane_type: PLANE_ANYX as i32 },
            DPlane { normal: [-s, -s, 0.0], dist: -100.0, plane_type: PLANE_ANYX as i32 },
        ];

        map.nodes = vec![node(0, l(2), l(1))];

        map.texinfo = vec![texinfo("diag", SurfaceFlags::empty())];

        map.leafs = vec![
            leaf(Contents::SOLID, -1, 0, 0, 0),
            leaf(Contents::empty(), 0, 1, 0, 0),
            leaf(Contents::SOLID, -1, 1, 0, 1),
        ];
        map.leafbrushes = vec![0];

        map.brushes = vec![DBrush { firstside: 0, numsides: 1, contents: Contents::SOLID.bits() }];
        map.brushsides = vec![side(1, 0)];

        map.models = vec![DModel {
            mins: [-512.0; 3],
            maxs: [512.0; 3],
            origin: [0.0; 3],
            headnode: 0,
        }];

        map.areas = vec![(0, 0), (0, 0)];
        map
    }

    /// Replace a lump's bytes verbatim.
    pub fn raw_lump(&mut self, lump: usize, bytes: Vec<u8>) {
        self.raw[lump] = Some(bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); HEADER_LUMPS];
        lumps[LUMP_ENTITIES] = self.entities.clone();
        lumps[LUMP_PLANES] = encode_all(&self.planes);
        lumps[LUMP_VISIBILITY] = self.visibility.clone();
        lumps[LUMP_NODES] = encode_all(&self.nodes);
        lumps[LUMP_TEXINFO] = encode_all(&self.texinfo);
        lumps[LUMP_LEAFS] = encode_all(&self.leafs);
        lumps[LUMP_LEAFBRUSHES] = self.leafbrushes.iter().flat_map(|b| b.to_le_bytes()).collect();
        lumps[LUMP_MODELS] = encode_all(&self.models);
        lumps[LUMP_BRUSHES] = encode_all(&self.brushes);
        lumps[LUMP_BRUSHSIDES] = encode_all(&self.brushsides);
        lumps[LUMP_AREAS] = encode_pairs(&self.areas);
        lumps[LUMP_AREAPORTALS] = encode_pairs(&self.areaportals);
        for (i, raw) in self.raw.iter().enumerate() {
            if let Some(bytes) = raw {
                lumps[i] = bytes.clone();
            }
        }

        let mut out = Vec::new();
        put_i32(&mut out, IDBSPHEADER);
        put_i32(&mut out, BSPVERSION);

        let mut ofs = HEADER_SIZE;
        for lump in &lumps {
            put_i32(&mut out, ofs as i32);
            put_i32(&mut out, lump.len() as i32);
            ofs += lump.len();
        }
        for lump in &lumps {
            out.extend_from_slice(lump);
        }
        out
    }
}

/// A fresh context with `map` loaded as "maps/test.bsp".
pub(crate) fn loaded(map: TestMap) -> CModelContext {
    let mut ctx = CModelContext::new();
    ctx.load_map("maps/test.bsp", false, Some(&map.to_bytes()))
        .expect("test map loads");
    ctx
}
