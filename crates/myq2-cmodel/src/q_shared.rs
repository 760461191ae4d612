// q_shared.rs — contents/surface flags, planes, traces and the vector math they need
// Derived from: myq2-original/game/q_shared.h + q_shared.c

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

pub const PITCH: usize = 0;
pub const YAW: usize = 1;
pub const ROLL: usize = 2;

// ============================================================
// Content flags
// ============================================================

bitflags::bitflags! {
    /// Contents of a leaf or brush. Lower bits are visible contents,
    /// upper bits are game-only. Unknown bits from the map are kept.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Contents: i32 {
        const SOLID         = 1;
        const WINDOW        = 2;
        const AUX           = 4;
        const LAVA          = 8;
        const SLIME         = 16;
        const WATER         = 32;
        const MIST          = 64;

        const AREAPORTAL    = 0x8000;
        const PLAYERCLIP    = 0x10000;
        const MONSTERCLIP   = 0x20000;

        const CURRENT_0     = 0x40000;
        const CURRENT_90    = 0x80000;
        const CURRENT_180   = 0x100000;
        const CURRENT_270   = 0x200000;
        const CURRENT_UP    = 0x400000;
        const CURRENT_DOWN  = 0x800000;

        const ORIGIN        = 0x1000000;
        const MONSTER       = 0x2000000;
        const DEADMONSTER   = 0x4000000;
        const DETAIL        = 0x8000000;
        const TRANSLUCENT   = 0x10000000;
        const LADDER        = 0x20000000;
    }
}

pub const LAST_VISIBLE_CONTENTS: Contents = Contents::MIST;

// ============================================================
// Content masks
// ============================================================

pub const MASK_ALL: Contents = Contents::from_bits_retain(-1);
pub const MASK_SOLID: Contents = Contents::SOLID.union(Contents::WINDOW);
pub const MASK_PLAYERSOLID: Contents = Contents::SOLID
    .union(Contents::PLAYERCLIP)
    .union(Contents::WINDOW)
    .union(Contents::MONSTER);
pub const MASK_DEADSOLID: Contents = Contents::SOLID
    .union(Contents::PLAYERCLIP)
    .union(Contents::WINDOW);
pub const MASK_MONSTERSOLID: Contents = Contents::SOLID
    .union(Contents::MONSTERCLIP)
    .union(Contents::WINDOW)
    .union(Contents::MONSTER);
pub const MASK_WATER: Contents = Contents::WATER.union(Contents::LAVA).union(Contents::SLIME);
pub const MASK_OPAQUE: Contents = Contents::SOLID.union(Contents::SLIME).union(Contents::LAVA);
pub const MASK_SHOT: Contents = Contents::SOLID
    .union(Contents::MONSTER)
    .union(Contents::WINDOW)
    .union(Contents::DEADMONSTER);
pub const MASK_CURRENT: Contents = Contents::CURRENT_0
    .union(Contents::CURRENT_90)
    .union(Contents::CURRENT_180)
    .union(Contents::CURRENT_270)
    .union(Contents::CURRENT_UP)
    .union(Contents::CURRENT_DOWN);

// ============================================================
// Surface flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: i32 {
        const LIGHT    = 0x1;
        const SLICK    = 0x2;
        const SKY      = 0x4;
        const WARP     = 0x8;
        const TRANS33  = 0x10;
        const TRANS66  = 0x20;
        const FLOWING  = 0x40;
        const NODRAW   = 0x80;
    }
}

// ============================================================
// Plane
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8,
    /// signx + (signy<<1) + (signz<<2), for the box-on-plane-side test
    pub signbits: u8,
}

impl CPlane {
    pub fn new(normal: Vec3, dist: f32, plane_type: u8) -> Self {
        Self {
            normal,
            dist,
            plane_type,
            signbits: signbits_for_normal(&normal),
        }
    }

    /// Rewrite the normal, keeping `signbits` in sync with it.
    pub fn set_normal(&mut self, normal: Vec3) {
        self.normal = normal;
        self.signbits = signbits_for_normal(&normal);
    }

    /// Signed distance from the plane, with the axial fast path.
    #[inline]
    pub fn distance(&self, p: &Vec3) -> f32 {
        let t = self.plane_type as usize;
        if t < 3 {
            p[t] - self.dist
        } else {
            dot_product(&self.normal, p) - self.dist
        }
    }
}

pub fn signbits_for_normal(normal: &Vec3) -> u8 {
    let mut bits = 0u8;
    for (j, n) in normal.iter().enumerate() {
        if *n < 0.0 {
            bits |= 1 << j;
        }
    }
    bits
}

// ============================================================
// Surface / trace
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CSurface {
    /// NUL-padded texture name, truncated to 15 characters
    pub name: [u8; 16],
    pub flags: SurfaceFlags,
    pub value: i32,
}

impl CSurface {
    pub fn name_str(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }
}

/// Result of a point test or swept box.
///
/// `fraction == 1.0` with neither solid flag set means nothing was hit.
/// `surface` is `None` for the null surface (box hull sides, untextured sides).
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// if true, plane is not valid
    pub allsolid: bool,
    /// if true, the initial point was in a solid area
    pub startsolid: bool,
    /// time completed, 1.0 = didn't hit anything
    pub fraction: f32,
    /// final position
    pub endpos: Vec3,
    /// surface normal at impact
    pub plane: CPlane,
    pub surface: Option<CSurface>,
    /// contents on other side of surface hit
    pub contents: Contents,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            fraction: 1.0,
            endpos: [0.0; 3],
            plane: CPlane::default(),
            surface: None,
            contents: Contents::empty(),
        }
    }
}

// ============================================================
// MATHLIB
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// a + frac * (b - a)
#[inline]
pub fn vector_lerp(a: &Vec3, b: &Vec3, frac: f32) -> Vec3 {
    [
        a[0] + frac * (b[0] - a[0]),
        a[1] + frac * (b[1] - a[1]),
        a[2] + frac * (b[2] - a[2]),
    ]
}

#[inline]
pub fn vector_is_zero(v: &Vec3) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

/// Returns (forward, right, up) for Euler angles in degrees.
pub fn angle_vectors(angles: &Vec3) -> (Vec3, Vec3, Vec3) {
    let (sy, cy) = angles[YAW].to_radians().sin_cos();
    let (sp, cp) = angles[PITCH].to_radians().sin_cos();
    let (sr, cr) = angles[ROLL].to_radians().sin_cos();

    let forward = [cp * cy, cp * sy, -sp];
    let right = [
        -sr * sp * cy + -cr * -sy,
        -sr * sp * sy + -cr * cy,
        -sr * cp,
    ];
    let up = [
        cr * sp * cy + -sr * -sy,
        cr * sp * sy + -sr * cy,
        cr * cp,
    ];
    (forward, right, up)
}

/// Express `v` in the (forward, -right, up) frame of `angles`.
pub fn rotate_into_frame(v: &Vec3, angles: &Vec3) -> Vec3 {
    let (forward, right, up) = angle_vectors(angles);
    [
        dot_product(v, &forward),
        -dot_product(v, &right),
        dot_product(v, &up),
    ]
}

/// Which side of a plane an axis-aligned box lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    Front,
    Back,
    Straddle,
}

pub fn box_on_plane_side(emins: &Vec3, emaxs: &Vec3, p: &CPlane) -> PlaneSide {
    // fast axial cases
    let t = p.plane_type as usize;
    if t < 3 {
        if p.dist <= emins[t] {
            return PlaneSide::Front;
        }
        if p.dist >= emaxs[t] {
            return PlaneSide::Back;
        }
        return PlaneSide::Straddle;
    }

    // general case: the corner furthest along the normal and the one furthest against it
    let mut far = [0.0f32; 3];
    let mut near = [0.0f32; 3];
    for j in 0..3 {
        if p.signbits & (1 << j) != 0 {
            far[j] = emins[j];
            near[j] = emaxs[j];
        } else {
            far[j] = emaxs[j];
            near[j] = emins[j];
        }
    }
    let dist1 = dot_product(&p.normal, &far);
    let dist2 = dot_product(&p.normal, &near);

    match (dist1 >= p.dist, dist2 < p.dist) {
        (true, true) => PlaneSide::Straddle,
        (true, false) => PlaneSide::Front,
        _ => PlaneSide::Back,
    }
}

// ============================================================
// Tests
// ============================================================
