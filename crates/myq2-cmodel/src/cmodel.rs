// cmodel.rs — collision model context: loaded map arrays, map load/unload and accessors
// Derived from: myq2-original/qcommon/cmodel.c

use std::cell::Cell;

use log::info;

use crate::box_hull::BoxHull;
use crate::config::CmodelConfig;
use crate::error::{CmodelError, Result};
use crate::md4::com_block_checksum;
use crate::q_shared::{CPlane, CSurface, Contents, Vec3};
use crate::qfiles::MAX_MAP_AREAPORTALS;
use crate::tree::NodeRef;

// ============================================================
// Runtime structures (not the on-disk layout)
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CNode {
    pub plane: usize,
    /// [front, back]
    pub children: [NodeRef; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CBrushSide {
    pub plane: usize,
    /// None is the null surface
    pub surface: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CLeaf {
    pub contents: Contents,
    pub cluster: i32,
    pub area: i32,
    pub firstleafbrush: usize,
    pub numleafbrushes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CBrush {
    pub contents: Contents,
    pub firstbrushside: usize,
    pub numsides: usize,
    /// trace generation that last tested this brush
    pub checkcount: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CArea {
    pub numareaportals: usize,
    pub firstareaportal: usize,
    pub floodnum: i32,
    /// flood generation that last stamped this area
    pub floodvalid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CAreaPortal {
    pub portalnum: usize,
    pub otherarea: usize,
}

/// A rigid collision object: the world (model 0) or an inline brush model.
/// Bounds are spread by one unit on each side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CModel {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub origin: Vec3,
    pub headnode: NodeRef,
}

/// Every array parsed out of one BSP file, plus the box hull appended
/// past the loaded counts. Capacity is reserved at load time so nothing
/// grows while tracing.
#[derive(Debug, Clone, Default)]
pub(crate) struct MapData {
    pub planes: Vec<CPlane>,
    pub nodes: Vec<CNode>,
    pub leafs: Vec<CLeaf>,
    pub leafbrushes: Vec<u16>,
    pub brushes: Vec<CBrush>,
    pub brushsides: Vec<CBrushSide>,
    pub surfaces: Vec<CSurface>,
    pub cmodels: Vec<CModel>,
    pub areas: Vec<CArea>,
    pub areaportals: Vec<CAreaPortal>,
    pub visibility: Vec<u8>,
    pub entity_string: String,

    // loaded counts, not including the box hull
    pub numplanes: usize,
    pub numnodes: usize,
    pub numleafs: usize,
    pub numleafbrushes: usize,
    pub numbrushes: usize,
    pub numbrushsides: usize,

    pub numclusters: usize,
    pub emptyleaf: usize,
}

impl MapData {
    /// State with no map: one empty leaf so leaf functions can be called,
    /// one cluster, one area and a default world model.
    pub fn empty() -> Self {
        Self {
            leafs: vec![CLeaf::default()],
            cmodels: vec![CModel::default()],
            areas: vec![CArea::default()],
            numleafs: 1,
            numclusters: 1,
            emptyleaf: 0,
            ..Self::default()
        }
    }
}

// ============================================================
// Statistics
// ============================================================

/// c_pointcontents / c_traces / c_brush_traces
#[derive(Debug, Default)]
pub struct CmodelStats {
    pointcontents: Cell<u32>,
    traces: Cell<u32>,
    brush_traces: Cell<u32>,
}

impl CmodelStats {
    pub fn pointcontents(&self) -> u32 {
        self.pointcontents.get()
    }

    pub fn traces(&self) -> u32 {
        self.traces.get()
    }

    pub fn brush_traces(&self) -> u32 {
        self.brush_traces.get()
    }

    pub fn reset(&self) {
        self.pointcontents.set(0);
        self.traces.set(0);
        self.brush_traces.set(0);
    }

    pub(crate) fn bump_pointcontents(&self) {
        self.pointcontents.set(self.pointcontents.get().wrapping_add(1));
    }

    pub(crate) fn bump_traces(&self) {
        self.traces.set(self.traces.get().wrapping_add(1));
    }

    pub(crate) fn bump_brush_traces(&self) {
        self.brush_traces.set(self.brush_traces.get().wrapping_add(1));
    }
}

// ============================================================
// Context: holds all loaded map state
// ============================================================

/// One collision world.
///
/// Queries that touch scratch state (box hull planes, brush check counts,
/// flood stamps) take `&mut self`, so a context is never re-entered; use
/// one context per thread for concurrent collision.
pub struct CModelContext {
    pub config: CmodelConfig,
    pub stats: CmodelStats,

    map_name: String,
    last_checksum: u32,

    pub(crate) map: MapData,
    pub(crate) box_hull: BoxHull,

    /// trace generation, bumped per box trace
    pub(crate) checkcount: u32,
    /// flood generation, bumped per flood pass
    pub(crate) floodvalid: u32,
    pub(crate) portalopen: Vec<bool>,
}

impl CModelContext {
    pub fn new() -> Self {
        Self::with_config(CmodelConfig::default())
    }

    pub fn with_config(config: CmodelConfig) -> Self {
        let mut map = MapData::empty();
        let box_hull = BoxHull::append(&mut map);
        Self {
            config,
            stats: CmodelStats::default(),
            map_name: String::new(),
            last_checksum: 0,
            map,
            box_hull,
            checkcount: 0,
            floodvalid: 0,
            portalopen: vec![false; MAX_MAP_AREAPORTALS],
        }
    }

    // ============================================================
    // CM_LoadMap
    // ============================================================

    /// Load a BSP map from raw file bytes, returning the world model and the
    /// map checksum.
    ///
    /// Reloading the current map skips the parse (unless `flushmap` is set and
    /// this is not a client load); a server reload still closes every portal.
    /// An empty name unloads the map. On error the context is left with no map.
    pub fn load_map(
        &mut self,
        name: &str,
        clientload: bool,
        buf: Option<&[u8]>,
    ) -> Result<(CModel, u32)> {
        if !name.is_empty() && self.map_name == name && (clientload || !self.config.flushmap) {
            if !clientload {
                self.portalopen.fill(false);
                self.flood_area_connections()?;
            }
            return Ok((self.map.cmodels[0], self.last_checksum));
        }

        // free old stuff
        self.unload();

        if name.is_empty() {
            return Ok((self.map.cmodels[0], 0));
        }

        let data = buf.ok_or_else(|| CmodelError::CouldNotLoad(name.to_string()))?;
        let checksum = com_block_checksum(data);

        let mut map = MapData::load(name, data, self.config.parallel_lump_threshold)?;
        BoxHull::check_room(&map)?;
        self.box_hull = BoxHull::append(&mut map);
        self.map = map;

        self.portalopen.fill(false);
        if let Err(err) = self.flood_area_connections() {
            self.unload();
            return Err(err);
        }

        self.map_name = name.to_string();
        self.last_checksum = checksum;

        info!(
            "loaded collision map {}: {} inline models, {} clusters, {} areas (checksum {:08x})",
            name,
            self.map.cmodels.len(),
            self.map.numclusters,
            self.map.areas.len(),
            checksum
        );

        Ok((self.map.cmodels[0], checksum))
    }

    fn unload(&mut self) {
        if !self.map_name.is_empty() {
            info!("unloading collision map {}", self.map_name);
        }
        let mut map = MapData::empty();
        self.box_hull = BoxHull::append(&mut map);
        self.map = map;
        self.map_name.clear();
        self.last_checksum = 0;
    }

    // ============================================================
    // Public accessors
    // ============================================================

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn checksum(&self) -> u32 {
        self.last_checksum
    }

    pub fn is_loaded(&self) -> bool {
        self.map.numnodes > 0
    }

    pub fn world_model(&self) -> CModel {
        self.map.cmodels[0]
    }

    /// Look up an inline model by its "*N" name (N >= 1).
    pub fn inline_model(&self, name: &str) -> Result<CModel> {
        let bad = || CmodelError::BadInlineModel(name.to_string());
        let digits = name.strip_prefix('*').ok_or_else(bad)?;
        if !digits.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(bad());
        }
        let num: usize = digits.parse().map_err(|_| bad())?;
        if num < 1 || num >= self.map.cmodels.len() {
            return Err(bad());
        }
        Ok(self.map.cmodels[num])
    }

    pub fn num_clusters(&self) -> usize {
        self.map.numclusters
    }

    pub fn num_inline_models(&self) -> usize {
        self.map.cmodels.len()
    }

    pub fn num_areas(&self) -> usize {
        self.map.areas.len()
    }

    pub fn num_area_portals(&self) -> usize {
        self.map.areaportals.len()
    }

    pub fn entity_string(&self) -> &str {
        &self.map.entity_string
    }

    /// Raw visibility lump, for PVS/PHS decompression by the caller.
    pub fn visibility(&self) -> &[u8] {
        &self.map.visibility
    }

    pub fn leaf_contents(&self, leafnum: usize) -> Result<Contents> {
        self.leaf(leafnum).map(|l| l.contents)
    }

    pub fn leaf_cluster(&self, leafnum: usize) -> Result<i32> {
        self.leaf(leafnum).map(|l| l.cluster)
    }

    pub fn leaf_area(&self, leafnum: usize) -> Result<i32> {
        self.leaf(leafnum).map(|l| l.area)
    }

    fn leaf(&self, leafnum: usize) -> Result<&CLeaf> {
        if leafnum >= self.map.numleafs {
            return Err(CmodelError::BadLeaf(leafnum));
        }
        Ok(&self.map.leafs[leafnum])
    }
}

impl Default for CModelContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testmap::TestMap;

    #[test]
    fn test_context_creation() {
        let ctx = CModelContext::new();
        assert_eq!(ctx.map.numleafs, 1);
        assert_eq!(ctx.num_clusters(), 1);
        assert_eq!(ctx.num_areas(), 1);
        assert_eq!(ctx.num_inline_models(), 1);
        assert!(ctx.map_name().is_empty());
        assert!(!ctx.is_loaded());
    }

    #[test]
    fn test_load_empty_name_unloads() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();
        assert!(ctx.is_loaded());

        let (world, checksum) = ctx.load_map("", false, None).unwrap();
        assert_eq!(checksum, 0);
        assert_eq!(world, CModel::default());
        assert!(!ctx.is_loaded());
        assert_eq!(ctx.map.numleafs, 1);
        assert_eq!(ctx.num_clusters(), 1);
        assert!(ctx.map_name().is_empty());
    }

    #[test]
    fn test_load_returns_world_and_checksum() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        let (world, checksum) = ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();

        assert_eq!(checksum, com_block_checksum(&bytes));
        assert_eq!(ctx.checksum(), checksum);
        assert_eq!(world.headnode, NodeRef::Node(0));
        // bounds are spread by a unit
        assert_eq!(world.mins, [-1025.0, -1025.0, -1025.0]);
        assert_eq!(world.maxs, [1025.0, 1025.0, 1025.0]);
        assert_eq!(ctx.map_name(), "maps/cube.bsp");
        assert_eq!(ctx.num_inline_models(), 2);
        assert_eq!(ctx.entity_string(), "{\n\"classname\" \"worldspawn\"\n}\n");
        assert_eq!(ctx.visibility(), &[1, 0, 0, 0][..]);
    }

    #[test]
    fn test_same_name_uses_cached_map() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        let (_, checksum) = ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();

        ctx.set_area_portal_state(1, true).unwrap();
        assert!(ctx.areas_connected(1, 2).unwrap());

        // no buffer needed, and a server reload closes the portals again
        let (_, cached) = ctx.load_map("maps/cube.bsp", false, None).unwrap();
        assert_eq!(cached, checksum);
        assert!(!ctx.portalopen[1]);
        assert!(!ctx.areas_connected(1, 2).unwrap());

        // a client load leaves portal state alone
        ctx.set_area_portal_state(1, true).unwrap();
        ctx.load_map("maps/cube.bsp", true, None).unwrap();
        assert!(ctx.portalopen[1]);
    }

    #[test]
    fn test_flushmap_forces_reparse() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();

        ctx.config.flushmap = true;
        assert_eq!(
            ctx.load_map("maps/cube.bsp", false, None),
            Err(CmodelError::CouldNotLoad("maps/cube.bsp".to_string()))
        );
        assert!(!ctx.is_loaded());
    }

    #[test]
    fn test_different_name_replaces_map() {
        let mut ctx = CModelContext::new();
        let cube = TestMap::cube_room().to_bytes();
        let split = TestMap::split_pair().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&cube)).unwrap();
        ctx.load_map("maps/split.bsp", false, Some(&split)).unwrap();

        assert_eq!(ctx.map_name(), "maps/split.bsp");
        assert_eq!(ctx.num_inline_models(), 1);
        assert_eq!(ctx.checksum(), com_block_checksum(&split));
    }

    #[test]
    fn test_failed_load_leaves_no_map() {
        let mut ctx = CModelContext::new();
        let cube = TestMap::cube_room().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&cube)).unwrap();

        let mut bad = cube.clone();
        bad[4..8].copy_from_slice(&37i32.to_le_bytes());
        assert!(matches!(
            ctx.load_map("maps/bad.bsp", false, Some(&bad)),
            Err(CmodelError::WrongVersion { version: 37, .. })
        ));
        assert!(!ctx.is_loaded());
        assert!(ctx.map_name().is_empty());
        assert_eq!(ctx.point_contents(&[32.0, 32.0, 32.0], NodeRef::Node(0)), Contents::empty());
    }

    #[test]
    fn test_inline_model_lookup() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();

        let door = ctx.inline_model("*1").unwrap();
        assert_eq!(door.headnode, NodeRef::Node(6));
        assert_eq!(door.origin, [0.0, 0.0, 0.0]);

        for bad in ["1", "*0", "*2", "*x", "*+1", "* 1", "*", ""] {
            assert_eq!(
                ctx.inline_model(bad),
                Err(CmodelError::BadInlineModel(bad.to_string())),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_leaf_accessors() {
        let mut ctx = CModelContext::new();
        let bytes = TestMap::cube_room().to_bytes();
        ctx.load_map("maps/cube.bsp", false, Some(&bytes)).unwrap();

        assert_eq!(ctx.leaf_contents(0).unwrap(), Contents::SOLID);
        assert_eq!(ctx.leaf_contents(1).unwrap(), Contents::empty());
        assert_eq!(ctx.leaf_cluster(1).unwrap(), 0);
        assert_eq!(ctx.leaf_area(1).unwrap(), 1);
        assert_eq!(ctx.leaf_area(3).unwrap(), 2);
        // the box hull leaf is past the loaded count
        assert_eq!(ctx.leaf_contents(4), Err(CmodelError::BadLeaf(4)));
    }
}
