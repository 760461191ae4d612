// loader.rs — BSP header/lump parsing into the runtime collision arrays
// Derived from: myq2-original/qcommon/cmodel.c (MAP LOADING)

use log::debug;
use rayon::prelude::*;

use crate::box_hull::{BOX_BRUSHES, BOX_BRUSHSIDES, BOX_LEAFBRUSHES, BOX_LEAFS, BOX_NODES, BOX_PLANES};
use crate::cmodel::{CArea, CAreaPortal, CBrush, CBrushSide, CLeaf, CModel, CNode, MapData};
use crate::error::{CmodelError, Result};
use crate::q_shared::{CPlane, CSurface, Contents, SurfaceFlags};
use crate::qfiles::*;
use crate::tree::NodeRef;

// ============================================================
// Header / lump directory
// ============================================================

struct BspFile<'a> {
    data: &'a [u8],
    lumps: [Lump; HEADER_LUMPS],
    parallel_threshold: usize,
}

impl<'a> BspFile<'a> {
    fn parse(name: &str, data: &'a [u8], parallel_threshold: usize) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CmodelError::Truncated { len: data.len() });
        }

        let ident = le_i32(data, 0);
        if ident != IDBSPHEADER {
            return Err(CmodelError::BadIdent(ident));
        }
        let version = le_i32(data, 4);
        if version != BSPVERSION {
            return Err(CmodelError::WrongVersion {
                name: name.to_string(),
                version,
            });
        }

        let mut lumps = [Lump::default(); HEADER_LUMPS];
        for (i, lump) in lumps.iter_mut().enumerate() {
            let base = 8 + i * 8;
            lump.fileofs = le_i32(data, base);
            lump.filelen = le_i32(data, base + 4);
        }

        Ok(Self {
            data,
            lumps,
            parallel_threshold,
        })
    }

    fn lump_bytes(&self, index: usize, lump_name: &'static str) -> Result<&'a [u8]> {
        let l = self.lumps[index];
        let out_of_range = || CmodelError::LumpOutOfRange {
            lump: lump_name,
            fileofs: l.fileofs,
            filelen: l.filelen,
        };
        let start = usize::try_from(l.fileofs).map_err(|_| out_of_range())?;
        let len = usize::try_from(l.filelen).map_err(|_| out_of_range())?;
        let end = start.checked_add(len).ok_or_else(out_of_range)?;
        self.data.get(start..end).ok_or_else(out_of_range)
    }

    /// Parse every record of one lump after checking the byte length and
    /// the count limits.
    fn records<R: Record>(&self, index: usize, min: usize, max: usize) -> Result<Vec<R>> {
        let bytes = self.lump_bytes(index, R::NAME)?;
        if bytes.len() % R::SIZE != 0 {
            return Err(CmodelError::FunnyLumpSize {
                lump: R::NAME,
                len: bytes.len(),
                record: R::SIZE,
            });
        }

        let count = bytes.len() / R::SIZE;
        if count < min {
            return Err(CmodelError::TooFew { lump: R::NAME });
        }
        if count > max {
            return Err(CmodelError::TooMany {
                lump: R::NAME,
                count,
                max,
            });
        }

        Ok(parse_records(bytes, self.parallel_threshold))
    }
}

/// Records are independent, so large lumps are split across the rayon pool.
fn parse_records<R: Record>(bytes: &[u8], parallel_threshold: usize) -> Vec<R> {
    let count = bytes.len() / R::SIZE;
    if count >= parallel_threshold {
        bytes.par_chunks_exact(R::SIZE).map(R::parse).collect()
    } else {
        bytes.chunks_exact(R::SIZE).map(R::parse).collect()
    }
}

// ============================================================
// Cross-lump index checks
// ============================================================

fn check_index(lump: &'static str, record: usize, value: i64, len: usize) -> Result<usize> {
    if value < 0 || value as u64 >= len as u64 {
        return Err(CmodelError::BadIndex { lump, record, value });
    }
    Ok(value as usize)
}

/// `first .. first + count` must lie inside `0..len`.
fn check_range(
    lump: &'static str,
    record: usize,
    first: i64,
    count: i64,
    len: usize,
) -> Result<(usize, usize)> {
    if first < 0 || count < 0 || (first + count) as u64 > len as u64 {
        return Err(CmodelError::BadIndex {
            lump,
            record,
            value: first + count.max(0),
        });
    }
    Ok((first as usize, count as usize))
}

fn check_child(
    lump: &'static str,
    record: usize,
    raw: i32,
    numnodes: usize,
    numleafs: usize,
) -> Result<NodeRef> {
    match NodeRef::from_raw(raw) {
        NodeRef::Node(n) if n < numnodes => Ok(NodeRef::Node(n)),
        NodeRef::Leaf(l) if l < numleafs => Ok(NodeRef::Leaf(l)),
        _ => Err(CmodelError::BadIndex {
            lump,
            record,
            value: raw as i64,
        }),
    }
}

// ============================================================
// Per-lump conversion
// ============================================================

fn load_surfaces(bsp: &BspFile) -> Result<Vec<CSurface>> {
    let texinfo = bsp.records::<TexInfo>(LUMP_TEXINFO, 1, MAX_MAP_TEXINFO)?;
    Ok(texinfo
        .iter()
        .map(|ti| {
            let mut name = [0u8; 16];
            // 15 characters and the terminator
            name[..15].copy_from_slice(&ti.texture[..15]);
            CSurface {
                name,
                flags: SurfaceFlags::from_bits_retain(ti.flags),
                value: ti.value,
            }
        })
        .collect())
}

fn load_planes(bsp: &BspFile) -> Result<Vec<CPlane>> {
    let planes = bsp.records::<DPlane>(LUMP_PLANES, 1, MAX_MAP_PLANES)?;
    let mut out = Vec::with_capacity(planes.len() + BOX_PLANES);
    out.extend(
        planes
            .iter()
            .map(|p| CPlane::new(p.normal, p.dist, p.plane_type as u8)),
    );
    Ok(out)
}

fn load_brushsides(bsp: &BspFile, numplanes: usize, numsurfaces: usize) -> Result<Vec<CBrushSide>> {
    let sides = bsp.records::<DBrushSide>(LUMP_BRUSHSIDES, 0, MAX_MAP_BRUSHSIDES)?;
    let mut out = Vec::with_capacity(sides.len() + BOX_BRUSHSIDES);
    for (i, side) in sides.iter().enumerate() {
        let plane = check_index(DBrushSide::NAME, i, side.planenum as i64, numplanes)?;
        let surface = if side.texinfo < 0 {
            None
        } else {
            Some(check_index(DBrushSide::NAME, i, side.texinfo as i64, numsurfaces)?)
        };
        out.push(CBrushSide { plane, surface });
    }
    Ok(out)
}

fn load_brushes(bsp: &BspFile, numbrushsides: usize) -> Result<Vec<CBrush>> {
    let brushes = bsp.records::<DBrush>(LUMP_BRUSHES, 0, MAX_MAP_BRUSHES)?;
    let mut out = Vec::with_capacity(brushes.len() + BOX_BRUSHES);
    for (i, b) in brushes.iter().enumerate() {
        let (firstbrushside, numsides) = check_range(
            DBrush::NAME,
            i,
            b.firstside as i64,
            b.numsides as i64,
            numbrushsides,
        )?;
        out.push(CBrush {
            contents: Contents::from_bits_retain(b.contents),
            firstbrushside,
            numsides,
            checkcount: 0,
        });
    }
    Ok(out)
}

fn load_leafbrushes(bsp: &BspFile, numbrushes: usize) -> Result<Vec<u16>> {
    let leafbrushes = bsp.records::<DLeafBrush>(LUMP_LEAFBRUSHES, 1, MAX_MAP_LEAFBRUSHES)?;
    let mut out = Vec::with_capacity(leafbrushes.len() + BOX_LEAFBRUSHES);
    for (i, lb) in leafbrushes.iter().enumerate() {
        check_index(DLeafBrush::NAME, i, lb.0 as i64, numbrushes)?;
        out.push(lb.0);
    }
    Ok(out)
}

/// Returns the leafs, the cluster count and the first empty leaf.
fn load_leafs(bsp: &BspFile, numleafbrushes: usize) -> Result<(Vec<CLeaf>, usize, usize)> {
    let leafs = bsp.records::<DLeaf>(LUMP_LEAFS, 1, MAX_MAP_LEAFS)?;
    let mut out = Vec::with_capacity(leafs.len() + BOX_LEAFS);
    let mut numclusters = 0usize;

    for (i, l) in leafs.iter().enumerate() {
        let (firstleafbrush, numleafbrushes) = check_range(
            DLeaf::NAME,
            i,
            l.firstleafbrush as i64,
            l.numleafbrushes as i64,
            numleafbrushes,
        )?;
        let cluster = l.cluster as i32;
        if cluster >= 0 {
            numclusters = numclusters.max(cluster as usize + 1);
        }
        out.push(CLeaf {
            contents: Contents::from_bits_retain(l.contents),
            cluster,
            area: l.area as i32,
            firstleafbrush,
            numleafbrushes,
        });
    }

    if out[0].contents != Contents::SOLID {
        return Err(CmodelError::LeafZeroNotSolid);
    }
    let emptyleaf = out
        .iter()
        .skip(1)
        .position(|l| l.contents.is_empty())
        .map(|i| i + 1)
        .ok_or(CmodelError::NoEmptyLeaf)?;

    Ok((out, numclusters, emptyleaf))
}

fn load_nodes(bsp: &BspFile, numplanes: usize, numleafs: usize) -> Result<Vec<CNode>> {
    let nodes = bsp.records::<DNode>(LUMP_NODES, 1, MAX_MAP_NODES)?;
    let numnodes = nodes.len();
    let mut out = Vec::with_capacity(numnodes + BOX_NODES);
    for (i, n) in nodes.iter().enumerate() {
        let plane = check_index(DNode::NAME, i, n.planenum as i64, numplanes)?;
        let children = [
            check_child(DNode::NAME, i, n.children[0], numnodes, numleafs)?,
            check_child(DNode::NAME, i, n.children[1], numnodes, numleafs)?,
        ];
        out.push(CNode { plane, children });
    }
    Ok(out)
}

fn load_submodels(bsp: &BspFile, numnodes: usize, numleafs: usize) -> Result<Vec<CModel>> {
    let models = bsp.records::<DModel>(LUMP_MODELS, 1, MAX_MAP_MODELS)?;
    let mut out = Vec::with_capacity(models.len());
    for (i, m) in models.iter().enumerate() {
        // spread the mins / maxs by a unit
        out.push(CModel {
            mins: [m.mins[0] - 1.0, m.mins[1] - 1.0, m.mins[2] - 1.0],
            maxs: [m.maxs[0] + 1.0, m.maxs[1] + 1.0, m.maxs[2] + 1.0],
            origin: m.origin,
            headnode: check_child(DModel::NAME, i, m.headnode, numnodes, numleafs)?,
        });
    }
    Ok(out)
}

fn load_areas(bsp: &BspFile, numareaportals: usize) -> Result<Vec<CArea>> {
    let areas = bsp.records::<DArea>(LUMP_AREAS, 0, MAX_MAP_AREAS)?;
    let mut out = Vec::with_capacity(areas.len());
    for (i, a) in areas.iter().enumerate() {
        let (firstareaportal, numareaportals) = check_range(
            DArea::NAME,
            i,
            a.firstareaportal as i64,
            a.numareaportals as i64,
            numareaportals,
        )?;
        out.push(CArea {
            numareaportals,
            firstareaportal,
            floodnum: 0,
            floodvalid: 0,
        });
    }
    Ok(out)
}

fn load_areaportals(bsp: &BspFile, numareas: usize) -> Result<Vec<CAreaPortal>> {
    let portals = bsp.records::<DAreaPortal>(LUMP_AREAPORTALS, 0, MAX_MAP_AREAPORTALS)?;
    let mut out = Vec::with_capacity(portals.len());
    for (i, p) in portals.iter().enumerate() {
        out.push(CAreaPortal {
            portalnum: check_index(DAreaPortal::NAME, i, p.portalnum as i64, MAX_MAP_AREAPORTALS)?,
            otherarea: check_index(DAreaPortal::NAME, i, p.otherarea as i64, numareas)?,
        });
    }
    Ok(out)
}

fn load_visibility(bsp: &BspFile) -> Result<Vec<u8>> {
    let bytes = bsp.lump_bytes(LUMP_VISIBILITY, "visibility")?;
    if bytes.len() > MAX_MAP_VISIBILITY {
        return Err(CmodelError::TooMany {
            lump: "visibility",
            count: bytes.len(),
            max: MAX_MAP_VISIBILITY,
        });
    }
    Ok(bytes.to_vec())
}

fn load_entity_string(bsp: &BspFile) -> Result<String> {
    let bytes = bsp.lump_bytes(LUMP_ENTITIES, "entities")?;
    if bytes.len() > MAX_MAP_ENTSTRING {
        return Err(CmodelError::TooMany {
            lump: "entities",
            count: bytes.len(),
            max: MAX_MAP_ENTSTRING,
        });
    }
    let text = String::from_utf8_lossy(bytes);
    Ok(text.trim_end_matches('\0').to_string())
}

// ============================================================
// CMod_LoadBrushModel
// ============================================================

impl MapData {
    /// Parse a whole BSP buffer. Nothing is installed until every lump has
    /// loaded and cross-checked.
    pub(crate) fn load(name: &str, data: &[u8], parallel_threshold: usize) -> Result<MapData> {
        let bsp = BspFile::parse(name, data, parallel_threshold)?;

        let surfaces = load_surfaces(&bsp)?;
        let planes = load_planes(&bsp)?;
        let brushsides = load_brushsides(&bsp, planes.len(), surfaces.len())?;
        let brushes = load_brushes(&bsp, brushsides.len())?;
        let leafbrushes = load_leafbrushes(&bsp, brushes.len())?;
        let (leafs, numclusters, emptyleaf) = load_leafs(&bsp, leafbrushes.len())?;
        let nodes = load_nodes(&bsp, planes.len(), leafs.len())?;
        let cmodels = load_submodels(&bsp, nodes.len(), leafs.len())?;
        // areas and portals refer to each other, so take both counts first
        let numareaportals = bsp.lump_bytes(LUMP_AREAPORTALS, DAreaPortal::NAME)?.len() / DAreaPortal::SIZE;
        let areas = load_areas(&bsp, numareaportals)?;
        let areaportals = load_areaportals(&bsp, areas.len())?;
        let visibility = load_visibility(&bsp)?;
        let entity_string = load_entity_string(&bsp)?;

        debug!(
            "{}: {} planes, {} nodes, {} leafs, {} brushes, {} brushsides, {} surfaces, {} models, {} areas, {} areaportals",
            name,
            planes.len(),
            nodes.len(),
            leafs.len(),
            brushes.len(),
            brushsides.len(),
            surfaces.len(),
            cmodels.len(),
            areas.len(),
            areaportals.len()
        );

        Ok(MapData {
            numplanes: planes.len(),
            numnodes: nodes.len(),
            numleafs: leafs.len(),
            numleafbrushes: leafbrushes.len(),
            numbrushes: brushes.len(),
            numbrushsides: brushsides.len(),
            numclusters,
            emptyleaf,
            planes,
            nodes,
            leafs,
            leafbrushes,
            brushes,
            brushsides,
            surfaces,
            cmodels,
            areas,
            areaportals,
            visibility,
            entity_string,
        })
    }
}

// ============================================================
// Tests
// ============================================================
