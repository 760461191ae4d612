// box_hull.rs — synthetic six-node BSP subtree for tracing against a bounding box
// Derived from: myq2-original/qcommon/cmodel.c (CM_InitBoxHull / CM_HeadnodeForBox)

use crate::cmodel::{CBrush, CBrushSide, CLeaf, CModelContext, CNode, MapData};
use crate::error::{CmodelError, Result};
use crate::q_shared::{CPlane, Contents, Vec3};
use crate::qfiles::*;
use crate::tree::NodeRef;

pub(crate) const BOX_PLANES: usize = 12;
pub(crate) const BOX_NODES: usize = 6;
pub(crate) const BOX_BRUSHSIDES: usize = 6;
pub(crate) const BOX_BRUSHES: usize = 1;
pub(crate) const BOX_LEAFBRUSHES: usize = 1;
pub(crate) const BOX_LEAFS: usize = 1;

/// Where the box hull sits in the map arrays; everything lies just past
/// the loaded counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BoxHull {
    pub headnode: usize,
    pub first_plane: usize,
    pub brush: usize,
    pub leaf: usize,
}

impl BoxHull {
    /// The hull must fit inside the fixed map limits.
    pub fn check_room(map: &MapData) -> Result<()> {
        if map.numnodes + BOX_NODES > MAX_MAP_NODES
            || map.numbrushes + BOX_BRUSHES > MAX_MAP_BRUSHES
            || map.numleafbrushes + BOX_LEAFBRUSHES > MAX_MAP_LEAFBRUSHES
            || map.numbrushsides + BOX_BRUSHSIDES > MAX_MAP_BRUSHSIDES
            || map.numplanes + BOX_PLANES > MAX_MAP_PLANES
            || map.numleafs + BOX_LEAFS > MAX_MAP_LEAFS
        {
            return Err(CmodelError::NoRoomForBoxHull);
        }
        Ok(())
    }

    /// Append the hull topology. Plane distances stay zero until
    /// `headnode_for_box` fills them in.
    pub fn append(map: &mut MapData) -> BoxHull {
        map.planes.truncate(map.numplanes);
        map.nodes.truncate(map.numnodes);
        map.leafs.truncate(map.numleafs);
        map.leafbrushes.truncate(map.numleafbrushes);
        map.brushes.truncate(map.numbrushes);
        map.brushsides.truncate(map.numbrushsides);

        let hull = BoxHull {
            headnode: map.numnodes,
            first_plane: map.numplanes,
            brush: map.numbrushes,
            leaf: map.numleafs,
        };

        map.brushes.push(CBrush {
            contents: Contents::MONSTER,
            firstbrushside: map.numbrushsides,
            numsides: BOX_BRUSHSIDES,
            checkcount: 0,
        });

        map.leafbrushes.push(hull.brush as u16);
        map.leafs.push(CLeaf {
            contents: Contents::MONSTER,
            cluster: 0,
            area: 0,
            firstleafbrush: map.numleafbrushes,
            numleafbrushes: 1,
        });

        for i in 0..6 {
            let side = i & 1;

            // brush sides
            map.brushsides.push(CBrushSide {
                plane: hull.first_plane + i * 2 + side,
                surface: None,
            });

            // nodes
            let mut children = [NodeRef::Leaf(0); 2];
            children[side] = NodeRef::Leaf(map.emptyleaf);
            children[side ^ 1] = if i != 5 {
                NodeRef::Node(hull.headnode + i + 1)
            } else {
                NodeRef::Leaf(hull.leaf)
            };
            map.nodes.push(CNode {
                plane: hull.first_plane + i * 2,
                children,
            });
        }

        // planes
        for i in 0..6 {
            let axis = i >> 1;
            let mut normal = [0.0f32; 3];
            normal[axis] = 1.0;
            map.planes.push(CPlane::new(normal, 0.0, axis as u8));
            normal[axis] = -1.0;
            map.planes.push(CPlane::new(normal, 0.0, PLANE_ANYX + axis as u8));
        }

        hull
    }
}

impl CModelContext {
    /// Root of the box hull, valid for whatever box was set last.
    pub fn box_headnode(&self) -> NodeRef {
        NodeRef::Node(self.box_hull.headnode)
    }

    /// Reshape the box hull to `mins`/`maxs` and return its root, so boxes
    /// (e.g. monsters) go through the same trace code as brush models.
    ///
    /// There is only one box hull per context: the returned headnode is
    /// valid until the next call.
    pub fn headnode_for_box(&mut self, mins: &Vec3, maxs: &Vec3) -> NodeRef {
        let bp = self.box_hull.first_plane;
        let planes = &mut self.map.planes[bp..bp + BOX_PLANES];
        for axis in 0..3 {
            planes[axis * 4].dist = maxs[axis];
            planes[axis * 4 + 1].dist = -maxs[axis];
            planes[axis * 4 + 2].dist = mins[axis];
            planes[axis * 4 + 3].dist = -mins[axis];
        }
        self.box_headnode()
    }
}

// ============================================================
// Tests
// ============================================================
