// tree.rs — BSP tree walks: point location, point contents and box leaf gathering
// Derived from: myq2-original/qcommon/cmodel.c (POINT TESTING IN HULLS)

use crate::cmodel::CModelContext;
use crate::q_shared::{box_on_plane_side, rotate_into_frame, vector_is_zero, vector_subtract};
use crate::q_shared::{Contents, PlaneSide, Vec3};
use crate::qfiles::MAX_MAP_NODES;

/// Child or head reference inside the tree.
///
/// On disk a child is a signed int: `>= 0` is a node index, negative is
/// leaf `-1 - v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Node(usize),
    Leaf(usize),
}

impl NodeRef {
    pub fn from_raw(raw: i32) -> Self {
        if raw >= 0 {
            NodeRef::Node(raw as usize)
        } else {
            NodeRef::Leaf((-1 - raw) as usize)
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            NodeRef::Node(n) => n as i32,
            NodeRef::Leaf(l) => -1 - l as i32,
        }
    }
}

impl Default for NodeRef {
    /// The world root.
    fn default() -> Self {
        NodeRef::Node(0)
    }
}

impl CModelContext {
    /// Descend from `num` to the leaf containing `p`. Points exactly on a
    /// plane go to the front child.
    pub fn point_leafnum_r(&self, p: &Vec3, mut num: NodeRef) -> usize {
        loop {
            match num {
                NodeRef::Leaf(leaf) => {
                    self.stats.bump_pointcontents();
                    return leaf;
                }
                NodeRef::Node(n) => {
                    let node = &self.map.nodes[n];
                    let d = self.map.planes[node.plane].distance(p);
                    num = if d < 0.0 { node.children[1] } else { node.children[0] };
                }
            }
        }
    }

    /// Leaf of the world tree containing `p`; 0 with no map loaded.
    pub fn point_leafnum(&self, p: &Vec3) -> usize {
        if self.map.numplanes == 0 {
            return 0;
        }
        self.point_leafnum_r(p, self.map.cmodels[0].headnode)
    }

    pub fn point_contents(&self, p: &Vec3, headnode: NodeRef) -> Contents {
        if self.map.numnodes == 0 {
            return Contents::empty();
        }
        let l = self.point_leafnum_r(p, headnode);
        self.map.leafs[l].contents
    }

    /// Contents at `p` for a model placed at `origin` with `angles`.
    /// The box hull is never rotated.
    pub fn transformed_point_contents(
        &self,
        p: &Vec3,
        headnode: NodeRef,
        origin: &Vec3,
        angles: &Vec3,
    ) -> Contents {
        if self.map.numnodes == 0 {
            return Contents::empty();
        }

        let mut p_l = vector_subtract(p, origin);
        if headnode != self.box_headnode() && !vector_is_zero(angles) {
            p_l = rotate_into_frame(&p_l, angles);
        }

        let l = self.point_leafnum_r(&p_l, headnode);
        self.map.leafs[l].contents
    }

    // ============================================================
    // Box leaf gathering
    // ============================================================

    fn box_leafnums_r(
        &self,
        mut nodenum: NodeRef,
        mins: &Vec3,
        maxs: &Vec3,
        list: &mut Vec<usize>,
        listsize: usize,
        topnode: &mut Option<usize>,
        depth: usize,
    ) {
        debug_assert!(depth <= MAX_MAP_NODES, "box_leafnums_r: tree deeper than node count");
        loop {
            let n = match nodenum {
                NodeRef::Leaf(leaf) => {
                    // overflow is silent: the caller only sees a full list
                    if list.len() < listsize {
                        list.push(leaf);
                    }
                    return;
                }
                NodeRef::Node(n) => n,
            };

            let node = &self.map.nodes[n];
            match box_on_plane_side(mins, maxs, &self.map.planes[node.plane]) {
                PlaneSide::Front => nodenum = node.children[0],
                PlaneSide::Back => nodenum = node.children[1],
                PlaneSide::Straddle => {
                    // go down both
                    if topnode.is_none() {
                        *topnode = Some(n);
                    }
                    self.box_leafnums_r(
                        node.children[0],
                        mins,
                        maxs,
                        list,
                        listsize,
                        topnode,
                        depth + 1,
                    );
                    nodenum = node.children[1];
                }
            }
        }
    }

    /// Leaves under `headnode` touched by the box, at most `listsize` of them,
    /// plus the first node where the box straddled a plane.
    pub fn box_leafnums_headnode(
        &self,
        mins: &Vec3,
        maxs: &Vec3,
        listsize: usize,
        headnode: NodeRef,
    ) -> (Vec<usize>, Option<usize>) {
        let mut list = Vec::new();
        let mut topnode = None;
        if self.map.numnodes == 0 {
            return (list, topnode);
        }
        self.box_leafnums_r(headnode, mins, maxs, &mut list, listsize, &mut topnode, 0);
        (list, topnode)
    }

    pub fn box_leafnums(
        &self,
        mins: &Vec3,
        maxs: &Vec3,
        listsize: usize,
    ) -> (Vec<usize>, Option<usize>) {
        self.box_leafnums_headnode(mins, maxs, listsize, self.map.cmodels[0].headnode)
    }

    /// True if any leaf under `nodenum` has its cluster bit set in `visbits`.
    /// Bits past the end of `visbits` count as clear.
    pub fn headnode_visible(&self, nodenum: NodeRef, visbits: &[u8]) -> bool {
        self.headnode_visible_r(nodenum, visbits, 0)
    }

    fn headnode_visible_r(&self, nodenum: NodeRef, visbits: &[u8], depth: usize) -> bool {
        debug_assert!(depth <= MAX_MAP_NODES, "headnode_visible_r: tree deeper than node count");
        match nodenum {
            NodeRef::Leaf(leaf) => {
                let cluster = self.map.leafs[leaf].cluster;
                if cluster < 0 {
                    return false;
                }
                let cluster = cluster as usize;
                visbits
                    .get(cluster >> 3)
                    .is_some_and(|byte| byte & (1 << (cluster & 7)) != 0)
            }
            NodeRef::Node(n) => {
                let node = &self.map.nodes[n];
                self.headnode_visible_r(node.children[0], visbits, depth + 1)
                    || self.headnode_visible_r(node.children[1], visbits, depth + 1)
            }
        }
    }
}

// ============================================================
// Tests
// ============================================================
