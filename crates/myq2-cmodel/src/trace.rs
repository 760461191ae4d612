// trace.rs — swept box / point traces and position tests against brushes
// Derived from: myq2-original/qcommon/cmodel.c (BOX TRACING)

use log::warn;

use crate::cmodel::{CBrush, CModelContext};
use crate::q_shared::{dot_product, rotate_into_frame, vector_is_zero, vector_lerp, vector_subtract};
use crate::q_shared::{CPlane, Contents, Trace, Vec3};
use crate::qfiles::MAX_MAP_NODES;
use crate::tree::NodeRef;

/// 1/32 epsilon to keep floating point happy
pub const DIST_EPSILON: f32 = 0.03125;

/// Leaf cap for a zero-length sweep's position test.
const POSITION_TEST_LEAFS: usize = 1024;

/// Per-trace state threaded through the recursive hull check.
#[derive(Debug, Clone)]
pub(crate) struct TraceWork {
    pub start: Vec3,
    pub end: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    /// greatest of abs(mins) and maxs per axis
    pub extents: Vec3,
    pub contents: Contents,
    /// optimized case: mins and maxs are all zero
    pub ispoint: bool,
    pub trace: Trace,
}

impl TraceWork {
    fn new(start: &Vec3, end: &Vec3, mins: &Vec3, maxs: &Vec3, contents: Contents) -> Self {
        Self {
            start: *start,
            end: *end,
            mins: *mins,
            maxs: *maxs,
            extents: [0.0; 3],
            contents,
            ispoint: false,
            trace: Trace::default(),
        }
    }

    /// Plane distance pushed out so the box's nearest corner touches it.
    fn side_dist(&self, plane: &CPlane) -> f32 {
        if self.ispoint {
            return plane.dist;
        }
        let ofs: Vec3 = std::array::from_fn(|j| {
            if plane.normal[j] < 0.0 {
                self.maxs[j]
            } else {
                self.mins[j]
            }
        });
        plane.dist - dot_product(&ofs, &plane.normal)
    }
}

impl CModelContext {
    fn clip_box_to_brush(&self, tw: &mut TraceWork, brush: &CBrush) {
        if brush.numsides == 0 {
            return;
        }

        self.stats.bump_brush_traces();

        let mut enterfrac = -1.0f32;
        let mut leavefrac = 1.0f32;
        let mut clip: Option<(CPlane, Option<usize>)> = None;
        let mut getout = false;
        let mut startout = false;

        let sides = &self.map.brushsides[brush.firstbrushside..brush.firstbrushside + brush.numsides];
        for side in sides {
            let plane = &self.map.planes[side.plane];
            let dist = tw.side_dist(plane);

            let d1 = dot_product(&tw.start, &plane.normal) - dist;
            let d2 = dot_product(&tw.end, &plane.normal) - dist;

            if d2 > 0.0 {
                getout = true; // endpoint is not in solid
            }
            if d1 > 0.0 {
                startout = true;
            }

            // if completely in front of face, no intersection
            if d1 > 0.0 && d2 >= d1 {
                return;
            }
            if d1 <= 0.0 && d2 <= 0.0 {
                continue;
            }

            // crosses face
            if d1 > d2 {
                // enter
                let f = (d1 - DIST_EPSILON) / (d1 - d2);
                if f > enterfrac {
                    enterfrac = f;
                    clip = Some((*plane, side.surface));
                }
            } else {
                // leave
                let f = (d1 + DIST_EPSILON) / (d1 - d2);
                if f < leavefrac {
                    leavefrac = f;
                }
            }
        }

        if !startout {
            // original point was inside brush
            tw.trace.startsolid = true;
            if !getout {
                tw.trace.allsolid = true;
            }
            return;
        }

        if enterfrac < leavefrac && enterfrac > -1.0 && enterfrac < tw.trace.fraction {
            if let Some((plane, surface)) = clip {
                tw.trace.fraction = enterfrac.max(0.0);
                tw.trace.plane = plane;
                tw.trace.surface = surface.map(|s| self.map.surfaces[s]);
                tw.trace.contents = brush.contents;
            }
        }
    }

    fn test_box_in_brush(&self, tw: &mut TraceWork, brush: &CBrush) {
        if brush.numsides == 0 {
            return;
        }

        let sides = &self.map.brushsides[brush.firstbrushside..brush.firstbrushside + brush.numsides];
        for side in sides {
            let plane = &self.map.planes[side.plane];

            // general box case
            let ofs: Vec3 = std::array::from_fn(|j| {
                if plane.normal[j] < 0.0 {
                    tw.maxs[j]
                } else {
                    tw.mins[j]
                }
            });
            let dist = plane.dist - dot_product(&ofs, &plane.normal);
            let d1 = dot_product(&tw.start, &plane.normal) - dist;

            // if completely in front of face, no intersection
            if d1 > 0.0 {
                return;
            }
        }

        // inside this brush
        tw.trace.startsolid = true;
        tw.trace.allsolid = true;
        tw.trace.fraction = 0.0;
        tw.trace.contents = brush.contents;
    }

    /// Brushes in a leaf that match the mask and were not already tested
    /// by this trace. Stamps each returned brush with the current check count.
    fn take_leaf_brush(&mut self, tw: &TraceWork, leafbrush: usize) -> Option<CBrush> {
        let brushnum = self.map.leafbrushes[leafbrush] as usize;
        let b = &mut self.map.brushes[brushnum];
        if b.checkcount == self.checkcount {
            return None; // already checked this brush in another leaf
        }
        b.checkcount = self.checkcount;
        if !b.contents.intersects(tw.contents) {
            return None;
        }
        Some(*b)
    }

    fn trace_to_leaf(&mut self, tw: &mut TraceWork, leafnum: usize) {
        let leaf = self.map.leafs[leafnum];
        if !leaf.contents.intersects(tw.contents) {
            return;
        }

        // trace line against all brushes in the leaf
        for k in leaf.firstleafbrush..leaf.firstleafbrush + leaf.numleafbrushes {
            let Some(brush) = self.take_leaf_brush(tw, k) else {
                continue;
            };
            self.clip_box_to_brush(tw, &brush);
            if tw.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn test_in_leaf(&mut self, tw: &mut TraceWork, leafnum: usize) {
        let leaf = self.map.leafs[leafnum];
        if !leaf.contents.intersects(tw.contents) {
            return;
        }

        // test box position against all brushes in the leaf
        for k in leaf.firstleafbrush..leaf.firstleafbrush + leaf.numleafbrushes {
            let Some(brush) = self.take_leaf_brush(tw, k) else {
                continue;
            };
            self.test_box_in_brush(tw, &brush);
            if tw.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn recursive_hull_check(
        &mut self,
        tw: &mut TraceWork,
        num: NodeRef,
        p1f: f32,
        p2f: f32,
        p1: &Vec3,
        p2: &Vec3,
        depth: usize,
    ) {
        debug_assert!(depth <= MAX_MAP_NODES, "recursive_hull_check: tree deeper than node count");

        if tw.trace.fraction <= p1f {
            return; // already hit something nearer
        }

        // if < 0, we are in a leaf node
        let n = match num {
            NodeRef::Leaf(leaf) => {
                self.trace_to_leaf(tw, leaf);
                return;
            }
            NodeRef::Node(n) => n,
        };

        // find the point distances to the separating plane
        // and the offset for the size of the box
        let node = self.map.nodes[n];
        let plane = self.map.planes[node.plane];

        let (t1, t2, offset) = if (plane.plane_type as usize) < 3 {
            let t = plane.plane_type as usize;
            (p1[t] - plane.dist, p2[t] - plane.dist, tw.extents[t])
        } else {
            let offset = if tw.ispoint {
                0.0
            } else {
                (tw.extents[0] * plane.normal[0]).abs()
                    + (tw.extents[1] * plane.normal[1]).abs()
                    + (tw.extents[2] * plane.normal[2]).abs()
            };
            (
                dot_product(&plane.normal, p1) - plane.dist,
                dot_product(&plane.normal, p2) - plane.dist,
                offset,
            )
        };

        // see which sides we need to consider
        if t1 >= offset && t2 >= offset {
            self.recursive_hull_check(tw, node.children[0], p1f, p2f, p1, p2, depth + 1);
            return;
        }
        if t1 < -offset && t2 < -offset {
            self.recursive_hull_check(tw, node.children[1], p1f, p2f, p1, p2, depth + 1);
            return;
        }

        // put the crosspoint DIST_EPSILON pixels on the near side
        let (side, frac, frac2) = if t1 < t2 {
            let idist = 1.0 / (t1 - t2);
            (
                1,
                (t1 - offset + DIST_EPSILON) * idist,
                (t1 + offset + DIST_EPSILON) * idist,
            )
        } else if t1 > t2 {
            let idist = 1.0 / (t1 - t2);
            (
                0,
                (t1 + offset + DIST_EPSILON) * idist,
                (t1 - offset - DIST_EPSILON) * idist,
            )
        } else {
            (0, 1.0, 0.0)
        };

        // move up to the node
        let frac = frac.clamp(0.0, 1.0);
        let midf = p1f + (p2f - p1f) * frac;
        let mid = vector_lerp(p1, p2, frac);
        self.recursive_hull_check(tw, node.children[side], p1f, midf, p1, &mid, depth + 1);

        // go past the node
        let frac2 = frac2.clamp(0.0, 1.0);
        let midf = p1f + (p2f - p1f) * frac2;
        let mid = vector_lerp(p1, p2, frac2);
        self.recursive_hull_check(tw, node.children[side ^ 1], midf, p2f, &mid, p2, depth + 1);
    }

    // ======================================================================

    /// Sweep the box `mins`/`maxs` from `start` to `end` through the tree
    /// under `headnode`, stopping at the first brush matching `brushmask`.
    ///
    /// With no map loaded this returns the default no-impact trace.
    pub fn box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: NodeRef,
        brushmask: Contents,
    ) -> Trace {
        self.checkcount = self.checkcount.wrapping_add(1); // for multi-check avoidance
        self.stats.bump_traces(); // for statistics, may be zeroed

        // fill in a default trace
        let mut tw = TraceWork::new(start, end, mins, maxs, brushmask);

        if self.map.numnodes == 0 {
            // map not loaded
            return tw.trace;
        }

        // check for position test special case
        if start == end {
            let c1: Vec3 = std::array::from_fn(|i| start[i] + mins[i] - 1.0);
            let c2: Vec3 = std::array::from_fn(|i| start[i] + maxs[i] + 1.0);

            let (leafs, _topnode) = self.box_leafnums_headnode(&c1, &c2, POSITION_TEST_LEAFS, headnode);
            if leafs.len() == POSITION_TEST_LEAFS {
                warn!("box_trace: position test hit the {} leaf cap", POSITION_TEST_LEAFS);
            }
            for leaf in leafs {
                self.test_in_leaf(&mut tw, leaf);
                if tw.trace.allsolid {
                    break;
                }
            }
            tw.trace.endpos = *start;
            return tw.trace;
        }

        // check for point special case
        if vector_is_zero(mins) && vector_is_zero(maxs) {
            tw.ispoint = true;
        } else {
            tw.extents = std::array::from_fn(|i| (-mins[i]).max(maxs[i]));
        }

        // general sweeping through world
        self.recursive_hull_check(&mut tw, headnode, 0.0, 1.0, start, end, 0);

        if tw.trace.fraction == 1.0 {
            tw.trace.endpos = *end;
        } else {
            tw.trace.endpos = vector_lerp(start, end, tw.trace.fraction);
        }
        tw.trace
    }

    /// Handles offseting and rotation of the end points for moving and
    /// rotating entities.
    pub fn transformed_box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: NodeRef,
        brushmask: Contents,
        origin: &Vec3,
        angles: &Vec3,
    ) -> Trace {
        // subtract origin offset
        let mut start_l = vector_subtract(start, origin);
        let mut end_l = vector_subtract(end, origin);

        // rotate start and end into the models frame of reference
        let rotated = headnode != self.box_headnode() && !vector_is_zero(angles);
        if rotated {
            start_l = rotate_into_frame(&start_l, angles);
            end_l = rotate_into_frame(&end_l, angles);
        }

        // sweep the box through the model
        let mut trace = self.box_trace(&start_l, &end_l, mins, maxs, headnode, brushmask);

        if rotated && trace.fraction != 1.0 {
            // rotate the plane normal back into world space
            let back = [-angles[0], -angles[1], -angles[2]];
            let normal = rotate_into_frame(&trace.plane.normal, &back);
            trace.plane.set_normal(normal);
        }

        trace.endpos = vector_lerp(start, end, trace.fraction);
        trace
    }
}

// ============================================================
// Tests
// ============================================================
