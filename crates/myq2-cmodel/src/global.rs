// global.rs — process-wide collision context and CM_* style free functions
// Derived from: myq2-original/qcommon/cmodel.c (the engine's single global map)

use std::sync::OnceLock;

use crate::cmodel::{CModel, CModelContext};
use crate::config::CmodelConfig;
use crate::error::{CmodelError, Result};
use crate::q_shared::{Contents, Trace, Vec3};
use crate::tree::NodeRef;

static CMODEL_CTX: OnceLock<parking_lot::Mutex<Option<CModelContext>>> = OnceLock::new();

fn global_ctx() -> &'static parking_lot::Mutex<Option<CModelContext>> {
    CMODEL_CTX.get_or_init(|| parking_lot::Mutex::new(None))
}

/// Install a fresh context with no map loaded, replacing any previous one.
pub fn cmodel_init(config: CmodelConfig) {
    *global_ctx().lock() = Some(CModelContext::with_config(config));
}

pub fn cmodel_shutdown() {
    *global_ctx().lock() = None;
}

/// Access the global context with a closure. Returns None if not initialized.
pub fn with_cmodel_ctx<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut CModelContext) -> R,
{
    global_ctx().lock().as_mut().map(f)
}

pub fn cm_load_map(name: &str, clientload: bool, buf: Option<&[u8]>) -> Result<(CModel, u32)> {
    with_cmodel_ctx(|c| c.load_map(name, clientload, buf))
        .unwrap_or_else(|| Err(CmodelError::CouldNotLoad(name.to_string())))
}

pub fn cm_inline_model(name: &str) -> Result<CModel> {
    with_cmodel_ctx(|c| c.inline_model(name))
        .unwrap_or_else(|| Err(CmodelError::BadInlineModel(name.to_string())))
}

pub fn cm_num_inline_models() -> usize {
    with_cmodel_ctx(|c| c.num_inline_models()).unwrap_or(0)
}

pub fn cm_num_clusters() -> usize {
    with_cmodel_ctx(|c| c.num_clusters()).unwrap_or(0)
}

pub fn cm_entity_string() -> String {
    with_cmodel_ctx(|c| c.entity_string().to_string()).unwrap_or_default()
}

pub fn cm_leaf_contents(leafnum: usize) -> Contents {
    with_cmodel_ctx(|c| c.leaf_contents(leafnum).unwrap_or_default()).unwrap_or_default()
}

/// -1 (no cluster) when unknown.
pub fn cm_leaf_cluster(leafnum: usize) -> i32 {
    with_cmodel_ctx(|c| c.leaf_cluster(leafnum).unwrap_or(-1)).unwrap_or(-1)
}

pub fn cm_leaf_area(leafnum: usize) -> i32 {
    with_cmodel_ctx(|c| c.leaf_area(leafnum).unwrap_or(0)).unwrap_or(0)
}

pub fn cm_point_leafnum(p: &Vec3) -> usize {
    with_cmodel_ctx(|c| c.point_leafnum(p)).unwrap_or(0)
}

pub fn cm_point_contents(p: &Vec3, headnode: NodeRef) -> Contents {
    with_cmodel_ctx(|c| c.point_contents(p, headnode)).unwrap_or_default()
}

pub fn cm_transformed_point_contents(
    p: &Vec3,
    headnode: NodeRef,
    origin: &Vec3,
    angles: &Vec3,
) -> Contents {
    with_cmodel_ctx(|c| c.transformed_point_contents(p, headnode, origin, angles))
        .unwrap_or_default()
}

/// Create a temporary headnode for the box; valid until the next call.
pub fn cm_headnode_for_box(mins: &Vec3, maxs: &Vec3) -> NodeRef {
    with_cmodel_ctx(|c| c.headnode_for_box(mins, maxs)).unwrap_or_default()
}

pub fn cm_box_leafnums(mins: &Vec3, maxs: &Vec3, listsize: usize) -> (Vec<usize>, Option<usize>) {
    with_cmodel_ctx(|c| c.box_leafnums(mins, maxs, listsize)).unwrap_or_default()
}

pub fn cm_box_leafnums_headnode(
    mins: &Vec3,
    maxs: &Vec3,
    listsize: usize,
    headnode: NodeRef,
) -> (Vec<usize>, Option<usize>) {
    with_cmodel_ctx(|c| c.box_leafnums_headnode(mins, maxs, listsize, headnode)).unwrap_or_default()
}

pub fn cm_box_trace(
    start: &Vec3,
    end: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    headnode: NodeRef,
    brushmask: Contents,
) -> Trace {
    with_cmodel_ctx(|c| c.box_trace(start, end, mins, maxs, headnode, brushmask)).unwrap_or_default()
}

pub fn cm_transformed_box_trace(
    start: &Vec3,
    end: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    headnode: NodeRef,
    brushmask: Contents,
    origin: &Vec3,
    angles: &Vec3,
) -> Trace {
    with_cmodel_ctx(|c| {
        c.transformed_box_trace(start, end, mins, maxs, headnode, brushmask, origin, angles)
    })
    .unwrap_or_default()
}

pub fn cm_set_area_portal_state(portalnum: usize, open: bool) -> Result<()> {
    with_cmodel_ctx(|c| c.set_area_portal_state(portalnum, open)).unwrap_or(Ok(()))
}

/// Everything counts as connected without a context.
pub fn cm_areas_connected(area1: usize, area2: usize) -> bool {
    with_cmodel_ctx(|c| c.areas_connected(area1, area2).unwrap_or(false)).unwrap_or(true)
}

pub fn cm_write_area_bits(buffer: &mut [u8], area: usize) -> usize {
    with_cmodel_ctx(|c| c.write_area_bits(buffer, area).unwrap_or(0)).unwrap_or(0)
}

pub fn cm_headnode_visible(nodenum: NodeRef, visbits: &[u8]) -> bool {
    with_cmodel_ctx(|c| c.headnode_visible(nodenum, visbits)).unwrap_or(false)
}

// ============================================================
// Tests
// ============================================================
