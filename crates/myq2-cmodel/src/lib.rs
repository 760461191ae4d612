#![allow(clippy::too_many_arguments, clippy::float_cmp, clippy::needless_range_loop,
         clippy::comparison_chain, clippy::manual_range_contains)]

//! Quake 2 BSP collision model: loads the collision lumps of a version 38
//! map and answers point-contents, swept-box trace and area-portal queries.

pub mod q_shared;
pub mod qfiles;
pub mod error;
pub mod config;
pub mod md4;
pub mod cmodel;
mod loader;
pub mod tree;
mod box_hull;
pub mod trace;
pub mod areas;
pub mod global;

#[cfg(test)]
mod testmap;

pub use crate::cmodel::{CModel, CModelContext, CmodelStats};
pub use crate::config::CmodelConfig;
pub use crate::error::{CmodelError, Result};
pub use crate::md4::com_block_checksum;
pub use crate::q_shared::{CPlane, CSurface, Contents, SurfaceFlags, Trace, Vec3};
pub use crate::trace::DIST_EPSILON;
pub use crate::tree::NodeRef;
