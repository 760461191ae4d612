// error.rs — load and query errors for the collision model

use std::error::Error;
use std::fmt;

pub type Result<T> = std::result::Result<T, CmodelError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmodelError {
    /// A map other than the loaded one was requested without its file data.
    CouldNotLoad(String),
    /// Buffer ends before the lump directory.
    Truncated { len: usize },
    BadIdent(i32),
    WrongVersion { name: String, version: i32 },
    /// A lump's byte range does not lie inside the file.
    LumpOutOfRange { lump: &'static str, fileofs: i32, filelen: i32 },
    FunnyLumpSize { lump: &'static str, len: usize, record: usize },
    TooFew { lump: &'static str },
    TooMany { lump: &'static str, count: usize, max: usize },
    /// A record refers past the end of another lump.
    BadIndex { lump: &'static str, record: usize, value: i64 },
    LeafZeroNotSolid,
    NoEmptyLeaf,
    NoRoomForBoxHull,
    BadInlineModel(String),
    BadLeaf(usize),
    BadArea(usize),
    BadPortal(usize),
    /// Portal data let two flood passes reach the same area.
    Reflooded { area: usize },
    UnknownSetting(String),
    BadSettingValue { name: String, value: String },
}

impl fmt::Display for CmodelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmodelError::CouldNotLoad(name) => write!(f, "Couldn't load {}", name),
            CmodelError::Truncated { len } => write!(f, "BSP file too short ({} bytes)", len),
            CmodelError::BadIdent(ident) => write!(f, "BSP has bad ident 0x{:08x}", ident),
            CmodelError::WrongVersion { name, version } => write!(
                f,
                "CMod_LoadBrushModel: {} has wrong version number ({} should be {})",
                name,
                version,
                crate::qfiles::BSPVERSION
            ),
            CmodelError::LumpOutOfRange { lump, fileofs, filelen } => write!(
                f,
                "CMod_LoadBrushModel: {} lump out of range (ofs {}, len {})",
                lump, fileofs, filelen
            ),
            CmodelError::FunnyLumpSize { lump, len, record } => write!(
                f,
                "MOD_LoadBmodel: funny lump size ({}: {} bytes, record size {})",
                lump, len, record
            ),
            CmodelError::TooFew { lump } => write!(f, "Map with no {}", lump),
            CmodelError::TooMany { lump, count, max } => {
                write!(f, "Map has too many {} ({} > {})", lump, count, max)
            }
            CmodelError::BadIndex { lump, record, value } => {
                write!(f, "Bad index {} in {} record {}", value, lump, record)
            }
            CmodelError::LeafZeroNotSolid => write!(f, "Map leaf 0 is not CONTENTS_SOLID"),
            CmodelError::NoEmptyLeaf => write!(f, "Map does not have an empty leaf"),
            CmodelError::NoRoomForBoxHull => write!(f, "Not enough room for box tree"),
            CmodelError::BadInlineModel(name) => write!(f, "CM_InlineModel: bad name {:?}", name),
            CmodelError::BadLeaf(n) => write!(f, "CM_LeafContents: bad number {}", n),
            CmodelError::BadArea(n) => write!(f, "area {} > numareas", n),
            CmodelError::BadPortal(n) => write!(f, "areaportal {} > numareaportals", n),
            CmodelError::Reflooded { area } => write!(f, "FloodArea_r: reflooded area {}", area),
            CmodelError::UnknownSetting(name) => write!(f, "unknown cmodel setting {:?}", name),
            CmodelError::BadSettingValue { name, value } => {
                write!(f, "bad value {:?} for {}", value, name)
            }
        }
    }
}

impl Error for CmodelError {}
