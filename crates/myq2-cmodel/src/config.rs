// config.rs — console-variable style settings read by the collision code

use crate::error::{CmodelError, Result};

/// Below this record count a lump is parsed sequentially; rayon only
/// pays off for the big lumps.
pub const DEFAULT_PARALLEL_LUMP_THRESHOLD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmodelConfig {
    /// "map_noareas": treat every area as connected (debugging aid).
    pub map_noareas: bool,
    /// "flushmap": reparse the map even when the same name is reloaded.
    pub flushmap: bool,
    /// "cm_parallel_lumps": record count at which lump parsing goes parallel.
    pub parallel_lump_threshold: usize,
}

impl Default for CmodelConfig {
    fn default() -> Self {
        Self {
            map_noareas: false,
            flushmap: false,
            parallel_lump_threshold: DEFAULT_PARALLEL_LUMP_THRESHOLD,
        }
    }
}

impl CmodelConfig {
    /// Set a value from its console string, e.g. `set("map_noareas", "1")`.
    /// Booleans follow cvar rules: any non-zero number is true.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let bad_value = || CmodelError::BadSettingValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let number = value.trim().parse::<f32>().map_err(|_| bad_value())?;

        match name {
            "map_noareas" => self.map_noareas = number != 0.0,
            "flushmap" => self.flushmap = number != 0.0,
            "cm_parallel_lumps" => {
                if number < 0.0 {
                    return Err(bad_value());
                }
                self.parallel_lump_threshold = number as usize;
            }
            _ => return Err(CmodelError::UnknownSetting(name.to_string())),
        }
        Ok(())
    }

    /// Current value as a console string.
    pub fn get(&self, name: &str) -> Option<String> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        match name {
            "map_noareas" => Some(flag(self.map_noareas)),
            "flushmap" => Some(flag(self.flushmap)),
            "cm_parallel_lumps" => Some(self.parallel_lump_threshold.to_string()),
            _ => None,
        }
    }
}
