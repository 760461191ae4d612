// areas.rs — area portal state and area connectivity flooding
// Derived from: myq2-original/qcommon/cmodel.c (AREAPORTALS)

use std::io::{self, Read, Write};

use crate::cmodel::CModelContext;
use crate::error::{CmodelError, Result};

impl CModelContext {
    fn flood_area_r(&mut self, area: usize, floodnum: i32) -> Result<()> {
        let a = &mut self.map.areas[area];
        if a.floodvalid == self.floodvalid {
            if a.floodnum == floodnum {
                return Ok(());
            }
            return Err(CmodelError::Reflooded { area });
        }

        a.floodnum = floodnum;
        a.floodvalid = self.floodvalid;

        let (first, count) = (a.firstareaportal, a.numareaportals);
        for i in first..first + count {
            let p = self.map.areaportals[i];
            if self.portalopen[p.portalnum] {
                self.flood_area_r(p.otherarea, floodnum)?;
            }
        }
        Ok(())
    }

    /// Give every group of areas joined by open portals its own floodnum.
    /// Area 0 is the solid "no area" and is never flooded.
    pub fn flood_area_connections(&mut self) -> Result<()> {
        // all current floods are now invalid
        self.floodvalid = self.floodvalid.wrapping_add(1);
        let mut floodnum = 0;

        // area 0 is not used
        for i in 1..self.map.areas.len() {
            if self.map.areas[i].floodvalid == self.floodvalid {
                continue; // already flooded into
            }
            floodnum += 1;
            self.flood_area_r(i, floodnum)?;
        }
        Ok(())
    }

    pub fn set_area_portal_state(&mut self, portalnum: usize, open: bool) -> Result<()> {
        if portalnum > self.map.areaportals.len() || portalnum >= self.portalopen.len() {
            return Err(CmodelError::BadPortal(portalnum));
        }

        self.portalopen[portalnum] = open;
        self.flood_area_connections()
    }

    pub fn areas_connected(&self, area1: usize, area2: usize) -> Result<bool> {
        if self.config.map_noareas {
            return Ok(true);
        }

        let numareas = self.map.areas.len();
        for area in [area1, area2] {
            if area >= numareas {
                return Err(CmodelError::BadArea(area));
            }
        }

        Ok(self.map.areas[area1].floodnum == self.map.areas[area2].floodnum)
    }

    /// Writes a bit vector of all the areas that are in the same flood as
    /// the area parameter. Area 0 marks every area, which the client uses
    /// as the "no area" fallback.
    ///
    /// Returns the number of bytes the full vector needs; bytes past the end
    /// of `buffer` are dropped.
    pub fn write_area_bits(&self, buffer: &mut [u8], area: usize) -> Result<usize> {
        let numareas = self.map.areas.len();
        if area >= numareas {
            return Err(CmodelError::BadArea(area));
        }

        let bytes = (numareas + 7) >> 3;
        let n = bytes.min(buffer.len());

        if self.config.map_noareas {
            // for debugging, send everything
            buffer[..n].fill(0xff);
        } else {
            buffer[..n].fill(0);

            let floodnum = self.map.areas[area].floodnum;
            for (i, a) in self.map.areas.iter().enumerate() {
                if a.floodnum == floodnum || area == 0 {
                    if let Some(byte) = buffer.get_mut(i >> 3) {
                        *byte |= 1 << (i & 7);
                    }
                }
            }
        }

        Ok(bytes)
    }

    /// Writes the portal state to a savegame file, one byte per portal slot.
    pub fn write_portal_state<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let bytes: Vec<u8> = self.portalopen.iter().map(|&open| open as u8).collect();
        writer.write_all(&bytes)
    }

    /// Reads the portal state from a savegame file and recalculates the
    /// area connections.
    pub fn read_portal_state<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        let mut bytes = vec![0u8; self.portalopen.len()];
        reader.read_exact(&mut bytes)?;
        for (open, b) in self.portalopen.iter_mut().zip(&bytes) {
            *open = *b != 0;
        }
        self.flood_area_connections()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

// ============================================================
// Tests
// ============================================================
