
//! Compute the geometry of smaller resolution levels.

use crate::input::part::PartInfo;
use crate::meta::attribute::LevelMode;
use crate::spec::ImageSpec;
use crate::error::*;
use crate::math::*;


/// The size of a mip level, halving the full resolution size once per level.
/// Each halving is rounded by the rounding mode and never results in less than one pixel.
pub fn mip_level_size(full_resolution: Vec2<usize>, round: RoundingMode, level: usize) -> Vec2<usize> {
    (0 .. level).fold(full_resolution, |size, _| size.map(|dimension| round.halve(dimension)))
}


impl PartInfo {

    /// Fail if the level does not exist or cannot be described by this crate.
    pub fn validate_mip_level(&self, level: usize) -> UnitResult {
        if level >= self.level_count {
            return Err(Error::usage(format!(
                "mip level {} does not exist, the part has {} levels",
                level, self.level_count
            )));
        }

        if level > 0 && self.level_mode == LevelMode::RipMap {
            return Err(Error::unsupported("resolution of rip map levels"));
        }

        Ok(())
    }

    /// The width and height of a mip level.
    pub fn mip_level_size(&self, level: usize) -> Result<Vec2<usize>> {
        self.validate_mip_level(level)?;

        Ok(match self.level_mode {
            LevelMode::MipMap => mip_level_size(self.data_window.size, self.rounding_mode, level),
            LevelMode::Singular | LevelMode::RipMap => self.data_window.size,
        })
    }

    /// Adjust the geometry of a spec of the full resolution level to describe the specified level.
    /// Smaller levels have no display window of their own, so they use their data window instead.
    pub fn apply_mip_level(&self, level: usize, spec: &mut ImageSpec) -> UnitResult {
        let size = self.mip_level_size(level)?;

        if self.level_mode == LevelMode::Singular {
            return Ok(());
        }

        spec.width = size.width();
        spec.height = size.height();
        spec.x = self.data_window.position.x();
        spec.y = self.data_window.position.y();

        if level == 0 {
            spec.full_x = self.display_window.position.x();
            spec.full_y = self.display_window.position.y();
            spec.full_width = self.display_window.size.width();
            spec.full_height = self.display_window.size.height();
        }
        else {
            spec.full_x = spec.x;
            spec.full_y = spec.y;
            spec.full_width = spec.width;
            spec.full_height = spec.height;
        }

        if self.cube_face {
            spec.full_width = size.width();
            spec.full_height = size.width();
        }

        Ok(())
    }
}
