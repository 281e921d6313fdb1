//! Validation utilities for caller-supplied regions and numeric parameters
//!
//! The processors themselves never reject regions; these helpers are for the
//! producers of regions (vision tools, the CLI) to check their side of the
//! contract before handing data to the pipeline.

use crate::error::{PostProcessError, Result};
use crate::types::Region;

/// Validator for the unit-interval region contract
pub struct RegionValidator;

impl RegionValidator {
    /// Validate that every component of a region is finite and within `[0, 1]`
    pub fn validate(region: &Region) -> Result<()> {
        let components = [
            ("x", region.x),
            ("y", region.y),
            ("w", region.w),
            ("h", region.h),
        ];

        for (name, value) in components {
            if !value.is_finite() {
                return Err(PostProcessError::invalid_region(format!(
                    "{} component of {} is not finite",
                    name, region
                )));
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(PostProcessError::invalid_region(format!(
                    "{} component of {} must be between 0.0 and 1.0, got {}",
                    name, region, value
                )));
            }
        }

        Ok(())
    }

    /// Validate a list of regions, reporting the index of the first offender
    pub fn validate_all(regions: &[Region]) -> Result<()> {
        for (index, region) in regions.iter().enumerate() {
            Self::validate(region).map_err(|e| {
                PostProcessError::invalid_region(format!("region #{}: {}", index, e))
            })?;
        }
        Ok(())
    }

    /// Parse a region from `"x,y,w,h"` text
    pub fn parse(text: &str) -> Result<Region> {
        let values = text
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|e| {
                    PostProcessError::invalid_region(format!(
                        "cannot parse '{}' in '{}': {}",
                        part.trim(),
                        text,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            [x, y, w, h] => Ok(Region::new(*x, *y, *w, *h)),
            _ => Err(PostProcessError::invalid_region(format!(
                "expected 4 comma-separated values (x,y,w,h), got {} in '{}'",
                values.len(),
                text
            ))),
        }
    }
}

/// Validator for numeric configuration values
pub struct NumericValidator;

impl NumericValidator {
    /// Validate fraction value (0.0 to 1.0)
    pub fn validate_fraction(value: f64, name: &str) -> Result<f64> {
        if !value.is_finite() {
            return Err(PostProcessError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(PostProcessError::invalid_config(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(PostProcessError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_validation() {
        assert!(RegionValidator::validate(&Region::new(0.0, 0.0, 1.0, 1.0)).is_ok());
        assert!(RegionValidator::validate(&Region::new(0.5, 0.5, 0.1, 0.1)).is_ok());

        let err = RegionValidator::validate(&Region::new(0.5, 1.2, 0.1, 0.1)).unwrap_err();
        assert!(err.to_string().contains("y component"));

        let err = RegionValidator::validate(&Region::new(f64::INFINITY, 0.0, 0.1, 0.1)).unwrap_err();
        assert!(err.to_string().contains("not finite"));
    }

    #[test]
    fn test_validate_all_reports_index() {
        let regions = [Region::new(0.1, 0.1, 0.1, 0.1), Region::new(0.1, 0.1, -0.1, 0.1)];
        let err = RegionValidator::validate_all(&regions).unwrap_err();
        assert!(err.to_string().contains("region #1"));
        assert!(RegionValidator::validate_all(&[]).is_ok());
    }

    #[test]
    fn test_parse_region() {
        let region = RegionValidator::parse("0.1, 0.2,0.3 ,0.4").unwrap();
        assert_eq!(region, Region::new(0.1, 0.2, 0.3, 0.4));

        assert!(RegionValidator::parse("0.1,0.2,0.3").is_err());
        assert!(RegionValidator::parse("0.1,0.2,0.3,abc").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert!(NumericValidator::validate_fraction(0.05, "zoom_padding").is_ok());
        assert!(NumericValidator::validate_fraction(1.5, "zoom_padding").is_err());
        assert!(NumericValidator::validate_fraction(f64::NAN, "zoom_padding").is_err());

        assert_eq!(NumericValidator::validate_range(3, 1, 64, "radius").unwrap(), 3);
        let err = NumericValidator::validate_range(0, 1, 64, "radius").unwrap_err();
        assert!(err.to_string().contains("radius must be between 1 and 64"));
    }
}
