//! Common validation utilities.

use validator::ValidationError;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a trip distance in kilometers (0 to 1000, generous upper bound
/// for a single urban-or-intercity trip).
pub fn validate_distance_km(distance_km: f64) -> Result<(), ValidationError> {
    if (0.0..=1000.0).contains(&distance_km) {
        Ok(())
    } else {
        let mut err = ValidationError::new("distance_km_range");
        err.message = Some("distance_km must be within [0, 1000]".into());
        Err(err)
    }
}

/// Validates a trip duration in seconds (0 to 86400, a generous single-day cap).
pub fn validate_duration_sec(duration_sec: i32) -> Result<(), ValidationError> {
    if (0..=86_400).contains(&duration_sec) {
        Ok(())
    } else {
        let mut err = ValidationError::new("duration_sec_range");
        err.message = Some("duration_sec must be within [0, 86400]".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_distance_km() {
        assert!(validate_distance_km(0.0).is_ok());
        assert!(validate_distance_km(1000.0).is_ok());
        assert!(validate_distance_km(-0.1).is_err());
        assert!(validate_distance_km(1000.1).is_err());
    }

    #[test]
    fn test_validate_duration_sec() {
        assert!(validate_duration_sec(0).is_ok());
        assert!(validate_duration_sec(86_400).is_ok());
        assert!(validate_duration_sec(-1).is_err());
        assert!(validate_duration_sec(86_401).is_err());
    }
}
