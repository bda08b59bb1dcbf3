//! Conversion request and feature-flag configuration.

/// Outer wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Xml,
    JsonLd,
}

/// EPCIS schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1_2,
    V2_0,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1_2 => "1.2",
            Version::V2_0 => "2.0",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1.2" => Some(Version::V1_2),
            "2.0" => Some(Version::V2_0),
            _ => None,
        }
    }
}

/// Policy applied when the injected validator rejects an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Abort the whole conversion and surface a problem response (default).
    #[default]
    Abort,
    /// Drop the offending event and continue with the rest of the stream.
    Skip,
}

/// A single conversion request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub from_media_type: MediaType,
    /// `None` means "detect it" (the orchestrator runs the detector first).
    pub from_version: Option<Version>,
    pub to_media_type: MediaType,
    pub to_version: Version,
    pub flags: TranscoderFlags,
    pub validation_policy: ValidationPolicy,
}

impl ConversionRequest {
    pub fn new(
        from_media_type: MediaType,
        to_media_type: MediaType,
        to_version: Version,
    ) -> Self {
        Self {
            from_media_type,
            from_version: None,
            to_media_type,
            to_version,
            flags: TranscoderFlags::default(),
            validation_policy: ValidationPolicy::default(),
        }
    }

    /// `(JSON_LD, V1_2)` has no valid input binding.
    pub fn is_valid(&self) -> bool {
        !(self.from_media_type == MediaType::JsonLd && self.from_version == Some(Version::V1_2))
    }
}

/// Feature flags gating 2.0-only content when emitting 1.2 output
/// `generate_gs1_compliant_document` additionally constrains
/// 1.2 output to the GS1-compliant profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscoderFlags {
    pub generate_gs1_compliant_document: bool,
    pub include_association_event: bool,
    pub include_persistent_disposition: bool,
    pub include_sensor_element_list: bool,
}

impl Default for TranscoderFlags {
    fn default() -> Self {
        Self {
            generate_gs1_compliant_document: true,
            include_association_event: true,
            include_persistent_disposition: true,
            include_sensor_element_list: true,
        }
    }
}
