//! PCM sample formats carried over the wire

use std::fmt;

/// Sample format of the raw PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    S8,
    #[default]
    S16,
    S24,
    S32,
    F32,
    F64,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 6] = [
        SampleFormat::S8,
        SampleFormat::S16,
        SampleFormat::S24,
        SampleFormat::S32,
        SampleFormat::F32,
        SampleFormat::F64,
    ];

    /// Size of one sample in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S32 => 4,
            SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    /// Command line name
    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::S8 => "s8",
            SampleFormat::S16 => "s16",
            SampleFormat::S24 => "s24",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Parse a format name, falling back to the default on unknown input.
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            let fallback = Self::default();
            tracing::warn!("Unknown sample format '{}', using {}", name, fallback);
            fallback
        })
    }

    /// Matching cpal format. Packed 24-bit has no cpal 0.15 counterpart.
    pub fn to_cpal(self) -> Option<cpal::SampleFormat> {
        match self {
            SampleFormat::S8 => Some(cpal::SampleFormat::I8),
            SampleFormat::S16 => Some(cpal::SampleFormat::I16),
            SampleFormat::S24 => None,
            SampleFormat::S32 => Some(cpal::SampleFormat::I32),
            SampleFormat::F32 => Some(cpal::SampleFormat::F32),
            SampleFormat::F64 => Some(cpal::SampleFormat::F64),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_widths() {
        let widths: Vec<usize> = SampleFormat::ALL.iter().map(|f| f.bytes_per_sample()).collect();
        assert_eq!(widths, vec![1, 2, 3, 4, 4, 8]);
    }

    #[test]
    fn test_parse_names() {
        for format in SampleFormat::ALL {
            assert_eq!(SampleFormat::parse(format.name()), Some(format));
        }
        assert_eq!(SampleFormat::parse("u8"), None);
        assert_eq!(SampleFormat::parse("S16"), None);
    }

    #[test]
    fn test_unknown_falls_back_to_s16() {
        assert_eq!(SampleFormat::parse_or_default("mp3"), SampleFormat::S16);
        assert_eq!(SampleFormat::parse_or_default("f64"), SampleFormat::F64);
    }

    #[test]
    fn test_cpal_mapping() {
        assert_eq!(SampleFormat::S16.to_cpal(), Some(cpal::SampleFormat::I16));
        assert_eq!(SampleFormat::F64.to_cpal(), Some(cpal::SampleFormat::F64));
        assert!(SampleFormat::S24.to_cpal().is_none());
    }
}
