//! Encoded device identifiers.
//!
//! Every device visible through the C ABI is addressed by a single `i32`:
//! the low four bits select the backend platform, the remaining bits the
//! device index within that platform. The encoding is stable across
//! processes so compiler-emitted host code can bake ids into generated
//! launches.

use std::fmt;

use crate::error::{Error, Result};

const TAG_BITS: u32 = 4;
const TAG_MASK: i32 = (1 << TAG_BITS) - 1;

/// Identifies one of the backend platforms the runtime can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PlatformTag {
    Host = 0,
    Cuda = 1,
    OpenCl = 2,
    Hsa = 3,
}

impl PlatformTag {
    /// Number of assignable platform slots.
    pub const COUNT: usize = 4;

    pub fn from_i32(tag: i32) -> Option<PlatformTag> {
        match tag {
            0 => Some(PlatformTag::Host),
            1 => Some(PlatformTag::Cuda),
            2 => Some(PlatformTag::OpenCl),
            3 => Some(PlatformTag::Hsa),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlatformTag::Host => "host",
            PlatformTag::Cuda => "cuda",
            PlatformTag::OpenCl => "opencl",
            PlatformTag::Hsa => "hsa",
        }
    }
}

/// A packed (platform, device index) identifier as passed across the ABI.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(i32);

impl DeviceId {
    /// Wraps a raw id received from the ABI. No validation happens here;
    /// `decode` reports unknown tags.
    pub const fn new(raw: i32) -> DeviceId {
        DeviceId(raw)
    }

    pub const fn encode(tag: PlatformTag, index: usize) -> DeviceId {
        DeviceId(((index as i32) << TAG_BITS) | tag as i32)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Splits the id into its platform tag and intra-platform index.
    ///
    /// Total over all inputs: ids carrying a tag outside the assigned
    /// range fail with an error naming the offending tag.
    pub fn decode(self) -> Result<(PlatformTag, usize)> {
        let tag_bits = self.0 & TAG_MASK;
        let tag = PlatformTag::from_i32(tag_bits)
            .ok_or(Error::UnknownPlatformTag(tag_bits))?;
        let index = (self.0 as u32 >> TAG_BITS) as usize;
        Ok((tag, index))
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.decode() {
            Ok((tag, index)) => write!(f, "DeviceId({}:{})", tag.name(), index),
            Err(_) => write!(f, "DeviceId(raw {})", self.0),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<i32> for DeviceId {
    fn from(raw: i32) -> DeviceId {
        DeviceId(raw)
    }
}

impl From<DeviceId> for i32 {
    fn from(id: DeviceId) -> i32 {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_all_tags() {
        let tags = [
            PlatformTag::Host,
            PlatformTag::Cuda,
            PlatformTag::OpenCl,
            PlatformTag::Hsa,
        ];
        for &tag in &tags {
            for index in (0..64).chain([1000, 65535].iter().cloned()) {
                let id = DeviceId::encode(tag, index);
                assert_eq!(id.decode().unwrap(), (tag, index));
            }
        }
    }

    #[test]
    fn unknown_tag_is_named() {
        let id = DeviceId::new(7);
        let err = id.decode().unwrap_err();
        assert!(err.to_string().contains('7'), "{}", err);

        let id = DeviceId::new((3 << 4) | 0xf);
        assert!(id.decode().is_err());
    }

    #[test]
    fn tag_is_low_bits() {
        let id = DeviceId::encode(PlatformTag::Hsa, 5);
        assert_eq!(id.raw() & 0xf, PlatformTag::Hsa as i32);
        assert_eq!(id.raw() >> 4, 5);
    }
}
