//! Magic and CRC checks applied to a boot image header.

use log::error;
use zerocopy::IntoBytes;

use crate::header::{BOOT_MAGIC, BootImageHeader, COMPRESSED_MAGIC};

pub(crate) static CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Checksum primitive used for all image checks.
pub trait Crc32 {
    fn checksum(&self, bytes: &[u8]) -> u32;
}

/// Standard reflected CRC32 as used by the image building tool.
#[derive(Clone, Copy, Debug, Default)]
pub struct IsoHdlc;

impl Crc32 for IsoHdlc {
    fn checksum(&self, bytes: &[u8]) -> u32 {
        CRC32.checksum(bytes)
    }
}

/// Whether the header carries either the plain or the compressed magic.
pub fn verify_magic(header: &BootImageHeader) -> bool {
    let magic = header.magic.get();
    let result = magic == BOOT_MAGIC || magic == COMPRESSED_MAGIC;

    if !result {
        error!(
            "magic is {:08x} vs expected {:08x} or {:08x}",
            magic, BOOT_MAGIC, COMPRESSED_MAGIC
        );
    }

    result
}

/// Check the header CRC, which is computed over the header with its CRC field zeroed.
///
/// The CRC field is always restored before returning, match or not.
pub fn validate_crc(header: &mut BootImageHeader, crc: &impl Crc32) -> bool {
    let original = header.header_crc.get();
    header.header_crc.set(0);

    let calculated = crc.checksum(header.as_bytes());
    let result = calculated == original;

    if !result {
        error!(
            "Checked boot image header CRC: calculated {:08x} vs expected {:08x}",
            calculated, original
        );
    }

    header.header_crc.set(original);

    result
}

/// CRC over the full claimed image length, for diagnostics only.
///
/// The claimed length is clamped to the bytes actually present in `image`.
pub fn image_crc(image: &[u8], header: &BootImageHeader, crc: &impl Crc32) -> u32 {
    let claimed = usize::try_from(header.boot_image_length.get()).unwrap_or(usize::MAX);
    let length = claimed.min(image.len());

    if length < claimed {
        log::warn!(
            "image claims {} bytes but only {} are available",
            claimed,
            image.len()
        );
    }

    crc.checksum(&image[..length])
}
