//! Fixed-layout header every boot image starts with.
//!
//! The layout is shared with the image building tool and must not change:
//! all fields are little-endian and the struct has no padding.

use core::mem::size_of;

use log::debug;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{LittleEndian, U32, U64},
};

use crate::Error;

/// Magic of an image which can be launched as-is.
pub const BOOT_MAGIC: u32 = 0xB007_C0DE;
/// Magic of an image which must be decompressed before use.
pub const COMPRESSED_MAGIC: u32 = 0xC08B_8355;

pub const BOOT_IMAGE_MAX_NAME_LEN: usize = 256;

pub const HEADER_SIZE: usize = size_of::<BootImageHeader>();

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BootImageHeader {
    pub magic: U32<LittleEndian>,
    /// CRC32 of the header, computed with this field set to zero.
    pub header_crc: U32<LittleEndian>,
    /// Total length of the image, header included.
    pub boot_image_length: U64<LittleEndian>,
    /// Human readable name of the image set, not necessarily NUL terminated.
    pub set_name: [u8; BOOT_IMAGE_MAX_NAME_LEN],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImageKind {
    Plain,
    Compressed,
}

impl BootImageHeader {
    pub fn kind(&self) -> Option<ImageKind> {
        match self.magic.get() {
            BOOT_MAGIC => Some(ImageKind::Plain),
            COMPRESSED_MAGIC => Some(ImageKind::Compressed),
            _ => None,
        }
    }

    /// Set name up to the first NUL, bounded by the buffer length.
    ///
    /// Stops early at the first byte which is not valid UTF-8.
    pub fn set_name(&self) -> &str {
        let end = self
            .set_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.set_name.len());
        let name = &self.set_name[..end];

        match core::str::from_utf8(name) {
            Ok(name) => name,
            Err(e) => core::str::from_utf8(&name[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    pub fn log_details(&self) {
        debug!(" - set name is >>{}<<", self.set_name());
        debug!(" - magic is    {:08X}", self.magic.get());
        debug!(" - length is   {:08X}", self.boot_image_length.get());
    }
}

/// Copy the header out of the start of `image`.
///
/// A region too small to hold a header is treated like an unreadable image.
pub fn read_header(image: &[u8]) -> Result<BootImageHeader, Error> {
    BootImageHeader::read_from_prefix(image)
        .map(|(header, _)| header)
        .map_err(|_| Error::Acquisition)
}
