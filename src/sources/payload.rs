//! Source for an image linked into the bootloader binary.

use crate::{Error, header::read_header, integrity::verify_magic};

/// Image embedded at build time, for example through `include_bytes!`.
///
/// Nothing is copied; the blob is used where it lives.
#[derive(Clone, Copy, Debug)]
pub struct Payload<'a> {
    blob: &'a [u8],
}

impl<'a> Payload<'a> {
    pub const fn new(blob: &'a [u8]) -> Self {
        Self { blob }
    }

    pub fn acquire(&self) -> Result<&'a [u8], Error> {
        let header = read_header(self.blob)?;

        if !verify_magic(&header) {
            return Err(Error::MagicMismatch {
                found: header.magic.get(),
            });
        }
        header.log_details();

        Ok(self.blob)
    }
}
