//! Source for an image executed in place from memory-mapped flash.

use log::info;

use crate::{Error, header::read_header, integrity::verify_magic};

/// Memory-mapped flash window holding the image.
///
/// The image is checked where it lives, without copying it to working memory.
/// Note that with eXecute In Place nothing keeps the flash from changing after validation.
#[derive(Clone, Copy, Debug)]
pub struct Xip<'a> {
    window: &'a [u8],
}

impl<'a> Xip<'a> {
    pub const fn new(window: &'a [u8]) -> Self {
        Self { window }
    }

    /// Create a source from the base address of a memory-mapped flash.
    ///
    /// # Safety
    /// `base` must point to `len` bytes of readable memory which stay mapped and are not
    /// written for the lifetime `'a`.
    pub unsafe fn from_raw(base: *const u8, len: usize) -> Self {
        Self {
            window: unsafe { core::slice::from_raw_parts(base, len) },
        }
    }

    pub fn window(&self) -> &'a [u8] {
        self.window
    }

    pub fn acquire(&self) -> Result<&'a [u8], Error> {
        info!("Checking boot image in place at {:p}", self.window.as_ptr());

        let header = read_header(self.window)?;

        if !verify_magic(&header) {
            return Err(Error::MagicMismatch {
                found: header.magic.get(),
            });
        }

        Ok(self.window)
    }
}
