//! Block-read primitive backed by a NOR flash driver.

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};
use embedded_storage_async::nor_flash::ReadNorFlash;

use crate::{BlockMedium, Device};

/// [`Device`] serving a single boot medium from an `embedded-storage-async` flash driver.
///
/// Reads must satisfy the alignment requirements of the driver (`READ_SIZE`).
pub struct NorFlashDevice<F> {
    medium: BlockMedium,
    flash: F,
}

impl<F: ReadNorFlash> NorFlashDevice<F> {
    pub fn new(medium: BlockMedium, flash: F) -> Self {
        Self { medium, flash }
    }

    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: ReadNorFlash> Device for NorFlashDevice<F> {
    type Error = NorFlashErrorKind;

    async fn read(
        &mut self,
        medium: BlockMedium,
        offset: u64,
        buffer: &mut [u8],
    ) -> Result<(), NorFlashErrorKind> {
        if medium != self.medium {
            return Err(NorFlashErrorKind::Other);
        }

        let offset = u32::try_from(offset).map_err(|_| NorFlashErrorKind::OutOfBounds)?;
        let end = usize::try_from(offset)
            .ok()
            .and_then(|offset| offset.checked_add(buffer.len()));
        if end.is_none_or(|end| end > self.flash.capacity()) {
            return Err(NorFlashErrorKind::OutOfBounds);
        }

        self.flash.read(offset, buffer).await.map_err(|e| e.kind())
    }
}
