//! Source which copies the image from a block-readable medium into target memory.
//!
//! Shared by QSPI flash without eXecute In Place, MMC cards and discrete SPI flash.
//! The header is read into a staging buffer first; only after its magic checks out is
//! the complete image read, from the same offset, into the target region.

use log::{error, info};
use zerocopy::IntoBytes;

use crate::{
    BlockMedium, Device, Error,
    header::{BootImageHeader, HEADER_SIZE},
    integrity::verify_magic,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockCopy {
    medium: BlockMedium,
    offset: u64,
}

impl BlockCopy {
    pub const fn new(medium: BlockMedium, offset: u64) -> Self {
        Self { medium, offset }
    }

    pub fn medium(&self) -> BlockMedium {
        self.medium
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Copy the image into `target`, returning its length.
    ///
    /// A failing read at either step ends the attempt; nothing partial is returned.
    pub async fn acquire<D: Device>(
        &self,
        device: &mut D,
        scratch: &mut BootImageHeader,
        target: &mut [u8],
    ) -> Result<usize, Error> {
        info!(
            "Preparing to copy from {:?} +{:#x} to target memory ...",
            self.medium, self.offset
        );
        info!("Attempting to read image header ({} bytes) ...", HEADER_SIZE);

        self.read(device, scratch.as_mut_bytes()).await?;

        if !verify_magic(scratch) {
            return Err(Error::MagicMismatch {
                found: scratch.magic.get(),
            });
        }
        scratch.log_details();

        let length = scratch.boot_image_length.get();
        let len = usize::try_from(length)
            .ok()
            .filter(|len| *len <= target.len())
            .ok_or_else(|| {
                error!(
                    "Image of {} bytes exceeds target memory of {} bytes",
                    length,
                    target.len()
                );
                Error::ImageTooLarge {
                    length,
                    capacity: target.len(),
                }
            })?;

        info!("Copying {} bytes to {:p}", len, target.as_ptr());
        self.read(device, &mut target[..len]).await?;

        Ok(len)
    }

    async fn read<D: Device>(&self, device: &mut D, buffer: &mut [u8]) -> Result<(), Error> {
        device
            .read(self.medium, self.offset, buffer)
            .await
            .map_err(|e| {
                error!(
                    "Failed to read {:#x} bytes from {:?} @{:#x}: {:?}",
                    buffer.len(),
                    self.medium,
                    self.offset,
                    e
                );
                Error::Acquisition
            })
    }
}
