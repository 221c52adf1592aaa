//! Toolkit for fetching a boot image from raw storage media and validating it before launch.
//!
//! An image is located on one of several media (compiled-in payload, memory-mapped flash,
//! block-readable flash or card, card with a GPT), optionally decompressed into working memory,
//! checked against its header CRC and then handed to a [`boot::Launch`] collaborator.
#![no_std]

use serde::{Deserialize, Serialize};

pub mod boot;
pub mod config;
pub mod decompress;
pub mod header;
pub mod integrity;
pub mod pipeline;
pub mod sources;
pub mod state;
pub mod storage;

pub use pipeline::Pipeline;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

/// Reasons a boot attempt can fail.
///
/// Only [`Error::PartitionLookup`] is recoverable; every other variant ends the attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("boot image could not be read from the selected medium")]
    Acquisition,
    #[error("boot image magic {found:#010x} not recognized")]
    MagicMismatch { found: u32 },
    #[error("boot image of {length} bytes does not fit in {capacity} bytes of target memory")]
    ImageTooLarge { length: u64, capacity: usize },
    #[error("boot image decompression failed")]
    Decompression,
    #[error("boot image header CRC mismatch")]
    Integrity,
    #[error("partition lookup failed: {0}")]
    PartitionLookup(PartitionError),
    #[error("no boot medium configured")]
    NoBootMedium,
    #[error("boot medium {0:?} is not available")]
    MediumUnavailable(BootMedium),
    #[error("core launch failed")]
    Launch,
    #[error("persistent storage access failed")]
    Storage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("partition table could not be read")]
    Read,
    #[error("partition table header invalid")]
    Header,
    #[error("partition entries invalid")]
    Entries,
    #[error("no partition of the requested type")]
    NotFound,
}

/// Media which are read through a block-read primitive of the [`Device`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum BlockMedium {
    /// QSPI flash, read without eXecute In Place.
    Qspi,
    /// MMC or SD card.
    Mmc,
    /// Discrete SPI flash behind the system controller.
    SpiFlash,
}

/// Every medium a boot image can be selected from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum BootMedium {
    /// Image linked into the bootloader binary.
    Payload,
    /// QSPI flash, either memory-mapped or block-read depending on configuration.
    Qspi,
    Mmc,
    SpiFlash,
}

/// Representation of a concrete board which can read raw bytes from its boot media.
#[allow(async_fn_in_trait)]
pub trait Device {
    type Error: core::fmt::Debug;

    /// Read exactly `buffer.len()` bytes starting at byte `offset` of `medium`.
    ///
    /// On failure the contents of `buffer` are unspecified.
    async fn read(
        &mut self,
        medium: BlockMedium,
        offset: u64,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}
