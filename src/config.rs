//! Which boot media are present on a board and how they are used.

use serde::{Deserialize, Serialize};
use uguid::Guid;

use crate::{BootMedium, boot::BootFlow, sources::gpt::BOOT_PARTITION_TYPE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiFlashConfig {
    /// Byte offset of the image within the SPI flash.
    pub offset: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmcConfig {
    /// Look the image up through the GUID Partition Table instead of reading from offset 0.
    pub use_gpt: bool,
    pub partition_type: Guid,
}

impl Default for MmcConfig {
    fn default() -> Self {
        Self {
            use_gpt: true,
            partition_type: BOOT_PARTITION_TYPE.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QspiConfig {
    /// The flash is memory-mapped and the image is used in place.
    pub xip: bool,
}

/// Boot media configuration, a medium being `None` meaning it is absent on this board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BootConfig {
    pub spi_flash: Option<SpiFlashConfig>,
    pub mmc: Option<MmcConfig>,
    pub qspi: Option<QspiConfig>,
    /// An image is linked into the bootloader.
    pub payload: bool,
    pub boot_flow: BootFlow,
}

impl BootConfig {
    pub fn is_enabled(&self, medium: BootMedium) -> bool {
        match medium {
            BootMedium::Payload => self.payload,
            BootMedium::Qspi => self.qspi.is_some(),
            BootMedium::Mmc => self.mmc.is_some(),
            BootMedium::SpiFlash => self.spi_flash.is_some(),
        }
    }

    /// Medium selected when nothing else was requested.
    ///
    /// SPI flash takes precedence over MMC, over QSPI, over the payload.
    pub fn default_medium(&self) -> Option<BootMedium> {
        [
            BootMedium::SpiFlash,
            BootMedium::Mmc,
            BootMedium::Qspi,
            BootMedium::Payload,
        ]
        .into_iter()
        .find(|medium| self.is_enabled(*medium))
    }
}
