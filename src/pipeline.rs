//! Orchestration of a single boot attempt.
//!
//! A boot attempt moves through the stages acquire, decompress (compressed images only),
//! validate and register. Every stage only runs when its predecessor succeeded, and the
//! attempt as a whole reports a single boolean. Which stage failed is only visible in the log.

use gpt_disk_types::GptPartitionType;
use log::{debug, error, info};
use zerocopy::FromZeros;

use crate::{
    BlockMedium, BootMedium, Device, Error,
    boot::{BootFlow, Cores, Launch},
    config::BootConfig,
    decompress::{self, Decompressor},
    header::{BOOT_MAGIC, BootImageHeader, ImageKind, read_header},
    integrity::{Crc32, IsoHdlc, image_crc, validate_crc},
    sources::{Acquired, BlockCopy, GptCopy, Payload, Source, Xip},
};

/// Progress of a boot attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    NotStarted,
    Acquired,
    Decompressed,
    Validated,
    Registered,
    Failed,
}

/// Where the image is after the optional decompression.
#[derive(Clone, Copy)]
enum Location<'a> {
    Resident(&'a [u8]),
    Target(usize),
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("boot stage {:?} -> {:?}", stage, next);
    *stage = next;
}

/// Context of the boot image pipeline.
///
/// Owns the header staging buffer and the medium selection, and borrows the memory regions
/// the image is read from or written to. The target region plays the part of working memory:
/// copied and decompressed images end up at its start.
pub struct Pipeline<'a, D, L, C = IsoHdlc> {
    device: D,
    launcher: L,
    crc: C,
    config: BootConfig,
    payload: Option<&'a [u8]>,
    xip_window: Option<&'a [u8]>,
    decompressor: Option<&'a mut dyn Decompressor>,
    staging: Option<&'a mut [u8]>,
    target: &'a mut [u8],
    scratch: BootImageHeader,
    selected: Option<BootMedium>,
    stage: Stage,
}

impl<'a, D: Device, L: Launch> Pipeline<'a, D, L> {
    /// Create a pipeline with the default medium of `config` selected.
    pub fn new(device: D, launcher: L, config: BootConfig, target: &'a mut [u8]) -> Self {
        Self {
            device,
            launcher,
            crc: IsoHdlc,
            config,
            payload: None,
            xip_window: None,
            decompressor: None,
            staging: None,
            target,
            scratch: BootImageHeader::new_zeroed(),
            selected: config.default_medium(),
            stage: Stage::NotStarted,
        }
    }
}

impl<'a, D: Device, L: Launch, C: Crc32> Pipeline<'a, D, L, C> {
    /// Image linked into the bootloader, used by [`BootMedium::Payload`].
    pub fn with_payload(mut self, blob: &'a [u8]) -> Self {
        self.payload = Some(blob);
        self
    }

    /// Memory-mapped QSPI flash, used by [`BootMedium::Qspi`] when configured for XIP.
    pub fn with_xip_window(mut self, window: Xip<'a>) -> Self {
        self.xip_window = Some(window.window());
        self
    }

    /// Enable support for compressed images.
    pub fn with_decompressor(mut self, decompressor: &'a mut dyn Decompressor) -> Self {
        self.decompressor = Some(decompressor);
        self
    }

    /// Region a copied compressed image is moved to before it is decompressed into the target.
    ///
    /// Without it, compressed images can only be booted from the payload or an XIP window.
    pub fn with_staging(mut self, staging: &'a mut [u8]) -> Self {
        self.staging = Some(staging);
        self
    }

    pub fn with_crc<C2: Crc32>(self, crc: C2) -> Pipeline<'a, D, L, C2> {
        Pipeline {
            device: self.device,
            launcher: self.launcher,
            crc,
            config: self.config,
            payload: self.payload,
            xip_window: self.xip_window,
            decompressor: self.decompressor,
            staging: self.staging,
            target: self.target,
            scratch: self.scratch,
            selected: self.selected,
            stage: self.stage,
        }
    }

    pub fn selected(&self) -> Option<BootMedium> {
        self.selected
    }

    /// Last stage reached by the most recent boot attempt.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Select the medium used by the next boot attempt.
    ///
    /// Fails, leaving the selection as it was, if the medium is not available on this board.
    pub fn select_source(&mut self, medium: BootMedium) -> Result<(), Error> {
        self.source_for(medium)?;

        info!("Selecting {:?} as boot source ...", medium);
        self.selected = Some(medium);

        Ok(())
    }

    fn source_for(&self, medium: BootMedium) -> Result<Source<'a>, Error> {
        let unavailable = Error::MediumUnavailable(medium);

        match medium {
            BootMedium::Payload => {
                let blob = self.payload.filter(|_| self.config.payload);
                blob.map(|blob| Source::Payload(Payload::new(blob)))
                    .ok_or(unavailable)
            }
            BootMedium::Qspi => match self.config.qspi.ok_or(unavailable)? {
                qspi if qspi.xip => self
                    .xip_window
                    .map(|window| Source::Xip(Xip::new(window)))
                    .ok_or(unavailable),
                _ => Ok(Source::BlockCopy(BlockCopy::new(BlockMedium::Qspi, 0))),
            },
            BootMedium::Mmc => {
                let mmc = self.config.mmc.ok_or(unavailable)?;
                Ok(if mmc.use_gpt {
                    Source::BlockCopyGpt(GptCopy::new(
                        BlockMedium::Mmc,
                        GptPartitionType(mmc.partition_type),
                    ))
                } else {
                    Source::BlockCopy(BlockCopy::new(BlockMedium::Mmc, 0))
                })
            }
            BootMedium::SpiFlash => {
                let spi = self.config.spi_flash.ok_or(unavailable)?;
                Ok(Source::BlockCopy(BlockCopy::new(
                    BlockMedium::SpiFlash,
                    spi.offset,
                )))
            }
        }
    }

    /// Run one boot attempt from the selected medium.
    ///
    /// Returns `true` once the image is registered and the launcher started it.
    pub async fn boot(&mut self) -> bool {
        info!("Initializing boot image..");

        match self.run().await {
            Ok(()) => true,
            Err(e) => {
                error!("Boot failed: {}", e);
                advance(&mut self.stage, Stage::Failed);
                false
            }
        }
    }

    async fn run(&mut self) -> Result<(), Error> {
        self.stage = Stage::NotStarted;

        let medium = self.selected.ok_or(Error::NoBootMedium)?;
        let source = self.source_for(medium)?;

        let acquired = source
            .acquire(&mut self.device, &mut self.scratch, &mut *self.target)
            .await?;
        advance(&mut self.stage, Stage::Acquired);

        let raw = read_header(acquired.bytes(&*self.target))?;
        let decompressed = raw.kind() == Some(ImageKind::Compressed);

        let location = if decompressed {
            let input: &[u8] = match acquired {
                Acquired::Resident(input) => input,
                // Copied images occupy the target region and cannot be decompressed in place.
                Acquired::Copied(len) => {
                    let Some(staging) = self
                        .staging
                        .as_deref_mut()
                        .and_then(|staging| staging.get_mut(..len))
                    else {
                        error!("No staging region of {} bytes to decompress from", len);
                        return Err(Error::Decompression);
                    };
                    staging.copy_from_slice(&self.target[..len]);
                    staging
                }
            };

            let len = decompress::decompress(
                self.decompressor.as_deref_mut(),
                input,
                &mut *self.target,
            )?;
            advance(&mut self.stage, Stage::Decompressed);
            Location::Target(len)
        } else {
            match acquired {
                Acquired::Resident(image) => Location::Resident(image),
                Acquired::Copied(len) => Location::Target(len),
            }
        };

        let image: &[u8] = match location {
            Location::Resident(image) => image,
            Location::Target(len) => &self.target[..len],
        };
        let qualifier = if decompressed { "decompressed " } else { "" };

        let header = validate(image, &self.crc, qualifier)?;
        advance(&mut self.stage, Stage::Validated);
        info!("Boot image set name: \"{}\"", header.set_name());

        let claimed = usize::try_from(header.boot_image_length.get()).unwrap_or(usize::MAX);
        self.launcher
            .register_boot_image(&image[..claimed.min(image.len())]);
        info!("Boot image registered...");
        advance(&mut self.stage, Stage::Registered);

        match self.config.boot_flow {
            BootFlow::RestartCores => self.launcher.restart_cores(Cores::All),
            BootFlow::Custom => self.launcher.custom_boot_flow(),
        }
        .map_err(|e| {
            error!("Failed to launch boot image: {:?}", e);
            Error::Launch
        })
    }
}

/// Check a possibly decompressed image before it is registered.
///
/// Only the header CRC decides. The CRC over the full image is computed on failure, for
/// diagnostics.
fn validate(image: &[u8], crc: &impl Crc32, qualifier: &str) -> Result<BootImageHeader, Error> {
    let mut header = read_header(image)?;

    let magic = header.magic.get();
    if magic != BOOT_MAGIC {
        error!("Boot image magic {:08x} invalid, ignoring", magic);
        return Err(Error::MagicMismatch { found: magic });
    }

    if !validate_crc(&mut header, crc) {
        error!("{}boot image failed CRC", qualifier);
        let full = image_crc(image, &header, crc);
        error!("Calculated CRC32 of image in memory is {:#010x}", full);
        return Err(Error::Integrity);
    }

    info!("{}boot image passed CRC", qualifier);

    Ok(header)
}
