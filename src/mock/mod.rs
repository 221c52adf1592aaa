pub mod disk;
pub mod flash;

pub use disk::GptDisk;

use core::cell::Cell;
use std::collections::BTreeMap;
use std::vec::Vec;

use zerocopy::{FromZeros, IntoBytes};

use crate::{
    BlockMedium, Device,
    boot::{Cores, Launch},
    decompress::{DecompressError, Decompressor},
    header::{BootImageHeader, HEADER_SIZE},
    integrity::{Crc32, IsoHdlc},
};

/// Header with the given magic and set name, CRC and length left zero.
pub fn header_with_name(magic: u32, name: &[u8]) -> BootImageHeader {
    let mut header = BootImageHeader::new_zeroed();
    header.magic.set(magic);
    header.set_name[..name.len()].copy_from_slice(name);
    header
}

/// Complete image with a correct header CRC.
pub fn build_image(magic: u32, name: &[u8], body: &[u8]) -> Vec<u8> {
    let mut header = header_with_name(magic, name);
    header
        .boot_image_length
        .set((HEADER_SIZE + body.len()) as u64);
    header.header_crc.set(IsoHdlc.checksum(header.as_bytes()));

    let mut image = Vec::from(header.as_bytes());
    image.extend_from_slice(body);
    image
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOp {
    pub medium: BlockMedium,
    pub offset: u64,
    pub len: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockError {
    Injected,
    NoMedium,
    OutOfRange,
}

/// Board with in-memory media, recording every read.
#[derive(Debug, Default)]
pub struct MockDevice {
    pub media: BTreeMap<BlockMedium, Vec<u8>>,
    pub reads: Vec<ReadOp>,
    /// Index of the read which fails.
    pub fail_at: Option<usize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_medium(mut self, medium: BlockMedium, contents: Vec<u8>) -> Self {
        self.media.insert(medium, contents);
        self
    }

    pub fn fail_read(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl Device for MockDevice {
    type Error = MockError;

    async fn read(
        &mut self,
        medium: BlockMedium,
        offset: u64,
        buffer: &mut [u8],
    ) -> Result<(), MockError> {
        let index = self.reads.len();
        self.reads.push(ReadOp {
            medium,
            offset,
            len: buffer.len(),
        });

        if self.fail_at == Some(index) {
            return Err(MockError::Injected);
        }

        let contents = self.media.get(&medium).ok_or(MockError::NoMedium)?;
        let start = usize::try_from(offset).map_err(|_| MockError::OutOfRange)?;
        let source = contents
            .get(start..start + buffer.len())
            .ok_or(MockError::OutOfRange)?;
        buffer.copy_from_slice(source);

        Ok(())
    }
}

/// Launcher recording what it was asked to do.
#[derive(Debug, Default)]
pub struct MockLauncher {
    /// Address and length of every registered image.
    pub registered: Vec<(usize, usize)>,
    pub restarts: Vec<Cores>,
    pub custom_flows: usize,
    pub fail: bool,
}

impl Launch for MockLauncher {
    type Error = ();

    fn register_boot_image(&mut self, image: &[u8]) {
        self.registered.push((image.as_ptr() as usize, image.len()));
    }

    fn restart_cores(&mut self, cores: Cores) -> Result<(), ()> {
        self.restarts.push(cores);
        if self.fail { Err(()) } else { Ok(()) }
    }

    fn custom_boot_flow(&mut self) -> Result<(), ()> {
        self.custom_flows += 1;
        if self.fail { Err(()) } else { Ok(()) }
    }
}

/// Decompressor which writes a prepared output.
#[derive(Debug, Default)]
pub struct MockDecompressor {
    pub output: Vec<u8>,
    pub calls: usize,
    /// Report zero bytes written instead of the output.
    pub empty: bool,
}

impl Decompressor for MockDecompressor {
    fn decompress(&mut self, _input: &[u8], output: &mut [u8]) -> Result<usize, DecompressError> {
        self.calls += 1;
        if self.empty {
            return Ok(0);
        }

        let target = output
            .get_mut(..self.output.len())
            .ok_or(DecompressError)?;
        target.copy_from_slice(&self.output);
        Ok(self.output.len())
    }
}

/// CRC counting how often and over how many bytes it was computed.
#[derive(Debug, Default)]
pub struct CountingCrc {
    pub calls: Cell<usize>,
    pub last_len: Cell<usize>,
}

impl Crc32 for CountingCrc {
    fn checksum(&self, bytes: &[u8]) -> u32 {
        self.calls.set(self.calls.get() + 1);
        self.last_len.set(bytes.len());
        IsoHdlc.checksum(bytes)
    }
}

/// Logger which only lets errors through, like a production build filtered to `Error`.
struct ErrorsOnly;

impl log::Log for ErrorsOnly {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Error
    }

    fn log(&self, _record: &log::Record) {}

    fn flush(&self) {}
}

static ERRORS_ONLY: ErrorsOnly = ErrorsOnly;

/// Install [`ErrorsOnly`] as global logger. Other tests may have installed it already.
pub fn filter_logs_to_errors() {
    let _ = log::set_logger(&ERRORS_ONLY);
    log::set_max_level(log::LevelFilter::Error);
}
