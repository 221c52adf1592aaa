use std::vec;
use std::vec::Vec;

use embedded_storage::nor_flash::{ErrorType, NorFlashErrorKind};
use embedded_storage_async::nor_flash::{NorFlash, ReadNorFlash};

/// Erase pages of a [`MockFlash`].
pub const PAGES: usize = 4;

/// NOR flash in RAM, erasing to `0xFF`.
pub struct MockFlash {
    pub data: Vec<u8>,
    pub reads: usize,
    pub writes: usize,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; PAGES * Self::ERASE_SIZE],
            reads: 0,
            writes: 0,
        }
    }

    fn check(&self, offset: u32, len: usize, align: usize) -> Result<usize, NorFlashErrorKind> {
        let offset = offset as usize;
        if offset % align != 0 || len % align != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if offset + len > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(offset)
    }
}

impl ErrorType for MockFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.check(offset, bytes.len(), Self::READ_SIZE)?;
        self.reads += 1;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 1024;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if to < from {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        let from = self.check(from, (to - from) as usize, Self::ERASE_SIZE)?;
        self.data[from..to as usize].fill(0xFF);
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = self.check(offset, bytes.len(), Self::WRITE_SIZE)?;
        self.writes += 1;
        // NOR can only clear bits.
        for (cell, byte) in self.data[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}
