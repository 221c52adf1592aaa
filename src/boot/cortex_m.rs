use crate::boot::{Cores, Launch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchError {
    /// No image was registered before the restart.
    NotRegistered,
    /// The vector table offset lies outside the registered image.
    OutOfBounds,
    /// Only the core running the bootloader can be launched.
    UnsupportedCores,
}

/// Simple bootload mechanism for a single Cortex-M core without support for TrustZone.
///
/// Jumps to the vector table found `vector_offset` bytes into the registered image.
pub struct SimpleCortexM {
    vector_offset: usize,
    image: Option<(*const u8, usize)>,
}

impl SimpleCortexM {
    pub const fn new(vector_offset: usize) -> Self {
        Self {
            vector_offset,
            image: None,
        }
    }
}

impl Launch for SimpleCortexM {
    type Error = LaunchError;

    fn register_boot_image(&mut self, image: &[u8]) {
        self.image = Some((image.as_ptr(), image.len()));
    }

    fn restart_cores(&mut self, cores: Cores) -> Result<(), LaunchError> {
        if !matches!(cores, Cores::All | Cores::Single(0)) {
            return Err(LaunchError::UnsupportedCores);
        }

        let (base, len) = self.image.ok_or(LaunchError::NotRegistered)?;
        if self.vector_offset >= len {
            return Err(LaunchError::OutOfBounds);
        }

        // SAFETY: the image was validated and registered, the offset lies within it.
        unsafe { cortex_m::asm::bootload(base.add(self.vector_offset) as *const u32) }
    }
}
