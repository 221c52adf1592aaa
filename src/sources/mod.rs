//! Boot image sources: where the raw, possibly compressed, image comes from.
//!
//! Every source ends in one of two places: the image is either resident in memory which the
//! bootloader can already address (a linked payload or a memory-mapped flash window), or it
//! has been copied into the caller-provided target region.

use crate::{Device, Error, header::BootImageHeader};

pub mod copy;
pub mod gpt;
pub mod payload;
pub mod xip;

pub use copy::BlockCopy;
pub use gpt::GptCopy;
pub use payload::Payload;
pub use xip::Xip;

/// The strategy used to acquire a boot image.
#[derive(Clone, Copy, Debug)]
pub enum Source<'a> {
    Payload(Payload<'a>),
    Xip(Xip<'a>),
    BlockCopy(BlockCopy),
    BlockCopyGpt(GptCopy),
}

/// Location of an acquired image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquired<'a> {
    /// The image is resident at its source and was not copied.
    Resident(&'a [u8]),
    /// The image occupies the first `len` bytes of the target region.
    Copied(usize),
}

impl<'a> Acquired<'a> {
    pub fn bytes<'t>(&self, target: &'t [u8]) -> &'t [u8]
    where
        'a: 't,
    {
        match *self {
            Acquired::Resident(image) => image,
            Acquired::Copied(len) => &target[..len],
        }
    }
}

impl<'a> Source<'a> {
    /// Locate the image and check its magic.
    ///
    /// `scratch` is used as staging buffer for the header of copied images,
    /// `target` receives the complete image when copying.
    pub async fn acquire<D: Device>(
        &self,
        device: &mut D,
        scratch: &mut BootImageHeader,
        target: &mut [u8],
    ) -> Result<Acquired<'a>, Error> {
        match self {
            Source::Payload(payload) => payload.acquire().map(Acquired::Resident),
            Source::Xip(xip) => xip.acquire().map(Acquired::Resident),
            Source::BlockCopy(copy) => copy
                .acquire(device, scratch, target)
                .await
                .map(Acquired::Copied),
            Source::BlockCopyGpt(gpt) => gpt
                .acquire(device, scratch, target)
                .await
                .map(Acquired::Copied),
        }
    }
}
