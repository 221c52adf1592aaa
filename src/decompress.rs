//! Decompression of images carrying the compressed magic.
//!
//! The algorithm itself is supplied by the caller through [`Decompressor`].

use log::{error, info};

use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecompressError;

pub trait Decompressor {
    /// Decompress the image starting at `input` into `output`.
    ///
    /// Returns the number of bytes written.
    ///
    /// Writing zero bytes counts as a failure.
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, DecompressError>;
}

/// Run the decompressor on a resident compressed image, producing the image in `output`.
pub fn decompress<'d>(
    decompressor: Option<&mut (dyn Decompressor + 'd)>,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, Error> {
    let Some(decompressor) = decompressor else {
        error!("Compressed boot image but no decompressor configured");
        return Err(Error::Decompression);
    };

    info!("Preparing to decompress to {:p}...", output.as_ptr());

    match decompressor.decompress(input, output) {
        Ok(0) | Err(_) => {
            error!("Failed to decompress boot image");
            Err(Error::Decompression)
        }
        Ok(written) if written > output.len() => {
            error!(
                "Decompressor claims {} bytes for a {} byte target",
                written,
                output.len()
            );
            Err(Error::Decompression)
        }
        Ok(written) => {
            info!("decompressed {} bytes...", written);
            Ok(written)
        }
    }
}
