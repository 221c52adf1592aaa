//! Simple straightforward implementation of keeping the selected boot medium.
//!
//! This implementation focusses on correctness and ease, contrary to efficiency and code size.
//! Leverages `sequential-storage` and `postcard` to store and serialize/deserialize the selection.

use embedded_storage_async::nor_flash::NorFlash;
use log::{debug, error};
use sequential_storage::{
    cache::KeyPointerCache,
    map::{SerializationError, Value},
};

use crate::{BootMedium, Error};

const MAX_SERIALIZED_SIZE: usize = 16;

impl<'a> Value<'a> for BootMedium {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let buffer = postcard::to_slice(self, buffer).map_err(|e| match e {
            postcard::Error::SerializeBufferFull => SerializationError::BufferTooSmall,
            // Unmapped error.
            _ => SerializationError::Custom(0),
        })?;

        Ok(buffer.len())
    }

    fn deserialize_from(buffer: &'a [u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        postcard::from_bytes(buffer).map_err(|e| match e {
            postcard::Error::DeserializeUnexpectedEnd => SerializationError::BufferTooSmall,
            // Stored by an incompatible version.
            postcard::Error::DeserializeBadVarint | postcard::Error::DeserializeBadEnum => {
                SerializationError::InvalidFormat
            }
            // Unmapped error.
            _ => SerializationError::Custom(0),
        })
    }
}

/// Boot medium selection kept in a dedicated NOR flash region of `PAGES` erase pages.
///
/// The whole capacity of `nvm` is used by the map.
pub struct PersistentSelection<NVM: NorFlash, const PAGES: usize> {
    selected: Option<BootMedium>,
    nvm: NVM,
    nvm_cache: KeyPointerCache<PAGES, (), 1>,
}

impl<NVM: NorFlash, const PAGES: usize> PersistentSelection<NVM, PAGES> {
    /// Load the stored selection, if any.
    ///
    /// Fails when `nvm` does not consist of exactly `PAGES` erase pages.
    pub async fn new(mut nvm: NVM) -> Result<Self, Error> {
        let capacity = nvm.capacity();
        if capacity % NVM::ERASE_SIZE != 0 || capacity / NVM::ERASE_SIZE != PAGES {
            error!(
                "Selection NVM of {} bytes is not {} pages of {} bytes",
                capacity,
                PAGES,
                NVM::ERASE_SIZE
            );
            return Err(Error::Storage);
        }
        let nvm_size = u32::try_from(capacity).map_err(|_| Error::Storage)?;

        let mut nvm_cache: KeyPointerCache<PAGES, (), 1> = KeyPointerCache::new();
        let mut data_buffer = [0u8; MAX_SERIALIZED_SIZE];

        let selected = sequential_storage::map::fetch_item::<(), BootMedium, _>(
            &mut nvm,
            0..nvm_size,
            &mut nvm_cache,
            &mut data_buffer,
            &(),
        )
        .await
        .map_err(|e| {
            error!("Failed to fetch boot medium selection: {:?}", e);
            Error::Storage
        })?;

        if selected.is_none() {
            debug!("Selection NVM does not contain value");
        }

        Ok(Self {
            selected,
            nvm,
            nvm_cache,
        })
    }

    pub fn get(&self) -> Option<BootMedium> {
        self.selected
    }

    pub async fn store(&mut self, medium: BootMedium) -> Result<(), Error> {
        let mut data_buffer = [0u8; MAX_SERIALIZED_SIZE];
        // Checked against u32 in `new`.
        let nvm_size = self.nvm.capacity() as u32;

        debug!("Storing {:?}", medium);

        sequential_storage::map::store_item::<(), BootMedium, _>(
            &mut self.nvm,
            0..nvm_size,
            &mut self.nvm_cache,
            &mut data_buffer,
            &(),
            &medium,
        )
        .await
        .map_err(|e| {
            error!("Failed to store boot medium selection: {:?}", e);
            Error::Storage
        })?;

        self.selected = Some(medium);
        Ok(())
    }

    pub fn into_inner(self) -> NVM {
        self.nvm
    }
}
