//! Source for a card carrying a GUID Partition Table.
//!
//! The partition table is only used to find the block where the boot image starts.
//! When the table is missing, corrupt, or has no partition of the requested type, the
//! lookup falls back to offset 0 and the generic block copy is attempted anyway.

use core::mem::size_of;

use gpt_disk_types::{GptHeader, GptPartitionEntry, GptPartitionType, guid};
use log::{error, info};

use crate::{
    BlockMedium, Device, Error, PartitionError, header::BootImageHeader, integrity::CRC32,
    sources::BlockCopy,
};

/// Logical block size assumed for the card.
pub const LBA_SIZE: u64 = 512;

/// Type of the partition the boot image is stored in.
pub const BOOT_PARTITION_TYPE: GptPartitionType =
    GptPartitionType(guid!("21686148-6449-6e6f-744e-656564454649"));

/// Largest partition entry array that is searched, 128 entries of 128 bytes.
const ENTRY_ARRAY_MAX: u64 = 16 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GptCopy {
    medium: BlockMedium,
    partition_type: GptPartitionType,
}

impl GptCopy {
    pub const fn new(medium: BlockMedium, partition_type: GptPartitionType) -> Self {
        Self {
            medium,
            partition_type,
        }
    }

    pub async fn acquire<D: Device>(
        &self,
        device: &mut D,
        scratch: &mut BootImageHeader,
        target: &mut [u8],
    ) -> Result<usize, Error> {
        let first_lba = match find_partition_by_type(device, self.medium, self.partition_type)
            .await
        {
            Ok((first_lba, last_lba)) => {
                info!("Boot partition found at LBA {}..={}", first_lba, last_lba);
                first_lba
            }
            // Even without a usable partition we still try to boot from the start of the card.
            Err(e) => {
                error!("{}, falling back to offset 0", e);
                0
            }
        };

        let offset = first_lba.checked_mul(LBA_SIZE).unwrap_or(0);

        BlockCopy::new(self.medium, offset)
            .acquire(device, scratch, target)
            .await
    }
}

/// Read the primary GPT header from LBA 1.
pub async fn read_header<D: Device>(
    device: &mut D,
    medium: BlockMedium,
) -> Result<GptHeader, Error> {
    let mut block = [0u8; LBA_SIZE as usize];

    device
        .read(medium, LBA_SIZE, &mut block)
        .await
        .map_err(|e| {
            error!("Failed to read GPT header from {:?}: {:?}", medium, e);
            Error::PartitionLookup(PartitionError::Read)
        })?;

    Ok(bytemuck::pod_read_unaligned(&block[..size_of::<GptHeader>()]))
}

/// Check signature, location and header CRC of a primary GPT header.
pub fn validate_header(header: &GptHeader) -> bool {
    if !header.is_signature_valid() {
        error!("GPT signature invalid");
        return false;
    }

    if header.my_lba.to_u64() != 1 {
        error!("GPT header claims LBA {}", header.my_lba.to_u64());
        return false;
    }

    let mut expected = *header;
    expected.update_header_crc32();
    if { expected.header_crc32 } != { header.header_crc32 } {
        error!("GPT header CRC mismatch");
        return false;
    }

    true
}

/// Walk the partition entry array one block at a time, handing every entry to `visit`.
///
/// The array CRC is only known after the last block, so anything `visit` collected must be
/// discarded when this returns an error.
pub async fn validate_entries<D: Device>(
    device: &mut D,
    medium: BlockMedium,
    header: &GptHeader,
    mut visit: impl FnMut(&GptPartitionEntry),
) -> Result<(), Error> {
    let invalid = Error::PartitionLookup(PartitionError::Entries);

    let count = header.number_of_partition_entries.to_u32();
    let entry_size = header.size_of_partition_entry.to_u32() as usize;
    if header.get_partition_entry_array_layout().is_err()
        || !entry_size.is_power_of_two()
        || !(size_of::<GptPartitionEntry>()..=LBA_SIZE as usize).contains(&entry_size)
    {
        error!("GPT partition entry layout invalid");
        return Err(invalid);
    }

    let exact = u64::from(count) * entry_size as u64;
    if exact > ENTRY_ARRAY_MAX {
        error!("GPT partition entry array of {} bytes is too large", exact);
        return Err(invalid);
    }

    let mut offset = header
        .partition_entry_lba
        .to_u64()
        .checked_mul(LBA_SIZE)
        .ok_or(invalid)?;
    let per_block = LBA_SIZE as usize / entry_size;

    let mut digest = CRC32.digest();
    let mut block = [0u8; LBA_SIZE as usize];
    let mut remaining = count as usize;

    while remaining > 0 {
        device.read(medium, offset, &mut block).await.map_err(|e| {
            error!("Failed to read GPT partition entries @{:#x}: {:?}", offset, e);
            Error::PartitionLookup(PartitionError::Read)
        })?;

        let in_block = per_block.min(remaining);
        let used = &block[..in_block * entry_size];
        digest.update(used);

        for raw in used.chunks_exact(entry_size) {
            let entry: GptPartitionEntry =
                bytemuck::pod_read_unaligned(&raw[..size_of::<GptPartitionEntry>()]);
            visit(&entry);
        }

        remaining -= in_block;
        offset = offset.checked_add(LBA_SIZE).ok_or(invalid)?;
    }

    if digest.finalize() != header.partition_entry_array_crc32.0.to_u32() {
        error!("GPT partition entry array CRC mismatch");
        return Err(invalid);
    }

    Ok(())
}

/// Find the first used partition of `partition_type`, returning its first and last LBA.
pub async fn find_partition_by_type<D: Device>(
    device: &mut D,
    medium: BlockMedium,
    partition_type: GptPartitionType,
) -> Result<(u64, u64), Error> {
    let header = read_header(device, medium).await?;

    if !validate_header(&header) {
        return Err(Error::PartitionLookup(PartitionError::Header));
    }

    let mut found = None;
    validate_entries(device, medium, &header, |entry| {
        if found.is_none() && entry.is_used() && { entry.partition_type_guid } == partition_type {
            found = Some(({ entry.starting_lba }.to_u64(), { entry.ending_lba }.to_u64()));
        }
    })
    .await?;

    found.ok_or(Error::PartitionLookup(PartitionError::NotFound))
}
