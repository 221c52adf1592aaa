use core::mem::size_of;
use std::vec;
use std::vec::Vec;

use gpt_disk_types::{
    BlockSize, GptHeader, GptPartitionEntryArray, GptPartitionType, LbaLe, U32Le, guid,
};

const BLOCK: usize = 512;
const ENTRIES: u32 = 4;

/// Card image with a primary GPT; entries live in LBA 2.
pub struct GptDisk {
    blocks: u64,
    partitions: Vec<(GptPartitionType, u64, u64)>,
}

impl GptDisk {
    pub fn new(blocks: u64) -> Self {
        Self {
            blocks,
            partitions: Vec::new(),
        }
    }

    pub fn partition(mut self, partition_type: GptPartitionType, first: u64, last: u64) -> Self {
        self.partitions.push((partition_type, first, last));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut disk = vec![0u8; self.blocks as usize * BLOCK];

        let mut header = GptHeader {
            my_lba: LbaLe::from_u64(1),
            alternate_lba: LbaLe::from_u64(self.blocks - 1),
            first_usable_lba: LbaLe::from_u64(34),
            last_usable_lba: LbaLe::from_u64(self.blocks - 2),
            disk_guid: guid!("57a7e1f0-3b5c-4d5e-8f90-123456789abc"),
            partition_entry_lba: LbaLe::from_u64(2),
            number_of_partition_entries: U32Le::from_u32(ENTRIES),
            size_of_partition_entry: U32Le::from_u32(128),
            ..Default::default()
        };

        let layout = header.get_partition_entry_array_layout().unwrap();
        let mut storage = vec![0u8; BLOCK];
        let mut entries =
            GptPartitionEntryArray::new(layout, BlockSize::BS_512, &mut storage).unwrap();

        for (index, (partition_type, first, last)) in self.partitions.iter().enumerate() {
            let entry = entries.get_partition_entry_mut(index as u32).unwrap();
            entry.partition_type_guid = *partition_type;
            entry.unique_partition_guid = guid!("0b5e7c1a-9d2f-4e3a-b6c8-0123456789ab");
            entry.starting_lba = LbaLe::from_u64(*first);
            entry.ending_lba = LbaLe::from_u64(*last);
        }

        header.partition_entry_array_crc32 = entries.calculate_crc32();
        header.update_header_crc32();

        disk[BLOCK..BLOCK + size_of::<GptHeader>()].copy_from_slice(bytemuck::bytes_of(&header));
        disk[2 * BLOCK..3 * BLOCK].copy_from_slice(entries.storage());

        disk
    }
}
