//! Mock target: an in-memory stopped process
//!
//! This module provides a simulated inspected process that can be used for testing
//! decoders without a live debugger. It pairs a set of memory regions with a
//! [`TypeTable`] and implements [`Inspector`] over them.
//!
//! # Example
//!
//! ```ignore
//! use ns_formatters::backend::{MockTarget, TypeTable};
//!
//! let mut target = MockTarget::new(TypeTable::new());
//! target.memory_mut().add_region(0x1000, 256);
//! target.memory_mut().write_value(0x1000, 42u32);
//!
//! assert_eq!(target.read_unsigned(0x1000, 4)?, 42);
//! ```

use crate::error::{FormatterError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::inspector::{Inspector, ReadStats};
use super::type_table::{SharedTypeTable, TypeTable};

/// Mock memory that can be read/written
#[derive(Debug, Default, Clone)]
pub struct MockMemory {
    /// Memory regions mapped by base address
    regions: BTreeMap<u64, Vec<u8>>,
}

impl MockMemory {
    /// Create a new empty mock memory
    pub fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
        }
    }

    /// Add a zero-filled memory region
    pub fn add_region(&mut self, base_address: u64, size: usize) {
        self.regions.insert(base_address, vec![0u8; size]);
    }

    /// Add a memory region with initial contents
    pub fn add_region_with(&mut self, base_address: u64, data: Vec<u8>) {
        self.regions.insert(base_address, data);
    }

    /// Number of mapped regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Write data to memory
    pub fn write(&mut self, address: u64, data: &[u8]) -> bool {
        // Find region containing this address
        for (&base, region) in &mut self.regions {
            let end = base + region.len() as u64;
            if address >= base && address + data.len() as u64 <= end {
                let offset = (address - base) as usize;
                region[offset..offset + data.len()].copy_from_slice(data);
                return true;
            }
        }
        false
    }

    /// Read data from memory
    pub fn read(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        let (&base, region) = self.regions.range(..=address).next_back()?;
        let end = base + region.len() as u64;
        let last = address.checked_add(size as u64)?;
        if last <= end {
            let offset = (address - base) as usize;
            return Some(region[offset..offset + size].to_vec());
        }
        None
    }

    /// Write a value to memory at the given address
    pub fn write_value<T: ToBytes>(&mut self, address: u64, value: T) -> bool {
        self.write(address, &value.to_le_bytes_vec())
    }
}

/// Trait for converting values to bytes
pub trait ToBytes {
    fn to_le_bytes_vec(&self) -> Vec<u8>;
}

macro_rules! impl_to_bytes {
    ($($t:ty),*) => {
        $(
            impl ToBytes for $t {
                fn to_le_bytes_vec(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
            }
        )*
    };
}

impl_to_bytes!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl ToBytes for bool {
    fn to_le_bytes_vec(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }
}

/// Mock inspected process for testing without a debugger
#[derive(Debug)]
pub struct MockTarget {
    /// Layout reflection
    types: SharedTypeTable,
    /// Simulated memory
    memory: MockMemory,
    /// Read statistics
    stats: RefCell<ReadStats>,
}

impl MockTarget {
    /// Create a new mock target over the given type table
    pub fn new(types: TypeTable) -> Self {
        Self::from_shared(Arc::new(types))
    }

    /// Create a new mock target sharing an existing type table
    pub fn from_shared(types: SharedTypeTable) -> Self {
        Self {
            types,
            memory: MockMemory::new(),
            stats: RefCell::new(ReadStats::default()),
        }
    }

    /// Replace the simulated memory
    pub fn with_memory(mut self, memory: MockMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Get access to mock memory for setup
    pub fn memory_mut(&mut self) -> &mut MockMemory {
        &mut self.memory
    }

    /// Read statistics accumulated since creation or the last reset
    pub fn read_stats(&self) -> ReadStats {
        self.stats.borrow().clone()
    }

    /// Reset read statistics
    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = ReadStats::default();
    }
}

impl Inspector for MockTarget {
    fn read_memory(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        match self.memory.read(address, size) {
            Some(bytes) => {
                self.stats.borrow_mut().record_success(size as u64);
                Ok(bytes)
            }
            None => {
                self.stats.borrow_mut().record_failure();
                tracing::trace!("Unmapped read of {} bytes at 0x{:X}", size, address);
                Err(FormatterError::MemoryAccess {
                    address,
                    message: format!("{} bytes not mapped", size),
                })
            }
        }
    }

    fn type_table(&self) -> SharedTypeTable {
        self.types.clone()
    }
}
