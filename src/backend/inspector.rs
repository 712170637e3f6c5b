//! Inspector trait: the host capability every decoder consumes
//!
//! The host debugger owns the stopped process. Decoders never talk to it directly;
//! they only see raw memory reads at an address and the layout reflection held in a
//! [`TypeTable`](super::TypeTable). Implementations exist for the in-memory
//! [`MockTarget`](super::MockTarget) used by tests and the snapshot CLI, and any
//! real debugger binding can provide its own.

use crate::error::{FormatterError, Result};

use super::type_table::{SharedTypeTable, TypeHandle};

/// Read counters kept by [`MockTarget`](super::MockTarget); tests use them to
/// tell a cached tree walk from a cold one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub successful_reads: u64,
    pub failed_reads: u64,
    pub total_bytes_read: u64,
}

impl ReadStats {
    pub fn record_success(&mut self, bytes: u64) {
        self.successful_reads += 1;
        self.total_bytes_read += bytes;
    }

    pub fn record_failure(&mut self) {
        self.failed_reads += 1;
    }
}

/// Read-only view of a stopped process
///
/// All reads are little-endian. Implementations must never write to the inspected
/// process.
///
/// # Example
///
/// ```ignore
/// fn read_count(target: &dyn Inspector, address: u64) -> Result<u64> {
///     target.read_unsigned(address, 4)
/// }
/// ```
pub trait Inspector {
    /// Read raw memory from the inspected process
    ///
    /// # Arguments
    /// * `address` - Memory address to read from
    /// * `size` - Number of bytes to read
    fn read_memory(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Layout reflection for the inspected process
    fn type_table(&self) -> SharedTypeTable;

    /// Read an unsigned little-endian integer of `size` bytes (1..=8)
    fn read_unsigned(&self, address: u64, size: usize) -> Result<u64> {
        if size == 0 || size > 8 {
            return Err(FormatterError::MemoryAccess {
                address,
                message: format!("unsupported integer width {}", size),
            });
        }
        let bytes = self.read_memory(address, size)?;
        Ok(decode_unsigned(&bytes))
    }

    /// Read a pointer-sized value
    fn read_pointer(&self, address: u64) -> Result<u64> {
        let size = self.type_table().pointer_size() as usize;
        self.read_unsigned(address, size)
    }

    /// Look up a type by its runtime name
    fn find_type(&self, name: &str) -> Option<TypeHandle> {
        let table = self.type_table();
        table
            .find_type(name)
            .map(|id| TypeHandle::new(table.clone(), id))
    }
}

/// Decode up to eight little-endian bytes as an unsigned integer
pub fn decode_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (i * 8)))
}

/// Sign-extend a value of `size` bytes
pub fn sign_extend(value: u64, size: usize) -> i64 {
    if size == 0 || size >= 8 {
        return value as i64;
    }
    let shift = 64 - size * 8;
    ((value << shift) as i64) >> shift
}
