//! Mock construction helpers

use mockall::mock;
use ns_formatters::backend::{share_type_table, SharedTypeTable, TypeTable};
use ns_formatters::{FormatterError, Inspector};

mock! {
    /// A host whose memory and type answers are scripted per test
    pub Host {}

    impl Inspector for Host {
        fn read_memory(&self, address: u64, size: usize) -> ns_formatters::Result<Vec<u8>>;
        fn type_table(&self) -> SharedTypeTable;
    }
}

/// A host that knows `table` but fails every memory read
pub fn unreadable_host(table: TypeTable) -> MockHost {
    let shared = share_type_table(table);
    let mut host = MockHost::new();
    host.expect_type_table().returning(move || shared.clone());
    host.expect_read_memory()
        .returning(|address, _| {
            Err(FormatterError::MemoryAccess {
                address,
                message: "process is not stopped".to_string(),
            })
        });
    host
}
