//! Property-Based Tests for Persist Module
//!
//! Checks file naming and the on-disk capacity bound of the response store.

use proptest::prelude::*;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use crate::persist::{
    file_name_for, PersistentResponseStore, StoredResponse, PREFIX_LIMIT, PREFIX_MAX_BYTES,
};

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,3}://[a-z./?#=&:_-]{0,120}"
}

proptest! {
    #[test]
    fn prop_file_name_is_deterministic(id in id_strategy()) {
        prop_assert_eq!(file_name_for(&id), file_name_for(&id));
    }

    #[test]
    fn prop_file_name_ends_with_full_digest(id in id_strategy()) {
        let digest = hex::encode(Sha256::digest(id.as_bytes()));
        let suffix = format!(".{}.data", digest);
        prop_assert!(file_name_for(&id).ends_with(&suffix));
    }

    #[test]
    fn prop_prefix_is_bounded_and_clean(id in id_strategy()) {
        let name = file_name_for(&id);
        // digest is 64 hex chars plus "." and ".data"
        let prefix = &name[..name.len() - 64 - 1 - ".data".len()];

        prop_assert!(prefix.chars().count() <= PREFIX_LIMIT);
        prop_assert!(!prefix.contains("--"));
        prop_assert!(!prefix.contains('?'));
        prop_assert!(!prefix.contains('#'));
        prop_assert!(!prefix.contains('/'));
    }

    #[test]
    fn prop_file_name_fits_filesystem_limit(id in "\\PC{0,200}") {
        let name = file_name_for(&id);
        let prefix = &name[..name.len() - 64 - 1 - ".data".len()];

        prop_assert!(prefix.len() <= PREFIX_MAX_BYTES);
        prop_assert!(name.len() < 255);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_store_files_match_index(
        limit in 1usize..5,
        ids in prop::collection::vec("[a-z]{1,3}", 1..20),
    ) {
        let dir = TempDir::new().unwrap();
        let store = PersistentResponseStore::new(dir.path(), limit).unwrap();

        for id in &ids {
            store.put(id, StoredResponse::new(200, Vec::new(), id.as_bytes().to_vec())).unwrap();

            let files = store.data_files().unwrap();
            prop_assert!(store.len() <= limit);
            prop_assert_eq!(files.len(), store.len());
            prop_assert!(store.contains(id));
        }
    }
}
