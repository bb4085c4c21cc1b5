//! Scoped release of the durable cache.

use hornet_api::DynStore;

/// Closes a store when dropped, on every exit path.
#[derive(Debug)]
pub struct CloseOnDrop(pub DynStore);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hornet_api::{HornetError, HornetResult};
    use hornet_core::cache::FileStore;

    fn failing_run(store: DynStore) -> HornetResult<()> {
        let _close = CloseOnDrop(store.clone());
        store.set("paths-1 0", b"snapshot".to_vec().into())?;
        Err(HornetError::other("analysis failed"))
    }

    #[test]
    fn closes_on_error_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        let store = FileStore::open_file(&path, 4).unwrap();
        assert!(failing_run(store.clone()).is_err());
        // a closed store answers nothing
        assert!(!store.has_key("paths-1 0"));
        drop(store);

        let store = FileStore::open_file(&path, 4).unwrap();
        assert!(store.has_key("paths-1 0"));
        assert_eq!(b"snapshot".as_slice(), store.get("paths-1 0").unwrap());
    }
}
