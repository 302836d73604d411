//! Binary persistence of item batches

use std::fs;
use std::path::Path;

use tracing::info;

use deal_core::Item;

use crate::error::Result;

/// Write a batch of items, creating parent directories as needed
pub fn save_items<P: AsRef<Path>>(path: P, items: &[Item]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serde::encode_to_vec(items, bincode::config::standard())?;
    fs::write(path, bytes)?;
    info!("Saved {} items to {}", items.len(), path.display());
    Ok(())
}

/// Read a batch written by [`save_items`]
pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Vec<Item>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let (items, _): (Vec<Item>, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
    info!("Loaded {} items from {}", items.len(), path.display());
    Ok(items)
}
