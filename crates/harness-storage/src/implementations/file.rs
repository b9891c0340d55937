//! JSON file storage backend.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Stores each key as `<base>/<key>.json`.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(StorageError::NotFound(key.to_string()))
			}
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<String, StorageError> {
		let path = self.file_path(key);

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		// Write to a temp file then rename, so readers never see half a report.
		let temp_path = path.with_extension("json.tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let location = path.display().to_string();
		info!("Wrote {}", location);
		Ok(location)
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name().to_string_lossy().into_owned();
			if let Some(key) = name.strip_suffix(".json") {
				if key.starts_with(prefix) {
					keys.push(key.to_string());
				}
			}
		}
		keys.sort();
		Ok(keys)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_file_round_trip() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path().join("reports"));

		assert!(matches!(
			storage.get_bytes("a/b").await,
			Err(StorageError::NotFound(_))
		));
		storage.set_bytes("a/b", b"{}".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("a/b").await.unwrap(), b"{}".to_vec());
		assert!(dir.path().join("reports").join("a_b.json").exists());
		assert!(!dir.path().join("reports").join("a_b.json.tmp").exists());
	}

	#[tokio::test]
	async fn test_keys_on_missing_directory() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path().join("absent"));
		assert!(storage.keys("").await.unwrap().is_empty());
	}
}
