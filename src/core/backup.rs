use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, success, warning};
use std::fs;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::FileOptions;

pub struct BackupLogic;

impl BackupLogic {
    /// Copy the live database to `dest_file`, optionally zipped.
    ///
    /// The copy is taken with `VACUUM INTO`, so it is consistent even while
    /// another process writes. Returns the path of the final artifact.
    pub fn backup(pool: &mut DbPool, dest_file: &str, compress: bool, force: bool) -> AppResult<PathBuf> {
        let dest = Path::new(dest_file);

        if !dest.is_absolute() {
            return Err(AppError::Validation(format!(
                "backup path must be absolute: {dest_file}"
            )));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if dest.exists() {
            if !force {
                return Err(AppError::Validation(format!(
                    "'{}' already exists (use --force to overwrite)",
                    dest.display()
                )));
            }
            warning(format!("Overwriting {}", dest.display()));
            fs::remove_file(dest)?;
        }

        pool.conn
            .execute("VACUUM INTO ?1", [dest.to_string_lossy().as_ref()])?;
        success(format!("Backup created: {}", dest.display()));

        let final_path = if compress {
            let compressed = compress_backup(dest)?;
            fs::remove_file(dest)?;
            info(format!("Removed uncompressed copy: {}", dest.display()));
            compressed
        } else {
            dest.to_path_buf()
        };

        ttlog(
            &pool.conn,
            "backup",
            &final_path.to_string_lossy(),
            if compress {
                "Backup created and compressed"
            } else {
                "Backup created"
            },
        )?;

        Ok(final_path)
    }
}

fn compress_backup(path: &Path) -> AppResult<PathBuf> {
    let zip_path = path.with_extension("zip");
    let file = fs::File::create(&zip_path)?;
    let mut zip = ZipWriter::new(file);

    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Validation(format!("invalid backup path {}", path.display())))?;

    let mut f = fs::File::open(path)?;
    zip.start_file(entry_name, options)
        .map_err(std::io::Error::other)?;

    std::io::copy(&mut f, &mut zip)?;
    zip.finish().map_err(std::io::Error::other)?;

    info(format!("Compressed: {}", zip_path.display()));

    Ok(zip_path)
}
