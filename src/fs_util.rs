use std::fs;
use std::io::{self, Read};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::CrashError;

const ZIP_SIGNATURES: [[u8; 4]; 3] = [
    [b'P', b'K', 0x03, 0x04],
    [b'P', b'K', 0x05, 0x06],
    [b'P', b'K', 0x07, 0x08],
];

pub fn is_zip_file(path: &Path) -> Result<bool, CrashError> {
    let mut file = fs::File::open(path)
        .map_err(|err| CrashError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(ZIP_SIGNATURES.contains(&magic)),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(CrashError::Filesystem(format!(
            "read {}: {err}",
            path.display()
        ))),
    }
}

pub fn read_zip_member(zip_path: &Path, member: &str) -> Result<Option<Vec<u8>>, CrashError> {
    let archive_error = |message: String| CrashError::Archive {
        path: zip_path.to_path_buf(),
        message,
    };
    let file = fs::File::open(zip_path)
        .map_err(|err| CrashError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| archive_error(err.to_string()))?;

    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(archive_error(err.to_string())),
    };
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|err| archive_error(err.to_string()))?;
    Ok(Some(content))
}
