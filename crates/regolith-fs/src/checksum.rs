//! Streaming content hashing
//!
//! File hashes are lowercase hex strings without a prefix. The hash algorithm
//! is chosen by the caller; it only has to be a resettable [`Digest`] so one
//! hasher instance can be reused across every file of a tree walk.

use sha2::Digest;
use sha2::digest::{FixedOutputReset, Output};
use std::fmt::LowerHex;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Size of the buffer files are streamed through
const BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of in-memory content.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hash a file's contents, leaving `hasher` reset for the next file.
pub fn hash_file<D>(hasher: &mut D, path: &Path) -> io::Result<String>
where
    D: Digest + FixedOutputReset,
    Output<D>: LowerHex,
{
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; BUFFER_SIZE];
    Digest::reset(hasher);
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        Digest::update(hasher, &buffer[..read]);
    }
    Ok(format!("{:x}", Digest::finalize_reset(hasher)))
}

/// Copy `source` to `target` and hash the bytes in the same pass.
///
/// The target file is created (or truncated) and its parent must exist.
/// Permissions are copied from the source after the content.
pub fn copy_and_hash<D>(hasher: &mut D, source: &Path, target: &Path) -> io::Result<String>
where
    D: Digest + FixedOutputReset,
    Output<D>: LowerHex,
{
    let mut input = File::open(source)?;
    let mut output = File::create(target)?;
    let mut buffer = vec![0u8; BUFFER_SIZE];
    Digest::reset(hasher);
    loop {
        let read = input.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        Digest::update(hasher, &buffer[..read]);
        output.write_all(&buffer[..read])?;
    }
    output.flush()?;
    fs::set_permissions(target, input.metadata()?.permissions())?;
    Ok(format!("{:x}", Digest::finalize_reset(hasher)))
}
