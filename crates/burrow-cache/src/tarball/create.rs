//! Tarball creation from in-memory files.

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};

use crate::fetch::FetchError;
use crate::CacheResult;

/// Build a gzipped tarball from `(path, contents)` pairs
pub fn create_tarball(files: &[(&str, &[u8])]) -> CacheResult<Vec<u8>> {
    let gz_encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar_builder = Builder::new(gz_encoder);

    for (path, contents) in files {
        let mut header = Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        tar_builder
            .append_data(&mut header, path, *contents)
            .map_err(|e| FetchError::io(format!("Failed to add {path} to archive"), e))?;
    }

    let gz_encoder = tar_builder
        .into_inner()
        .map_err(|e| FetchError::io("Failed to finish archive", e))?;
    gz_encoder
        .finish()
        .map_err(|e| FetchError::io("Failed to compress archive", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tar::Archive;

    #[test]
    fn test_create_lists_all_files() {
        let bytes = create_tarball(&[
            ("pkg/DESCRIPTION", b"Package: pkg\n".as_slice()),
            ("pkg/NAMESPACE", b"".as_slice()),
        ])
        .unwrap();

        let mut archive = Archive::new(GzDecoder::new(bytes.as_slice()));
        let paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec!["pkg/DESCRIPTION", "pkg/NAMESPACE"]);
    }

    #[test]
    fn test_identical_input_gives_identical_bytes() {
        let files = [("pkg/DESCRIPTION", b"Package: pkg\n".as_slice())];
        assert_eq!(create_tarball(&files).unwrap(), create_tarball(&files).unwrap());
    }
}
