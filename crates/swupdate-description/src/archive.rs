//! Reading `.swu` update images.
//!
//! An update image is a cpio archive in "newc" (`070701`) or "crc"
//! (`070702`) format. `sw-description` must be its first member.

use crate::{
    ArchiveError, Artifact, Error, Result, Selection, SwDescription, DESCRIPTION_FILENAME,
    SIGNATURE_FILENAME,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const NEWC_MAGIC: &[u8; 6] = b"070701";
const CRC_MAGIC: &[u8; 6] = b"070702";
const HEADER_LEN: usize = 110;
const TRAILER: &str = "TRAILER!!!";
const COPY_CHUNK: usize = 16 * 1024;

/// Longest member name accepted, terminating NUL included.
pub const MAX_NAME_LEN: usize = 4096;

/// Largest `sw-description` accepted.
pub const MAX_DESCRIPTION_LEN: u64 = 4 * 1024 * 1024;

/// A member of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub mode: u32,
    /// Byte sum of the data (crc format only, 0 otherwise)
    pub checksum: u32,
}

struct Header {
    entry: ArchiveEntry,
    crc: bool,
}

/// Tracks the absolute offset for error reporting and padding.
struct CpioReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> CpioReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), ArchiveError> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ArchiveError::Truncated {
                    offset: self.offset,
                }
            } else {
                ArchiveError::Io(e)
            }
        })?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn skip_padding(&mut self) -> std::result::Result<(), ArchiveError> {
        let pad = (4 - (self.offset % 4) as usize) % 4;
        let mut buf = [0u8; 3];
        self.read_exact(&mut buf[..pad])
    }

    fn header(&mut self) -> std::result::Result<Header, ArchiveError> {
        let start = self.offset;
        let mut raw = [0u8; HEADER_LEN];
        self.read_exact(&mut raw)?;

        let crc = match &raw[..6] {
            m if m == NEWC_MAGIC => false,
            m if m == CRC_MAGIC => true,
            _ => return Err(ArchiveError::BadMagic { offset: start }),
        };

        // 13 eight-digit hex fields follow the magic
        let field = |index: usize, name: &'static str| -> std::result::Result<u32, ArchiveError> {
            let begin = 6 + index * 8;
            std::str::from_utf8(&raw[begin..begin + 8])
                .ok()
                .and_then(|s| u32::from_str_radix(s, 16).ok())
                .ok_or(ArchiveError::InvalidHeader {
                    field: name,
                    offset: start,
                })
        };
        let mode = field(1, "mode")?;
        let size = field(6, "filesize")?;
        let namesize = field(11, "namesize")? as usize;
        let checksum = field(12, "check")?;
        if namesize == 0 || namesize > MAX_NAME_LEN {
            return Err(ArchiveError::InvalidName { offset: start });
        }

        let mut name = vec![0u8; namesize];
        self.read_exact(&mut name)?;
        if name.pop() != Some(0) {
            return Err(ArchiveError::InvalidName { offset: start });
        }
        let name = String::from_utf8(name).map_err(|_| ArchiveError::InvalidName { offset: start })?;
        self.skip_padding()?;

        Ok(Header {
            entry: ArchiveEntry {
                name,
                size: u64::from(size),
                mode,
                checksum: if crc { checksum } else { 0 },
            },
            crc,
        })
    }

    /// Read (or skip) the member data, verifying the crc sum when present.
    fn data(
        &mut self,
        header: &Header,
        keep: bool,
    ) -> std::result::Result<Option<Vec<u8>>, ArchiveError> {
        let mut remaining = header.entry.size;
        let mut kept = keep.then(|| Vec::with_capacity(remaining.min(1 << 20) as usize));
        let mut sum: u32 = 0;
        let mut buf = vec![0u8; COPY_CHUNK];

        while remaining > 0 {
            let n = remaining.min(COPY_CHUNK as u64) as usize;
            self.read_exact(&mut buf[..n])?;
            if header.crc {
                sum = buf[..n]
                    .iter()
                    .fold(sum, |acc, b| acc.wrapping_add(u32::from(*b)));
            }
            if let Some(kept) = kept.as_mut() {
                kept.extend_from_slice(&buf[..n]);
            }
            remaining -= n as u64;
        }
        self.skip_padding()?;

        if header.crc && sum != header.entry.checksum {
            return Err(ArchiveError::ChecksumMismatch {
                name: header.entry.name.clone(),
                expected: header.entry.checksum,
                actual: sum,
            });
        }
        Ok(kept)
    }
}

/// Walk every member, handing the data of those selected by `want` to `visit`.
fn scan<R, W, V>(reader: R, mut want: W, mut visit: V) -> std::result::Result<Vec<ArchiveEntry>, ArchiveError>
where
    R: Read,
    W: FnMut(usize, &ArchiveEntry) -> std::result::Result<bool, ArchiveError>,
    V: FnMut(usize, &ArchiveEntry, Vec<u8>) -> std::result::Result<(), ArchiveError>,
{
    let mut cpio = CpioReader::new(reader);
    let mut entries = Vec::new();
    loop {
        let header = cpio.header()?;
        if header.entry.name == TRAILER {
            return Ok(entries);
        }
        let index = entries.len();
        let keep = want(index, &header.entry)?;
        if let Some(data) = cpio.data(&header, keep)? {
            visit(index, &header.entry, data)?;
        }
        entries.push(header.entry);
    }
}

/// Member listing of an update image plus its description text.
#[derive(Debug, Clone)]
pub struct SwuArchive {
    pub entries: Vec<ArchiveEntry>,
    /// Raw `sw-description` content
    pub description: String,
}

impl SwuArchive {
    /// Read an update image from a path.
    pub fn open<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ArchiveError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read an update image from a reader.
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, ArchiveError> {
        let mut description = None;
        let entries = scan(
            reader,
            |index, entry| {
                if index != 0 || entry.name != DESCRIPTION_FILENAME {
                    return Ok(false);
                }
                if entry.size > MAX_DESCRIPTION_LEN {
                    return Err(ArchiveError::DescriptionTooLarge {
                        size: entry.size,
                        max: MAX_DESCRIPTION_LEN,
                    });
                }
                Ok(true)
            },
            |_, _, data| {
                let text = String::from_utf8(data).map_err(|_| ArchiveError::DescriptionEncoding)?;
                description = Some(text);
                Ok(())
            },
        )?;

        let description = description.ok_or_else(|| ArchiveError::MissingDescription {
            found: entries.first().map(|e| e.name.clone()),
        })?;

        Ok(Self {
            entries,
            description,
        })
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn is_signed(&self) -> bool {
        self.contains(SIGNATURE_FILENAME)
    }

    /// Total payload size of all members.
    pub fn payload_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Return the data of the member called `name`, if present.
pub fn read_entry<R: Read>(reader: R, name: &str) -> std::result::Result<Option<Vec<u8>>, ArchiveError> {
    let mut found = None;
    scan(
        reader,
        |_, entry| Ok(entry.name == name),
        |_, _, data| {
            found.get_or_insert(data);
            Ok(())
        },
    )?;
    Ok(found)
}

/// An update image: archive listing and resolved description.
#[derive(Debug, Clone)]
pub struct SwuImage {
    pub archive: SwuArchive,
    pub description: SwDescription,
}

impl SwuImage {
    /// Open an update image and resolve its description for `selection`.
    pub fn load<P: AsRef<Path>>(path: P, selection: &Selection) -> Result<Self> {
        let archive = SwuArchive::open(path)?;
        Self::from_archive(archive, selection)
    }

    pub fn from_archive(archive: SwuArchive, selection: &Selection) -> Result<Self> {
        let description = SwDescription::parse(&archive.description, selection)
            .map_err(Error::Description)?;
        Ok(Self {
            archive,
            description,
        })
    }

    /// Artifacts whose file is not part of the archive.
    pub fn missing_artifacts(&self) -> Vec<&Artifact> {
        self.description
            .artifacts()
            .filter(|a| {
                a.filename
                    .as_deref()
                    .map(|f| !self.archive.contains(f))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Build a cpio archive in memory from `(name, data)` pairs.
    fn build_cpio(members: &[(&str, &[u8])], crc: bool) -> Vec<u8> {
        fn pad(out: &mut Vec<u8>) {
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        let mut out = Vec::new();
        let trailer: (&str, &[u8]) = (TRAILER, b"");
        for (ino, (name, data)) in members.iter().chain(std::iter::once(&trailer)).enumerate() {
            let sum = data.iter().fold(0u32, |a, b| a.wrapping_add(u32::from(*b)));
            out.extend_from_slice(if crc { CRC_MAGIC } else { NEWC_MAGIC });
            let fields = [
                ino as u32,
                0o100644,
                0,
                0,
                1,
                0,
                data.len() as u32,
                0,
                0,
                0,
                0,
                name.len() as u32 + 1,
                if crc { sum } else { 0 },
            ];
            for f in fields {
                out.extend_from_slice(format!("{:08X}", f).as_bytes());
            }
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            pad(&mut out);
            out.extend_from_slice(data);
            pad(&mut out);
        }
        out
    }

    const DESC: &[u8] = br#"software = { version = "1.0"; images: ( { filename = "rootfs.ext4"; }, { filename = "kernel"; } ); };"#;

    #[test]
    fn test_read_archive() {
        let bytes = build_cpio(&[("sw-description", DESC), ("rootfs.ext4", b"abcde")], false);
        let archive = SwuArchive::from_reader(&bytes[..]).unwrap();
        assert_eq!(
            archive.entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["sw-description", "rootfs.ext4"]
        );
        assert_eq!(archive.entry("rootfs.ext4").unwrap().size, 5);
        assert!(archive.description.contains("rootfs.ext4"));
        assert!(!archive.is_signed());
    }

    #[test]
    fn test_crc_archive_checksum() {
        let mut bytes = build_cpio(&[("sw-description", DESC), ("data", b"xyz")], true);
        assert!(SwuArchive::from_reader(&bytes[..]).is_ok());

        let pos = bytes.windows(3).position(|w| w == b"xyz").unwrap();
        bytes[pos] = b'X';
        assert!(matches!(
            SwuArchive::from_reader(&bytes[..]),
            Err(ArchiveError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_description_must_be_first() {
        let bytes = build_cpio(&[("rootfs.ext4", b"abc"), ("sw-description", DESC)], false);
        match SwuArchive::from_reader(&bytes[..]) {
            Err(ArchiveError::MissingDescription { found }) => {
                assert_eq!(found.as_deref(), Some("rootfs.ext4"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_bad_magic_and_truncation() {
        assert!(matches!(
            SwuArchive::from_reader(&b"not a cpio archive at all"[..]),
            Err(ArchiveError::Truncated { .. })
        ));

        let mut bytes = build_cpio(&[("sw-description", DESC)], false);
        bytes[0] = b'9';
        assert!(matches!(
            SwuArchive::from_reader(&bytes[..]),
            Err(ArchiveError::BadMagic { offset: 0 })
        ));

        let bytes = build_cpio(&[("sw-description", DESC)], false);
        assert!(matches!(
            SwuArchive::from_reader(&bytes[..150]),
            Err(ArchiveError::Truncated { .. })
        ));
    }

    /// Overwrite header field `index` of the first member.
    fn forge_field(bytes: &mut [u8], index: usize, value: u32) {
        let begin = 6 + index * 8;
        bytes[begin..begin + 8].copy_from_slice(format!("{:08X}", value).as_bytes());
    }

    #[test]
    fn test_oversized_name_rejected() {
        let mut bytes = build_cpio(&[("sw-description", DESC)], false);
        forge_field(&mut bytes, 11, u32::MAX);
        assert!(matches!(
            SwuArchive::from_reader(&bytes[..]),
            Err(ArchiveError::InvalidName { offset: 0 })
        ));

        let mut bytes = build_cpio(&[("sw-description", DESC)], false);
        forge_field(&mut bytes, 11, 0);
        assert!(matches!(
            SwuArchive::from_reader(&bytes[..]),
            Err(ArchiveError::InvalidName { offset: 0 })
        ));
    }

    #[test]
    fn test_oversized_description_rejected() {
        let mut bytes = build_cpio(&[("sw-description", DESC)], false);
        forge_field(&mut bytes, 6, MAX_DESCRIPTION_LEN as u32 + 1);
        match SwuArchive::from_reader(&bytes[..]) {
            Err(ArchiveError::DescriptionTooLarge { size, max }) => {
                assert_eq!(size, MAX_DESCRIPTION_LEN + 1);
                assert_eq!(max, MAX_DESCRIPTION_LEN);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_entry() {
        let bytes = build_cpio(&[("sw-description", DESC), ("kernel", b"zImage")], false);
        assert_eq!(read_entry(&bytes[..], "kernel").unwrap(), Some(b"zImage".to_vec()));
        assert_eq!(read_entry(&bytes[..], "absent").unwrap(), None);
    }

    #[test]
    fn test_missing_artifacts() {
        let bytes = build_cpio(&[("sw-description", DESC), ("rootfs.ext4", b"abcde")], false);
        let archive = SwuArchive::from_reader(&bytes[..]).unwrap();
        let image = SwuImage::from_archive(archive, &Selection::default()).unwrap();
        let missing: Vec<_> = image
            .missing_artifacts()
            .iter()
            .filter_map(|a| a.filename.as_deref())
            .collect();
        assert_eq!(missing, vec!["kernel"]);
    }
}
