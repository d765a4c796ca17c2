use crate::error::{MDResult, MkDebError};
use std::io::{self, Read, Write};
use std::path::Path;
use tar::{EntryType, Header as TarHeader};

/// Shared tar plumbing for the control and data archives.
pub(crate) struct Tarball<W: Write> {
    time: u64,
    tar: tar::Builder<W>,
}

impl<W: Write> Tarball<W> {
    pub fn new(dest: W, time: u64) -> Self {
        Self {
            time,
            tar: tar::Builder::new(dest),
        }
    }

    /// Buffered entry at a bare name, used for control archive members.
    pub fn file(&mut self, name: &str, data: &[u8], chmod: u32) -> MDResult<()> {
        let mut header = TarHeader::new_gnu();
        header.set_mtime(self.time);
        header.set_mode(chmod);
        header.set_size(data.len() as u64);
        set_root_ownership(&mut header);
        header.set_path(name)
            .map_err(|e| MkDebError::IoFile("Can't set header path", e, name.into()))?;
        header.set_cksum();
        self.tar.append(&header, data)
            .map_err(|e| MkDebError::IoFile("Can't add file to tarball", e, name.into()))?;
        Ok(())
    }

    /// Streamed entry stored under `./{target}`, used for the data archive.
    pub fn stream_file(&mut self, target: &str, mut reader: impl Read, size: u64, mode: u32, mtime: u64) -> MDResult<()> {
        let mut header = TarHeader::new_gnu();
        header.set_mtime(mtime);
        header.set_mode(mode);
        header.set_size(size);
        set_root_ownership(&mut header);
        set_header_path(&mut header, target)
            .map_err(|e| MkDebError::IoFile("Can't set header path", e, target.into()))?;
        header.set_cksum();
        self.tar.append(&header, &mut reader)
            .map_err(|e| MkDebError::IoFile("Can't add file to tarball", e, target.into()))?;
        Ok(())
    }

    /// Symlink entry stored under `./{target}`, pointing at `link_name`.
    pub fn symlink(&mut self, target: &str, link_name: &Path) -> MDResult<()> {
        let mut header = TarHeader::new_gnu();
        header.set_mtime(self.time);
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        set_root_ownership(&mut header);
        set_header_path(&mut header, target)
            .map_err(|e| MkDebError::IoFile("Can't set header path", e, target.into()))?;
        header.set_link_name(link_name)
            .map_err(|e| MkDebError::IoFile("Can't set header link name", e, target.into()))?;
        header.set_cksum();
        self.tar.append(&header, &mut io::empty())
            .map_err(|e| MkDebError::IoFile("Can't add symlink to tarball", e, target.into()))?;
        Ok(())
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.tar.into_inner()
    }
}

fn set_root_ownership(header: &mut TarHeader) {
    header.set_uid(0);
    header.set_gid(0);
    let _ = header.set_username("root");
    let _ = header.set_groupname("root");
}

// The tar crate rejects names with a leading `./` component, so the prefixed
// name is written straight into the header's name field.
fn set_header_path(header: &mut TarHeader, target: &str) -> io::Result<()> {
    const PREFIX: &[u8] = b"./";
    let slot = &mut header.as_old_mut().name;
    let bytes = target.as_bytes();
    if slot.len() < bytes.len() + PREFIX.len() {
        return Err(io::Error::other(format!("Path too long: {target}")));
    }
    let (prefix, rest) = slot.split_at_mut(PREFIX.len());
    prefix.copy_from_slice(PREFIX);
    rest[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamed_entries_are_dot_prefixed() {
        let mut tarball = Tarball::new(Vec::new(), 0);
        tarball.stream_file("usr/bin/tool", &b"data"[..], 4, 0o755, 123).unwrap();
        let bytes = tarball.into_inner().unwrap();

        let mut archive = tar::Archive::new(&bytes[..]);
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(&*entry.path().unwrap(), Path::new("./usr/bin/tool"));
        assert_eq!(entry.header().mode().unwrap(), 0o755);
        assert_eq!(entry.header().mtime().unwrap(), 123);
        assert_eq!(entry.header().username().unwrap(), Some("root"));
    }

    #[test]
    fn control_entries_use_bare_names() {
        let mut tarball = Tarball::new(Vec::new(), 42);
        tarball.file("control", b"Package: x\n", 0o600).unwrap();
        let bytes = tarball.into_inner().unwrap();

        let mut archive = tar::Archive::new(&bytes[..]);
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(&*entry.path().unwrap(), Path::new("control"));
        assert_eq!(entry.header().mtime().unwrap(), 42);
    }
}
