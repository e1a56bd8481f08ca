use memmap2::MmapMut;
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

/// A file mapped read-write into this process.
pub struct MmapFileMut {
    _file: File,
    mmap: MmapMut,
    created: bool,
}

impl MmapFileMut {
    /// Open `path`, creating it if needed, grow it to at least `size_bytes` of
    /// zeroes and map it read-write.
    ///
    /// The file is never shrunk: an existing file keeps its contents, and a
    /// file already longer than `size_bytes` keeps its length.
    pub fn open_or_create_rw<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let created = file.metadata()?.len() == 0;
        grow_to(&file, size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            _file: file,
            mmap,
            created,
        })
    }

    /// Whether the file was empty before this call sized it (the mapping is
    /// all zeroes unless a racing opener already wrote to it).
    #[inline]
    pub fn created(&self) -> bool {
        self.created
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// Extends `file` to `size_bytes` if it is shorter.
///
/// `posix_fallocate` only ever extends, so a racing opener asking for less
/// cannot truncate a file another process has mapped.
#[cfg(target_os = "linux")]
fn grow_to(file: &File, size_bytes: u64) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let len = libc::off_t::try_from(size_bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "file size too large"))?;
    if len == 0 {
        return Ok(());
    }
    // SAFETY: `file` owns a valid open descriptor for the duration of the call.
    match unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) } {
        0 => Ok(()),
        errno => Err(io::Error::from_raw_os_error(errno)),
    }
}

#[cfg(not(target_os = "linux"))]
fn grow_to(file: &File, size_bytes: u64) -> io::Result<()> {
    if file.metadata()?.len() < size_bytes {
        file.set_len(size_bytes)?;
    }
    Ok(())
}
