use crate::errors::{LoadImageError, MemoryError};
use crate::hardware::model::{MemoryPort, MemoryRequest, MemoryResponse};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of 16 bit words in the memory array.
pub const MEMORY_SIZE: usize = 1 << 16;
/// Cell the OS reads the user program's entry point from in split mode.
pub const USER_ENTRY_CELL: u16 = 0x0200;
/// Reset vector when an OS image is loaded.
pub const SUPERVISOR_ENTRY: u16 = 0x02CA;

/// A binary image: 2 byte big-endian origin followed by the payload words.
pub struct Image {
    name: PathBuf,
    bytes: Vec<u8>,
}

impl Image {
    /// Reads a whole image file.
    ///
    /// # Errors
    /// - File cannot be opened or read
    pub fn read(path: &Path) -> Result<Self, LoadImageError> {
        let bytes = fs::read(path).map_err(|source| LoadImageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: path.to_path_buf(),
            bytes,
        })
    }
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Collects images in file byte order. Words only become usable once
/// [`ImageLoader::finish`] normalized the whole array, which consumes the loader
/// so normalization happens exactly once.
struct ImageLoader {
    raw: Vec<u16>,
}

impl ImageLoader {
    fn new() -> Self {
        Self {
            raw: vec![0; MEMORY_SIZE],
        }
    }

    /// Copies the payload of `image` to its origin and returns the raw origin word.
    fn load(&mut self, image: &Image, description: &str) -> Result<u16, LoadImageError> {
        let Some((header, payload)) = image.bytes.split_first_chunk::<2>() else {
            return Err(LoadImageError::MissingOrigin {
                path: image.name.clone(),
            });
        };
        let raw_origin = u16::from_ne_bytes(*header);
        let origin = usize::from(u16::from_be(raw_origin));
        log::debug!("Loading {description} image at x{origin:04x}");

        let capacity = MEMORY_SIZE - origin;
        let words = payload.chunks(2).take(capacity).map(|chunk| match *chunk {
            [high, low] => u16::from_ne_bytes([high, low]),
            [high] => u16::from_ne_bytes([high, 0]),
            _ => unreachable!("chunks(2) yields one or two bytes"),
        });
        for (cell, word) in self.raw[origin..].iter_mut().zip(words) {
            *cell = word;
        }
        if payload.len().div_ceil(2) > capacity {
            log::warn!(
                "{description} image '{}' truncated at end of memory",
                image.name.display()
            );
        }
        Ok(raw_origin)
    }

    fn finish(self, entry_point: u16) -> Memory {
        Memory {
            data: self.raw.into_iter().map(u16::from_be).collect(),
            entry_point,
        }
    }
}

/// The machine's word addressed memory, words are stored as values (big-endian
/// byte order already resolved).
pub struct Memory {
    data: Vec<u16>,
    entry_point: u16,
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory {{ words: {:#x}, entry_point: x{:04x} }}",
            self.data.len(),
            self.entry_point
        )
    }
}

impl Memory {
    /// Loads a program image and optionally an OS image.
    ///
    /// - Combined mode (no OS): the program's origin becomes the reset vector.
    /// - Split mode: the OS is loaded first, then the program, whose origin is
    ///   additionally stored at [`USER_ENTRY_CELL`]; the reset vector is
    ///   [`SUPERVISOR_ENTRY`].
    ///
    /// # Errors
    /// - An image is shorter than its origin header
    pub fn load(program: &Image, os: Option<&Image>) -> Result<Self, LoadImageError> {
        let mut loader = ImageLoader::new();
        let entry_point = if let Some(os) = os {
            loader.load(os, "OS")?;
            let raw_origin = loader.load(program, "program")?;
            loader.raw[usize::from(USER_ENTRY_CELL)] = raw_origin;
            SUPERVISOR_ENTRY
        } else {
            u16::from_be(loader.load(program, "program")?)
        };
        Ok(loader.finish(entry_point))
    }

    /// Reads the image files and loads them, see [`Memory::load`].
    ///
    /// # Errors
    /// - An image file cannot be opened
    /// - An image is shorter than its origin header
    pub fn from_files(program: &Path, os: Option<&Path>) -> Result<Self, LoadImageError> {
        let os = os.map(Image::read).transpose()?;
        Self::load(&Image::read(program)?, os.as_ref())
    }

    /// Address the machine resets to.
    #[must_use]
    pub const fn entry_point(&self) -> u16 {
        self.entry_point
    }

    const fn check(&self, address: usize) -> Result<usize, MemoryError> {
        if address < self.data.len() {
            Ok(address)
        } else {
            Err(MemoryError::OutOfRange {
                address,
                size: self.data.len(),
            })
        }
    }

    /// # Errors
    /// - `address` is outside of memory
    pub fn read_word(&self, address: usize) -> Result<u16, MemoryError> {
        Ok(self.data[self.check(address)?])
    }

    /// # Errors
    /// - `address` is outside of memory
    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), MemoryError> {
        let address = self.check(address)?;
        self.data[address] = value;
        Ok(())
    }

    /// Reads a byte, even byte addresses select the high byte of a word.
    ///
    /// # Errors
    /// - `byte_address` is outside of memory
    pub fn read_byte(&self, byte_address: usize) -> Result<u8, MemoryError> {
        let [high, low] = self.read_word(byte_address / 2)?.to_be_bytes();
        Ok(if byte_address % 2 == 0 { high } else { low })
    }

    /// # Errors
    /// - `byte_address` is outside of memory
    pub fn write_byte(&mut self, byte_address: usize, value: u8) -> Result<(), MemoryError> {
        let mut bytes = self.read_word(byte_address / 2)?.to_be_bytes();
        bytes[byte_address % 2] = value;
        self.write_word(byte_address / 2, u16::from_be_bytes(bytes))
    }

    /// Up to `count` words starting at `start`, cut off at the end of memory.
    #[must_use]
    pub fn words(&self, start: usize, count: usize) -> &[u16] {
        let start = start.min(self.data.len());
        let end = start.saturating_add(count).min(self.data.len());
        &self.data[start..end]
    }
}

impl MemoryPort for Memory {
    fn access(&mut self, request: MemoryRequest) -> MemoryResponse {
        if !request.enable {
            return MemoryResponse::default();
        }
        let address = usize::from(request.address);
        match self.read_word(address) {
            Ok(data_out) => {
                if request.write_enable {
                    self.data[address] = request.data_in;
                }
                MemoryResponse {
                    data_out,
                    ready: true,
                }
            }
            Err(e) => {
                log::error!("Memory hook: {e}");
                MemoryResponse::default()
            }
        }
    }
}
