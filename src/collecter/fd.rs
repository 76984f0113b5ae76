use flate2::{Compression, write::GzEncoder};
use std::{
    fs::File,
    io::{Stdout, stdout},
};

use crate::error::Error;

pub enum FileDescriptor {
    Plain(File),
    Gzip(GzEncoder<File>),
    Stdout(Stdout),
}

impl std::io::Write for FileDescriptor {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(data),
            Self::Gzip(w) => w.write(data),
            Self::Stdout(w) => w.write(data),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Stdout(w) => w.flush(),
        }
    }
}

impl FileDescriptor {
    pub fn new(gzip: bool, filename: &str) -> Result<Self, Error> {
        let fd = File::create(filename)?;

        if gzip {
            let compression = Compression::new(5);
            Ok(Self::Gzip(GzEncoder::new(fd, compression)))
        } else {
            Ok(Self::Plain(fd))
        }
    }

    pub fn stdout() -> Self {
        Self::Stdout(stdout())
    }

    /// Terminates the stream. Required to obtain a valid gzip trailer.
    pub fn finish(self) -> Result<(), Error> {
        match self {
            Self::Gzip(w) => {
                w.finish()?;
            },
            Self::Plain(mut w) => std::io::Write::flush(&mut w)?,
            Self::Stdout(mut w) => std::io::Write::flush(&mut w)?,
        }
        Ok(())
    }
}
