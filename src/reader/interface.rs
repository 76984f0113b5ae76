use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Read, Stdin};

/// [Interface] to the G12 log
pub enum Interface {
    /// Plain file input
    Plain(File),

    /// Gzip compressed file input, identified by its ".gz" termination
    Gzip(GzDecoder<File>),

    /// Standard input, when the log is piped in
    Stdin(Stdin),
}

impl Interface {
    /// Creates a new file [Interface]. Gzip files must be terminated with ".gz".
    pub fn open(fullpath: &str) -> std::io::Result<Self> {
        let handle = File::open(fullpath)?;

        if fullpath.ends_with(".gz") {
            Ok(Self::Gzip(GzDecoder::new(handle)))
        } else {
            Ok(Self::Plain(handle))
        }
    }

    /// Creates a new [Interface] reading from standard input
    pub fn stdin() -> Self {
        Self::Stdin(std::io::stdin())
    }
}

impl std::io::Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
            Self::Stdin(r) => r.read(buf),
        }
    }
}
