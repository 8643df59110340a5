use std::{io,num,fmt};
use std::convert::From;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    CSV(csv::Error),
    JSON(serde_json::Error),
    Xlsx(calamine::XlsxError),
    Reqwest(reqwest::Error),
    ParseInt(num::ParseIntError),
    MissingSheet(usize),
    MissingRegion(String),
    MissingData,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::CSV(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JSON(err)
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Self::Xlsx(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(err)
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
        Self::ParseInt(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IO(err) => write!(f, "I/O error: {}", err),
            Self::CSV(err) => write!(f, "CSV error: {}", err),
            Self::JSON(err) => write!(f, "JSON error: {}", err),
            Self::Xlsx(err) => write!(f, "Spreadsheet error: {}", err),
            Self::Reqwest(err) => write!(f, "Request error: {}", err),
            Self::ParseInt(err) => write!(f, "Integer parse error: {}", err),
            Self::MissingSheet(index) => write!(f, "Missing sheet: {}", index),
            Self::MissingRegion(name) => write!(f, "Unknown region: {}", name),
            Self::MissingData => write!(f, "No data!"),
        }
    }
}
