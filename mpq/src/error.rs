use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot create archive `{}`", .path.display())]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot close archive `{}`", .path.display())]
    CloseArchive {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot list archive `{}`", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot extract `{name}`")]
    Extract {
        name: String,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot add `{}` to archive", .path.display())]
    AddFile {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot read file `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot derive an archived name from `{}`", .path.display())]
    InvalidName { path: PathBuf },

    #[error("File `{}` is too large for an archive", .path.display())]
    FileTooLarge { path: PathBuf },

    #[error("Cannot remove `{name}`")]
    RemoveFile {
        name: String,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot compact archive `{}`", .path.display())]
    Compact {
        path: PathBuf,
        #[source]
        source: mpq_bridge::Error,
    },

    #[error("Cannot read script `{}`", .path.display())]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read request")]
    ReadRequest {
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write output")]
    WriteOutput {
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown engine `{0}`")]
    UnknownEngine(String),

    #[error("Engine `{0}` is not available in this build")]
    EngineUnavailable(&'static str),

    #[error("`{0}` works on archive files, which the memory engine never writes; use `--engine stormlib`")]
    NeedsDiskEngine(&'static str),

    #[error("Unknown compression method `{0}`")]
    UnknownCompression(String),
}
