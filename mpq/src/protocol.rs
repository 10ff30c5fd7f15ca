//! JSON-lines request protocol.
//!
//! One request object per line, tagged by `op`. Handles are plain unsigned
//! integers and byte buffers are hex strings. Every line gets exactly one
//! response line, including lines that cannot be parsed.

use std::collections::HashSet;
use std::path::PathBuf;

use mpq_bridge::{ArchiveHandle, Bridge, Engine, FileHandle, FindEntry, SearchHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Request {
    OpenArchive {
        path: PathBuf,
        #[serde(default)]
        flags: u32,
    },
    CreateArchive {
        path: PathBuf,
        #[serde(default)]
        flags: u32,
        max_file_count: u32,
    },
    FlushArchive {
        archive: u64,
    },
    CompactArchive {
        archive: u64,
        #[serde(default)]
        list_file: Option<PathBuf>,
    },
    CloseArchive {
        archive: u64,
    },
    OpenFile {
        archive: u64,
        name: String,
        #[serde(default)]
        scope: u32,
    },
    GetFileSize {
        file: u64,
    },
    ReadFile {
        file: u64,
        length: u64,
    },
    CreateFile {
        archive: u64,
        name: String,
        #[serde(default)]
        file_time: u64,
        size: u32,
        #[serde(default)]
        locale: u32,
        #[serde(default)]
        flags: u32,
    },
    WriteFile {
        file: u64,
        data: String,
        #[serde(default)]
        compression: u32,
    },
    FinishFile {
        file: u64,
    },
    CloseFile {
        file: u64,
    },
    HasFile {
        archive: u64,
        name: String,
    },
    RemoveFile {
        archive: u64,
        name: String,
    },
    FindFirstFile {
        archive: u64,
        #[serde(default)]
        mask: String,
    },
    FindNextFile {
        search: u64,
    },
    FindClose {
        search: u64,
    },
}

/// A find entry as it crosses the boundary, in the engine's order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry {
    file_name: String,
    plain_name: String,
    hash_index: u32,
    block_index: u32,
    file_size: u32,
    comp_size: u32,
    file_time_lo: u32,
    file_time_hi: u32,
    locale: u32,
}

impl From<FindEntry> for JsonEntry {
    fn from(entry: FindEntry) -> JsonEntry {
        JsonEntry {
            file_name: entry.file_name,
            plain_name: entry.plain_name,
            hash_index: entry.hash_index,
            block_index: entry.block_index,
            file_size: entry.file_size,
            comp_size: entry.compressed_size,
            file_time_lo: entry.file_time_lo,
            file_time_hi: entry.file_time_hi,
            locale: entry.locale,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    kind: &'static str,
    operation: Option<&'static str>,
    cause: Option<u32>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok { id: Value, ok: Value },
    Error { id: Value, error: ErrorBody },
}

#[derive(Debug)]
enum Failure {
    BadRequest(String),
    Bridge(mpq_bridge::Error),
}

impl From<mpq_bridge::Error> for Failure {
    fn from(err: mpq_bridge::Error) -> Failure {
        Failure::Bridge(err)
    }
}

impl Failure {
    fn into_body(self) -> ErrorBody {
        match self {
            Failure::BadRequest(message) => ErrorBody {
                kind: "BadRequest",
                operation: None,
                cause: None,
                message,
            },
            Failure::Bridge(err) => ErrorBody {
                kind: err.kind(),
                operation: err.operation().map(|op| op.label()),
                cause: err.cause().map(|cause| cause.code()),
                message: err.to_string(),
            },
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// State kept between requests on one connection.
pub struct Session<E> {
    bridge: Bridge<E>,
    /// Searches whose end has already been reported.
    exhausted: HashSet<u64>,
}

impl<E: Engine> Session<E> {
    pub fn new(bridge: Bridge<E>) -> Session<E> {
        Session {
            bridge,
            exhausted: HashSet::new(),
        }
    }

    /// Handles one request line.
    pub fn respond(&mut self, line: &str) -> Response {
        let parsed: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                return Response::Error {
                    id: Value::Null,
                    error: Failure::BadRequest(err.to_string()).into_body(),
                }
            }
        };
        let id = parsed.get("id").cloned().unwrap_or(Value::Null);

        let result = serde_json::from_value::<Request>(parsed)
            .map_err(|err| Failure::BadRequest(err.to_string()))
            .and_then(|request| self.dispatch(request));

        match result {
            Ok(ok) => Response::Ok { id, ok },
            Err(failure) => {
                let error = failure.into_body();
                tracing::debug!(kind = error.kind, message = %error.message, "request failed");
                Response::Error { id, error }
            }
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Value, Failure> {
        let bridge = &self.bridge;
        let value = match request {
            Request::OpenArchive { path, flags } => {
                to_value(bridge.open_archive(path, flags)?.into_raw())
            }
            Request::CreateArchive {
                path,
                flags,
                max_file_count,
            } => to_value(bridge.create_archive(path, flags, max_file_count)?.into_raw()),
            Request::FlushArchive { archive } => {
                bridge.flush_archive(ArchiveHandle::from_raw(archive))?;
                Value::Null
            }
            Request::CompactArchive { archive, list_file } => {
                bridge.compact_archive(ArchiveHandle::from_raw(archive), list_file.as_deref())?;
                Value::Null
            }
            Request::CloseArchive { archive } => {
                bridge.close_archive(ArchiveHandle::from_raw(archive))?;
                Value::Null
            }
            Request::OpenFile {
                archive,
                name,
                scope,
            } => to_value(
                bridge
                    .open_file(ArchiveHandle::from_raw(archive), &name, scope)?
                    .into_raw(),
            ),
            Request::GetFileSize { file } => {
                to_value(bridge.file_size(FileHandle::from_raw(file))?)
            }
            Request::ReadFile { file, length } => {
                let file = FileHandle::from_raw(file);
                file.decode()?;
                let len = usize::try_from(length)
                    .ok()
                    .filter(|len| u32::try_from(*len).is_ok())
                    .ok_or(mpq_bridge::Error::BufferTooLarge {
                        len: usize::try_from(length).unwrap_or(usize::MAX),
                    })?;
                let mut buffer = vec![0u8; len];
                let read = bridge.read_file(file, &mut buffer)?;
                serde_json::json!({ "read": read, "data": hex::encode(&buffer[..read]) })
            }
            Request::CreateFile {
                archive,
                name,
                file_time,
                size,
                locale,
                flags,
            } => to_value(
                bridge
                    .create_file(
                        ArchiveHandle::from_raw(archive),
                        &name,
                        file_time,
                        size,
                        locale,
                        flags,
                    )?
                    .into_raw(),
            ),
            Request::WriteFile {
                file,
                data,
                compression,
            } => {
                let data = hex::decode(&data)
                    .map_err(|err| Failure::BadRequest(format!("data: {}", err)))?;
                bridge.write_file(FileHandle::from_raw(file), &data, compression)?;
                Value::Null
            }
            Request::FinishFile { file } => {
                bridge.finish_file(FileHandle::from_raw(file))?;
                Value::Null
            }
            Request::CloseFile { file } => {
                bridge.close_file(FileHandle::from_raw(file))?;
                Value::Null
            }
            Request::HasFile { archive, name } => {
                Value::Bool(bridge.has_file(ArchiveHandle::from_raw(archive), &name)?)
            }
            Request::RemoveFile { archive, name } => {
                bridge.remove_file(ArchiveHandle::from_raw(archive), &name)?;
                Value::Null
            }
            Request::FindFirstFile { archive, mask } => {
                match bridge.find_first(ArchiveHandle::from_raw(archive), &mask)? {
                    Some((search, entry)) => {
                        // A token can be handed out again once its search is closed.
                        self.exhausted.remove(&search.into_raw());
                        let mut value = to_value(JsonEntry::from(entry));
                        if let Value::Object(map) = &mut value {
                            map.insert("hFind".into(), to_value(search.into_raw()));
                        }
                        value
                    }
                    None => Value::Null,
                }
            }
            Request::FindNextFile { search } => {
                if self.exhausted.contains(&search) {
                    return Err(mpq_bridge::Error::CursorExhausted.into());
                }
                match bridge.find_next(SearchHandle::from_raw(search))? {
                    Some(entry) => to_value(JsonEntry::from(entry)),
                    None => {
                        self.exhausted.insert(search);
                        Value::Null
                    }
                }
            }
            Request::FindClose { search } => {
                self.exhausted.remove(&search);
                bridge.find_close(SearchHandle::from_raw(search))?;
                Value::Null
            }
        };
        Ok(value)
    }
}
