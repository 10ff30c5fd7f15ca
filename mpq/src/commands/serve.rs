use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use mpq_bridge::{Bridge, Engine};

use crate::error::{Error, Result};
use crate::protocol::Session;

/// Answers requests from stdin until it closes.
pub fn serve<E: Engine>(bridge: Bridge<E>) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut session = Session::new(bridge);
    drive(&mut session, stdin.lock(), stdout.lock())
}

/// Runs every request in `script` and prints the responses.
pub fn run<E: Engine>(bridge: Bridge<E>, script: &Path) -> Result<()> {
    let file = File::open(script).map_err(|source| Error::ReadScript {
        path: script.to_path_buf(),
        source,
    })?;
    let stdout = std::io::stdout();
    let mut session = Session::new(bridge);
    drive(&mut session, BufReader::new(file), stdout.lock())
}

pub(crate) fn drive<E, R, W>(session: &mut Session<E>, input: R, mut output: W) -> Result<()>
where
    E: Engine,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.map_err(|source| Error::ReadRequest { source })?;
        if line.trim().is_empty() {
            continue;
        }

        let response = session.respond(&line);
        serde_json::to_writer(&mut output, &response)
            .map_err(|err| Error::WriteOutput { source: err.into() })?;
        writeln!(output).map_err(|source| Error::WriteOutput { source })?;
        output
            .flush()
            .map_err(|source| Error::WriteOutput { source })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpq_bridge::MemoryEngine;
    use std::io::Cursor;

    #[test]
    fn one_response_per_request_line() {
        let script = concat!(
            r#"{"id":1,"op":"createArchive","path":"s.mpq","maxFileCount":4}"#,
            "\n\n",
            "garbage\n",
            r#"{"id":2,"op":"closeArchive","archive":4096}"#,
            "\n",
        );
        let mut session = Session::new(Bridge::new(MemoryEngine::new()));
        let mut out = Vec::new();
        drive(&mut session, Cursor::new(script), &mut out).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["ok"], serde_json::json!(4096));
        assert_eq!(lines[1]["error"]["kind"], "BadRequest");
        assert_eq!(lines[2]["id"], 2);
        assert!(lines[2].get("error").is_none());
    }

    #[test]
    fn missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Bridge::new(MemoryEngine::new()),
            &dir.path().join("missing.jsonl"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ReadScript { .. }));
    }
}
